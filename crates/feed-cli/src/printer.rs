//! Terminal Rendering of Feed Snapshots

use alerting::{EMPTY_FEED_MESSAGE, FEED_TITLE};
use clap::ValueEnum;
use live_feed::FeedSnapshot;
use std::io::{self, Write};

/// How snapshots are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DisplayMode {
    /// Print each new alert as one line, oldest first
    #[default]
    Lines,
    /// Re-render the whole feed, newest first, after every change
    Full,
}

/// Writes feed updates to a terminal (or any writer)
pub struct FeedPrinter<W: Write> {
    mode: DisplayMode,
    out: W,
    /// Alerts inserted as of the last render (accepted + backfilled)
    seen: Option<u64>,
}

impl<W: Write> FeedPrinter<W> {
    /// Create a printer
    pub fn new(mode: DisplayMode, out: W) -> Self {
        Self {
            mode,
            out,
            seen: None,
        }
    }

    /// Render a snapshot; snapshots without new alerts print nothing
    pub fn render(&mut self, snapshot: &FeedSnapshot) -> io::Result<()> {
        let total = snapshot.stats.alerts_accepted + snapshot.stats.backfilled;
        let previous = self.seen.replace(total);
        if previous == Some(total) {
            return Ok(());
        }

        match self.mode {
            DisplayMode::Lines => {
                if snapshot.alerts.is_empty() {
                    writeln!(self.out, "{}", EMPTY_FEED_MESSAGE)?;
                } else {
                    let fresh = total.saturating_sub(previous.unwrap_or(0));
                    let fresh = usize::try_from(fresh)
                        .unwrap_or(usize::MAX)
                        .min(snapshot.alerts.len());
                    for alert in snapshot.alerts[..fresh].iter().rev() {
                        writeln!(self.out, "{}", alert)?;
                    }
                }
            }
            DisplayMode::Full => {
                writeln!(self.out, "{}", FEED_TITLE)?;
                for line in snapshot.render() {
                    writeln!(self.out, "  {}", line)?;
                }
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    /// Consume the printer, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}
