//! Text Rendering for Alert Records

use crate::record::AlertRecord;
use std::fmt;

/// Shown for a missing risk level or score
pub const PLACEHOLDER: &str = "?";

/// Joins reasons on one line
pub const REASON_SEPARATOR: &str = ", ";

/// Heading of the live feed
pub const FEED_TITLE: &str = "Live Alerts";

/// Shown while the feed holds no alerts
pub const EMPTY_FEED_MESSAGE: &str = "No alerts yet...";

impl AlertRecord {
    /// Risk level, or the placeholder when absent
    pub fn risk_level_display(&self) -> &str {
        self.risk_level.as_deref().unwrap_or(PLACEHOLDER)
    }

    /// Reasons joined with `", "`, empty when there are none
    pub fn reasons_display(&self) -> String {
        self.reasons.join(REASON_SEPARATOR)
    }

    /// Final score, or the placeholder when absent
    pub fn final_risk_display(&self) -> String {
        self.final_risk
            .as_ref()
            .map(|score| score.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} — {} (score: {})",
            self.risk_level_display(),
            self.reasons_display(),
            self.final_risk_display()
        )
    }
}

/// Render a newest-first feed as display lines
///
/// An empty feed renders a single placeholder line.
pub fn render_feed(alerts: &[AlertRecord]) -> Vec<String> {
    if alerts.is_empty() {
        return vec![EMPTY_FEED_MESSAGE.to_string()];
    }
    alerts.iter().map(|alert| alert.to_string()).collect()
}
