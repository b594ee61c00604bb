//! Live Alert Feed Implementation
//!
//! One task per activation owns the transport and the buffer. Readers get
//! snapshots through a watch channel; the handle holds the shutdown signal.

use crate::api::ApiClient;
use crate::backoff::ReconnectPolicy;
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::ALERT_EVENT;
use alerting::{render_feed, AlertRecord};
use feed_buffer::FeedBuffer;
use metrics::counter;
use sse_client::{EventTransport, HttpTransport, HttpTransportConfig, SseEvent};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// Constructed, not activated
    Idle,
    /// Activated, first connection attempt in flight
    Connecting,
    /// Connected at least once; reconnects stay in this state
    Streaming,
    /// Terminal
    Closed,
}

/// Counters for one activation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Events of any type read from the stream
    pub events_received: u64,
    /// Alerts decoded and inserted
    pub alerts_accepted: u64,
    /// Alert payloads dropped by validation
    pub malformed_dropped: u64,
    /// Events of other types
    pub ignored_events: u64,
    /// Records seeded from history
    pub backfilled: u64,
    /// Reconnects scheduled
    pub reconnects: u64,
}

/// Copy of the feed published after every update
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Newest first, at most 50
    pub alerts: Vec<AlertRecord>,
    /// Feed state
    pub state: FeedState,
    /// Counters
    pub stats: FeedStats,
}

impl FeedSnapshot {
    fn new(state: FeedState) -> Self {
        Self {
            alerts: Vec::new(),
            state,
            stats: FeedStats::default(),
        }
    }

    /// Display lines for the current alerts
    pub fn render(&self) -> Vec<String> {
        render_feed(&self.alerts)
    }
}

/// A feed that has not been activated yet
pub struct LiveAlertFeed<T = HttpTransport> {
    transport: T,
    policy: ReconnectPolicy,
    history: Option<ApiClient>,
}

impl LiveAlertFeed<HttpTransport> {
    /// Create a feed for the configured alert server
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        config.validate()?;

        let transport = HttpTransport::new(HttpTransportConfig {
            url: config.stream_url(),
            connect_timeout: config.connect_timeout(),
        })?;

        let mut feed = Self::with_transport(transport, config.reconnect_policy());
        if config.backfill_history {
            feed.history = Some(ApiClient::new(config)?);
        }
        Ok(feed)
    }

    /// URL of the event stream this feed subscribes to
    pub fn stream_url(&self) -> &reqwest::Url {
        self.transport.url()
    }
}

impl<T: EventTransport + 'static> LiveAlertFeed<T> {
    /// Create a feed over any event transport
    pub fn with_transport(transport: T, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            history: None,
        }
    }

    /// Seed the buffer from the history endpoint before streaming
    pub fn with_history(mut self, client: ApiClient) -> Self {
        self.history = Some(client);
        self
    }

    /// State before activation
    pub fn state(&self) -> FeedState {
        FeedState::Idle
    }

    /// Start the feed task
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate(self) -> FeedHandle {
        let (updates, snapshots) = watch::channel(FeedSnapshot::new(FeedState::Connecting));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = FeedTask {
            transport: self.transport,
            policy: self.policy,
            history: self.history,
            buffer: FeedBuffer::with_default_capacity(),
            stats: FeedStats::default(),
            state: FeedState::Connecting,
            updates,
        };

        info!("Activating live alert feed");
        let join = tokio::spawn(task.run(shutdown_rx));

        FeedHandle {
            shutdown: Some(shutdown_tx),
            task: Some(join),
            snapshots,
        }
    }
}

/// Handle to an active feed
///
/// Dropping the handle closes the feed without waiting for it.
pub struct FeedHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    snapshots: watch::Receiver<FeedSnapshot>,
}

impl FeedHandle {
    /// Receiver notified after every update
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Current state
    pub fn state(&self) -> FeedState {
        self.snapshots.borrow().state
    }

    /// Wait until the feed closes on its own (fatal error or retries exhausted)
    pub async fn wait_closed(&self) {
        let mut rx = self.snapshots.clone();
        // Err means the task is gone, which only happens after it closed
        let _ = rx.wait_for(|s| s.state == FeedState::Closed).await;
    }

    /// Close the connection and wait for the task to finish
    ///
    /// Returns the final snapshot.
    pub async fn close(mut self) -> Result<FeedSnapshot, FeedError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| FeedError::Task(e.to_string()))?;
        }
        Ok(self.snapshots.borrow().clone())
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            debug!("Feed handle dropped, closing stream");
            let _ = shutdown.send(());
        }
    }
}

/// State owned by the running feed task
struct FeedTask<T> {
    transport: T,
    policy: ReconnectPolicy,
    history: Option<ApiClient>,
    buffer: FeedBuffer<AlertRecord>,
    stats: FeedStats,
    state: FeedState,
    updates: watch::Sender<FeedSnapshot>,
}

impl<T: EventTransport> FeedTask<T> {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        if self.backfill(&mut shutdown).await {
            self.session(&mut shutdown).await;
        }

        // Every exit path comes through here exactly once
        self.transport.close();
        self.set_state(FeedState::Closed);
        info!(
            "Live alert feed closed ({} alerts accepted, {} dropped, {} of {} retained out of {} inserted)",
            self.stats.alerts_accepted,
            self.stats.malformed_dropped,
            self.buffer.len(),
            self.buffer.capacity(),
            self.buffer.total_inserted()
        );
    }

    /// Seed from history; `false` if shutdown arrived meanwhile
    async fn backfill(&mut self, shutdown: &mut oneshot::Receiver<()>) -> bool {
        let Some(history) = self.history.take() else {
            return true;
        };

        let result = tokio::select! {
            biased;
            _ = &mut *shutdown => return false,
            result = history.fetch_history() => result,
        };

        match result {
            Ok(records) => {
                // History is oldest first
                for record in records {
                    self.buffer.push_front(record);
                    self.stats.backfilled += 1;
                }
                info!("Backfilled {} alerts from history", self.stats.backfilled);
                self.publish();
            }
            Err(e) => warn!("History backfill failed, streaming without it: {}", e),
        }
        true
    }

    /// Connect, read, and reconnect until shutdown or a terminal failure
    async fn session(&mut self, shutdown: &mut oneshot::Receiver<()>) {
        let mut attempt: u32 = 0;

        loop {
            let opened = tokio::select! {
                biased;
                _ = &mut *shutdown => return,
                result = self.transport.open() => result,
            };

            match opened {
                Ok(()) => {
                    attempt = 0;
                    if self.state != FeedState::Streaming {
                        self.set_state(FeedState::Streaming);
                    }
                }
                Err(e) if !e.is_retryable() => {
                    error!("Alert stream failed permanently: {}", e);
                    return;
                }
                Err(e) => {
                    warn!("Alert stream connection failed: {}", e);
                    if !self.wait_before_retry(&mut attempt, shutdown).await {
                        return;
                    }
                    continue;
                }
            }

            loop {
                let next = tokio::select! {
                    biased;
                    _ = &mut *shutdown => return,
                    result = self.transport.next_event() => result,
                };

                match next {
                    Ok(Some(event)) => self.handle_event(event),
                    Ok(None) => {
                        info!("Alert stream ended by server");
                        break;
                    }
                    Err(e) => {
                        warn!("Alert stream interrupted: {}", e);
                        break;
                    }
                }
            }

            if !self.wait_before_retry(&mut attempt, shutdown).await {
                return;
            }
        }
    }

    /// Sleep before the next attempt; `false` when the feed should close instead
    async fn wait_before_retry(
        &mut self,
        attempt: &mut u32,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> bool {
        if !self.policy.enabled {
            info!("Reconnect disabled, closing feed");
            return false;
        }
        if !self.policy.allows(*attempt) {
            warn!("Giving up after {} reconnect attempts", attempt);
            return false;
        }

        if let Some(retry) = self.transport.reconnection_time() {
            self.policy.set_server_retry(retry);
        }
        let delay = self.policy.delay(*attempt);
        *attempt += 1;

        self.stats.reconnects += 1;
        counter!("alert_feed_reconnects_total").increment(1);
        info!("Reconnecting in {:?} (attempt {})", delay, attempt);
        self.publish();

        tokio::select! {
            biased;
            _ = &mut *shutdown => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn handle_event(&mut self, event: SseEvent) {
        self.stats.events_received += 1;
        counter!("alert_feed_events_total").increment(1);

        if !event.is(ALERT_EVENT) {
            debug!("Ignoring `{}` event", event.event_type);
            self.stats.ignored_events += 1;
            counter!("alert_feed_ignored_total").increment(1);
            return;
        }

        match AlertRecord::decode(&event.data) {
            Ok(record) => {
                debug!("Alert received: {}", record);
                if let Some(evicted) = self.buffer.push_front(record) {
                    debug!("Feed full, evicted: {}", evicted);
                }
                self.stats.alerts_accepted += 1;
                counter!("alert_feed_alerts_total").increment(1);
            }
            Err(e) => {
                warn!("Dropping malformed alert payload: {}", e);
                self.stats.malformed_dropped += 1;
                counter!("alert_feed_malformed_total").increment(1);
            }
        }
        self.publish();
    }

    fn set_state(&mut self, state: FeedState) {
        debug!("Feed state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        self.updates.send_replace(FeedSnapshot {
            alerts: self.buffer.snapshot(),
            state: self.state,
            stats: self.stats.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sse_client::SseError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    type Step = Result<Option<SseEvent>, SseError>;

    /// Transport fed from a channel, counting opens and closes
    struct ScriptedTransport {
        opens: VecDeque<Result<(), SseError>>,
        events: mpsc::UnboundedReceiver<Step>,
        open_count: Arc<AtomicUsize>,
        close_count: Arc<AtomicUsize>,
        retry: Option<Duration>,
    }

    struct Script {
        events: mpsc::UnboundedSender<Step>,
        open_count: Arc<AtomicUsize>,
        close_count: Arc<AtomicUsize>,
    }

    impl Script {
        fn alert(&self, payload: &str) {
            self.events
                .send(Ok(Some(SseEvent::new("alert", payload))))
                .unwrap();
        }

        fn send(&self, step: Step) {
            self.events.send(step).unwrap();
        }

        fn opens(&self) -> usize {
            self.open_count.load(Ordering::SeqCst)
        }

        fn closes(&self) -> usize {
            self.close_count.load(Ordering::SeqCst)
        }
    }

    fn scripted(opens: Vec<Result<(), SseError>>) -> (ScriptedTransport, Script) {
        let (tx, rx) = mpsc::unbounded_channel();
        let open_count = Arc::new(AtomicUsize::new(0));
        let close_count = Arc::new(AtomicUsize::new(0));
        let transport = ScriptedTransport {
            opens: opens.into(),
            events: rx,
            open_count: open_count.clone(),
            close_count: close_count.clone(),
            retry: None,
        };
        let script = Script {
            events: tx,
            open_count,
            close_count,
        };
        (transport, script)
    }

    #[async_trait]
    impl EventTransport for ScriptedTransport {
        async fn open(&mut self) -> Result<(), SseError> {
            self.open_count.fetch_add(1, Ordering::SeqCst);
            self.opens.pop_front().unwrap_or(Ok(()))
        }

        async fn next_event(&mut self) -> Result<Option<SseEvent>, SseError> {
            match self.events.recv().await {
                Some(step) => step,
                None => std::future::pending().await,
            }
        }

        fn reconnection_time(&self) -> Option<Duration> {
            self.retry
        }

        fn close(&mut self) {
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn activate(transport: ScriptedTransport, policy: ReconnectPolicy) -> FeedHandle {
        LiveAlertFeed::with_transport(transport, policy).activate()
    }

    async fn wait_for_alerts(handle: &FeedHandle, count: usize) -> FeedSnapshot {
        let mut rx = handle.subscribe();
        let snapshot = rx.wait_for(|s| s.alerts.len() >= count).await.unwrap();
        snapshot.clone()
    }

    async fn wait_for_state(handle: &FeedHandle, state: FeedState) -> FeedSnapshot {
        let mut rx = handle.subscribe();
        let snapshot = rx.wait_for(|s| s.state == state).await.unwrap();
        snapshot.clone()
    }

    #[tokio::test]
    async fn test_newest_first_scenario() {
        let (transport, script) = scripted(vec![]);
        let feed = LiveAlertFeed::with_transport(transport, ReconnectPolicy::default());
        assert_eq!(feed.state(), FeedState::Idle);
        let handle = feed.activate();

        script.alert(r#"{"risk_level":"HIGH","reasons":["geo-mismatch","velocity"],"final_risk":0.92}"#);
        script.alert(r#"{"risk_level":"LOW","reasons":[],"final_risk":0.1}"#);

        let snapshot = wait_for_alerts(&handle, 2).await;
        assert_eq!(snapshot.state, FeedState::Streaming);
        assert_eq!(snapshot.alerts[0].risk_level.as_deref(), Some("LOW"));
        assert_eq!(snapshot.alerts[1].risk_level.as_deref(), Some("HIGH"));
        assert_eq!(
            snapshot.render(),
            vec![
                "LOW —  (score: 0.1)",
                "HIGH — geo-mismatch, velocity (score: 0.92)"
            ]
        );

        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_buffer_capped_at_fifty() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::default());

        for i in 1..=51 {
            script.alert(&format!(r#"{{"risk_level":"R{}","final_risk":{}}}"#, i, i));
        }

        let mut rx = handle.subscribe();
        let snapshot = rx
            .wait_for(|s| s.stats.alerts_accepted == 51)
            .await
            .unwrap()
            .clone();

        assert_eq!(snapshot.alerts.len(), 50);
        assert_eq!(snapshot.alerts[0].risk_level.as_deref(), Some("R51"));
        assert_eq!(snapshot.alerts[49].risk_level.as_deref(), Some("R2"));
        assert!(!snapshot
            .alerts
            .iter()
            .any(|a| a.risk_level.as_deref() == Some("R1")));

        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payload_dropped_and_stream_continues() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::default());

        script.alert("{not json");
        script.alert(r#"{"reasons":"velocity"}"#);
        script.alert(r#"{"risk_level":"MEDIUM"}"#);

        let snapshot = wait_for_alerts(&handle, 1).await;
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.stats.malformed_dropped, 2);
        assert_eq!(snapshot.state, FeedState::Streaming);
        assert_eq!(snapshot.alerts[0].to_string(), "MEDIUM —  (score: ?)");

        handle.close().await.unwrap();
        assert_eq!(script.opens(), 1);
    }

    #[tokio::test]
    async fn test_other_event_types_ignored() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::default());

        script.send(Ok(Some(SseEvent::message(r#"{"risk_level":"HIGH"}"#))));
        script.send(Ok(Some(SseEvent::new("heartbeat", "ping"))));
        script.alert(r#"{"risk_level":"LOW"}"#);

        let snapshot = wait_for_alerts(&handle, 1).await;
        assert_eq!(snapshot.alerts[0].risk_level.as_deref(), Some("LOW"));
        assert_eq!(snapshot.stats.ignored_events, 2);
        assert_eq!(snapshot.stats.events_received, 3);

        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_exactly_once_and_skips_queued_events() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::default());

        script.alert(r#"{"risk_level":"A"}"#);
        script.alert(r#"{"risk_level":"B"}"#);
        wait_for_alerts(&handle, 2).await;

        // Queued but not yet read when close is requested
        script.alert(r#"{"risk_level":"C"}"#);
        script.alert(r#"{"risk_level":"D"}"#);
        let watcher = handle.subscribe();

        let last = handle.close().await.unwrap();
        assert_eq!(last.state, FeedState::Closed);
        assert_eq!(last.alerts.len(), 2);
        assert_eq!(script.closes(), 1);

        // The transport is gone with the task, nothing can read this
        assert!(script
            .events
            .send(Ok(Some(SseEvent::new("alert", r#"{"risk_level":"E"}"#))))
            .is_err());
        tokio::task::yield_now().await;
        assert_eq!(watcher.borrow().alerts.len(), 2);
        assert_eq!(script.closes(), 1);
    }

    #[tokio::test]
    async fn test_close_before_any_event() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::default());

        let last = handle.close().await.unwrap();
        assert_eq!(last.state, FeedState::Closed);
        assert!(last.alerts.is_empty());
        assert_eq!(last.render(), vec!["No alerts yet..."]);
        assert_eq!(script.closes(), 1);
    }

    #[tokio::test]
    async fn test_dropping_handle_releases_connection() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::default());
        let mut rx = handle.subscribe();

        script.alert(r#"{"risk_level":"A"}"#);
        rx.wait_for(|s| s.alerts.len() == 1).await.unwrap();

        drop(handle);
        rx.wait_for(|s| s.state == FeedState::Closed).await.unwrap();
        assert_eq!(script.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_keeps_buffer_and_state() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::default());

        script.alert(r#"{"risk_level":"BEFORE"}"#);
        script.send(Ok(None));
        script.alert(r#"{"risk_level":"AFTER"}"#);

        let snapshot = wait_for_alerts(&handle, 2).await;
        assert_eq!(snapshot.state, FeedState::Streaming);
        assert_eq!(snapshot.stats.reconnects, 1);
        assert_eq!(snapshot.alerts[0].risk_level.as_deref(), Some("AFTER"));
        assert_eq!(snapshot.alerts[1].risk_level.as_deref(), Some("BEFORE"));
        assert_eq!(script.opens(), 2);

        handle.close().await.unwrap();
        assert_eq!(script.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_transport_error() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::default());

        script.send(Err(SseError::Body("connection reset".into())));
        script.alert(r#"{"risk_level":"AFTER"}"#);

        let snapshot = wait_for_alerts(&handle, 1).await;
        assert_eq!(snapshot.stats.reconnects, 1);
        assert_eq!(script.opens(), 2);

        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_fatal_open_error_closes_without_retry() {
        let (transport, script) = scripted(vec![Err(SseError::Status(404))]);
        let handle = activate(transport, ReconnectPolicy::default());

        let snapshot = wait_for_state(&handle, FeedState::Closed).await;
        assert_eq!(snapshot.stats.reconnects, 0);
        assert_eq!(script.opens(), 1);
        assert_eq!(script.closes(), 1);

        handle.wait_closed().await;
        handle.close().await.unwrap();
        assert_eq!(script.closes(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_disabled_closes_on_end() {
        let (transport, script) = scripted(vec![]);
        let handle = activate(transport, ReconnectPolicy::disabled());

        script.alert(r#"{"risk_level":"ONLY"}"#);
        script.send(Ok(None));

        let snapshot = wait_for_state(&handle, FeedState::Closed).await;
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(script.opens(), 1);
        assert_eq!(script.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let refused = || Err(SseError::Body("connection refused".into()));
        let (transport, script) = scripted(vec![refused(), refused(), refused(), refused()]);
        let policy = ReconnectPolicy {
            max_attempts: Some(2),
            ..Default::default()
        };
        let handle = activate(transport, policy);

        let snapshot = wait_for_state(&handle, FeedState::Closed).await;
        assert_eq!(snapshot.stats.reconnects, 2);
        assert_eq!(script.opens(), 3);
        assert_eq!(script.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_retry_sets_delay() {
        let (mut transport, script) = scripted(vec![]);
        transport.retry = Some(Duration::from_millis(40));
        let policy = ReconnectPolicy {
            first: Duration::from_secs(3600),
            max: Duration::from_secs(7200),
            ..Default::default()
        };
        let handle = activate(transport, policy);

        script.send(Ok(None));
        script.alert(r#"{"risk_level":"AFTER"}"#);

        let started = tokio::time::Instant::now();
        wait_for_alerts(&handle, 1).await;
        assert!(started.elapsed() < Duration::from_secs(1));

        handle.close().await.unwrap();
    }
}
