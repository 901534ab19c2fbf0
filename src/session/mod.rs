//! # Device Session Manager
//!
//! Owns the lifecycle of the link to a print spooler.
//!
//! ## State Machine
//!
//! ```text
//!                 connect()
//! Disconnected ─────────────► Connecting ──── open ok ────► Connected
//!      ▲                          │                             │
//!      │                          └── timeout / refused ──► Failed
//!      │                                                        │
//!      └──────────── link lost (one automatic reconnect) ◄──────┘
//! ```
//!
//! - `Connecting` is bounded by [`SessionConfig::connect_timeout`]; expiry
//!   leaves the session `Failed` with a retryable [`ConnectionError::Timeout`].
//! - Losing the link while `Connected` moves to `Disconnected` and triggers
//!   exactly one reconnect before the error reaches the caller.
//! - Connects are serialized: a connect issued while another is in flight
//!   waits for it.
//! - Submissions are bounded by [`SessionConfig::ack_timeout`]. An
//!   abandoned write drops the link, since the printer may hold half a
//!   stream.
//! - A [`LinkHandle`] taken from a connected session writes streams
//!   without holding the session, so writes to different endpoints run
//!   side by side. [`SessionManager::recover`] applies a failed write back
//!   to the session, unless the link has been replaced in the meantime.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, timeout};
use tracing::{debug, info, instrument, warn};

use crate::error::{ConnectionError, SubmitError};
use crate::printer::PrinterEndpoint;
use crate::transport::{Spooler, SpoolerLink};

mod backoff;

pub use backoff::Backoff;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Session timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bound on `Connecting`
    pub connect_timeout: Duration,
    /// Bound on one stream submission
    pub ack_timeout: Duration,
    /// Delays between attempts in [`SessionManager::connect_with_retry`]
    pub retry: Backoff,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            ack_timeout: Duration::from_secs(30),
            retry: Backoff::default(),
        }
    }
}

/// Snapshot of a session for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub state: SessionState,
    pub last_error: Option<String>,
    /// Automatic reconnects performed so far
    pub reconnects: u32,
    pub spooler: String,
}

/// One connection to the spooler.
///
/// Created `Disconnected`; only the [`SessionManager`] changes its state.
pub struct Session {
    state: SessionState,
    link: Option<Arc<dyn SpoolerLink>>,
    /// Bumped on every successful connect
    generation: u64,
    last_error: Option<String>,
    reconnects: u32,
    state_tx: watch::Sender<SessionState>,
}

/// The link of a connected session, usable without holding the session.
#[derive(Clone)]
pub struct LinkHandle {
    link: Arc<dyn SpoolerLink>,
    generation: u64,
}

impl fmt::Debug for LinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            state: SessionState::Disconnected,
            link: None,
            generation: 0,
            last_error: None,
            reconnects: 0,
            state_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Watch state changes without holding the session.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn fail(&mut self, error: String) {
        self.last_error = Some(error);
        self.set_state(SessionState::Failed);
    }

    /// Detach the current link for a write.
    pub fn link(&self) -> Result<LinkHandle, ConnectionError> {
        match (self.state, &self.link) {
            (SessionState::Connected, Some(link)) => Ok(LinkHandle {
                link: link.clone(),
                generation: self.generation,
            }),
            _ => Err(ConnectionError::NotConnected),
        }
    }

    async fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            link.close().await;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("last_error", &self.last_error)
            .field("reconnects", &self.reconnects)
            .finish_non_exhaustive()
    }
}

/// Connects sessions to one spooler and runs operations on them.
pub struct SessionManager {
    spooler: Arc<dyn Spooler>,
    config: SessionConfig,
    connect_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(spooler: Arc<dyn Spooler>, config: SessionConfig) -> Self {
        Self {
            spooler,
            config,
            connect_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a new session.
    pub async fn connect(&self) -> Result<Session, ConnectionError> {
        let mut session = Session::new();
        self.establish(&mut session).await?;
        Ok(session)
    }

    /// Open a new session, retrying with backoff until `deadline` has passed.
    pub async fn connect_with_retry(&self, deadline: Duration) -> Result<Session, ConnectionError> {
        let mut session = Session::new();
        self.establish_with_retry(&mut session, deadline).await?;
        Ok(session)
    }

    /// Bring an existing session to `Connected`. No-op when it already is.
    pub async fn establish(&self, session: &mut Session) -> Result<(), ConnectionError> {
        self.attempt(session, self.config.connect_timeout).await
    }

    /// One connect bounded by `limit`.
    #[instrument(skip(self, session), fields(spooler = %self.spooler.describe()))]
    async fn attempt(&self, session: &mut Session, limit: Duration) -> Result<(), ConnectionError> {
        let _guard = self.connect_lock.lock().await;
        if session.is_connected() {
            return Ok(());
        }

        session.close_link().await;
        session.set_state(SessionState::Connecting);

        match timeout(limit, self.spooler.open()).await {
            Ok(Ok(link)) => {
                session.link = Some(Arc::from(link));
                session.generation += 1;
                session.last_error = None;
                session.set_state(SessionState::Connected);
                info!(generation = session.generation, "Session connected");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Connect failed");
                session.fail(e.to_string());
                Err(ConnectionError::Failed(e))
            }
            Err(_) => {
                let err = ConnectionError::Timeout(limit);
                warn!(error = %err, "Connect timed out");
                session.fail(err.to_string());
                Err(err)
            }
        }
    }

    /// [`establish`](Self::establish) with exponential backoff for at most
    /// `deadline`. See [`establish_until`](Self::establish_until).
    pub async fn establish_with_retry(
        &self,
        session: &mut Session,
        deadline: Duration,
    ) -> Result<(), ConnectionError> {
        self.establish_until(session, Instant::now() + deadline).await
    }

    /// Retry connecting with exponential backoff until `deadline`.
    ///
    /// No attempt runs past the deadline: the last one gets only the time
    /// that is left. Gives up with the last error once the next attempt
    /// would start at or after `deadline`, and with `NotConnected` if the
    /// deadline has already passed.
    pub async fn establish_until(
        &self,
        session: &mut Session,
        deadline: Instant,
    ) -> Result<(), ConnectionError> {
        if session.is_connected() {
            return Ok(());
        }
        let mut delays = self.config.retry.delays();

        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(ConnectionError::NotConnected);
            }
            let err = match self.attempt(session, self.config.connect_timeout.min(left)).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            let delay = delays.next().unwrap_or(self.config.retry.max);
            if Instant::now() + delay >= deadline {
                return Err(err);
            }
            info!(delay_ms = delay.as_millis() as u64, "Retrying connect");
            tokio::time::sleep(delay).await;
        }
    }

    /// Drop a dead link and connect once more.
    async fn reconnect(&self, session: &mut Session) -> Result<(), ConnectionError> {
        session.close_link().await;
        session.set_state(SessionState::Disconnected);
        session.reconnects += 1;
        info!(reconnects = session.reconnects, "Link lost, reconnecting");
        self.establish(session)
            .await
            .map_err(|e| ConnectionError::Lost(e.to_string()))
    }

    /// Printers behind the spooler. A lost link is reconnected once and
    /// the listing retried.
    pub async fn list_endpoints(
        &self,
        session: &mut Session,
    ) -> Result<Vec<PrinterEndpoint>, ConnectionError> {
        let ack_timeout = self.config.ack_timeout;
        let link = session.link()?;
        let first = match timeout(ack_timeout, link.link.endpoints()).await {
            Ok(result) => result,
            Err(_) => return Err(ConnectionError::Timeout(ack_timeout)),
        };

        match first {
            Ok(endpoints) => Ok(endpoints),
            Err(e) if e.is_link_loss() => {
                warn!(error = %e, "Link lost while listing endpoints");
                self.reconnect(session).await?;
                let link = session.link()?;
                match timeout(ack_timeout, link.link.endpoints()).await {
                    Ok(Ok(endpoints)) => Ok(endpoints),
                    Ok(Err(e)) => Err(ConnectionError::Lost(e.to_string())),
                    Err(_) => Err(ConnectionError::Timeout(ack_timeout)),
                }
            }
            Err(e) => Err(ConnectionError::Failed(e)),
        }
    }

    /// Hand a finished stream to one endpoint.
    ///
    /// Never resubmits: after a link loss the session reconnects once so
    /// the next job can proceed, and the original error is returned.
    pub async fn submit(
        &self,
        session: &mut Session,
        endpoint_id: &str,
        data: &[u8],
    ) -> Result<(), SubmitError> {
        let link = session.link()?;
        let result = self.send(&link, endpoint_id, data).await;
        if let Err(e) = &result {
            self.recover(session, &link, e).await;
        }
        result
    }

    /// Write a stream through a detached link, bounded by the ack timeout.
    /// Leaves the session alone; pass failures to [`recover`](Self::recover).
    #[instrument(skip(self, link, data), fields(endpoint = %endpoint_id, bytes = data.len()))]
    pub async fn send(
        &self,
        link: &LinkHandle,
        endpoint_id: &str,
        data: &[u8],
    ) -> Result<(), SubmitError> {
        let ack_timeout = self.config.ack_timeout;
        match timeout(ack_timeout, link.link.submit(endpoint_id, data)).await {
            Ok(Ok(())) => {
                info!("Stream accepted");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Submit failed");
                Err(SubmitError::Transport(e))
            }
            Err(_) => {
                warn!(timeout_ms = ack_timeout.as_millis() as u64, "No acknowledgment");
                Err(SubmitError::AckTimeout(ack_timeout))
            }
        }
    }

    /// Apply a failed [`send`](Self::send) to the session it came from.
    ///
    /// A lost link is reconnected once; an unacknowledged write drops the
    /// link and leaves the session `Disconnected`. Nothing happens when the
    /// session has moved on to a newer link.
    pub async fn recover(&self, session: &mut Session, link: &LinkHandle, error: &SubmitError) {
        if session.generation != link.generation {
            debug!(
                stale = link.generation,
                current = session.generation,
                "Link already replaced"
            );
            return;
        }

        match error {
            SubmitError::Transport(e) if e.is_link_loss() => {
                session.last_error = Some(e.to_string());
                if let Err(re) = self.reconnect(session).await {
                    warn!(error = %re, "Reconnect failed");
                }
            }
            SubmitError::AckTimeout(d) => {
                session.close_link().await;
                session.last_error = Some(format!("no acknowledgment within {:?}", d));
                session.set_state(SessionState::Disconnected);
            }
            SubmitError::Transport(_) | SubmitError::Connection(_) => {}
        }
    }

    pub async fn disconnect(&self, session: &mut Session) {
        let _guard = self.connect_lock.lock().await;
        session.close_link().await;
        session.set_state(SessionState::Disconnected);
        info!("Session disconnected");
    }

    pub fn health(&self, session: &Session) -> Health {
        Health {
            state: session.state,
            last_error: session.last_error.clone(),
            reconnects: session.reconnects,
            spooler: self.spooler.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::VirtualSpooler;
    use crate::transport::memory::Behavior;

    fn manager(spooler: &VirtualSpooler) -> SessionManager {
        SessionManager::new(Arc::new(spooler.clone()), SessionConfig::default())
    }

    #[tokio::test]
    async fn test_connect_and_list() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        let manager = manager(&spooler);

        let mut session = manager.connect().await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        let endpoints = manager.list_endpoints(&mut session).await.unwrap();
        assert_eq!(endpoints[0].id, "front");

        manager.disconnect(&mut session).await;
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(
            manager.list_endpoints(&mut session).await,
            Err(ConnectionError::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_is_retryable_failure() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        spooler.set_connect(Behavior::Hang);
        let manager = manager(&spooler);

        let mut session = Session::new();
        let mut states = session.subscribe();
        let start = Instant::now();
        let err = manager.establish(&mut session).await.unwrap_err();

        assert!(matches!(err, ConnectionError::Timeout(d) if d == Duration::from_secs(3)));
        assert!(err.is_retryable());
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(*states.borrow_and_update(), SessionState::Failed);

        let health = manager.health(&session);
        assert_eq!(health.state, SessionState::Failed);
        assert_eq!(health.spooler, "virtual://");
        assert!(health.last_error.is_some());
    }

    #[tokio::test]
    async fn test_refused_connect() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        spooler.set_connect(Behavior::Fail);
        let err = manager(&spooler).connect().await.unwrap_err();
        assert!(matches!(err, ConnectionError::Failed(TransportError::Refused(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_backs_off() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        spooler.set_connect(Behavior::Fail);
        let manager = manager(&spooler);

        let revive = spooler.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            revive.set_connect(Behavior::Ready);
        });

        // attempts at 0ms, 200ms, 600ms
        let start = Instant::now();
        let session = manager.connect_with_retry(Duration::from_secs(5)).await.unwrap();
        assert!(session.is_connected());
        assert_eq!(start.elapsed(), Duration::from_millis(600));
        assert_eq!(spooler.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_gives_up() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        spooler.set_connect(Behavior::Fail);
        let manager = manager(&spooler);

        let start = Instant::now();
        let err = manager.connect_with_retry(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Failed(_)));
        // the attempt after 600ms would start at 1400ms
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_connects_are_serialized() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        spooler.set_connect(Behavior::Delay(Duration::from_secs(1)));
        let manager = manager(&spooler);

        let start = Instant::now();
        let (a, b) = tokio::join!(manager.connect(), manager.connect());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_listing_reconnects_once_after_link_loss() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        let manager = manager(&spooler);
        let mut session = manager.connect().await.unwrap();

        spooler.drop_links();
        let endpoints = manager.list_endpoints(&mut session).await.unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(spooler.opens(), 2);
        assert_eq!(manager.health(&session).reconnects, 1);
    }

    #[tokio::test]
    async fn test_reconnect_failure_surfaces_lost() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        let manager = manager(&spooler);
        let mut session = manager.connect().await.unwrap();

        spooler.drop_links();
        spooler.set_connect(Behavior::Fail);
        let err = manager.list_endpoints(&mut session).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Lost(_)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_submit_link_loss_is_not_resubmitted() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        let manager = manager(&spooler);
        let mut session = manager.connect().await.unwrap();

        spooler.drop_next_submits(1);
        let err = manager.submit(&mut session, "front", b"receipt").await.unwrap_err();
        assert!(matches!(err, SubmitError::Transport(TransportError::Lost(_))));
        assert!(spooler.received("front").is_empty());
        // reconnected for the next job
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(spooler.opens(), 2);

        manager.submit(&mut session, "front", b"next").await.unwrap();
        assert_eq!(spooler.received("front"), vec![b"next".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_ack_timeout_drops_link() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        spooler.set_submit(Behavior::Hang);
        let manager = SessionManager::new(
            Arc::new(spooler.clone()),
            SessionConfig {
                ack_timeout: Duration::from_secs(5),
                ..SessionConfig::default()
            },
        );
        let mut session = manager.connect().await.unwrap();

        let err = manager.submit(&mut session, "front", b"receipt").await.unwrap_err();
        assert!(matches!(err, SubmitError::AckTimeout(d) if d == Duration::from_secs(5)));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_never_runs_past_deadline() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        spooler.set_connect(Behavior::Hang);
        let manager = manager(&spooler);

        // 3s attempt, 200ms pause, then only 1.8s left for the second one
        let mut session = Session::new();
        let start = Instant::now();
        let err = manager
            .establish_with_retry(&mut session, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert!(matches!(err, ConnectionError::Timeout(d) if d == Duration::from_millis(1800)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_expired_deadline_makes_no_attempt() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        let manager = manager(&spooler);

        let mut session = Session::new();
        let err = manager
            .establish_until(&mut session, Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::NotConnected));
        assert_eq!(spooler.opens(), 0);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_sends_run_side_by_side() {
        let spooler = VirtualSpooler::with_endpoints(&["bar", "kitchen"]);
        spooler.set_submit(Behavior::Delay(Duration::from_secs(2)));
        let manager = manager(&spooler);
        let session = manager.connect().await.unwrap();

        let link = session.link().unwrap();
        let start = Instant::now();
        let (a, b) = tokio::join!(
            manager.send(&link, "bar", b"one"),
            manager.send(&link, "kitchen", b"two")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_recover_ignores_replaced_link() {
        let spooler = VirtualSpooler::with_endpoints(&["front"]);
        let manager = manager(&spooler);
        let mut session = manager.connect().await.unwrap();

        let stale = session.link().unwrap();
        manager.disconnect(&mut session).await;
        manager.establish(&mut session).await.unwrap();

        let err = SubmitError::AckTimeout(Duration::from_secs(1));
        manager.recover(&mut session, &stale, &err).await;
        assert_eq!(session.state(), SessionState::Connected);
        assert!(session.last_error().is_none());

        // the current link is still recovered
        let current = session.link().unwrap();
        manager.recover(&mut session, &current, &err).await;
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}
