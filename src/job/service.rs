use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, mpsc, oneshot, watch};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::pipeline::{self, Rendered};
use super::tracker::{JobHandle, JobTracker};
use super::{FailureReason, JobState, PrintRequest};
use crate::error::ConnectionError;
use crate::printer::PrinterEndpoint;
use crate::raster::{BitmapPainter, Painter};
use crate::session::{Health, LinkHandle, Session, SessionConfig, SessionManager, SessionState};
use crate::transport::Spooler;

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub session: SessionConfig,
    /// Endpoint used when a request names none
    pub default_endpoint: Option<String>,
    /// How long a job may wait for the printer: once while it is being
    /// prepared, counted from the `print` call, and once when it reaches
    /// the head of its endpoint queue. Covers waiting for the session and
    /// connect attempts; expiry fails the job with `DeviceUnavailable`.
    pub device_wait: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            default_endpoint: None,
            device_wait: Duration::from_secs(10),
        }
    }
}

/// State shared by job tasks and endpoint workers.
struct Shared {
    manager: SessionManager,
    session: Mutex<Session>,
    painter: Arc<dyn Painter>,
    device_wait: Duration,
}

impl Shared {
    /// Lock the session once it is connected. Waiting for the lock and
    /// connecting both end at `deadline`.
    async fn lock_connected(&self, deadline: Instant) -> Result<MutexGuard<'_, Session>, FailureReason> {
        let wait = async {
            let mut session = self.session.lock().await;
            if !session.is_connected() {
                info!(state = %session.state(), "Waiting for printer session");
                self.manager.establish_until(&mut session, deadline).await?;
            }
            Ok::<_, ConnectionError>(session)
        };

        match timeout_at(deadline, wait).await {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(e)) => Err(FailureReason::DeviceUnavailable(e.to_string())),
            Err(_) => Err(FailureReason::DeviceUnavailable(format!(
                "printer not ready within {:?}",
                self.device_wait
            ))),
        }
    }

    async fn endpoint(&self, id: &str, deadline: Instant) -> Result<PrinterEndpoint, FailureReason> {
        let mut session = self.lock_connected(deadline).await?;
        let endpoints = self
            .manager
            .list_endpoints(&mut session)
            .await
            .map_err(|e| FailureReason::DeviceUnavailable(e.to_string()))?;
        endpoints
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| FailureReason::UnknownEndpoint(id.to_string()))
    }

    /// The session's link for one write. The session is only held while
    /// the link is looked up.
    async fn link(&self, deadline: Instant) -> Result<LinkHandle, FailureReason> {
        let session = self.lock_connected(deadline).await?;
        session
            .link()
            .map_err(|e| FailureReason::DeviceUnavailable(e.to_string()))
    }
}

/// A job waiting in an endpoint queue. `ready` fires once the tracker
/// holds the encoded stream; it is dropped if preparation fails.
struct Slot {
    tracker: Arc<JobTracker>,
    ready: oneshot::Receiver<()>,
    cancel: CancellationToken,
}

/// # Print Service
///
/// Owns the single printer session and one submission queue per endpoint.
///
/// ```
/// use std::sync::Arc;
/// use recibo::document::demo_sale;
/// use recibo::job::{PrintRequest, PrintService, ServiceConfig};
/// use recibo::transport::VirtualSpooler;
///
/// # #[tokio::main]
/// # async fn main() {
/// let spooler = VirtualSpooler::with_endpoints(&["front"]);
/// let service = PrintService::new(Arc::new(spooler.clone()), ServiceConfig::default());
///
/// let job = service.print(PrintRequest::new(demo_sale()).to_endpoint("front"));
/// assert!(job.wait().await.is_success());
/// assert_eq!(spooler.received("front").len(), 1);
/// # }
/// ```
pub struct PrintService {
    shared: Arc<Shared>,
    default_endpoint: Option<String>,
    queues: StdMutex<HashMap<String, mpsc::UnboundedSender<Slot>>>,
    session_state: watch::Receiver<SessionState>,
    shutdown: CancellationToken,
}

impl PrintService {
    /// Service painting raster jobs with the built-in [`BitmapPainter`].
    pub fn new(spooler: Arc<dyn Spooler>, config: ServiceConfig) -> Self {
        Self::with_painter(spooler, config, Arc::new(BitmapPainter::new()))
    }

    /// Service using another graphics collaborator for raster jobs.
    pub fn with_painter(
        spooler: Arc<dyn Spooler>,
        config: ServiceConfig,
        painter: Arc<dyn Painter>,
    ) -> Self {
        let session = Session::new();
        let session_state = session.subscribe();
        Self {
            shared: Arc::new(Shared {
                manager: SessionManager::new(spooler, config.session),
                session: Mutex::new(session),
                painter,
                device_wait: config.device_wait,
            }),
            default_endpoint: config.default_endpoint,
            queues: StdMutex::new(HashMap::new()),
            session_state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Connect up front instead of on the first job.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        let mut session = self.shared.session.lock().await;
        self.shared.manager.establish(&mut session).await
    }

    /// Printers reachable through the session.
    pub async fn endpoints(&self) -> Result<Vec<PrinterEndpoint>, ConnectionError> {
        let mut session = self.shared.session.lock().await;
        if !session.is_connected() {
            self.shared.manager.establish(&mut session).await?;
        }
        self.shared.manager.list_endpoints(&mut session).await
    }

    pub async fn health(&self) -> Health {
        let session = self.shared.session.lock().await;
        self.shared.manager.health(&session)
    }

    /// Session state changes, observable without waiting on running jobs.
    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.session_state.clone()
    }

    /// Start a print job.
    ///
    /// The job is queued for its endpoint before this returns, so jobs
    /// for one endpoint are submitted in call order. Must be called from
    /// within a tokio runtime.
    pub fn print(&self, request: PrintRequest) -> JobHandle {
        let id = Uuid::new_v4();
        let deadline = Instant::now() + self.shared.device_wait;
        let endpoint_id = request
            .endpoint_id
            .clone()
            .or_else(|| self.default_endpoint.clone());
        let tracker = Arc::new(JobTracker::new(id, endpoint_id.clone()));
        let token = self.shutdown.child_token();
        let handle = JobHandle::new(tracker.clone(), token.clone());

        let Some(endpoint_id) = endpoint_id else {
            tracker.finish(JobState::Failed(FailureReason::NoPrinterSelected));
            return handle;
        };

        let (ready_tx, ready) = oneshot::channel();
        if let Err(e) = self.queue(&endpoint_id).send(Slot {
            tracker: tracker.clone(),
            ready,
            cancel: token.clone(),
        }) {
            warn!(job = %id, error = %e, "Endpoint queue closed");
            tracker.finish(JobState::Failed(FailureReason::DeviceUnavailable(
                "print service stopped".into(),
            )));
            return handle;
        }

        tokio::spawn(prepare(
            self.shared.clone(),
            request,
            endpoint_id,
            deadline,
            tracker,
            token,
            ready_tx,
        ));
        handle
    }

    /// Stop all endpoint workers and close the session. Jobs still queued
    /// fail with `Cancelled`.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.queues_lock().clear();
        let mut session = self.shared.session.lock().await;
        self.shared.manager.disconnect(&mut session).await;
    }

    fn queues_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<Slot>>> {
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn queue(&self, endpoint_id: &str) -> mpsc::UnboundedSender<Slot> {
        let mut queues = self.queues_lock();
        if let Some(tx) = queues.get(endpoint_id).filter(|tx| !tx.is_closed()) {
            return tx.clone();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = EndpointWorker {
            shared: self.shared.clone(),
            endpoint_id: endpoint_id.to_string(),
        };
        tokio::spawn(worker.run(rx, self.shutdown.clone()));
        queues.insert(endpoint_id.to_string(), tx.clone());
        tx
    }
}

impl Drop for PrintService {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Render and encode one job, then hand the stream to its endpoint queue.
#[instrument(skip_all, fields(job = %tracker.id(), endpoint = %endpoint_id))]
async fn prepare(
    shared: Arc<Shared>,
    request: PrintRequest,
    endpoint_id: String,
    deadline: Instant,
    tracker: Arc<JobTracker>,
    token: CancellationToken,
    ready: oneshot::Sender<()>,
) {
    let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(FailureReason::Cancelled),
        result = build(&shared, request, &endpoint_id, deadline, &tracker) => result,
    };

    match result {
        Ok(bytes) => {
            tracker.store_payload(bytes);
            // A closed queue means the service is gone
            if ready.send(()).is_err() {
                tracker.finish(JobState::Failed(FailureReason::Cancelled));
            }
        }
        Err(reason) => {
            tracker.finish(JobState::Failed(reason));
        }
    }
}

async fn build(
    shared: &Shared,
    request: PrintRequest,
    endpoint_id: &str,
    deadline: Instant,
    tracker: &JobTracker,
) -> Result<Vec<u8>, FailureReason> {
    tracker.advance(JobState::Rendering);
    let painter = shared.painter.clone();
    let profile = request.profile.clone();
    let rendered: Rendered = tokio::task::spawn_blocking(move || {
        pipeline::render(&request, painter.as_ref())
    })
    .await
    .map_err(|e| FailureReason::Render(format!("render worker failed: {}", e)))??;

    tracker.advance(JobState::Encoding);
    let endpoint = shared.endpoint(endpoint_id, deadline).await?;
    let profile = profile.restricted_to(&endpoint.capabilities);
    let bytes = tokio::task::spawn_blocking(move || pipeline::encode(&rendered, &profile))
        .await
        .map_err(|e| FailureReason::Encode(format!("encode worker failed: {}", e)))??;

    debug!(bytes = bytes.len(), "Stream ready");
    Ok(bytes)
}

/// Submits the jobs of one endpoint, one at a time, in queue order.
struct EndpointWorker {
    shared: Arc<Shared>,
    endpoint_id: String,
}

impl EndpointWorker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Slot>, shutdown: CancellationToken) {
        debug!(endpoint = %self.endpoint_id, "Endpoint worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    rx.close();
                    while let Some(slot) = rx.recv().await {
                        slot.tracker.cancel();
                    }
                    break;
                }
                slot = rx.recv() => {
                    let Some(slot) = slot else {
                        break;
                    };
                    self.handle(slot).await;
                }
            }
        }

        debug!(endpoint = %self.endpoint_id, "Endpoint worker stopped");
    }

    #[instrument(skip_all, fields(job = %slot.tracker.id(), endpoint = %self.endpoint_id))]
    async fn handle(&self, slot: Slot) {
        let Slot {
            tracker,
            ready,
            cancel,
        } = slot;
        if ready.await.is_err() {
            // Preparation failed or was cancelled; the tracker already says so
            return;
        }

        // Time spent behind earlier jobs of this endpoint does not count
        let deadline = Instant::now() + self.shared.device_wait;

        let link = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FailureReason::Cancelled),
            link = self.shared.link(deadline) => link,
        };
        let link = match link {
            Ok(link) => link,
            Err(reason) => {
                tracker.finish(JobState::Failed(reason));
                return;
            }
        };

        let Some(payload) = tracker.begin_submit() else {
            debug!("Job finished while queued");
            return;
        };

        // Other endpoints keep using the session while this write runs
        let result = self
            .shared
            .manager
            .send(&link, &self.endpoint_id, &payload)
            .await;
        drop(payload);

        if let Err(e) = &result {
            let mut session = self.shared.session.lock().await;
            self.shared.manager.recover(&mut session, &link, e).await;
        }

        let outcome = match result {
            Ok(()) => JobState::Succeeded,
            Err(e) => JobState::Failed(e.into()),
        };
        tracker.finish(outcome);
    }
}
