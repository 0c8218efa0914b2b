//! # Job Scheduler
//!
//! Single-worker print pipeline: at most one job is in flight system-wide,
//! because the transport is one shared serial link.
//!
//! ## Lifecycle
//!
//! ```text
//! Queued → Rendering → Connecting → Transmitting → Completed
//!                │           │           │
//!                └───────────┴───────────┴──► Failed(reason)
//!                            (any point) ───► Cancelled
//! ```
//!
//! The worker renders, encodes, and pushes frames through the connection
//! manager one at a time, updating progress after every frame. Cancellation
//! is cooperative and only observed at frame boundaries: once a frame has
//! been handed to the transport it is never clawed back, and no reset
//! command is sent — a cancelled print leaves the printer in its last
//! commanded state. The connection stays open for the next job.
//!
//! A transport error mid-stream fails the job; reconnecting is the
//! connection manager's business and the job is never retried implicitly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::connection::ConnectionManager;
use crate::error::TintaError;
use crate::printer::{Config, JobPolicy, PrintSettings, PrinterConfig};
use crate::protocol::encode;
use crate::render::{self, ContentDescriptor};

/// Terminal and intermediate job states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Rendering,
    Connecting,
    Transmitting,
    Completed,
    Cancelled,
    Failed(String),
}

impl JobStatus {
    /// Whether this status ends the job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed(_)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Rendering => write!(f, "rendering"),
            Self::Connecting => write!(f, "connecting"),
            Self::Transmitting => write!(f, "transmitting"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Frames sent vs. total for the active transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobProgress {
    pub frames_sent: usize,
    pub frames_total: usize,
}

/// Snapshot of a job's observable state.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One entry on the job event stream.
#[derive(Debug, Clone)]
pub struct JobEvent {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: JobProgress,
}

struct QueuedJob {
    id: Uuid,
    descriptor: ContentDescriptor,
    settings: PrintSettings,
    cancel: Arc<AtomicBool>,
    submitted_at: DateTime<Utc>,
}

enum WorkerMsg {
    Job(Box<QueuedJob>),
    Shutdown,
}

#[derive(Default)]
struct SchedState {
    pending: usize,
    active: Option<Uuid>,
}

struct Shared {
    state: Mutex<SchedState>,
    cancels: Mutex<HashMap<Uuid, Arc<AtomicBool>>>,
    subscribers: Mutex<Vec<Sender<JobEvent>>>,
    latest: Mutex<Option<PrintJob>>,
}

impl Shared {
    fn emit(&self, job: &PrintJob) {
        *self.latest.lock().unwrap() = Some(job.clone());
        let event = JobEvent {
            id: job.id,
            status: job.status.clone(),
            progress: job.progress,
        };
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Handle to the scheduler. Cheap to clone; all clones talk to the same
/// worker thread.
#[derive(Clone)]
pub struct JobScheduler {
    tx: Sender<WorkerMsg>,
    shared: Arc<Shared>,
    policy: JobPolicy,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl JobScheduler {
    /// Spawn the worker thread around a connection manager.
    pub fn new(connection: ConnectionManager, printer: PrinterConfig, config: &Config) -> Self {
        let (tx, rx) = channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(SchedState::default()),
            cancels: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            latest: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            Worker {
                rx,
                connection,
                printer,
                shared: worker_shared,
            }
            .run();
        });

        Self {
            tx,
            shared,
            policy: config.job_policy,
            worker: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Subscribe to job events (status transitions and per-frame progress).
    pub fn subscribe(&self) -> Receiver<JobEvent> {
        let (tx, rx) = channel();
        self.shared.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Submit a job.
    ///
    /// With the `Reject` policy a submission while any job is active or
    /// queued fails with [`TintaError::Busy`]; with `Queue` it lines up
    /// FIFO. The returned id is live immediately; it can be cancelled
    /// before rendering starts.
    pub fn submit(
        &self,
        descriptor: ContentDescriptor,
        settings: PrintSettings,
    ) -> Result<Uuid, TintaError> {
        let id = Uuid::new_v4();
        let cancel = Arc::new(AtomicBool::new(false));
        let submitted_at = Utc::now();

        {
            let mut state = self.shared.state.lock().unwrap();
            if self.policy == JobPolicy::Reject && (state.pending > 0 || state.active.is_some()) {
                return Err(TintaError::Busy);
            }
            state.pending += 1;
        }
        self.shared
            .cancels
            .lock()
            .unwrap()
            .insert(id, Arc::clone(&cancel));

        self.shared.emit(&PrintJob {
            id,
            status: JobStatus::Queued,
            progress: JobProgress::default(),
            submitted_at,
            finished_at: None,
        });

        let job = QueuedJob {
            id,
            descriptor,
            settings,
            cancel,
            submitted_at,
        };
        if self.tx.send(WorkerMsg::Job(Box::new(job))).is_err() {
            // Worker is gone (shutdown); roll the bookkeeping back.
            self.shared.state.lock().unwrap().pending -= 1;
            self.shared.cancels.lock().unwrap().remove(&id);
            return Err(TintaError::Busy);
        }
        debug!("job {} queued", id);
        Ok(id)
    }

    /// Request cancellation. Returns false for unknown or finished jobs.
    /// Takes effect at the next frame boundary.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.shared.cancels.lock().unwrap().get(&id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                info!("job {} cancellation requested", id);
                true
            }
            None => false,
        }
    }

    /// The currently executing job, if any.
    pub fn active_job(&self) -> Option<Uuid> {
        self.shared.state.lock().unwrap().active
    }

    /// Snapshot of the most recently updated job.
    pub fn latest(&self) -> Option<PrintJob> {
        self.shared.latest.lock().unwrap().clone()
    }

    /// Stop the worker after the current job and join it.
    pub fn shutdown(&self) {
        let _ = self.tx.send(WorkerMsg::Shutdown);
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// WORKER
// ============================================================================

struct Worker {
    rx: Receiver<WorkerMsg>,
    connection: ConnectionManager,
    printer: PrinterConfig,
    shared: Arc<Shared>,
}

impl Worker {
    fn run(self) {
        while let Ok(msg) = self.rx.recv() {
            match msg {
                WorkerMsg::Job(job) => {
                    {
                        let mut state = self.shared.state.lock().unwrap();
                        state.pending -= 1;
                        state.active = Some(job.id);
                    }
                    self.process(*job);
                }
                WorkerMsg::Shutdown => break,
            }
        }
    }

    fn process(&self, job: QueuedJob) {
        let mut snapshot = PrintJob {
            id: job.id,
            status: JobStatus::Queued,
            progress: JobProgress::default(),
            submitted_at: job.submitted_at,
            finished_at: None,
        };

        let outcome = self.execute(&job, &mut snapshot);
        snapshot.status = outcome;
        snapshot.finished_at = Some(Utc::now());
        match &snapshot.status {
            JobStatus::Completed => info!("job {} completed", job.id),
            JobStatus::Cancelled => info!("job {} cancelled", job.id),
            JobStatus::Failed(reason) => warn!("job {} failed: {}", job.id, reason),
            _ => {}
        }
        self.shared.emit(&snapshot);

        let mut state = self.shared.state.lock().unwrap();
        state.active = None;
        drop(state);
        self.shared.cancels.lock().unwrap().remove(&job.id);
    }

    /// Drive one job to a terminal status.
    fn execute(&self, job: &QueuedJob, snapshot: &mut PrintJob) -> JobStatus {
        if job.cancel.load(Ordering::SeqCst) {
            return JobStatus::Cancelled;
        }

        // Rendering
        snapshot.status = JobStatus::Rendering;
        self.shared.emit(snapshot);
        let canvas = match render::render(&job.descriptor, self.printer.width_dots as u32) {
            Ok(canvas) => canvas,
            Err(e) => return JobStatus::Failed(e.to_string()),
        };

        let stream = match encode::encode(canvas, &job.settings, &self.printer) {
            Ok(stream) => stream,
            Err(e) => return JobStatus::Failed(e.to_string()),
        };
        let total = stream.total();
        snapshot.progress = JobProgress {
            frames_sent: 0,
            frames_total: total,
        };

        if job.cancel.load(Ordering::SeqCst) {
            return JobStatus::Cancelled;
        }

        // Connecting (skipped when the link is already up)
        if !self.connection.is_connected() {
            snapshot.status = JobStatus::Connecting;
            self.shared.emit(snapshot);
            if let Err(e) = self.connection.connect() {
                return JobStatus::Failed(e.to_string());
            }
        }

        // Transmitting, one frame at a time
        snapshot.status = JobStatus::Transmitting;
        self.shared.emit(snapshot);

        for frame in stream {
            if job.cancel.load(Ordering::SeqCst) {
                return JobStatus::Cancelled;
            }
            if let Err(e) = self.connection.send(&frame.bytes) {
                return JobStatus::Failed(e.to_string());
            }
            snapshot.progress.frames_sent += 1;
            self.shared.emit(snapshot);
        }

        JobStatus::Completed
    }
}

// ============================================================================
// TESTS
// ============================================================================
