//! # Connection Manager
//!
//! Owns the transport handle and runs the connect/reconnect state machine.
//!
//! ## State Machine
//!
//! ```text
//!               connect()                 transport ok
//! Disconnected ───────────► Connecting ───────────────► Connected
//!      ▲                        │  ▲                        │
//!      │        failure         │  │ after delay            │ send error /
//!      ◄────────────────────────┘  │                        │ close
//!      │                           │                        ▼
//!      │   attempts exhausted   Reconnecting ◄───── Disconnected
//!      ◄────────────────────── {attempt, delay}    (auto-reconnect only,
//!                                                   after a prior success)
//! ```
//!
//! Backoff for attempt *k* is `min(base · 2^(k-1), max)` with ±10% jitter;
//! the attempt counter resets to zero after any successful connect.
//!
//! The reconnect loop runs on its own thread — a pure time-based suspension
//! that never blocks the job worker. All state transitions are serialized
//! behind one mutex, and every transition is emitted to subscribers so a
//! front end can mirror connection health.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;

use crate::error::{ConnectError, SendError};
use crate::printer::{Config, PrinterDescriptor};
use crate::transport::{Timeouts, Transport, TransportOpener};

/// Connection lifecycle state. `Reconnecting` carries the upcoming attempt
/// number and the delay before it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32, next_delay: Duration },
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt, next_delay } => {
                write!(f, "reconnecting (attempt {}, in {:?})", attempt, next_delay)
            }
        }
    }
}

/// Tunables for the state machine, derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub auto_reconnect: bool,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub timeouts: Timeouts,
}

impl From<&Config> for ConnectionConfig {
    fn from(config: &Config) -> Self {
        Self {
            auto_reconnect: config.auto_reconnect,
            max_attempts: config.max_reconnect_attempts,
            backoff_base: config.backoff_base(),
            backoff_max: config.backoff_max(),
            timeouts: Timeouts {
                connect: config.connect_timeout(),
                send: config.send_timeout(),
            },
        }
    }
}

/// Backoff delay for reconnect attempt `attempt` (1-based), without jitter:
/// `min(base · 2^(attempt-1), max)`.
///
/// ```
/// use std::time::Duration;
/// use tinta::connection::backoff_delay;
///
/// let base = Duration::from_secs(1);
/// let max = Duration::from_secs(30);
/// assert_eq!(backoff_delay(1, base, max), Duration::from_secs(1));
/// assert_eq!(backoff_delay(3, base, max), Duration::from_secs(4));
/// assert_eq!(backoff_delay(10, base, max), Duration::from_secs(30));
/// ```
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(max, |d| d.min(max))
}

/// Apply ±10% jitter so queued clients don't reconnect in lockstep.
fn jittered(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    delay.mul_f64(rng.random_range(0.9..1.1))
}

struct Inner {
    state: ConnectionState,
    transport: Option<Box<dyn Transport>>,
    descriptor: Option<PrinterDescriptor>,
    attempts: u32,
    had_success: bool,
    reconnecting: bool,
}

/// Handle to the shared connection state machine. Cheap to clone; all
/// clones observe and drive the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Mutex<Inner>>,
    subscribers: Arc<Mutex<Vec<Sender<ConnectionState>>>>,
    config: Arc<ConnectionConfig>,
    opener: Arc<dyn TransportOpener>,
}

impl ConnectionManager {
    /// Create a manager around a transport opener. `descriptor` is the
    /// persisted last-used printer, if any.
    pub fn new(
        opener: Arc<dyn TransportOpener>,
        config: ConnectionConfig,
        descriptor: Option<PrinterDescriptor>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                transport: None,
                descriptor,
                attempts: 0,
                had_success: false,
                reconnecting: false,
            })),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            config: Arc::new(config),
            opener,
        }
    }

    /// Subscribe to state transitions. Each transition is delivered to
    /// every live receiver; dropped receivers are pruned on the next emit.
    pub fn subscribe(&self) -> Receiver<ConnectionState> {
        let (tx, rx) = channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    fn emit(&self, state: ConnectionState) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(state.clone()).is_ok());
    }

    /// Current state snapshot.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ConnectionState::Connected)
    }

    /// The configured printer, if any.
    pub fn descriptor(&self) -> Option<PrinterDescriptor> {
        self.inner.lock().unwrap().descriptor.clone()
    }

    /// Select the printer for subsequent connects.
    pub fn set_descriptor(&self, descriptor: PrinterDescriptor) {
        self.inner.lock().unwrap().descriptor = Some(descriptor);
    }

    /// Connect to a specific printer (and remember it).
    pub fn connect_to(&self, descriptor: PrinterDescriptor) -> Result<(), ConnectError> {
        self.set_descriptor(descriptor);
        self.connect()
    }

    /// Connect to the configured printer.
    ///
    /// A no-op when already connected. Fails with `NotFound` when no
    /// printer has been selected.
    pub fn connect(&self) -> Result<(), ConnectError> {
        let descriptor = {
            let mut inner = self.inner.lock().unwrap();
            match inner.state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting | ConnectionState::Reconnecting { .. } => {
                    return Err(ConnectError::RefusedOrUnreachable(
                        "a connection attempt is already in progress".into(),
                    ));
                }
                ConnectionState::Disconnected => {}
            }
            let descriptor = inner
                .descriptor
                .clone()
                .ok_or_else(|| ConnectError::NotFound("no printer configured".into()))?;
            inner.state = ConnectionState::Connecting;
            descriptor
        };
        self.emit(ConnectionState::Connecting);

        match self.try_open(&descriptor) {
            Ok(transport) => {
                {
                    let mut inner = self.inner.lock().unwrap();
                    inner.transport = Some(transport);
                    inner.state = ConnectionState::Connected;
                    inner.attempts = 0;
                    inner.had_success = true;
                }
                info!("connected to {} ({})", descriptor.name, descriptor.address);
                self.emit(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.inner.lock().unwrap().state = ConnectionState::Disconnected;
                self.emit(ConnectionState::Disconnected);
                warn!("connect to {} failed: {}", descriptor.address, e);
                Err(e)
            }
        }
    }

    /// Open a transport and probe it for liveness.
    fn try_open(&self, descriptor: &PrinterDescriptor) -> Result<Box<dyn Transport>, ConnectError> {
        let mut transport = self.opener.open(descriptor, &self.config.timeouts)?;
        match transport.request_status() {
            Ok(status) => {
                debug!("printer status: {:02x?}", status);
                Ok(transport)
            }
            Err(SendError::Timeout(detail)) => Err(ConnectError::Timeout(detail)),
            Err(e) => Err(ConnectError::RefusedOrUnreachable(format!(
                "status probe failed: {}",
                e
            ))),
        }
    }

    /// Drop the connection. Also aborts an in-flight reconnect loop.
    pub fn disconnect(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.transport = None;
            inner.reconnecting = false;
            inner.attempts = 0;
            inner.state = ConnectionState::Disconnected;
        }
        self.emit(ConnectionState::Disconnected);
    }

    /// Write bytes to the printer, blocking until the transport accepts
    /// them. A failure tears the connection down and — when auto-reconnect
    /// is enabled and a connection previously succeeded — kicks off the
    /// background reconnect loop.
    pub fn send(&self, bytes: &[u8]) -> Result<(), SendError> {
        let result = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != ConnectionState::Connected {
                return Err(SendError::Closed("not connected".into()));
            }
            match inner.transport.as_mut() {
                Some(transport) => transport.send(bytes),
                None => return Err(SendError::Closed("not connected".into())),
            }
        };

        if let Err(e) = &result {
            warn!("send failed: {}", e);
            self.handle_transport_loss();
        }
        result
    }

    /// Transport close/error path: Connected → Disconnected, then the
    /// reconnect task if policy allows.
    fn handle_transport_loss(&self) {
        let should_reconnect = {
            let mut inner = self.inner.lock().unwrap();
            inner.transport = None;
            inner.state = ConnectionState::Disconnected;
            let eligible =
                self.config.auto_reconnect && inner.had_success && !inner.reconnecting;
            if eligible {
                inner.reconnecting = true;
            }
            eligible
        };
        self.emit(ConnectionState::Disconnected);

        if should_reconnect {
            let manager = self.clone();
            thread::spawn(move || manager.reconnect_loop());
        }
    }

    /// Background reconnect with exponential backoff. Runs until success,
    /// attempt exhaustion, or an explicit `disconnect()`.
    fn reconnect_loop(&self) {
        for attempt in 1..=self.config.max_attempts {
            let delay = backoff_delay(attempt, self.config.backoff_base, self.config.backoff_max);

            {
                let mut inner = self.inner.lock().unwrap();
                if !inner.reconnecting {
                    return; // disconnect() cancelled us
                }
                inner.attempts = attempt;
                inner.state = ConnectionState::Reconnecting {
                    attempt,
                    next_delay: delay,
                };
            }
            self.emit(ConnectionState::Reconnecting {
                attempt,
                next_delay: delay,
            });
            debug!("reconnect attempt {} in {:?}", attempt, delay);
            thread::sleep(jittered(delay));

            let descriptor = {
                let mut inner = self.inner.lock().unwrap();
                if !inner.reconnecting {
                    return;
                }
                inner.state = ConnectionState::Connecting;
                match inner.descriptor.clone() {
                    Some(d) => d,
                    None => break,
                }
            };
            self.emit(ConnectionState::Connecting);

            match self.try_open(&descriptor) {
                Ok(transport) => {
                    {
                        let mut inner = self.inner.lock().unwrap();
                        inner.transport = Some(transport);
                        inner.state = ConnectionState::Connected;
                        inner.attempts = 0;
                        inner.reconnecting = false;
                    }
                    info!("reconnected to {} on attempt {}", descriptor.address, attempt);
                    self.emit(ConnectionState::Connected);
                    return;
                }
                Err(e) => {
                    debug!("reconnect attempt {} failed: {}", attempt, e);
                }
            }
        }

        // Terminal: reconnection requires an explicit connect() now.
        {
            let mut inner = self.inner.lock().unwrap();
            inner.reconnecting = false;
            inner.state = ConnectionState::Disconnected;
        }
        warn!(
            "giving up after {} reconnect attempts",
            self.config.max_attempts
        );
        self.emit(ConnectionState::Disconnected);
    }
}

// ============================================================================
// TESTS
// ============================================================================
