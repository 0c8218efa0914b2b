//! # Mock Transport
//!
//! Scripted in-memory transport and opener for exercising the connection
//! manager and job scheduler without hardware. Every transport opened by a
//! [`MockOpener`] shares one [`MockState`], so a test holds the state handle
//! and inspects exactly what reached the wire.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ConnectError, SendError};
use crate::printer::PrinterDescriptor;
use crate::protocol::commands::STATUS_RESPONSE_LEN;
use crate::transport::{Timeouts, Transport, TransportOpener};

/// Shared scripting surface for mock transports.
pub struct MockState {
    /// Every payload that reached `send`, in order.
    pub sent: Vec<Vec<u8>>,

    /// 1-based send index that fails (once), e.g. `Some(5)` makes the fifth
    /// send return `fail_with` without recording the payload.
    pub fail_at: Option<usize>,

    /// Error returned when `fail_at` trips.
    pub fail_with: SendError,

    /// Called after each successful send with the running send count.
    /// Runs synchronously on the sender's thread while the state lock is
    /// held, so the hook must not touch this [`MockState`].
    pub send_hook: Option<Box<dyn FnMut(usize) + Send>>,

    /// Status report returned by `request_status`.
    pub status_response: [u8; STATUS_RESPONSE_LEN],

    /// Make the status probe fail (simulates a dead peer that accepted the
    /// socket).
    pub status_fails: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            fail_at: None,
            fail_with: SendError::Io("mock failure".into()),
            send_hook: None,
            status_response: [0; STATUS_RESPONSE_LEN],
            status_fails: false,
        }
    }
}

/// Transport half: records sends into the shared state.
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Transport for MockTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        let mut state = self.state.lock().unwrap();
        let index = state.sent.len() + 1;
        if state.fail_at == Some(index) {
            state.fail_at = None;
            return Err(state.fail_with.clone());
        }
        state.sent.push(bytes.to_vec());
        let count = state.sent.len();
        if let Some(hook) = state.send_hook.as_mut() {
            hook(count);
        }
        Ok(())
    }

    fn request_status(&mut self) -> Result<[u8; STATUS_RESPONSE_LEN], SendError> {
        let state = self.state.lock().unwrap();
        if state.status_fails {
            return Err(SendError::Closed("mock status failure".into()));
        }
        Ok(state.status_response)
    }
}

/// Opener half: yields transports per a scripted plan.
pub struct MockOpener {
    state: Arc<Mutex<MockState>>,
    plan: Mutex<VecDeque<Result<(), ConnectError>>>,
    default_outcome: Result<(), ConnectError>,
    opens: AtomicUsize,
}

impl MockOpener {
    /// Opener whose every `open` succeeds.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            plan: Mutex::new(VecDeque::new()),
            default_outcome: Ok(()),
            opens: AtomicUsize::new(0),
        }
    }

    /// Outcomes for successive `open` calls; once the plan is exhausted,
    /// `default_outcome` applies.
    pub fn with_plan(
        plan: Vec<Result<(), ConnectError>>,
        default_outcome: Result<(), ConnectError>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            plan: Mutex::new(plan.into()),
            default_outcome,
            opens: AtomicUsize::new(0),
        }
    }

    /// Handle to the shared state for scripting and assertions.
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }

    /// How many times `open` was called.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Default for MockOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportOpener for MockOpener {
    fn open(
        &self,
        _descriptor: &PrinterDescriptor,
        _timeouts: &Timeouts,
    ) -> Result<Box<dyn Transport>, ConnectError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone());
        outcome?;
        Ok(Box::new(MockTransport {
            state: Arc::clone(&self.state),
        }))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> PrinterDescriptor {
        PrinterDescriptor::new("AA:BB:CC:DD:EE:FF", "CorePrint_TEST", 1)
    }

    #[test]
    fn test_records_sends_in_order() {
        let opener = MockOpener::new();
        let mut transport = opener.open(&descriptor(), &Timeouts::default()).unwrap();
        transport.send(&[1, 2]).unwrap();
        transport.send(&[3]).unwrap();

        let state = opener.state();
        let state = state.lock().unwrap();
        assert_eq!(state.sent, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_fail_at_trips_once() {
        let opener = MockOpener::new();
        opener.state().lock().unwrap().fail_at = Some(2);
        let mut transport = opener.open(&descriptor(), &Timeouts::default()).unwrap();

        transport.send(&[1]).unwrap();
        assert!(transport.send(&[2]).is_err());
        transport.send(&[3]).unwrap();

        let state = opener.state();
        let guard = state.lock().unwrap();
        assert_eq!(guard.sent.len(), 2);
    }

    #[test]
    fn test_plan_then_default() {
        let opener = MockOpener::with_plan(
            vec![Ok(())],
            Err(ConnectError::RefusedOrUnreachable("down".into())),
        );
        assert!(opener.open(&descriptor(), &Timeouts::default()).is_ok());
        assert!(opener.open(&descriptor(), &Timeouts::default()).is_err());
        assert!(opener.open(&descriptor(), &Timeouts::default()).is_err());
        assert_eq!(opener.open_count(), 3);
    }

    #[test]
    fn test_send_hook_sees_count() {
        let opener = MockOpener::new();
        let counts: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let counts2 = Arc::clone(&counts);
        opener.state().lock().unwrap().send_hook =
            Some(Box::new(move |n| counts2.lock().unwrap().push(n)));

        let mut transport = opener.open(&descriptor(), &Timeouts::default()).unwrap();
        transport.send(&[0]).unwrap();
        transport.send(&[0]).unwrap();
        assert_eq!(*counts.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_status_probe() {
        let opener = MockOpener::new();
        opener.state().lock().unwrap().status_response = [7; STATUS_RESPONSE_LEN];
        let mut transport = opener.open(&descriptor(), &Timeouts::default()).unwrap();
        assert_eq!(transport.request_status().unwrap(), [7; 8]);

        opener.state().lock().unwrap().status_fails = true;
        assert!(transport.request_status().is_err());
    }
}
