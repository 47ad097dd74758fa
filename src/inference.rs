//! Single-lane access to the local vision model.
//!
//! Ollama keeps one model resident at a time; concurrent chat requests force
//! model swaps and stall every caller. Both vision collaborators acquire the
//! `InferenceGate` for the full duration of a model call, and the gate records
//! what is running so `/health` can report it.
//!
//! Waiting is bounded by the caller's deadline. A call abandoned while queued
//! gives up instead of taking its turn on the model.

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What kind of model operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Classification,
    Extraction,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classification => write!(f, "Document classification"),
            Self::Extraction => write!(f, "Field extraction"),
        }
    }
}

/// Snapshot of the operation currently holding the gate.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveOperation {
    pub kind: OperationKind,
    pub model: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Inference gate lock poisoned")]
    LockPoisoned,
    #[error("Deadline passed after waiting {0:?} for the model")]
    DeadlineElapsed(Duration),
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct InferenceGate {
    lock: Mutex<()>,
    current_op: Mutex<Option<ActiveOperation>>,
}

impl InferenceGate {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            current_op: Mutex::new(None),
        }
    }

    /// Wait for the model until `deadline`. Hold the guard for the whole call.
    ///
    /// Never succeeds once `deadline` has passed, so a caller that already
    /// gave up cannot start a model call.
    pub fn acquire_until(
        &self,
        kind: OperationKind,
        model: &str,
        deadline: Instant,
    ) -> Result<InferenceGuard<'_>, GateError> {
        let queued_at = Instant::now();
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(GateError::DeadlineElapsed(now - queued_at));
            }
            match self.try_acquire(kind, model) {
                Ok(Some(guard)) => return Ok(guard),
                Ok(None) => std::thread::sleep(POLL_INTERVAL.min(deadline - now)),
                Err(e) => return Err(e),
            }
        }
    }

    /// Take the gate only if it is free; `Ok(None)` when another operation is running.
    fn try_acquire(
        &self,
        kind: OperationKind,
        model: &str,
    ) -> Result<Option<InferenceGuard<'_>>, GateError> {
        let guard = match self.lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Ok(None),
            Err(TryLockError::Poisoned(_)) => return Err(GateError::LockPoisoned),
        };
        self.set_current_op(kind, model);
        Ok(Some(InferenceGuard {
            _guard: guard,
            gate: self,
        }))
    }

    pub fn current_operation(&self) -> Option<ActiveOperation> {
        self.current_op.lock().ok()?.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    fn set_current_op(&self, kind: OperationKind, model: &str) {
        if let Ok(mut current) = self.current_op.lock() {
            *current = Some(ActiveOperation {
                kind,
                model: model.to_string(),
                started_at: Utc::now(),
            });
        }
    }

    fn clear_current_op(&self) {
        if let Ok(mut current) = self.current_op.lock() {
            *current = None;
        }
    }
}

impl Default for InferenceGate {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII token: dropping it frees the gate and clears the current operation.
pub struct InferenceGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    gate: &'a InferenceGate,
}

impl Drop for InferenceGuard<'_> {
    fn drop(&mut self) {
        self.gate.clear_current_op();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn far() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn idle_gate_reports_nothing() {
        let gate = InferenceGate::new();
        assert!(!gate.is_busy());
        assert!(gate.current_operation().is_none());
    }

    #[test]
    fn acquire_records_operation_until_drop() {
        let gate = InferenceGate::new();
        {
            let _guard = gate
                .acquire_until(OperationKind::Extraction, "qwen2.5vl:7b", far())
                .unwrap();
            assert!(gate.is_busy());
            let op = gate.current_operation().unwrap();
            assert_eq!(op.kind, OperationKind::Extraction);
            assert_eq!(op.model, "qwen2.5vl:7b");
        }
        assert!(!gate.is_busy());
        assert!(gate.current_operation().is_none());
    }

    #[test]
    fn try_acquire_fails_while_held() {
        let gate = InferenceGate::new();
        let _guard = gate.acquire_until(OperationKind::Classification, "m", far()).unwrap();
        assert!(gate.try_acquire(OperationKind::Extraction, "m").unwrap().is_none());
    }

    #[test]
    fn queued_caller_gives_up_at_deadline() {
        let gate = InferenceGate::new();
        let _guard = gate.acquire_until(OperationKind::Classification, "m", far()).unwrap();

        let started = Instant::now();
        let deadline = started + Duration::from_millis(50);
        let err = gate
            .acquire_until(OperationKind::Extraction, "m", deadline)
            .err()
            .unwrap();
        assert!(matches!(err, GateError::DeadlineElapsed(_)));
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(
            gate.current_operation().unwrap().kind,
            OperationKind::Classification
        );
    }

    #[test]
    fn passed_deadline_refuses_even_an_idle_gate() {
        let gate = InferenceGate::new();
        let err = gate
            .acquire_until(OperationKind::Classification, "m", Instant::now())
            .err()
            .unwrap();
        assert!(matches!(err, GateError::DeadlineElapsed(_)));
        assert!(!gate.is_busy());
    }

    #[test]
    fn waiter_gets_the_gate_once_released() {
        let gate = Arc::new(InferenceGate::new());
        let holder = {
            let gate = Arc::clone(&gate);
            let guard_held = Arc::new(std::sync::Barrier::new(2));
            let ready = Arc::clone(&guard_held);
            let handle = std::thread::spawn(move || {
                let _guard = gate.acquire_until(OperationKind::Extraction, "m", far()).unwrap();
                ready.wait();
                std::thread::sleep(Duration::from_millis(30));
            });
            guard_held.wait();
            handle
        };
        let guard = gate.acquire_until(OperationKind::Classification, "m", far()).unwrap();
        assert_eq!(
            gate.current_operation().unwrap().kind,
            OperationKind::Classification
        );
        drop(guard);
        holder.join().unwrap();
    }

    #[test]
    fn concurrent_callers_are_serialized() {
        let gate = Arc::new(InferenceGate::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                std::thread::spawn(move || {
                    let _guard = gate.acquire_until(OperationKind::Classification, "m", far()).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
