use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

use crate::error::RecordError;

/// Who asked for a prediction, and what they got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visit {
    pub name: String,
    pub email: String,
    pub age: i32,
    pub prediction: u8,
}

/// Sink for visit records. Recording is best effort and never blocks a result.
pub trait VisitRecorder: Send + Sync {
    fn record(&self, visit: &Visit) -> Result<(), RecordError>;
}

/// Records nothing. The default: submissions are not kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRecorder;

impl VisitRecorder for DisabledRecorder {
    fn record(&self, _visit: &Visit) -> Result<(), RecordError> {
        Ok(())
    }
}

/// Keeps the most recent visits in process memory; lost on restart.
pub struct MemoryRecorder {
    capacity: usize,
    visits: Mutex<VecDeque<Visit>>,
}

impl MemoryRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            visits: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn snapshot(&self) -> Vec<Visit> {
        self.visits.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.visits.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VisitRecorder for MemoryRecorder {
    fn record(&self, visit: &Visit) -> Result<(), RecordError> {
        if self.capacity == 0 {
            return Err(RecordError::Unavailable("memory recorder has zero capacity".into()));
        }
        let mut visits = self.visits.lock();
        if visits.len() >= self.capacity {
            visits.pop_front();
        }
        visits.push_back(visit.clone());
        Ok(())
    }
}

/// Records `visit`, logging instead of propagating any failure.
pub fn record_best_effort(recorder: &dyn VisitRecorder, visit: &Visit) {
    if let Err(e) = recorder.record(visit) {
        tracing::error!("Error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(age: i32) -> Visit {
        Visit { name: "Ada".into(), email: "ada@example.com".into(), age, prediction: 0 }
    }

    #[test]
    fn memory_recorder_keeps_latest() {
        let r = MemoryRecorder::new(2);
        for age in [30, 40, 50] {
            r.record(&visit(age)).unwrap();
        }
        let ages: Vec<_> = r.snapshot().iter().map(|v| v.age).collect();
        assert_eq!(ages, vec![40, 50]);
    }

    #[test]
    fn failures_are_swallowed() {
        let r = MemoryRecorder::new(0);
        assert!(r.record(&visit(30)).is_err());
        record_best_effort(&r, &visit(30));
        assert!(r.is_empty());
        record_best_effort(&DisabledRecorder, &visit(30));
    }
}
