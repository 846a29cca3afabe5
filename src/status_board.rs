use crate::domain::AvailabilitySnapshot;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub snapshot: AvailabilitySnapshot,
    pub last_check: DateTime<Utc>,
}

/// Latest snapshot, shared between the poller (writer) and the web handlers (readers).
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<RwLock<StatusView>>,
}

impl StatusBoard {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StatusView {
                snapshot: AvailabilitySnapshot::default(),
                last_check: now,
            })),
        }
    }

    pub fn read(&self) -> StatusView {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.clone()
    }

    pub fn write(&self, snapshot: AvailabilitySnapshot, last_check: DateTime<Utc>) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = StatusView {
            snapshot,
            last_check,
        };
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}
