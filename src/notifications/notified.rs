use crate::configuration::DedupKey;
use crate::domain::{ChatId, Location, OpenSlot};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;

/// How long an announced opening stays suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Never forget within a run. Nothing is persisted, so a restart announces everything
    /// that is open at that moment again.
    ProcessLifetime,
    /// Forget an announcement after the given duration.
    Ttl(Duration),
}

impl RetentionPolicy {
    pub fn from_ttl(ttl: Option<Duration>) -> Self {
        ttl.map_or(RetentionPolicy::ProcessLifetime, RetentionPolicy::Ttl)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotifiedKey {
    /// `None` for announcements shared by every recipient.
    pub recipient: Option<ChatId>,
    /// `None` when the date alone identifies an opening.
    pub location: Option<Location>,
    pub date: NaiveDate,
}

impl NotifiedKey {
    pub fn shared(slot: &OpenSlot, key: DedupKey) -> Self {
        Self {
            recipient: None,
            location: location_part(slot, key),
            date: slot.date,
        }
    }

    pub fn for_recipient(recipient: &ChatId, slot: &OpenSlot, key: DedupKey) -> Self {
        Self {
            recipient: Some(recipient.clone()),
            location: location_part(slot, key),
            date: slot.date,
        }
    }
}

fn location_part(slot: &OpenSlot, key: DedupKey) -> Option<Location> {
    match key {
        DedupKey::Date => None,
        DedupKey::LocationDate => Some(slot.location),
    }
}

/// Openings that were already announced, with the instant they were announced.
#[derive(Debug)]
pub struct NotifiedDates {
    policy: RetentionPolicy,
    entries: HashMap<NotifiedKey, DateTime<Utc>>,
}

impl NotifiedDates {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
        }
    }

    pub fn contains(&self, key: &NotifiedKey, now: DateTime<Utc>) -> bool {
        match self.entries.get(key) {
            None => false,
            Some(at) => match self.policy {
                RetentionPolicy::ProcessLifetime => true,
                RetentionPolicy::Ttl(ttl) => now - *at < ttl,
            },
        }
    }

    pub fn insert(&mut self, key: NotifiedKey, now: DateTime<Utc>) {
        self.entries.insert(key, now);
    }

    /// Drops expired entries. A no-op for the process-lifetime policy.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        if let RetentionPolicy::Ttl(ttl) = self.policy {
            self.entries.retain(|_, at| now - *at < ttl);
        }
    }
}
