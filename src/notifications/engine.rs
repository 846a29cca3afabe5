use crate::configuration::{DedupKey, DedupScope};
use crate::domain::{AvailabilitySnapshot, ChatId, OpenSlot, Query};
use crate::notifications::format;
use crate::notifications::{NotifiedDates, NotifiedKey};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was extracted for any location; the scraper is probably broken.
    ScrapeFailure,
    NothingNew,
    NewAvailability { message: String, count: usize },
}

/// A subscriber together with the filters they saved.
#[derive(Debug, Clone)]
pub struct SubscriberQueries {
    pub chat_id: ChatId,
    pub queries: Vec<Query>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: ChatId,
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberOutcome {
    ScrapeFailure,
    Deliveries(Vec<Delivery>),
}

/// Decides which openings of a snapshot are worth announcing.
pub struct NotificationEngine {
    notified: NotifiedDates,
    scope: DedupScope,
    key: DedupKey,
}

impl NotificationEngine {
    pub fn new(notified: NotifiedDates, scope: DedupScope, key: DedupKey) -> Self {
        Self {
            notified,
            scope,
            key,
        }
    }

    /// One message for everyone, listing openings that were not announced before.
    ///
    /// Openings are checked against what was announced before this cycle, so a new date
    /// open at both refuges is listed for both.
    pub fn process(&mut self, snapshot: &AvailabilitySnapshot, now: DateTime<Utc>) -> CycleOutcome {
        if snapshot.total_dates() == 0 {
            return CycleOutcome::ScrapeFailure;
        }
        self.notified.prune(now);

        let fresh: Vec<OpenSlot> = snapshot
            .open_slots()
            .filter(|slot| {
                !self
                    .notified
                    .contains(&NotifiedKey::shared(slot, self.key), now)
            })
            .collect();
        if fresh.is_empty() {
            return CycleOutcome::NothingNew;
        }
        for slot in &fresh {
            self.notified.insert(NotifiedKey::shared(slot, self.key), now);
        }
        CycleOutcome::NewAvailability {
            message: format::availability_message(&fresh),
            count: fresh.len(),
        }
    }

    /// One message per subscriber, restricted to openings matching any of their queries.
    ///
    /// Subscribers are evaluated in the given order. With [`DedupScope::Global`] the first
    /// matching subscriber claims an opening and later subscribers never receive it.
    pub fn process_for_subscribers(
        &mut self,
        snapshot: &AvailabilitySnapshot,
        subscribers: &[SubscriberQueries],
        now: DateTime<Utc>,
    ) -> SubscriberOutcome {
        if snapshot.total_dates() == 0 {
            return SubscriberOutcome::ScrapeFailure;
        }
        self.notified.prune(now);

        let slots: Vec<OpenSlot> = snapshot.open_slots().collect();
        let mut deliveries = Vec::new();
        for subscriber in subscribers {
            let matched: Vec<OpenSlot> = slots
                .iter()
                .filter(|slot| {
                    subscriber
                        .queries
                        .iter()
                        .any(|query| query.matches(slot.location, slot.date))
                })
                .filter(|slot| {
                    !self
                        .notified
                        .contains(&self.key_for(&subscriber.chat_id, slot), now)
                })
                .copied()
                .collect();
            for slot in &matched {
                let key = self.key_for(&subscriber.chat_id, slot);
                self.notified.insert(key, now);
            }
            if !matched.is_empty() {
                deliveries.push(Delivery {
                    recipient: subscriber.chat_id.clone(),
                    message: format::availability_message(&matched),
                    count: matched.len(),
                });
            }
        }
        SubscriberOutcome::Deliveries(deliveries)
    }

    fn key_for(&self, recipient: &ChatId, slot: &OpenSlot) -> NotifiedKey {
        match self.scope {
            DedupScope::Global => NotifiedKey::shared(slot, self.key),
            DedupScope::PerSubscriber => NotifiedKey::for_recipient(recipient, slot, self.key),
        }
    }
}
