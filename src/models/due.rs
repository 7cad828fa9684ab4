//! Due-card selection and bucketing.
//!
//! Every card of a deck lands in exactly one bucket, checked in this order:
//! - New: never graded (no progress row, or a zeroed one)
//! - Due: `due_date <= now`
//! - Learning: not yet due, interval under a day
//! - Mature: not yet due, interval of a day or more
//!
//! The live review queue is New + Due + Learning, ordered Due first, then
//! Learning, then New. Mature cards only show up in the counts.

use super::{Flashcard, ProgressState, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Batch size used when the caller has no preference.
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    New,
    Due,
    Learning,
    Mature,
}

impl Bucket {
    /// Queue priority, lower first. Mature cards are never queued.
    pub fn priority(self) -> Option<u8> {
        match self {
            Bucket::Due => Some(0),
            Bucket::Learning => Some(1),
            Bucket::New => Some(2),
            Bucket::Mature => None,
        }
    }
}

pub fn classify(progress: Option<&ProgressState>, now: DateTime<Utc>) -> Bucket {
    let Some(state) = progress else {
        return Bucket::New;
    };
    if state.stage() == Stage::New {
        Bucket::New
    } else if state.is_due(now) {
        Bucket::Due
    } else if state.interval() < 1.0 {
        Bucket::Learning
    } else {
        Bucket::Mature
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub new: usize,
    pub due: usize,
    pub learning: usize,
    pub mature: usize,
    pub total: usize,
}

impl BucketCounts {
    /// Cards the learner could review right now.
    pub fn reviewable(&self) -> usize {
        self.new + self.due + self.learning
    }
}

pub fn bucket_counts(
    cards: &[Flashcard],
    progress: &HashMap<i64, ProgressState>,
    now: DateTime<Utc>,
) -> BucketCounts {
    let mut counts = BucketCounts {
        total: cards.len(),
        ..Default::default()
    };
    for card in cards {
        match classify(progress.get(&card.id), now) {
            Bucket::New => counts.new += 1,
            Bucket::Due => counts.due += 1,
            Bucket::Learning => counts.learning += 1,
            Bucket::Mature => counts.mature += 1,
        }
    }
    counts
}

/// Ordered review queue of at most `limit` cards.
pub fn select_due<'a>(
    cards: &'a [Flashcard],
    progress: &HashMap<i64, ProgressState>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<&'a Flashcard> {
    select_due_with_new_limit(cards, progress, now, limit, usize::MAX)
}

/// Like `select_due`, but admits at most `new_allowance` New cards, the
/// remainder of the learner's daily new-card budget.
pub fn select_due_with_new_limit<'a>(
    cards: &'a [Flashcard],
    progress: &HashMap<i64, ProgressState>,
    now: DateTime<Utc>,
    limit: usize,
    new_allowance: usize,
) -> Vec<&'a Flashcard> {
    let mut queue: Vec<QueueEntry<'a>> = cards
        .iter()
        .filter_map(|card| {
            let state = progress.get(&card.id);
            let bucket = classify(state, now);
            bucket.priority().map(|priority| QueueEntry {
                priority,
                bucket,
                due_date: state.map(ProgressState::due_date),
                card,
            })
        })
        .collect();

    queue.sort_by(QueueEntry::by_priority);

    let mut new_left = new_allowance;
    queue
        .into_iter()
        .filter(|entry| {
            if entry.bucket != Bucket::New {
                return true;
            }
            if new_left == 0 {
                return false;
            }
            new_left -= 1;
            true
        })
        .take(limit)
        .map(|entry| entry.card)
        .collect()
}

struct QueueEntry<'a> {
    priority: u8,
    bucket: Bucket,
    /// `None` sorts first.
    due_date: Option<DateTime<Utc>>,
    card: &'a Flashcard,
}

impl QueueEntry<'_> {
    fn by_priority(a: &Self, b: &Self) -> Ordering {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.due_date.cmp(&b.due_date))
            .then_with(|| a.card.id.cmp(&b.card.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProgressRecord, Settings};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn card(id: i64) -> Flashcard {
        Flashcard::new(id, &format!("term {}", id), &format!("definition {}", id))
    }

    fn state(interval: f64, learning_step: i32, due_in: Duration) -> ProgressState {
        ProgressRecord {
            interval,
            ease_factor: 2.5,
            repetitions: 1,
            due_date: now() + due_in,
            last_review: Some(now() - Duration::hours(1)),
            learning_step: Some(learning_step),
        }
        .into_state(&Settings::default())
        .unwrap()
    }

    fn zeroed_row() -> ProgressState {
        let settings = Settings::default();
        ProgressRecord::zeroed(&settings, now() - Duration::days(3))
            .into_state(&settings)
            .unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(None, now()), Bucket::New);
        assert_eq!(classify(Some(&zeroed_row()), now()), Bucket::New);
        assert_eq!(
            classify(Some(&state(5.0, -1, Duration::days(-1))), now()),
            Bucket::Due
        );
        assert_eq!(
            classify(Some(&state(5.0, -1, Duration::zero())), now()),
            Bucket::Due
        );
        assert_eq!(
            classify(Some(&state(0.01, 2, Duration::minutes(10))), now()),
            Bucket::Learning
        );
        assert_eq!(
            classify(Some(&state(12.0, 3, Duration::days(12))), now()),
            Bucket::Mature
        );
    }

    #[test]
    fn test_empty_deck() {
        let progress = HashMap::new();
        assert!(select_due(&[], &progress, now(), DEFAULT_BATCH_SIZE).is_empty());
        assert_eq!(bucket_counts(&[], &progress, now()), BucketCounts::default());
    }

    #[test]
    fn test_queue_order_and_mature_excluded() {
        let cards: Vec<Flashcard> = (1..=7).map(card).collect();
        let mut progress = HashMap::new();
        progress.insert(1, state(30.0, -1, Duration::days(10))); // mature
        progress.insert(2, state(0.01, 2, Duration::minutes(5))); // learning
        progress.insert(3, state(4.0, -1, Duration::days(-2))); // due, older
        progress.insert(4, state(4.0, -1, Duration::hours(-1))); // due, newer
        progress.insert(6, zeroed_row()); // new, with row
        // 5 and 7: new, no row

        let queue: Vec<i64> = select_due(&cards, &progress, now(), DEFAULT_BATCH_SIZE)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(queue, vec![3, 4, 2, 5, 7, 6]);
    }

    #[test]
    fn test_queue_is_capped() {
        let cards: Vec<Flashcard> = (1..=80).map(card).collect();
        let queue = select_due(&cards, &HashMap::new(), now(), DEFAULT_BATCH_SIZE);
        assert_eq!(queue.len(), 50);
        assert_eq!(queue[0].id, 1);
        assert_eq!(queue[49].id, 50);
    }

    #[test]
    fn test_new_allowance_limits_only_new_cards() {
        let cards: Vec<Flashcard> = (1..=6).map(card).collect();
        let mut progress = HashMap::new();
        progress.insert(6, state(4.0, -1, Duration::days(-1)));

        let queue: Vec<i64> = select_due_with_new_limit(&cards, &progress, now(), 50, 2)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(queue, vec![6, 1, 2]);

        let queue = select_due_with_new_limit(&cards, &progress, now(), 50, 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_bucket_counts_add_up() {
        let cards: Vec<Flashcard> = (1..=5).map(card).collect();
        let mut progress = HashMap::new();
        progress.insert(1, state(30.0, -1, Duration::days(10)));
        progress.insert(2, state(0.01, 1, Duration::minutes(5)));
        progress.insert(3, state(4.0, -1, Duration::days(-2)));
        // progress for a card outside the deck is ignored
        progress.insert(99, state(4.0, -1, Duration::days(-2)));

        let counts = bucket_counts(&cards, &progress, now());
        assert_eq!(
            counts,
            BucketCounts {
                new: 2,
                due: 1,
                learning: 1,
                mature: 1,
                total: 5,
            }
        );
        assert_eq!(counts.new + counts.due + counts.learning + counts.mature, counts.total);
        assert_eq!(counts.reviewable(), 4);
    }
}
