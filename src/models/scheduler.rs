//! Grading state machine.
//!
//! A card starts New, walks the learning-steps queue (short, sub-day
//! intervals) and graduates into the review phase, where intervals grow
//! SM-2 style with the ease factor:
//! - Again always sends the card back to the first learning step and costs ease
//! - Hard/Good/Easy move through the queue while learning
//! - Once graduated, Hard shrinks ease, Good keeps it, Easy grows it
//! - Ease stays within [1.3, 3.0] and intervals within [0, max_interval]
//!
//! `review` is pure: it never touches storage and reads no clock. Previews
//! go through the same `review`, so what a button promises is what it does.

use super::progress::{MAX_EASE_FACTOR, MIN_EASE_FACTOR};
use super::{Grade, ProgressState, Settings, Stage};
use chrono::{DateTime, Duration, Utc};

const EASE_STEP: f64 = 0.15;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Learning-phase step a first Hard lands on.
const FIRST_HARD_STEP: usize = 1;
/// Learning-phase step a first Good skips ahead to.
const FIRST_GOOD_STEP: usize = 2;

/// Interval, ease, repetitions and stage before the due date is derived.
struct Transition {
    interval: f64,
    ease_factor: f64,
    repetitions: u32,
    stage: Stage,
}

/// Computes the card's next progress after `grade` at `now`.
/// `None` is a card that has never been scheduled.
pub fn review(
    progress: Option<&ProgressState>,
    grade: Grade,
    settings: &Settings,
    now: DateTime<Utc>,
) -> ProgressState {
    let current = match progress {
        Some(state) => state.clone(),
        None => ProgressState::new(settings, now),
    };

    let next = match (grade, current.stage) {
        (Grade::Again, _) => relearn(&current, settings),
        (_, Stage::New) => first_pass(&current, grade, settings),
        (_, Stage::Learning { step }) => repeat_pass(&current, step, grade, settings),
        (_, Stage::Review) => grow(&current, grade, settings),
    };

    let max_interval = f64::from(settings.max_interval());
    let interval = next.interval.clamp(0.0, max_interval);

    ProgressState {
        interval,
        ease_factor: next.ease_factor,
        repetitions: next.repetitions,
        due_date: due_after(now, interval),
        last_review: Some(now),
        stage: next.stage,
    }
}

/// `now` plus `interval` days, at millisecond resolution.
pub fn due_after(now: DateTime<Utc>, interval: f64) -> DateTime<Utc> {
    now + Duration::milliseconds((interval * MILLIS_PER_DAY).round() as i64)
}

fn relearn(current: &ProgressState, settings: &Settings) -> Transition {
    Transition {
        interval: settings.learning_steps()[0],
        ease_factor: (current.ease_factor - EASE_STEP).max(MIN_EASE_FACTOR),
        repetitions: 0,
        stage: Stage::Learning { step: 0 },
    }
}

/// Index of the final learning step.
fn last_step(settings: &Settings) -> usize {
    settings.learning_steps().len() - 1
}

fn at_step(current: &ProgressState, step: usize, repetitions: u32, settings: &Settings) -> Transition {
    let step = step.min(last_step(settings));
    Transition {
        interval: settings.learning_steps()[step],
        ease_factor: current.ease_factor,
        repetitions,
        stage: Stage::Learning { step },
    }
}

fn graduate(current: &ProgressState, bonus: f64, settings: &Settings) -> Transition {
    Transition {
        interval: settings.learning_steps()[last_step(settings)] * bonus,
        ease_factor: current.ease_factor,
        repetitions: 1,
        stage: Stage::Review,
    }
}

/// First grading of a card that has never been reviewed.
fn first_pass(current: &ProgressState, grade: Grade, settings: &Settings) -> Transition {
    match grade {
        Grade::Hard => at_step(current, FIRST_HARD_STEP, 1, settings),
        Grade::Good => at_step(current, FIRST_GOOD_STEP, 1, settings),
        _ => graduate(current, settings.easy_bonus(), settings),
    }
}

/// Learning card that has been seen before (including after a lapse).
fn repeat_pass(current: &ProgressState, step: usize, grade: Grade, settings: &Settings) -> Transition {
    let last = last_step(settings);
    let step = step.min(last);
    match grade {
        Grade::Hard => at_step(current, step, current.repetitions, settings),
        Grade::Good if step >= last => graduate(current, 1.0, settings),
        Grade::Good if step + 1 == last => at_step(current, last, current.repetitions, settings),
        Grade::Good => at_step(current, last - 1, current.repetitions, settings),
        _ => graduate(current, settings.easy_bonus(), settings),
    }
}

/// Review-phase update of a graduated card.
fn grow(current: &ProgressState, grade: Grade, settings: &Settings) -> Transition {
    let mut ease_factor = current.ease_factor;
    let mut interval = current.interval;

    match grade {
        Grade::Hard => {
            ease_factor = (ease_factor - EASE_STEP).max(MIN_EASE_FACTOR);
            interval *= settings.hard_interval_factor();
        }
        Grade::Easy => {
            ease_factor = (ease_factor + EASE_STEP).min(MAX_EASE_FACTOR);
            interval *= ease_factor * settings.easy_bonus();
        }
        _ => interval *= ease_factor,
    }

    interval *= settings.interval_modifier();

    // Graduated cards are scheduled in whole days.
    let interval = interval.round().min(f64::from(settings.max_interval()));

    Transition {
        interval,
        ease_factor,
        repetitions: current.repetitions.saturating_add(1),
        stage: Stage::Review,
    }
}
