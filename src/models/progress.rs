//! Per-user, per-card scheduling state.
//!
//! Two shapes live here:
//! - `ProgressRecord`: the flat row the persistence layer reads and writes.
//!   Older rows may lack `learning_step`.
//! - `ProgressState`: the validated model the scheduler works on, with the
//!   card's phase as an explicit `Stage`.
//!
//! `ProgressRecord::into_state` is the only way from one to the other; it
//! performs the legacy `learning_step` migration and rejects rows that cannot
//! be reconciled.

use super::Settings;
use crate::error::{Result, SchedulerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_EASE_FACTOR: f64 = 3.0;

/// `learning_step` value of a graduated card.
pub const GRADUATED_STEP: i32 = -1;

const EASE_TOLERANCE: f64 = 1e-9;

/// Where a card is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum Stage {
    /// Never graded. A zeroed pre-created row is also New.
    New,
    /// Walking the learning-steps queue; `step` indexes it.
    Learning { step: usize },
    /// Graduated into long intervals.
    Review,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    pub(crate) interval: f64,
    pub(crate) ease_factor: f64,
    pub(crate) repetitions: u32,
    pub(crate) due_date: DateTime<Utc>,
    pub(crate) last_review: Option<DateTime<Utc>>,
    pub(crate) stage: Stage,
}

impl ProgressState {
    /// State of a card that has never been scheduled.
    pub fn new(settings: &Settings, now: DateTime<Utc>) -> Self {
        Self {
            interval: 0.0,
            ease_factor: settings
                .starting_ease_factor()
                .clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR),
            repetitions: 0,
            due_date: now,
            last_review: None,
            stage: Stage::New,
        }
    }

    /// Current interval in days.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn last_review(&self) -> Option<DateTime<Utc>> {
        self.last_review
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Flat `learning_step`: -1 once graduated, otherwise the queue index.
    pub fn learning_step(&self) -> i32 {
        match self.stage {
            Stage::New => 0,
            Stage::Learning { step } => step as i32,
            Stage::Review => GRADUATED_STEP,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date <= now
    }

    pub fn to_record(&self) -> ProgressRecord {
        ProgressRecord {
            interval: self.interval,
            ease_factor: self.ease_factor,
            repetitions: i64::from(self.repetitions),
            due_date: self.due_date,
            last_review: self.last_review,
            learning_step: Some(self.learning_step()),
        }
    }
}

/// Persisted shape of a progress row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub interval: f64,
    pub ease_factor: f64,
    pub repetitions: i64,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub last_review: Option<DateTime<Utc>>,
    /// Absent on rows written before learning steps existed.
    #[serde(default)]
    pub learning_step: Option<i32>,
}

impl ProgressRecord {
    /// Zeroed row as an external system might pre-create it.
    pub fn zeroed(settings: &Settings, now: DateTime<Utc>) -> Self {
        ProgressState::new(settings, now).to_record()
    }

    /// True when the row predates learning steps and has to be migrated.
    pub fn needs_migration(&self) -> bool {
        self.learning_step.is_none()
    }

    /// Picks a `learning_step` for a legacy row: sub-day intervals map to
    /// the closest learning step, everything else counts as graduated.
    pub fn infer_learning_step(&self, settings: &Settings) -> i32 {
        if self.interval >= 1.0 {
            return GRADUATED_STEP;
        }
        settings
            .learning_steps()
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - self.interval)
                    .abs()
                    .total_cmp(&(*b - self.interval).abs())
            })
            .map(|(idx, _)| idx as i32)
            .unwrap_or(0)
    }

    /// Validates the row against `settings` and builds the scheduler model.
    pub fn into_state(self, settings: &Settings) -> Result<ProgressState> {
        if !self.interval.is_finite() || self.interval < 0.0 {
            return Err(SchedulerError::InvalidState(format!(
                "interval {} is not a non-negative number of days",
                self.interval
            )));
        }

        if !self.ease_factor.is_finite()
            || self.ease_factor < MIN_EASE_FACTOR - EASE_TOLERANCE
            || self.ease_factor > MAX_EASE_FACTOR + EASE_TOLERANCE
        {
            return Err(SchedulerError::InvalidState(format!(
                "ease factor {} outside [{}, {}]",
                self.ease_factor, MIN_EASE_FACTOR, MAX_EASE_FACTOR
            )));
        }

        let repetitions = u32::try_from(self.repetitions).map_err(|_| {
            SchedulerError::InvalidState(format!("repetitions {} out of range", self.repetitions))
        })?;

        let learning_step = match self.learning_step {
            Some(step) => step,
            None => self.infer_learning_step(settings),
        };
        let last_index = settings.learning_steps().len() as i32 - 1;
        if !(GRADUATED_STEP..=last_index).contains(&learning_step) {
            return Err(SchedulerError::InvalidState(format!(
                "learning step {} outside [-1, {}]",
                learning_step, last_index
            )));
        }

        let stage = match (self.last_review, repetitions) {
            (None, 0) => Stage::New,
            (None, _) => {
                return Err(SchedulerError::InvalidState(format!(
                    "{} repetitions but no last review",
                    repetitions
                )));
            }
            (Some(_), _) if learning_step == GRADUATED_STEP => Stage::Review,
            (Some(_), _) => Stage::Learning {
                step: learning_step as usize,
            },
        };

        Ok(ProgressState {
            interval: self.interval,
            ease_factor: self.ease_factor.clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR),
            repetitions,
            due_date: self.due_date,
            last_review: self.last_review,
            stage,
        })
    }
}
