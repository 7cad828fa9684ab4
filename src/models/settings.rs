//! Per-user scheduling parameters.
//!
//! Settings arrive as a flat JSON record that may be partial, out of range or
//! plain wrong. `Settings::validate` is the single entry point that turns such
//! a record into a fully valid `Settings`: numbers are clamped, garbage is
//! replaced by defaults and a bad learning-steps string falls back to the
//! default queue. Nothing here ever fails the caller.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

pub const DEFAULT_LEARNING_STEPS: &str = "1m,6m,10m,12d";

const MAX_INTERVAL_RANGE: RangeInclusive<f64> = 1.0..=100_000.0;
const STARTING_EASE_RANGE: RangeInclusive<f64> = 1.1..=3.0;
const EASY_BONUS_RANGE: RangeInclusive<f64> = 1.0..=2.0;
const INTERVAL_MODIFIER_RANGE: RangeInclusive<f64> = 0.5..=2.0;
const HARD_FACTOR_RANGE: RangeInclusive<f64> = 1.0..=2.0;
const NEW_CARDS_RANGE: RangeInclusive<f64> = 1.0..=200.0;

const MINUTES_PER_DAY: f64 = 1440.0;
const HOURS_PER_DAY: f64 = 24.0;

static STEP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)([mhd])$").expect("step pattern is a valid regex"));

/// Validated scheduling parameters. Construct with `Settings::validate` or
/// `Settings::default`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    max_interval: u32,
    starting_ease_factor: f64,
    easy_bonus: f64,
    interval_modifier: f64,
    hard_interval_factor: f64,
    new_cards_per_day: u32,
    learning_steps: String,
    #[serde(skip)]
    steps: Vec<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_interval: 36_500,
            starting_ease_factor: 2.5,
            easy_bonus: 1.3,
            interval_modifier: 1.0,
            hard_interval_factor: 1.0,
            new_cards_per_day: 20,
            learning_steps: DEFAULT_LEARNING_STEPS.to_string(),
            steps: default_steps(),
        }
    }
}

impl Settings {
    /// Builds settings from an untrusted flat record. Unknown keys are ignored.
    pub fn validate(raw: &Value) -> Settings {
        let defaults = Settings::default();

        let max_interval = number_in(raw, "max_interval", MAX_INTERVAL_RANGE)
            .map(|v| v.round() as u32)
            .unwrap_or(defaults.max_interval);
        let new_cards_per_day = number_in(raw, "new_cards_per_day", NEW_CARDS_RANGE)
            .map(|v| v.round() as u32)
            .unwrap_or(defaults.new_cards_per_day);

        let (learning_steps, steps) = match raw.get("learning_steps").and_then(Value::as_str) {
            Some(text) => match try_parse_learning_steps(text) {
                Some(steps) => (text.trim().to_string(), steps),
                None => {
                    log::warn!(
                        "Invalid learning steps {:?}, using {}",
                        text,
                        DEFAULT_LEARNING_STEPS
                    );
                    (defaults.learning_steps.clone(), default_steps())
                }
            },
            None => (defaults.learning_steps.clone(), default_steps()),
        };

        Settings {
            max_interval,
            starting_ease_factor: number_in(raw, "starting_ease_factor", STARTING_EASE_RANGE)
                .unwrap_or(defaults.starting_ease_factor),
            easy_bonus: number_in(raw, "easy_bonus", EASY_BONUS_RANGE)
                .unwrap_or(defaults.easy_bonus),
            interval_modifier: number_in(raw, "interval_modifier", INTERVAL_MODIFIER_RANGE)
                .unwrap_or(defaults.interval_modifier),
            hard_interval_factor: number_in(raw, "hard_interval_factor", HARD_FACTOR_RANGE)
                .unwrap_or(defaults.hard_interval_factor),
            new_cards_per_day,
            learning_steps,
            steps,
        }
    }

    pub fn max_interval(&self) -> u32 {
        self.max_interval
    }

    pub fn starting_ease_factor(&self) -> f64 {
        self.starting_ease_factor
    }

    pub fn easy_bonus(&self) -> f64 {
        self.easy_bonus
    }

    pub fn interval_modifier(&self) -> f64 {
        self.interval_modifier
    }

    pub fn hard_interval_factor(&self) -> f64 {
        self.hard_interval_factor
    }

    pub fn new_cards_per_day(&self) -> u32 {
        self.new_cards_per_day
    }

    /// The learning-steps text as it was accepted.
    pub fn learning_steps_text(&self) -> &str {
        &self.learning_steps
    }

    /// Learning steps in days. Never empty.
    pub fn learning_steps(&self) -> &[f64] {
        &self.steps
    }
}

/// Reads `key` as a number (JSON number or numeric string) and clamps it.
/// `None` means "use the default".
fn number_in(raw: &Value, key: &str, range: RangeInclusive<f64>) -> Option<f64> {
    let value = match raw.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        other => {
            log::warn!("Ignoring non-numeric setting {}={}", key, other);
            return None;
        }
    };
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(*range.start(), *range.end()))
}

fn default_steps() -> Vec<f64> {
    vec![
        1.0 / MINUTES_PER_DAY,
        6.0 / MINUTES_PER_DAY,
        10.0 / MINUTES_PER_DAY,
        12.0,
    ]
}

fn try_parse_learning_steps(text: &str) -> Option<Vec<f64>> {
    text.split(',')
        .map(|token| {
            let caps = STEP_PATTERN.captures(token.trim())?;
            let amount = caps[1].parse::<u32>().ok()? as f64;
            match caps[2].to_ascii_lowercase().as_str() {
                "m" => Some(amount / MINUTES_PER_DAY),
                "h" => Some(amount / HOURS_PER_DAY),
                _ => Some(amount),
            }
        })
        .collect()
}

/// Parses a queue such as `"1m,6m,10m,12d"` into day fractions.
/// Any malformed token discards the whole string for the default queue.
pub fn parse_learning_steps(text: &str) -> Vec<f64> {
    try_parse_learning_steps(text).unwrap_or_else(|| {
        log::warn!("Invalid learning steps {:?}, using {}", text, DEFAULT_LEARNING_STEPS);
        default_steps()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.max_interval(), 36_500);
        assert_eq!(settings.starting_ease_factor(), 2.5);
        assert_eq!(settings.easy_bonus(), 1.3);
        assert_eq!(settings.interval_modifier(), 1.0);
        assert_eq!(settings.hard_interval_factor(), 1.0);
        assert_eq!(settings.new_cards_per_day(), 20);
        assert_eq!(settings.learning_steps_text(), "1m,6m,10m,12d");
        assert_eq!(settings.learning_steps().len(), 4);
    }

    #[test]
    fn test_empty_record_gives_defaults() {
        assert_eq!(Settings::validate(&json!({})), Settings::default());
        assert_eq!(Settings::validate(&Value::Null), Settings::default());
        assert_eq!(Settings::validate(&json!([1, 2, 3])), Settings::default());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let settings = Settings::validate(&json!({
            "max_interval": 0,
            "starting_ease_factor": 9.0,
            "easy_bonus": 0.2,
            "interval_modifier": 5,
            "hard_interval_factor": -1,
            "new_cards_per_day": 1000,
        }));
        assert_eq!(settings.max_interval(), 1);
        assert_eq!(settings.starting_ease_factor(), 3.0);
        assert_eq!(settings.easy_bonus(), 1.0);
        assert_eq!(settings.interval_modifier(), 2.0);
        assert_eq!(settings.hard_interval_factor(), 1.0);
        assert_eq!(settings.new_cards_per_day(), 200);
    }

    #[test]
    fn test_garbage_values_fall_back_to_defaults() {
        let settings = Settings::validate(&json!({
            "max_interval": "lots",
            "easy_bonus": null,
            "interval_modifier": [1.5],
            "new_cards_per_day": true,
        }));
        assert_eq!(settings.max_interval(), 36_500);
        assert_eq!(settings.easy_bonus(), 1.3);
        assert_eq!(settings.interval_modifier(), 1.0);
        assert_eq!(settings.new_cards_per_day(), 20);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let settings = Settings::validate(&json!({
            "easy_bonus": " 1.5 ",
            "new_cards_per_day": "12.6",
            "unknown_field": 42,
        }));
        assert_eq!(settings.easy_bonus(), 1.5);
        assert_eq!(settings.new_cards_per_day(), 13);
    }

    #[test]
    fn test_parse_learning_steps_units() {
        let steps = parse_learning_steps("1m, 2H ,3d");
        assert_eq!(steps, vec![1.0 / 1440.0, 2.0 / 24.0, 3.0]);
    }

    #[test]
    fn test_bad_learning_steps_fall_back() {
        let defaults = default_steps();
        assert_eq!(parse_learning_steps("1m,6x"), defaults);
        assert_eq!(parse_learning_steps(""), defaults);
        assert_eq!(parse_learning_steps("1m,,10m"), defaults);
        assert_eq!(parse_learning_steps("1.5m"), defaults);
        assert_eq!(parse_learning_steps("99999999999999999999d"), defaults);
    }

    #[test]
    fn test_validate_replaces_bad_learning_steps() {
        let settings = Settings::validate(&json!({ "learning_steps": "soon,later" }));
        assert_eq!(settings.learning_steps_text(), DEFAULT_LEARNING_STEPS);
        assert_eq!(settings.learning_steps(), default_steps().as_slice());

        let settings = Settings::validate(&json!({ "learning_steps": "10m,1d" }));
        assert_eq!(settings.learning_steps_text(), "10m,1d");
        assert_eq!(settings.learning_steps(), &[10.0 / 1440.0, 1.0]);
    }

    #[test]
    fn test_serialized_record_validates_back() {
        let settings = Settings::validate(&json!({ "easy_bonus": 1.7, "learning_steps": "5m,1d" }));
        let raw = serde_json::to_value(&settings).unwrap();
        assert!(raw.get("steps").is_none());
        assert_eq!(Settings::validate(&raw), settings);
    }
}
