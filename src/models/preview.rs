//! "What will each button do" without committing a grade.
use super::scheduler::review;
use super::{Grade, ProgressState, Settings};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preview {
    pub grade: Grade,
    pub due_date: DateTime<Utc>,
    /// Days
    pub interval: f64,
}

/// Outcome `review` would produce for the same inputs. Nothing is mutated.
pub fn preview(
    progress: Option<&ProgressState>,
    grade: Grade,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Preview {
    let next = review(progress, grade, settings, now);
    Preview {
        grade,
        due_date: next.due_date(),
        interval: next.interval(),
    }
}

/// Previews for Again, Hard, Good and Easy, in that order.
pub fn preview_all(
    progress: Option<&ProgressState>,
    settings: &Settings,
    now: DateTime<Utc>,
) -> [Preview; 4] {
    Grade::ALL.map(|grade| preview(progress, grade, settings, now))
}

/// Short button caption for an interval in days.
pub fn format_interval(days: f64) -> String {
    let minutes = (days * 1440.0).round();
    if minutes < 1.0 {
        return "now".to_string();
    }
    if minutes < 60.0 {
        return format!("{}m", minutes as i64);
    }

    let hours = (days * 24.0).round();
    if hours < 24.0 {
        return format!("{}h", hours as i64);
    }

    if days < 7.0 {
        format!("{}d", days.round() as i64)
    } else if days < 30.0 {
        format!("{}w", (days / 7.0) as i64)
    } else if days < 365.0 {
        format!("{}mo", (days / 30.0) as i64)
    } else {
        format!("{}y", (days / 365.0) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_preview_matches_review_for_new_card() {
        let settings = Settings::default();
        for grade in Grade::ALL {
            let shown = preview(None, grade, &settings, now());
            let done = review(None, grade, &settings, now());
            assert_eq!(shown.interval, done.interval());
            assert_eq!(shown.due_date, done.due_date());
        }
    }

    #[test]
    fn test_preview_all_button_order() {
        let settings = Settings::default();
        let buttons = preview_all(None, &settings, now());
        let grades: Vec<Grade> = buttons.iter().map(|p| p.grade).collect();
        assert_eq!(grades, Grade::ALL.to_vec());
        assert_eq!(buttons[0].due_date, now() + Duration::minutes(1));
        assert_eq!(buttons[3].interval, 12.0 * 1.3);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0.0), "now");
        assert_eq!(format_interval(1.0 / 1440.0), "1m");
        assert_eq!(format_interval(10.0 / 1440.0), "10m");
        assert_eq!(format_interval(3.0 / 24.0), "3h");
        assert_eq!(format_interval(1.0), "1d");
        assert_eq!(format_interval(5.0), "5d");
        assert_eq!(format_interval(15.6), "2w");
        assert_eq!(format_interval(90.0), "3mo");
        assert_eq!(format_interval(730.0), "2y");
    }
}
