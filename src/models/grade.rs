//! Learner's self-assessment of one review.
use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    /// Button order used by previews and prompts.
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Again => "again",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" => Ok(Grade::Again),
            "hard" => Ok(Grade::Hard),
            "good" => Ok(Grade::Good),
            "easy" => Ok(Grade::Easy),
            _ => Err(SchedulerError::InvalidGrade(s.to_string())),
        }
    }
}

/// UI button number: 1 = Again .. 4 = Easy
impl TryFrom<u8> for Grade {
    type Error = SchedulerError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Grade::Again),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 => Ok(Grade::Easy),
            _ => Err(SchedulerError::InvalidGrade(n.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grades() {
        assert_eq!("again".parse::<Grade>().unwrap(), Grade::Again);
        assert_eq!(" Good ".parse::<Grade>().unwrap(), Grade::Good);
        assert_eq!("EASY".parse::<Grade>().unwrap(), Grade::Easy);
    }

    #[test]
    fn test_shortcuts_are_not_grades() {
        assert!("h".parse::<Grade>().is_err());
        assert!("g".parse::<Grade>().is_err());
    }

    #[test]
    fn test_unknown_grade_is_rejected() {
        let err = "perfect".parse::<Grade>().unwrap_err();
        assert_eq!(err, SchedulerError::InvalidGrade("perfect".to_string()));
    }

    #[test]
    fn test_button_numbers() {
        assert_eq!(Grade::try_from(1).unwrap(), Grade::Again);
        assert_eq!(Grade::try_from(4).unwrap(), Grade::Easy);
        assert!(Grade::try_from(0).is_err());
        assert!(Grade::try_from(5).is_err());
    }
}
