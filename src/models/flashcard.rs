//! Flashcard is a pair <term, definition> with a stable id. Only text is used in terms and definitions
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: i64,
    pub term: String,
    pub definition: String,
}

impl Flashcard {
    pub fn new(id: i64, term: &str, definition: &str) -> Self {
        Self {
            id,
            term: term.to_string(),
            definition: definition.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flashcard_creation() {
        let card = Flashcard::new(7, "hello", "cześć");

        assert_eq!(card.id, 7);
        assert_eq!(card.term, "hello");
        assert_eq!(card.definition, "cześć");
    }

    #[test]
    fn test_flashcard_json() {
        let card = Flashcard::new(1, "dziękuję", "thank you");
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(
            json,
            r#"{"id":1,"term":"dziękuję","definition":"thank you"}"#
        );
    }
}
