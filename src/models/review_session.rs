//! Review session management for spaced repetition practice.
//! Serves a deck's due queue card by card and refreshes it in rounds until
//! nothing is left to review.

use super::{Flashcard, Grade, ProgressState};
use crate::database::db;
use crate::error::StoreResult;
use rusqlite::Connection;

/// Walks one user's review queue for one deck.
/// When a round's queue is used up, the queue is fetched again: learning
/// cards stay in the live queue until they graduate, so they come back.
pub struct ReviewSession {
    pub user_id: String,
    pub deck_name: String,
    pub queue: Vec<Flashcard>,
    pub current_index: usize,
    pub show_definition: bool,
    pub round_number: usize,
    pub reviewed_count: usize,
}

impl ReviewSession {
    /// Starts a session with the deck's current review queue.
    pub fn start(user_id: &str, deck_name: &str, conn: &Connection) -> StoreResult<Self> {
        let queue = db::due_queue(user_id, deck_name, None, conn)?;
        Ok(Self {
            user_id: user_id.to_string(),
            deck_name: deck_name.to_string(),
            queue,
            current_index: 0,
            show_definition: false,
            round_number: 1,
            reviewed_count: 0,
        })
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        self.queue.get(self.current_index)
    }

    pub fn toggle_definition(&mut self) {
        self.show_definition = !self.show_definition;
    }

    /// Grades the current card, persists its progress and moves on.
    /// Returns `None` when the session is already completed.
    pub fn grade_current_card(
        &mut self,
        grade: Grade,
        conn: &mut Connection,
    ) -> StoreResult<Option<ProgressState>> {
        let Some(card_id) = self.current_card().map(|card| card.id) else {
            return Ok(None);
        };

        let progress = db::record_review(&self.user_id, card_id, grade, conn)?;
        self.reviewed_count += 1;
        self.next_card(conn)?;
        Ok(Some(progress))
    }

    fn next_card(&mut self, conn: &Connection) -> StoreResult<()> {
        self.show_definition = false;
        if self.current_index + 1 < self.queue.len() {
            self.current_index += 1;
            return Ok(());
        }
        self.start_next_round(conn)
    }

    /// Re-queries the deck. If it comes back empty, the session is complete.
    fn start_next_round(&mut self, conn: &Connection) -> StoreResult<()> {
        self.queue = db::due_queue(&self.user_id, &self.deck_name, None, conn)?;
        self.current_index = 0;
        if !self.queue.is_empty() {
            self.round_number += 1;
        }
        Ok(())
    }

    pub fn remaining_count(&self) -> usize {
        self.queue.len().saturating_sub(self.current_index)
    }

    pub fn is_completed(&self) -> bool {
        self.current_card().is_none()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.queue.len())
        } else {
            format!(
                "Round {} (Review): {} cards to retry",
                self.round_number,
                self.queue.len()
            )
        }
    }
}
