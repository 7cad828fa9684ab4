//! Database operations for the vocabulary trainer
//!
//! Handles SQLite database initialization, decks and flashcards, per-user
//! settings and per-user progress rows. The scheduler itself is pure; this
//! module is the read-modify-write around it.

use crate::error::{SchedulerError, StoreError, StoreResult};
use crate::models::due::{self, DEFAULT_BATCH_SIZE};
use crate::models::{
    BucketCounts, Flashcard, Grade, ProgressRecord, ProgressState, Settings, review,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde_json::Value;
use std::collections::HashMap;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Opens (or creates) the database file and makes sure the schema exists
pub fn init_database(path: &str) -> StoreResult<Connection> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates tables for decks, flashcards, progress, settings and app state.
/// Sets the simulated current date to now if not already initialized.
pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS decks (
            name TEXT PRIMARY KEY
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS flashcards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            deck_name TEXT NOT NULL,
            term TEXT NOT NULL,
            definition TEXT NOT NULL,
            FOREIGN KEY (deck_name) REFERENCES decks(name),
            UNIQUE(deck_name, term)
        )",
        (),
    )?;

    // One row per (user, card), created on the first grading.
    // learning_step is NULL on rows written before learning steps existed.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS progress (
            user_id TEXT NOT NULL,
            flashcard_id INTEGER NOT NULL,
            interval_days REAL NOT NULL DEFAULT 0,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            repetitions INTEGER NOT NULL DEFAULT 0,
            due_date INTEGER NOT NULL,
            last_review INTEGER,
            learning_step INTEGER,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, flashcard_id),
            FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            user_id TEXT PRIMARY KEY,
            body TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![Utc::now().timestamp_millis().to_string()],
    )?;

    Ok(())
}

fn from_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        StoreError::Scheduler(SchedulerError::InvalidState(format!(
            "timestamp {} out of range",
            ms
        )))
    })
}

/// Retrieves current simulated date from database
pub fn get_current_date(conn: &Connection) -> StoreResult<DateTime<Utc>> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    match value.parse::<i64>() {
        Ok(ms) => from_millis(ms),
        Err(_) => {
            log::warn!("Unreadable current_date {:?}, using the system clock", value);
            Ok(Utc::now())
        }
    }
}

/// Pins the simulated date
pub fn set_current_date(date: DateTime<Utc>, conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![date.timestamp_millis().to_string()],
    )?;
    Ok(())
}

/// Advances current date by 24 hours (for testing spaced repetition)
pub fn advance_day(conn: &Connection) -> StoreResult<DateTime<Utc>> {
    let next_day = get_current_date(conn)? + Duration::days(1);
    set_current_date(next_day, conn)?;
    Ok(next_day)
}

/// Creates a new deck in the database
pub fn new_deck(name: &str, conn: &Connection) -> StoreResult<()> {
    conn.execute("INSERT INTO decks (name) VALUES (?1)", params![name])?;
    log::info!("Deck '{}' created", name);
    Ok(())
}

fn deck_exists(name: &str, conn: &Connection) -> StoreResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM decks WHERE name = ?1", params![name], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Adds a flashcard to a deck and returns its ID.
///
/// If the flashcard already exists (same deck + term), the existing ID is
/// returned. No progress row is created; that happens on the first grading.
pub fn add_flashcard(
    deck_name: &str,
    term: &str,
    definition: &str,
    conn: &Connection,
) -> StoreResult<i64> {
    if !deck_exists(deck_name, conn)? {
        return Err(StoreError::DeckNotFound(deck_name.to_string()));
    }

    conn.execute(
        "INSERT OR IGNORE INTO flashcards (deck_name, term, definition) VALUES (?1, ?2, ?3)",
        params![deck_name, term, definition],
    )?;

    let flashcard_id: i64 = conn.query_row(
        "SELECT id FROM flashcards WHERE deck_name = ?1 AND term = ?2",
        params![deck_name, term],
        |row| row.get(0),
    )?;

    Ok(flashcard_id)
}

/// Deletes a flashcard together with every user's progress on it
pub fn delete_flashcard(flashcard_id: i64, conn: &Connection) -> StoreResult<()> {
    let deleted = conn.execute("DELETE FROM flashcards WHERE id = ?1", params![flashcard_id])?;
    if deleted == 0 {
        return Err(StoreError::CardNotFound(flashcard_id));
    }
    Ok(())
}

/// Retrieves all flashcards for a given deck, ordered by ID
pub fn get_flashcards_for_deck(deck_name: &str, conn: &Connection) -> StoreResult<Vec<Flashcard>> {
    let mut stmt = conn
        .prepare("SELECT id, term, definition FROM flashcards WHERE deck_name = ?1 ORDER BY id")?;

    let flashcards = stmt
        .query_map(params![deck_name], |row| {
            Ok(Flashcard {
                id: row.get(0)?,
                term: row.get(1)?,
                definition: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<Flashcard>>>()?;

    Ok(flashcards)
}

pub fn get_flashcard(flashcard_id: i64, conn: &Connection) -> StoreResult<Flashcard> {
    conn.query_row(
        "SELECT id, term, definition FROM flashcards WHERE id = ?1",
        params![flashcard_id],
        |row| {
            Ok(Flashcard {
                id: row.get(0)?,
                term: row.get(1)?,
                definition: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(StoreError::CardNotFound(flashcard_id))
}

/// Retrieves all deck names from database
pub fn get_all_decks(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM decks ORDER BY name")?;
    let decks = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(decks)
}

/// Deck names with their flashcard counts, sorted by name
pub fn deck_card_counts(conn: &Connection) -> StoreResult<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT d.name, COUNT(f.id) FROM decks d
         LEFT JOIN flashcards f ON f.deck_name = d.name
         GROUP BY d.name ORDER BY d.name",
    )?;
    let counts = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as usize)))?
        .collect::<rusqlite::Result<Vec<(String, usize)>>>()?;
    Ok(counts)
}

// ==================== Settings ====================

/// Settings for a user. Missing or unreadable settings resolve to defaults.
pub fn load_settings(user_id: &str, conn: &Connection) -> StoreResult<Settings> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM settings WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(body) = body else {
        return Ok(Settings::default());
    };

    match serde_json::from_str::<Value>(&body) {
        Ok(raw) => Ok(Settings::validate(&raw)),
        Err(e) => {
            log::warn!("Unreadable settings for user '{}': {}", user_id, e);
            Ok(Settings::default())
        }
    }
}

/// Validates `raw` and stores the result. Returns what was stored.
pub fn save_settings(user_id: &str, raw: &Value, conn: &Connection) -> StoreResult<Settings> {
    let settings = Settings::validate(raw);
    let body = serde_json::to_string(&settings)?;
    conn.execute(
        "INSERT INTO settings (user_id, body) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET body = excluded.body",
        params![user_id, body],
    )?;
    Ok(settings)
}

// ==================== Progress ====================

struct ProgressRow {
    flashcard_id: i64,
    interval: f64,
    ease_factor: f64,
    repetitions: i64,
    due_date: i64,
    last_review: Option<i64>,
    learning_step: Option<i32>,
}

impl ProgressRow {
    const COLUMNS: &'static str = "p.flashcard_id, p.interval_days, p.ease_factor, p.repetitions, \
         p.due_date, p.last_review, p.learning_step";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            flashcard_id: row.get(0)?,
            interval: row.get(1)?,
            ease_factor: row.get(2)?,
            repetitions: row.get(3)?,
            due_date: row.get(4)?,
            last_review: row.get(5)?,
            learning_step: row.get(6)?,
        })
    }

    fn into_record(self) -> StoreResult<ProgressRecord> {
        Ok(ProgressRecord {
            interval: self.interval,
            ease_factor: self.ease_factor,
            repetitions: self.repetitions,
            due_date: from_millis(self.due_date)?,
            last_review: self.last_review.map(from_millis).transpose()?,
            learning_step: self.learning_step,
        })
    }
}

/// Converts a stored row, persisting the inferred learning step once for
/// rows that predate learning steps. Nothing is written for a row that
/// fails validation.
fn row_to_state(
    user_id: &str,
    row: ProgressRow,
    settings: &Settings,
    conn: &Connection,
) -> StoreResult<ProgressState> {
    let flashcard_id = row.flashcard_id;
    let mut record = row.into_record()?;

    let inferred = record.needs_migration().then(|| record.infer_learning_step(settings));
    record.learning_step = record.learning_step.or(inferred);
    let state = record.into_state(settings)?;

    if let Some(step) = inferred {
        conn.execute(
            "UPDATE progress SET learning_step = ?1 WHERE user_id = ?2 AND flashcard_id = ?3",
            params![step, user_id, flashcard_id],
        )?;
        log::info!(
            "Migrated progress of card {} for '{}' to learning step {}",
            flashcard_id,
            user_id,
            step
        );
    }

    Ok(state)
}

/// Progress of one card for one user, `None` if never graded
pub fn load_progress(
    user_id: &str,
    flashcard_id: i64,
    settings: &Settings,
    conn: &Connection,
) -> StoreResult<Option<ProgressState>> {
    let sql = format!(
        "SELECT {} FROM progress p WHERE p.user_id = ?1 AND p.flashcard_id = ?2",
        ProgressRow::COLUMNS
    );
    let row = conn
        .query_row(&sql, params![user_id, flashcard_id], ProgressRow::from_row)
        .optional()?;

    row.map(|row| row_to_state(user_id, row, settings, conn))
        .transpose()
}

/// Progress of every graded card of a deck, keyed by card ID
pub fn load_deck_progress(
    user_id: &str,
    deck_name: &str,
    settings: &Settings,
    conn: &Connection,
) -> StoreResult<HashMap<i64, ProgressState>> {
    let sql = format!(
        "SELECT {} FROM progress p
         JOIN flashcards f ON f.id = p.flashcard_id
         WHERE p.user_id = ?1 AND f.deck_name = ?2",
        ProgressRow::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id, deck_name], ProgressRow::from_row)?
        .collect::<rusqlite::Result<Vec<ProgressRow>>>()?;

    let mut progress = HashMap::with_capacity(rows.len());
    for row in rows {
        let flashcard_id = row.flashcard_id;
        progress.insert(flashcard_id, row_to_state(user_id, row, settings, conn)?);
    }
    Ok(progress)
}

/// Inserts or overwrites a progress row. `now` is recorded as the creation
/// time of new rows only.
pub fn write_progress(
    user_id: &str,
    flashcard_id: i64,
    state: &ProgressState,
    now: DateTime<Utc>,
    conn: &Connection,
) -> StoreResult<()> {
    let record = state.to_record();
    conn.execute(
        "INSERT INTO progress (user_id, flashcard_id, interval_days, ease_factor, repetitions,
                               due_date, last_review, learning_step, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(user_id, flashcard_id) DO UPDATE SET
            interval_days = excluded.interval_days,
            ease_factor = excluded.ease_factor,
            repetitions = excluded.repetitions,
            due_date = excluded.due_date,
            last_review = excluded.last_review,
            learning_step = excluded.learning_step",
        params![
            user_id,
            flashcard_id,
            record.interval,
            record.ease_factor,
            record.repetitions,
            record.due_date.timestamp_millis(),
            record.last_review.map(|t| t.timestamp_millis()),
            record.learning_step,
            now.timestamp_millis(),
        ],
    )?;
    Ok(())
}

/// Grades a card for a user and persists the new progress.
///
/// The whole read-modify-write runs in one IMMEDIATE transaction, so two
/// gradings of the same card (a double submit) are applied one after the
/// other instead of overwriting each other.
pub fn record_review(
    user_id: &str,
    flashcard_id: i64,
    grade: Grade,
    conn: &mut Connection,
) -> StoreResult<ProgressState> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    get_flashcard(flashcard_id, &tx)?;
    let settings = load_settings(user_id, &tx)?;
    let now = get_current_date(&tx)?;

    let current = load_progress(user_id, flashcard_id, &settings, &tx)?;
    let next = review(current.as_ref(), grade, &settings, now);
    write_progress(user_id, flashcard_id, &next, now, &tx)?;

    tx.commit()?;

    log::debug!(
        "Card {} graded {} by '{}': interval {:.4}d, ease {:.2}, due {}",
        flashcard_id,
        grade,
        user_id,
        next.interval(),
        next.ease_factor(),
        next.due_date()
    );
    Ok(next)
}

/// Number of the user's progress rows in a deck created on the UTC day of `day`,
/// i.e. new cards introduced that day
pub fn new_cards_introduced_on(
    user_id: &str,
    deck_name: &str,
    day: DateTime<Utc>,
    conn: &Connection,
) -> StoreResult<usize> {
    let ms = day.timestamp_millis();
    let start = ms - ms.rem_euclid(MILLIS_PER_DAY);
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM progress p
         JOIN flashcards f ON f.id = p.flashcard_id
         WHERE p.user_id = ?1 AND f.deck_name = ?2
           AND p.created_at >= ?3 AND p.created_at < ?4",
        params![user_id, deck_name, start, start + MILLIS_PER_DAY],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Ordered review queue for a user's deck. New cards are limited by what is
/// left of the user's daily new-card budget.
pub fn due_queue(
    user_id: &str,
    deck_name: &str,
    limit: Option<usize>,
    conn: &Connection,
) -> StoreResult<Vec<Flashcard>> {
    if !deck_exists(deck_name, conn)? {
        return Err(StoreError::DeckNotFound(deck_name.to_string()));
    }

    let settings = load_settings(user_id, conn)?;
    let now = get_current_date(conn)?;
    let cards = get_flashcards_for_deck(deck_name, conn)?;
    let progress = load_deck_progress(user_id, deck_name, &settings, conn)?;

    let introduced = new_cards_introduced_on(user_id, deck_name, now, conn)?;
    let allowance = (settings.new_cards_per_day() as usize).saturating_sub(introduced);

    let queue = due::select_due_with_new_limit(
        &cards,
        &progress,
        now,
        limit.unwrap_or(DEFAULT_BATCH_SIZE),
        allowance,
    );
    Ok(queue.into_iter().cloned().collect())
}

/// Bucket counts for a user's deck
pub fn deck_stats(user_id: &str, deck_name: &str, conn: &Connection) -> StoreResult<BucketCounts> {
    if !deck_exists(deck_name, conn)? {
        return Err(StoreError::DeckNotFound(deck_name.to_string()));
    }

    let settings = load_settings(user_id, conn)?;
    let now = get_current_date(conn)?;
    let cards = get_flashcards_for_deck(deck_name, conn)?;
    let progress = load_deck_progress(user_id, deck_name, &settings, conn)?;

    Ok(due::bucket_counts(&cards, &progress, now))
}
