use clap::{Parser, Subcommand};
use std::error::Error;
use std::io::{self, BufRead, Write};
use vocab_srs::database::db;
use vocab_srs::models::preview::{format_interval, preview_all};
use vocab_srs::models::{Grade, ReviewSession};

#[derive(Parser)]
#[command(name = "vocab-srs", about = "Spaced-repetition vocabulary trainer")]
struct Cli {
    /// SQLite database file
    #[arg(long, default_value = "db.sqlite3")]
    db: String,

    /// Learner whose progress is used
    #[arg(long, default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the sample Polish deck if there are no decks yet
    Seed,
    /// List decks with their card counts
    Decks,
    AddDeck { name: String },
    AddCard {
        deck: String,
        term: String,
        definition: String,
    },
    /// New / due / learning / mature counts for a deck
    Stats { deck: String },
    /// Print the review queue of a deck
    Due {
        deck: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show what each grade would do to a card
    Preview { card: i64 },
    /// Grade a card: again, hard, good or easy
    Grade { card: i64, grade: String },
    /// Interactive review of a deck
    Study { deck: String },
    /// Move the simulated date one day forward
    AdvanceDay,
    /// Show settings, or replace them with a JSON record
    Settings { json: Option<String> },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let mut conn = db::init_database(&cli.db)?;
    let user = cli.user.as_str();

    match cli.command {
        Command::Seed => {
            if db::get_all_decks(&conn)?.is_empty() {
                db::new_deck("Polish Vocabulary", &conn)?;
                db::add_flashcard("Polish Vocabulary", "cześć", "hello", &conn)?;
                db::add_flashcard("Polish Vocabulary", "dziękuję", "thank you", &conn)?;
                db::add_flashcard("Polish Vocabulary", "proszę", "please", &conn)?;
                println!("Sample data created!");
            }
        }
        Command::Decks => {
            let decks = db::deck_card_counts(&conn)?;
            println!("Loaded {} decks from database", decks.len());
            for (name, cards) in &decks {
                println!("  - {} ({} cards)", name, cards);
            }
        }
        Command::AddDeck { name } => db::new_deck(&name, &conn)?,
        Command::AddCard {
            deck,
            term,
            definition,
        } => {
            let id = db::add_flashcard(&deck, &term, &definition, &conn)?;
            println!("Card {} in '{}'", id, deck);
        }
        Command::Stats { deck } => {
            let stats = db::deck_stats(user, &deck, &conn)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Due { deck, limit } => {
            for card in db::due_queue(user, &deck, limit, &conn)? {
                println!("{:>5}  {} - {}", card.id, card.term, card.definition);
            }
        }
        Command::Preview { card } => {
            let settings = db::load_settings(user, &conn)?;
            let now = db::get_current_date(&conn)?;
            let progress = db::load_progress(user, card, &settings, &conn)?;
            for button in preview_all(progress.as_ref(), &settings, now) {
                println!(
                    "{:>6}  {:>5}  due {}",
                    button.grade,
                    format_interval(button.interval),
                    button.due_date.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Grade { card, grade } => {
            let grade: Grade = grade.parse()?;
            let progress = db::record_review(user, card, grade, &mut conn)?;
            println!(
                "Next review in {} ({})",
                format_interval(progress.interval()),
                progress.due_date().format("%Y-%m-%d %H:%M")
            );
        }
        Command::Study { deck } => study(user, &deck, &mut conn)?,
        Command::AdvanceDay => {
            let today = db::advance_day(&conn)?;
            println!("Current date: {}", today.format("%Y-%m-%d"));
        }
        Command::Settings { json } => {
            let settings = match json {
                Some(raw) => db::save_settings(user, &serde_json::from_str(&raw)?, &conn)?,
                None => db::load_settings(user, &conn)?,
            };
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

/// Terminal loop: show term, wait for Enter, show definition, read a grade.
fn study(user: &str, deck: &str, conn: &mut rusqlite::Connection) -> Result<(), Box<dyn Error>> {
    let mut session = ReviewSession::start(user, deck, conn)?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut round = 0;

    while let Some(card) = session.current_card().cloned() {
        if session.round_number != round {
            round = session.round_number;
            println!("\n{}", session.phase_message());
        }

        println!("\n{}", card.term);
        print!("(Enter to show) ");
        io::stdout().flush()?;
        if lines.next().transpose()?.is_none() {
            break;
        }
        session.toggle_definition();
        println!("{}", card.definition);

        let grade = loop {
            print!("[a]gain [h]ard [g]ood [e]asy: ");
            io::stdout().flush()?;
            let Some(line) = lines.next().transpose()? else {
                println!();
                return Ok(());
            };
            let answer = line.trim().to_ascii_lowercase();
            let answer = match answer.as_str() {
                "a" => "again",
                "h" => "hard",
                "g" => "good",
                "e" => "easy",
                other => other,
            };
            match answer.parse::<Grade>() {
                Ok(grade) => break grade,
                Err(e) => println!("{}", e),
            }
        };

        if let Some(progress) = session.grade_current_card(grade, conn)? {
            println!("-> {}", format_interval(progress.interval()));
        }
    }

    println!("\nReviewed {} cards.", session.reviewed_count);
    Ok(())
}
