pub mod due;
pub mod flashcard;
pub mod grade;
pub mod preview;
pub mod progress;
pub mod review_session;
pub mod scheduler;
pub mod settings;

pub use due::{Bucket, BucketCounts, bucket_counts, classify, select_due};
pub use flashcard::Flashcard;
pub use grade::Grade;
pub use preview::{Preview, preview, preview_all};
pub use progress::{ProgressRecord, ProgressState, Stage};
pub use review_session::ReviewSession;
pub use scheduler::review;
pub use settings::{Settings, parse_learning_steps};
