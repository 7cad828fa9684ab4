pub mod database;
pub mod error;
pub mod models;

pub use error::{SchedulerError, StoreError};
pub use models::{
    Bucket, BucketCounts, Flashcard, Grade, Preview, ProgressRecord, ProgressState,
    ReviewSession, Settings, Stage,
};
