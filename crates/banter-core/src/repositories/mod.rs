pub mod error;
pub mod preferences_json_repository;
pub mod preferences_repository;
pub mod transcript_json_repository;
pub mod transcript_repository;

pub use error::{RepositoryError, RepositoryResult};
pub use preferences_json_repository::PreferencesJsonRepository;
pub use preferences_repository::PreferencesRepository;
pub use transcript_json_repository::TranscriptJsonRepository;
pub use transcript_repository::{BoxFuture, TranscriptRepository};
