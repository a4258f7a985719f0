use super::error::RepositoryResult;
use super::transcript_repository::BoxFuture;
use crate::preferences::Preferences;

/// Repository trait for preference persistence
pub trait PreferencesRepository: Send + Sync + 'static {
    /// Load saved preferences; defaults when nothing usable is on disk.
    fn load(&self) -> BoxFuture<'static, RepositoryResult<Preferences>>;

    /// Save preferences to storage
    fn save(&self, preferences: Preferences) -> BoxFuture<'static, RepositoryResult<()>>;
}
