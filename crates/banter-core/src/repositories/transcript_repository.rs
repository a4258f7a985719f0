use std::future::Future;
use std::pin::Pin;

use super::error::RepositoryResult;
use crate::transcript::Transcript;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Repository trait for transcript persistence
pub trait TranscriptRepository: Send + Sync + 'static {
    /// Load the saved transcript. `None` when nothing is saved, the saved
    /// copy is older than the retention window, or the file is unreadable.
    fn load(&self) -> BoxFuture<'static, RepositoryResult<Option<Transcript>>>;

    /// Save the transcript, stamping it with the current time.
    fn save(&self, transcript: Transcript) -> BoxFuture<'static, RepositoryResult<()>>;

    /// Remove the saved transcript, if any.
    fn clear(&self) -> BoxFuture<'static, RepositoryResult<()>>;
}
