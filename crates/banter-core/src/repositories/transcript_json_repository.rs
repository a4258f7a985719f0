use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, warn};

use super::error::{RepositoryError, RepositoryResult};
use super::transcript_repository::{BoxFuture, TranscriptRepository};
use crate::transcript::Transcript;

/// JSON file-based repository for the chat transcript.
/// Stores a single history file in ~/.config/banter/.
pub struct TranscriptJsonRepository {
    file_path: PathBuf,
}

impl TranscriptJsonRepository {
    pub fn new() -> RepositoryResult<Self> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| RepositoryError::InitializationError {
                message: "Could not determine config directory".to_string(),
            })?;

        Ok(Self {
            file_path: config_dir.join("banter").join("history.json"),
        })
    }

    /// Repository rooted at an explicit directory (used by tests).
    pub fn at_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            file_path: dir.into().join("history.json"),
        }
    }
}

impl TranscriptRepository for TranscriptJsonRepository {
    fn load(&self) -> BoxFuture<'static, RepositoryResult<Option<Transcript>>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(RepositoryError::IoError(e)),
            };

            // Unreadable history is dropped and started over, never surfaced
            // to the user.
            let transcript: Transcript = match serde_json::from_str(&contents) {
                Ok(transcript) => transcript,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "discarding unreadable history");
                    let _ = tokio::fs::remove_file(&path).await;
                    return Ok(None);
                }
            };

            if transcript.is_stale(Utc::now()) {
                debug!(saved_at = %transcript.saved_at, "discarding stale history");
                let _ = tokio::fs::remove_file(&path).await;
                return Ok(None);
            }

            Ok(Some(transcript))
        })
    }

    fn save(&self, mut transcript: Transcript) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            transcript.saved_at = Utc::now();
            let json = serde_json::to_string_pretty(&transcript)?;

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            // Write atomically (write to temp, then rename)
            let temp_path = path.with_extension("json.tmp");
            tokio::fs::write(&temp_path, json).await?;
            tokio::fs::rename(&temp_path, &path).await?;

            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(RepositoryError::IoError(e)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ChatTurn;
    use chrono::Duration;

    #[tokio::test]
    async fn test_load_without_saved_history_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TranscriptJsonRepository::at_dir(dir.path());
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips_turns_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TranscriptJsonRepository::at_dir(dir.path());

        let transcript = Transcript::new(vec![
            ChatTurn::user("question"),
            ChatTurn::assistant("answer", Some("reasoning".to_string())),
            ChatTurn::user("follow-up"),
        ]);
        repo.save(transcript).await.unwrap();

        let loaded = repo.load().await.unwrap().unwrap();
        let texts: Vec<&str> = loaded.turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["question", "answer", "follow-up"]);
        assert_eq!(loaded.turns[1].thoughts.as_deref(), Some("reasoning"));
    }

    #[tokio::test]
    async fn test_corrupt_history_is_silently_reset() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TranscriptJsonRepository::at_dir(dir.path());

        tokio::fs::write(&repo.file_path, "{ not valid json")
            .await
            .unwrap();

        assert!(repo.load().await.unwrap().is_none());
        // The bad file is gone, so the next load starts clean.
        assert!(!repo.file_path.exists());
    }

    #[tokio::test]
    async fn test_stale_history_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TranscriptJsonRepository::at_dir(dir.path());

        let mut transcript = Transcript::new(vec![ChatTurn::user("old news")]);
        transcript.saved_at = Utc::now() - Duration::hours(25);
        tokio::fs::write(
            &repo.file_path,
            serde_json::to_string(&transcript).unwrap(),
        )
        .await
        .unwrap();

        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_history() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TranscriptJsonRepository::at_dir(dir.path());

        repo.save(Transcript::new(vec![ChatTurn::user("bye")]))
            .await
            .unwrap();
        repo.clear().await.unwrap();
        assert!(repo.load().await.unwrap().is_none());

        // Clearing twice is fine.
        repo.clear().await.unwrap();
    }
}
