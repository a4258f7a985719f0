use std::path::PathBuf;

use tracing::warn;

use super::error::{RepositoryError, RepositoryResult};
use super::preferences_repository::PreferencesRepository;
use super::transcript_repository::BoxFuture;
use crate::preferences::Preferences;

/// JSON file-based repository for user preferences in ~/.config/banter/.
pub struct PreferencesJsonRepository {
    file_path: PathBuf,
}

impl PreferencesJsonRepository {
    pub fn new() -> RepositoryResult<Self> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| RepositoryError::InitializationError {
                message: "Could not determine config directory".to_string(),
            })?;

        Ok(Self {
            file_path: config_dir.join("banter").join("preferences.json"),
        })
    }

    /// Repository rooted at an explicit directory (used by tests).
    pub fn at_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            file_path: dir.into().join("preferences.json"),
        }
    }
}

impl PreferencesRepository for PreferencesJsonRepository {
    fn load(&self) -> BoxFuture<'static, RepositoryResult<Preferences>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(Preferences::default());
                }
                Err(e) => return Err(RepositoryError::IoError(e)),
            };

            match serde_json::from_str::<Preferences>(&contents) {
                Ok(preferences) => Ok(preferences.sanitized()),
                Err(e) => {
                    warn!(error = %e, "unreadable preferences, using defaults");
                    Ok(Preferences::default())
                }
            }
        })
    }

    fn save(&self, preferences: Preferences) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            let json = serde_json::to_string_pretty(&preferences)?;

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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PreferencesJsonRepository::at_dir(dir.path());
        assert_eq!(repo.load().await.unwrap(), Preferences::default());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PreferencesJsonRepository::at_dir(dir.path());

        let prefs = Preferences {
            dark_mode: false,
            font_size: 18.0,
            eye_comfort: true,
            eye_comfort_intensity: 0.8,
            fast_mode: true,
        };
        repo.save(prefs.clone()).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), prefs);
    }

    #[tokio::test]
    async fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PreferencesJsonRepository::at_dir(dir.path());

        tokio::fs::write(&repo.file_path, "###").await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Preferences::default());
    }

    #[tokio::test]
    async fn test_out_of_range_values_are_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PreferencesJsonRepository::at_dir(dir.path());

        tokio::fs::write(
            &repo.file_path,
            r#"{"font_size": 500.0, "eye_comfort_intensity": 9.0}"#,
        )
        .await
        .unwrap();

        let prefs = repo.load().await.unwrap();
        assert_eq!(prefs.font_size, 32.0);
        assert_eq!(prefs.eye_comfort_intensity, 1.0);
    }
}
