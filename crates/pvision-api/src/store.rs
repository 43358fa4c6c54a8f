//! On-disk storage for uploads and processed outputs.
//!
//! Artifacts are named `{job_id}_{filename}` and
//! `{job_id}_processed_{filename}` so concurrent uploads of the same file
//! never collide and outputs can always be traced back to their job.

use std::path::{Path, PathBuf};

use pvision_models::JobId;

/// Video container extensions accepted for processing.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Check a client-supplied filename against the accepted extensions,
/// case-insensitively.
pub fn has_allowed_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Upload and output directories for one server instance.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Create both directories if missing.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    /// Where the persisted upload for a job lives.
    pub fn input_path(&self, job_id: &JobId, filename: &str) -> PathBuf {
        self.upload_dir.join(format!("{}_{}", job_id, filename))
    }

    /// Where the processed output for a job lives.
    pub fn output_path(&self, job_id: &JobId, filename: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_processed_{}", job_id, filename))
    }

    /// Persist an upload to its input path.
    pub async fn save_upload(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(path, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_gate() {
        assert!(has_allowed_extension("match.mp4"));
        assert!(has_allowed_extension("MATCH.MP4"));
        assert!(has_allowed_extension("second half.mov"));
        assert!(has_allowed_extension("game.mkv"));
        assert!(has_allowed_extension("replay.avi"));

        assert!(!has_allowed_extension("notes.txt"));
        assert!(!has_allowed_extension("match.mp3"));
        assert!(!has_allowed_extension("match"));
        assert!(!has_allowed_extension("mp4"));
    }

    #[test]
    fn test_artifact_paths_embed_job_id() {
        let store = ArtifactStore::new("/tmp/up", "/tmp/out");
        let id = JobId::from_string("abc-123");

        assert_eq!(
            store.input_path(&id, "match.mp4"),
            PathBuf::from("/tmp/up/abc-123_match.mp4")
        );
        assert_eq!(
            store.output_path(&id, "match.mp4"),
            PathBuf::from("/tmp/out/abc-123_processed_match.mp4")
        );
    }

    #[tokio::test]
    async fn test_save_upload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("in"), dir.path().join("out"));
        store.ensure_dirs().await.unwrap();

        let id = JobId::from_string("job-1");
        let path = store.input_path(&id, "clip.mp4");
        store.save_upload(&path, b"fake video bytes").await.unwrap();

        let read_back = tokio::fs::read(&path).await.unwrap();
        assert_eq!(read_back, b"fake video bytes");
    }
}
