use std::path::Path;

use tracing::debug;

use crate::catalog::Job;
use crate::error::StageError;
use crate::stages::frames::staging_dir;

/// Deletes a job's frame directory and any staging directory left behind by
/// an interrupted extraction. Missing directories are not an error.
pub fn remove_frames(job: &Job) -> Result<(), StageError> {
    remove_dir(&job.frame_dir)?;
    remove_dir(&staging_dir(&job.frame_dir))
}

fn remove_dir(dir: &Path) -> Result<(), StageError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!("Removed {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StageError::CleanupFailed {
            path: dir.to_path_buf(),
            cause: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OutputLayout;
    use tempfile::TempDir;

    fn test_job(temp_dir: &TempDir) -> Job {
        let layout = OutputLayout::new(temp_dir.path());
        Job::new(
            0,
            temp_dir.path().join("001 Intro.mp4"),
            "001 Intro".to_string(),
            &layout,
        )
    }

    #[test]
    fn test_remove_frames_deletes_frames_and_staging() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(&temp_dir);
        let staging = staging_dir(&job.frame_dir);
        std::fs::create_dir_all(&job.frame_dir).unwrap();
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(job.frame_dir.join("frame_0001.jpg"), b"x").unwrap();
        std::fs::write(staging.join("frame_0001.jpg"), b"x").unwrap();

        remove_frames(&job).unwrap();
        assert!(!job.frame_dir.exists());
        assert!(!staging.exists());
    }

    #[test]
    fn test_remove_frames_when_nothing_exists() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(&temp_dir);
        assert!(remove_frames(&job).is_ok());
    }

    #[test]
    fn test_remove_frames_leaves_other_jobs_alone() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(&temp_dir);
        let layout = OutputLayout::new(temp_dir.path());
        let other = layout.frame_dir("002 Topic");
        std::fs::create_dir_all(&job.frame_dir).unwrap();
        std::fs::create_dir_all(&other).unwrap();

        remove_frames(&job).unwrap();
        assert!(other.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_frames_not_a_directory_is_cleanup_failed() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(&temp_dir);
        std::fs::create_dir_all(job.frame_dir.parent().unwrap()).unwrap();
        // A regular file where the directory should be.
        std::fs::write(&job.frame_dir, b"not a dir").unwrap();

        let err = remove_frames(&job).unwrap_err();
        assert!(matches!(err, StageError::CleanupFailed { .. }));
    }
}
