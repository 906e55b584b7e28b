use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, VidlocError};

pub const WORKSPACE_PREFIX: &str = "vidloc_";

const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Scratch directory owned by a single job.
///
/// Nothing is removed when the value is dropped; call [`Workspace::cleanup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a fresh `vidloc_<uuid>` directory under `parent` (system temp dir if unset)
    pub async fn create(parent: Option<&Path>) -> Result<Self> {
        let parent = parent.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        let root = parent.join(format!("{}{}", WORKSPACE_PREFIX, Uuid::new_v4().simple()));

        fs::create_dir_all(&root).await?;
        info!("Created workspace: {}", root.display());

        Ok(Self { root })
    }

    /// Reopen an existing scratch directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(VidlocError::NotFound(root));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.root.join(name)
    }

    /// Delete the directory and everything in it
    pub async fn cleanup(self) -> Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                info!("Removed workspace: {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Workspace already removed: {}", self.root.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Replace characters that are not allowed in file names.
pub fn safe_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');

    if trimmed.is_empty() {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        format!("file_{}", secs)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("my:video?.mp4"), "my_video_.mp4");
        assert_eq!(safe_filename("  .hidden name. "), "hidden name");
        assert_eq!(safe_filename(r#"a<b>c"d/e\f|g*h"#), "a_b_c_d_e_f_g_h");
        assert!(safe_filename(" .. ").starts_with("file_"));
    }

    #[tokio::test]
    async fn test_workspace_lifecycle() {
        let parent = assert_fs::TempDir::new().unwrap();

        let workspace = Workspace::create(Some(parent.path())).await.unwrap();
        assert!(workspace.path().is_dir());
        assert!(workspace.path().starts_with(parent.path()));
        assert!(workspace
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORKSPACE_PREFIX));

        std::fs::write(workspace.join("scratch.txt"), b"data").unwrap();
        let reopened = Workspace::open(workspace.path()).unwrap();
        assert_eq!(reopened, workspace);

        let root = workspace.path().to_path_buf();
        workspace.cleanup().await.unwrap();
        assert!(!root.exists());

        reopened.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_two_workspaces_are_distinct() {
        let parent = assert_fs::TempDir::new().unwrap();
        let a = Workspace::create(Some(parent.path())).await.unwrap();
        let b = Workspace::create(Some(parent.path())).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_open_missing_directory() {
        assert!(matches!(Workspace::open("/no/such/workspace"), Err(VidlocError::NotFound(_))));
    }
}
