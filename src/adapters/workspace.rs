use crate::domain::ports::Workspace;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    base_path: PathBuf,
}

impl LocalWorkspace {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 建立根目錄 (啟動時呼叫)
    pub async fn ensure_base(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }
}

impl Workspace for LocalWorkspace {
    async fn create(&self, name: &str) -> Result<PathBuf> {
        let dir = self.base_path.join(sanitize_file_name(name));
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    async fn cleanup(&self, dir: &Path) {
        if !dir.starts_with(&self.base_path) {
            tracing::warn!("Refusing to remove {} outside the work dir", dir.display());
            return;
        }
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => tracing::info!("🧹 Cleaned up temp directory: {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Error cleaning up {}: {}", dir.display(), e),
        }
    }
}

/// Single path component safe to create inside the job directory.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();

    if cleaned.is_empty() {
        "input".to_string()
    } else {
        cleaned.to_string()
    }
}
