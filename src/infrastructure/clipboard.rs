//! Clipboard sources for burst paste

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard access denied: {0}")]
    Denied(String),

    #[error("No clipboard source configured")]
    Unavailable,

    #[error("Clipboard read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ClipboardSource: Send + Sync {
    async fn read_text(&self) -> Result<String, ClipboardError>;
}

/// Reads the "clipboard" from a file each time a paste is requested
pub struct FileClipboard {
    path: PathBuf,
}

impl FileClipboard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ClipboardSource for FileClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(ClipboardError::Denied(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A source with nothing behind it; every read is refused
pub struct NoClipboard;

#[async_trait]
impl ClipboardSource for NoClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        Err(ClipboardError::Unavailable)
    }
}

/// Fixed text, for scripted sessions
pub struct StaticClipboard(pub String);

#[async_trait]
impl ClipboardSource for StaticClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_clipboard_reads_contents() {
        let path = std::env::temp_dir().join(format!("hid_relay_clip_{}", std::process::id()));
        std::fs::write(&path, "hello\r\n").unwrap();
        let clipboard = FileClipboard::new(path.clone());
        assert_eq!(clipboard.read_text().await.unwrap(), "hello\r\n");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let clipboard = FileClipboard::new(PathBuf::from("/nonexistent/hid_relay_clip"));
        assert!(matches!(
            clipboard.read_text().await,
            Err(ClipboardError::Io(_))
        ));
        assert!(matches!(
            NoClipboard.read_text().await,
            Err(ClipboardError::Unavailable)
        ));
    }
}
