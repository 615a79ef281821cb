//! Free-text operator notes kept in a single file under the data directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const NOTES_FILE: &str = "notes.txt";

#[derive(Debug, Clone)]
pub struct NotesService {
    path: PathBuf,
}

impl NotesService {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(NOTES_FILE),
        }
    }

    /// A missing file reads as empty notes.
    pub async fn read(&self) -> std::io::Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(notes) => Ok(notes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn write(&self, notes: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, notes).await
    }
}
