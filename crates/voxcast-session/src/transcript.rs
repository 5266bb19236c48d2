//! Transcript accumulation and flush-to-disk.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

/// The accumulated session transcript: one `"{speaker}: {text}"` line per
/// unit, in playback order.
#[derive(Debug)]
pub struct Transcript {
    character: String,
    lines: Vec<String>,
}

impl Transcript {
    pub fn new(character: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            lines: Vec::new(),
        }
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = String>) {
        self.lines.extend(lines);
    }

    /// Write the transcript as UTF-8 text into `dir`, one line per unit.
    ///
    /// The file name carries the character and a local timestamp.
    pub fn write_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!(
            "{}-{stamp}.txt",
            self.character.to_lowercase()
        ));

        let mut content = self.lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        std::fs::write(&path, content)?;

        info!(path = %path.display(), lines = self.lines.len(), "Transcript written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_one_line_per_unit() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = Transcript::new("Emily");
        transcript.extend([
            "Emily: first".to_string(),
            "Emily: second".to_string(),
        ]);

        let path = transcript.write_to(dir.path()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Emily: first\nEmily: second\n");
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("emily-"));
    }

    #[test]
    fn test_empty_transcript_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = Transcript::new("Nova");
        let path = transcript.write_to(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
