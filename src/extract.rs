//! Text extraction collaborator.
//!
//! Extraction never fails upward: an unsupported file type or a read error
//! degrades to an empty string with a log line, and the ingest run carries
//! on. Format-specific readers (PDF, slides) plug in behind the same trait.

use std::path::Path;

use tracing::warn;

/// Produces one text document per input file.
pub trait TextExtractor {
    /// Extract the text content of `path`.
    ///
    /// Returns `""` and logs on any unsupported type or read failure;
    /// never raises to the caller.
    fn extract_text(&self, path: &Path) -> String;
}

/// Extractor for plain-text lecture materials.
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path) -> String {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext) => {
                match std::fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Error reading {}: {e}", path.display());
                        String::new()
                    }
                }
            }
            _ => {
                warn!("Unsupported file type for {}", path.display());
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_plain_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lecture_01.txt");
        std::fs::write(&path, "Photosynthesis converts light into energy.").unwrap();

        let extractor = PlainTextExtractor;
        assert_eq!(
            extractor.extract_text(&path),
            "Photosynthesis converts light into energy."
        );
    }

    #[test]
    fn test_reads_markdown() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.md");
        std::fs::write(&path, "# Week 3\nOsmosis.").unwrap();

        let extractor = PlainTextExtractor;
        assert_eq!(extractor.extract_text(&path), "# Week 3\nOsmosis.");
    }

    #[test]
    fn test_unsupported_extension_degrades_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("slides.pptx");
        std::fs::write(&path, b"binary blob").unwrap();

        let extractor = PlainTextExtractor;
        assert_eq!(extractor.extract_text(&path), "");
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let extractor = PlainTextExtractor;
        assert_eq!(extractor.extract_text(Path::new("no/such/file.txt")), "");
    }

    #[test]
    fn test_extension_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("LECTURE.TXT");
        std::fs::write(&path, "content").unwrap();

        let extractor = PlainTextExtractor;
        assert_eq!(extractor.extract_text(&path), "content");
    }
}
