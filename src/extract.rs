//! Document readers.
//!
//! The corpus format is picked from the file extension: PDFs go through
//! `pdf-extract`, everything else is read as UTF-8 text. Failures come back
//! as [`ReadError`] so ingestion can skip the file and keep going.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            Self::Pdf
        } else {
            Self::Text
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),
}

/// Read the plain text of one corpus document.
pub fn read_document(path: &Path) -> Result<String, ReadError> {
    match DocumentFormat::from_path(path) {
        DocumentFormat::Pdf => {
            let bytes = std::fs::read(path)?;
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ReadError::Pdf(e.to_string()))
        }
        DocumentFormat::Text => Ok(std::fs::read_to_string(path)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a/b.PDF")), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("notes.md")), DocumentFormat::Text);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), DocumentFormat::Text);
    }

    #[test]
    fn test_reads_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        std::fs::write(&path, "# Title\n\nBody").unwrap();
        assert_eq!(read_document(&path).unwrap(), "# Title\n\nBody");
    }

    #[test]
    fn test_invalid_pdf_is_error_not_panic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();
        let err = read_document(&path).unwrap_err();
        assert!(matches!(err, ReadError::Pdf(_)));
        assert!(err.to_string().starts_with("PDF text extraction failed: "));
    }

    #[test]
    fn test_non_utf8_text_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bin.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = read_document(&path).unwrap_err();
        assert!(matches!(err, ReadError::Io(_)));
        assert!(err.to_string().starts_with("read failed: "));
    }
}
