use std::path::{Path, PathBuf};

/// One source document read by the extractor.
///
/// Records move from the producer thread to the consumer by value and are
/// never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// File name without its extension; becomes the output file stem
    pub name: String,

    /// Full document text
    pub content: String,

    /// Path the document was read from
    pub source_path: PathBuf,

    /// Path relative to the input root, for log lines
    pub relative_path: String,
}

impl Record {
    /// Creates a new record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        source_path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            source_path: source_path.into(),
            relative_path: relative_path.into(),
        }
    }

    /// Builds a record named `name` from raw file bytes.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD rather than
    /// rejecting the file.
    #[must_use]
    pub fn from_bytes(path: &Path, root: &Path, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let relative_path = pathdiff::diff_paths(path, root)
            .unwrap_or_else(|| path.to_path_buf())
            .to_string_lossy()
            .to_string();

        let content = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Replacing invalid UTF-8 in {}", path.display());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        Self {
            name: name.into(),
            content,
            source_path: path.to_path_buf(),
            relative_path,
        }
    }

    /// File name of the payload written for this record.
    #[must_use]
    pub fn output_file_name(&self) -> String {
        format!("{}.json", self.name)
    }

    /// Returns the size of the content in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_relative_path_and_output_name() {
        let record = Record::from_bytes(
            Path::new("/in/notes/daily.md"),
            Path::new("/in"),
            "daily",
            b"hello".to_vec(),
        );

        assert_eq!(record.name, "daily");
        assert_eq!(record.content, "hello");
        assert_eq!(record.relative_path, "notes/daily.md");
        assert_eq!(record.output_file_name(), "daily.json");
    }

    #[test]
    fn test_empty_name_gives_bare_json_extension() {
        let record = Record::from_bytes(Path::new("/in/.md"), Path::new("/in"), "", Vec::new());

        assert_eq!(record.output_file_name(), ".json");
        assert_eq!(record.size_bytes(), 0);
    }

    #[test]
    fn test_from_bytes_replaces_invalid_utf8() {
        let record = Record::from_bytes(
            Path::new("/in/bad.md"),
            Path::new("/in"),
            "bad",
            vec![b'o', b'k', 0xFF, b'!'],
        );

        assert_eq!(record.content, "ok\u{FFFD}!");
    }

    #[test]
    fn test_unicode_content_preserved() {
        let text = "Привет, мир!\n\n# Заголовок";
        let record = Record::from_bytes(
            Path::new("/in/ru.md"),
            Path::new("/in"),
            "ru",
            text.as_bytes().to_vec(),
        );

        assert_eq!(record.content, text);
        assert_eq!(record.size_bytes(), text.len() as u64);
    }
}
