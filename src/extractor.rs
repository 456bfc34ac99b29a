use crate::{
    config::Config,
    error::{Error, Result},
    record::Record,
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, SyncSender},
};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Statistics collected while extracting records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    /// Files whose extension matched
    pub matched: usize,

    /// Records handed to the consumer
    pub emitted: usize,

    /// Entries that could not be read and were skipped
    pub skipped: usize,

    /// Files ignored because of their extension
    pub ignored: usize,
}

/// Sending half of the record stream.
///
/// Dropping the sink signals end-of-stream to the consumer.
#[derive(Debug)]
pub struct RecordSink {
    tx: SyncSender<Record>,
}

impl RecordSink {
    pub(crate) const fn new(tx: SyncSender<Record>) -> Self {
        Self { tx }
    }

    /// Creates a sink with the given buffer size and its receiving end.
    ///
    /// A bound of zero gives a rendezvous channel: every emit blocks until
    /// the consumer takes the record.
    #[must_use]
    pub fn channel(bound: usize) -> (Self, Receiver<Record>) {
        let (tx, rx) = mpsc::sync_channel(bound);
        (Self::new(tx), rx)
    }

    /// Hands a record to the consumer, blocking until it is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the consumer has gone away.
    pub fn emit(&self, record: Record) -> Result<()> {
        self.tx.send(record).map_err(|_| Error::Cancelled)
    }
}

/// A producer of records run on the pipeline's producer thread.
pub trait RecordSource: Send + 'static {
    /// Emits every record into `sink`, then drops it.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot proceed at all, or
    /// [`Error::Cancelled`] if the sink was closed by the consumer.
    fn extract(&self, sink: RecordSink) -> Result<ExtractStats>;
}

/// Walks a directory tree and reads every file with the configured extension.
#[derive(Debug, Clone)]
pub struct Extractor {
    root: PathBuf,
    extension: String,
}

impl Extractor {
    /// Creates an extractor from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.input_dir.clone(),
            extension: config.extension.clone(),
        }
    }

    /// Returns the record name for `path`, or `None` if the file does not
    /// carry the extension this extractor reads.
    ///
    /// The comparison is case-sensitive, so `README.MD` does not match `md`.
    /// Only the final `.<ext>` is stripped, and a file named exactly `.md`
    /// matches with an empty name.
    #[must_use]
    pub fn document_name(&self, path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_string_lossy();
        let suffix = format!(".{}", self.extension);

        file_name
            .strip_suffix(suffix.as_str())
            .map(ToString::to_string)
    }

    /// Returns true if `path` carries the extension this extractor reads.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        self.document_name(path).is_some()
    }

    fn check_root(&self) -> Result<()> {
        let metadata =
            fs::metadata(&self.root).map_err(|e| Error::traversal(&self.root, e.to_string()))?;

        if !metadata.is_dir() {
            return Err(Error::traversal(&self.root, "not a directory"));
        }

        Ok(())
    }
}

impl RecordSource for Extractor {
    fn extract(&self, sink: RecordSink) -> Result<ExtractStats> {
        self.check_root()?;

        debug!("Walking {}", self.root.display());
        let mut stats = ExtractStats::default();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(Error::traversal(&self.root, e.to_string()));
                }
                Err(e) => {
                    let path = e.path().map_or_else(String::new, |p| p.display().to_string());
                    warn!("Skipping {}: {}", path, e);
                    stats.skipped += 1;
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let Some(name) = self.document_name(path) else {
                trace!("Ignoring {}", path.display());
                stats.ignored += 1;
                continue;
            };
            stats.matched += 1;

            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping {}: read failed: {}", path.display(), e);
                    stats.skipped += 1;
                    continue;
                }
            };

            let record = Record::from_bytes(path, &self.root, name, bytes);
            trace!("Emitting {} ({} bytes)", record.relative_path, record.size_bytes());
            sink.emit(record)?;
            stats.emitted += 1;
        }

        debug!(
            "Walk complete: {} matched, {} emitted, {} skipped, {} ignored",
            stats.matched, stats.emitted, stats.skipped, stats.ignored
        );

        Ok(stats)
    }
}
