use crate::{
    config::Config,
    error::{Error, Result},
    extractor::{ExtractStats, Extractor, RecordSink, RecordSource},
    payload::PromptTemplate,
    record::Record,
    writer::Writer,
};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::mpsc::{self, Receiver, SyncSender, TrySendError},
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Producer-side counters
    pub extract: ExtractStats,

    /// Records transformed by the consumer
    pub records_processed: usize,

    /// Payload files written
    pub files_written: usize,

    /// Total execution time
    pub duration: Duration,

    /// Output directory path
    pub output_directory: String,

    /// Whether writes were skipped
    pub dry_run: bool,
}

impl PipelineStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            Pipeline Execution Summary                 ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Documents Found:      {:>8}                        ║",
            self.extract.matched
        );
        println!(
            "║   - Skipped:          {:>8}                        ║",
            self.extract.skipped
        );
        println!(
            "║   - Other files:      {:>8}                        ║",
            self.extract.ignored
        );
        println!(
            "║ Records Processed:    {:>8}                        ║",
            self.records_processed
        );
        println!(
            "║ Files Written:        {:>8}                        ║",
            self.files_written
        );
        println!("║ Output Directory:                                     ║");
        println!("║   {}", self.output_directory);
        println!(
            "║ Total Time:           {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        if self.dry_run {
            println!("║ ⚠ No files were written (dry run mode)               ║");
        }
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Runs the extractor on a producer thread and transforms and writes every
/// record it emits on the calling thread.
///
/// Records travel over a rendezvous channel, so the producer waits for the
/// consumer on every record. A second channel with a single slot carries at
/// most one fatal producer error. If the consumer fails it drops its end of
/// the record channel, which makes the producer's next send fail, and the
/// producer thread is always joined before `run` returns.
pub struct Pipeline<S = Extractor> {
    config: Config,
    source: S,
    template: PromptTemplate,
    writer: Writer,
}

impl Pipeline<Extractor> {
    /// Creates a new pipeline reading documents from the configured input
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The prompt template cannot be loaded
    pub fn new(config: Config) -> Result<Self> {
        let source = Extractor::new(&config);
        Self::with_source(config, source)
    }
}

impl<S: RecordSource> Pipeline<S> {
    /// Creates a pipeline fed by a custom record source.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation or template loading fails.
    pub fn with_source(config: Config, source: S) -> Result<Self> {
        config.validate()?;

        let template = PromptTemplate::new(&config)?;
        let writer = Writer::new(&config);

        Ok(Self {
            config,
            source,
            template,
            writer,
        })
    }

    /// Executes the pipeline and returns statistics.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: an untraversable input root, a
    /// producer panic, or a transform or write failure.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use promptpack::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .input_dir("./IN")
    ///     .output_dir("./OUT")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(
        input_dir = %self.config.input_dir.display(),
        output_dir = %self.config.output_dir.display(),
    ))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let Self {
            config,
            source,
            template,
            writer,
        } = self;

        info!("Starting pipeline execution");

        if config.dry_run {
            warn!("Dry run mode enabled - skipping file writes");
        } else {
            writer.prepare()?;
        }

        let (data_tx, data_rx) = mpsc::sync_channel::<Record>(0);
        let (err_tx, err_rx) = mpsc::sync_channel::<Error>(1);

        let producer = thread::spawn(move || supervise(&source, RecordSink::new(data_tx), &err_tx));
        debug!("Pipeline running");

        let mut progress = Progress::default();
        let consumer = Consumer {
            template: &template,
            writer: &writer,
            dry_run: config.dry_run,
        };
        let drained = consumer.drain(&data_rx, &mut progress);

        // Unblocks a producer still waiting on a send
        drop(data_rx);
        let joined = producer.join();

        if let Err(e) = drained {
            if let Ok(pending) = err_rx.try_recv() {
                warn!("Producer also failed: {}", pending);
            }
            return Err(e);
        }

        let extract_stats = joined.map_err(|payload| Error::producer_panic(payload.as_ref()))?;

        debug!("Record stream exhausted, draining error channel");

        if let Ok(e) = err_rx.recv() {
            return Err(e);
        }

        debug!("Pipeline done");

        let stats = PipelineStats {
            extract: extract_stats.unwrap_or_default(),
            records_processed: progress.records,
            files_written: progress.files_written,
            duration: start_time.elapsed(),
            output_directory: config.output_dir.display().to_string(),
            dry_run: config.dry_run,
        };

        if stats.extract.skipped > 0 {
            info!("{} document(s) could not be read and were skipped", stats.extract.skipped);
        }

        info!(
            "✓ Pipeline completed: {} records, {} files written in {:.2}s",
            stats.records_processed,
            stats.files_written,
            stats.duration.as_secs_f64()
        );

        Ok(stats)
    }
}

#[derive(Debug, Default)]
struct Progress {
    records: usize,
    files_written: usize,
}

struct Consumer<'a> {
    template: &'a PromptTemplate,
    writer: &'a Writer,
    dry_run: bool,
}

impl Consumer<'_> {
    /// Transforms and writes records until the producer closes the stream.
    fn drain(&self, records: &Receiver<Record>, progress: &mut Progress) -> Result<()> {
        for record in records {
            let payload = self.template.render(&record)?;

            if self.dry_run {
                debug!(
                    "Would write {} ({} bytes)",
                    self.writer.output_path(&record).display(),
                    payload.len()
                );
            } else {
                let path = self.writer.write(&record, &payload)?;
                info!("Processed: {} -> {}", record.relative_path, path.display());
                progress.files_written += 1;
            }

            progress.records += 1;
        }

        Ok(())
    }
}

/// Runs the source, turning an error or a panic into a value on the error
/// channel.
///
/// A cancelled stream is not reported: the consumer already has its own
/// error. When the error slot is taken or the consumer is gone the error is
/// logged and dropped.
fn supervise<S: RecordSource>(
    source: &S,
    sink: RecordSink,
    errors: &SyncSender<Error>,
) -> Option<ExtractStats> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.extract(sink)))
        .unwrap_or_else(|payload| Err(Error::producer_panic(payload.as_ref())));

    match outcome {
        Ok(stats) => Some(stats),
        Err(Error::Cancelled) => {
            debug!("Producer stopped: record stream closed by consumer");
            None
        }
        Err(e) => {
            match errors.try_send(e) {
                Ok(()) => {}
                Err(TrySendError::Full(e)) => {
                    warn!("Dropping producer error, another is already pending: {}", e);
                }
                Err(TrySendError::Disconnected(e)) => {
                    warn!("Dropping producer error, consumer has exited: {}", e);
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use std::{fs, path::Path};

    fn create_test_config(temp: &TempDir) -> Config {
        temp.child("OUT").create_dir_all().unwrap();
        Config::builder()
            .input_dir(temp.child("IN").path())
            .output_dir(temp.child("OUT").path())
            .build()
            .unwrap()
    }

    fn output_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    struct PanickingSource;

    impl RecordSource for PanickingSource {
        fn extract(&self, _sink: RecordSink) -> Result<ExtractStats> {
            panic!("walker exploded");
        }
    }

    struct FailingSource;

    impl RecordSource for FailingSource {
        fn extract(&self, sink: RecordSink) -> Result<ExtractStats> {
            sink.emit(Record::new("first", "1", "IN/first.md", "first.md"))?;
            Err(Error::traversal("IN", "device went away"))
        }
    }

    /// Emits records until the consumer stops listening.
    struct EndlessSource;

    impl RecordSource for EndlessSource {
        fn extract(&self, sink: RecordSink) -> Result<ExtractStats> {
            loop {
                sink.emit(Record::new("same", "again", "IN/same.md", "same.md"))?;
            }
        }
    }

    #[test]
    fn test_markdown_only_scenario() {
        let temp = TempDir::new().unwrap();
        temp.child("IN/a.md").write_str("hello").unwrap();
        temp.child("IN/b.txt").write_str("ignored").unwrap();

        let stats = Pipeline::new(create_test_config(&temp)).unwrap().run().unwrap();

        assert_eq!(output_names(temp.child("OUT").path()), vec!["a.json"]);
        assert_eq!(stats.files_written, 1);
        assert_eq!(stats.extract.ignored, 1);

        let json = fs::read_to_string(temp.child("OUT/a.json").path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["options"]["num_ctx"], 2048);
        assert_eq!(
            value["messages"][1]["content"],
            "Начало текста: hello\n\nКонец текста."
        );
    }

    #[test]
    fn test_bare_extension_document_writes_bare_json() {
        let temp = TempDir::new().unwrap();
        temp.child("IN/.md").write_str("dotfile").unwrap();
        temp.child("IN/a.md").write_str("a").unwrap();

        let stats = Pipeline::new(create_test_config(&temp)).unwrap().run().unwrap();

        assert_eq!(stats.extract.matched, 2);
        assert_eq!(stats.extract.ignored, 0);
        assert_eq!(output_names(temp.child("OUT").path()), vec![".json", "a.json"]);
    }

    #[test]
    fn test_one_output_per_document() {
        let temp = TempDir::new().unwrap();
        for i in 0..12 {
            temp.child(format!("IN/dir{}/doc{i}.md", i % 3))
                .write_str(&format!("document {i}"))
                .unwrap();
        }
        temp.child("IN/dir0/readme.rst").write_str("no").unwrap();

        let stats = Pipeline::new(create_test_config(&temp)).unwrap().run().unwrap();

        assert_eq!(stats.extract.matched, 12);
        assert_eq!(stats.records_processed, 12);
        assert_eq!(output_names(temp.child("OUT").path()).len(), 12);
    }

    #[test]
    fn test_run_is_idempotent() {
        let temp = TempDir::new().unwrap();
        temp.child("IN/x.md").write_str("# X\n\nbody").unwrap();
        temp.child("IN/sub/y.md").write_str("y").unwrap();

        Pipeline::new(create_test_config(&temp)).unwrap().run().unwrap();
        let first_x = fs::read(temp.child("OUT/x.json").path()).unwrap();
        let first_y = fs::read(temp.child("OUT/y.json").path()).unwrap();

        Pipeline::new(create_test_config(&temp)).unwrap().run().unwrap();

        assert_eq!(fs::read(temp.child("OUT/x.json").path()).unwrap(), first_x);
        assert_eq!(fs::read(temp.child("OUT/y.json").path()).unwrap(), first_y);
    }

    #[test]
    fn test_name_collisions_overwrite() {
        let temp = TempDir::new().unwrap();
        temp.child("IN/one/same.md").write_str("1").unwrap();
        temp.child("IN/two/same.md").write_str("2").unwrap();

        let stats = Pipeline::new(create_test_config(&temp)).unwrap().run().unwrap();

        assert_eq!(stats.files_written, 2);
        assert_eq!(output_names(temp.child("OUT").path()), vec!["same.json"]);
    }

    #[test]
    fn test_missing_input_dir_fails_without_output() {
        let temp = TempDir::new().unwrap();

        let err = Pipeline::new(create_test_config(&temp))
            .unwrap()
            .run()
            .unwrap_err();

        assert!(err.is_traversal());
        assert!(output_names(temp.child("OUT").path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_document_is_skipped() {
        let temp = TempDir::new().unwrap();
        for i in 0..9 {
            temp.child(format!("IN/doc{i}.md")).write_str("ok").unwrap();
        }
        std::os::unix::fs::symlink(
            temp.path().join("missing-target"),
            temp.child("IN/broken.md").path(),
        )
        .unwrap();

        let stats = Pipeline::new(create_test_config(&temp)).unwrap().run().unwrap();

        assert_eq!(stats.extract.skipped, 1);
        assert_eq!(stats.files_written, 9);
        assert_eq!(output_names(temp.child("OUT").path()).len(), 9);
    }

    #[test]
    fn test_missing_output_dir_aborts_run() {
        let temp = TempDir::new().unwrap();
        temp.child("IN/a.md").write_str("a").unwrap();
        temp.child("IN/b.md").write_str("b").unwrap();

        let config = Config::builder()
            .input_dir(temp.child("IN").path())
            .output_dir(temp.child("OUT").path())
            .build()
            .unwrap();

        let err = Pipeline::new(config).unwrap().run().unwrap_err();

        assert!(err.is_io());
        assert!(!temp.child("OUT").exists());
    }

    #[test]
    fn test_create_output_dir_option() {
        let temp = TempDir::new().unwrap();
        temp.child("IN/a.md").write_str("a").unwrap();

        let config = Config::builder()
            .input_dir(temp.child("IN").path())
            .output_dir(temp.child("OUT").path())
            .create_output_dir(true)
            .build()
            .unwrap();

        Pipeline::new(config).unwrap().run().unwrap();

        assert!(temp.child("OUT/a.json").exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        temp.child("IN/a.md").write_str("a").unwrap();

        let config = Config::builder()
            .input_dir(temp.child("IN").path())
            .output_dir(temp.child("OUT").path())
            .create_output_dir(true)
            .dry_run(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.records_processed, 1);
        assert_eq!(stats.files_written, 0);
        assert!(!temp.child("OUT").exists());
    }

    #[test]
    fn test_producer_panic_is_reported() {
        let temp = TempDir::new().unwrap();

        let err = Pipeline::with_source(create_test_config(&temp), PanickingSource)
            .unwrap()
            .run()
            .unwrap_err();

        assert!(matches!(err, Error::ProducerPanic { ref message } if message.contains("walker exploded")));
    }

    #[test]
    fn test_producer_error_after_records_is_fatal() {
        let temp = TempDir::new().unwrap();

        let err = Pipeline::with_source(create_test_config(&temp), FailingSource)
            .unwrap()
            .run()
            .unwrap_err();

        assert!(err.is_traversal());
        assert_eq!(output_names(temp.child("OUT").path()), vec!["first.json"]);
    }

    #[test]
    fn test_consumer_failure_releases_producer() {
        let temp = TempDir::new().unwrap();
        let config = Config::builder()
            .input_dir(temp.child("IN").path())
            .output_dir(temp.child("OUT").path())
            .build()
            .unwrap();

        let err = Pipeline::with_source(config, EndlessSource)
            .unwrap()
            .run()
            .unwrap_err();

        assert!(err.is_io());
    }
}
