use crate::{
    config::Config,
    error::{Error, Result},
    record::Record,
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Writes one payload file per record.
#[derive(Debug, Clone)]
pub struct Writer {
    output_dir: PathBuf,
    create_output_dir: bool,
}

impl Writer {
    /// Creates a new writer from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            create_output_dir: config.create_output_dir,
        }
    }

    /// Creates the output directory when the configuration asks for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn prepare(&self) -> Result<()> {
        if self.create_output_dir {
            fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;
            info!("Output directory ready: {}", self.output_dir.display());
        }
        Ok(())
    }

    /// Returns the path the payload for `record` is written to.
    #[must_use]
    pub fn output_path(&self, record: &Record) -> PathBuf {
        self.output_dir.join(record.output_file_name())
    }

    /// Writes `payload` as the full content of `<output_dir>/<name>.json`.
    ///
    /// Existing files are overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory is missing or not writable.
    pub fn write(&self, record: &Record, payload: &str) -> Result<PathBuf> {
        let path = self.output_path(record);

        if path.exists() {
            debug!("Overwriting {}", path.display());
        }

        Self::write_file_atomic(&path, payload)?;

        debug!("Wrote {} bytes to {}", payload.len(), path.display());
        Ok(path)
    }

    /// Writes a file through a temporary sibling that is synced and renamed
    /// over the target.
    fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::config(format!("Invalid output path: {}", path.display())))?
            .to_string_lossy();
        let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(path, e))?;

        let written = temp_file
            .write_all(content.as_bytes())
            .and_then(|()| temp_file.sync_all());
        drop(temp_file);

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::io(&temp_path, e));
        }

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::io(path, e)
        })
    }
}
