use crate::error::{Error, Result};
use std::path::PathBuf;

const DEFAULT_INPUT_DIR: &str = "./IN";
const DEFAULT_OUTPUT_DIR: &str = "./OUT";
const DEFAULT_EXTENSION: &str = "md";

/// Model name written into every request.
pub const DEFAULT_MODEL: &str = "gemma3:1b";

/// System instruction placed before the document.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Ты — помощник для анализа текстов. Отвечай кратко и по делу.";

/// Sampling temperature written into every request.
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Context window size written into every request.
pub const DEFAULT_NUM_CTX: u32 = 2048;

const MAX_TEMPERATURE: f64 = 2.0;

/// Settings for the generated chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSettings {
    /// Model identifier
    pub model: String,

    /// Content of the leading system message
    pub system_prompt: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Context window size (`num_ctx`)
    pub num_ctx: u32,

    /// Optional Tera template overriding the user message
    pub template_path: Option<PathBuf>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            num_ctx: DEFAULT_NUM_CTX,
            template_path: None,
        }
    }
}

/// Configuration for the promptpack pipeline.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Root directory to walk for documents
    pub input_dir: PathBuf,

    /// Directory receiving one `<stem>.json` per document
    pub output_dir: PathBuf,

    /// Extension (without the dot) a file must have to be picked up
    pub extension: String,

    /// Chat request settings
    pub prompt: PromptSettings,

    /// Create the output directory if it is missing
    pub create_output_dir: bool,

    /// Dry run mode (no file writes)
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptpack::Config;
    ///
    /// let config = Config::builder()
    ///     .input_dir("./notes")
    ///     .num_ctx(4096)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// The input directory is not checked here; a missing root is reported
    /// by the extractor as a traversal failure.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The extension is empty or starts with a dot
    /// - The model name is empty
    /// - The temperature or context size is out of range
    /// - The template file is missing or does not parse
    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            return Err(Error::config("extension must not be empty"));
        }

        if self.extension.starts_with('.') {
            return Err(Error::config(format!(
                "extension must be given without the leading dot: '{}'",
                self.extension
            )));
        }

        if self.prompt.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }

        if !self.prompt.temperature.is_finite()
            || !(0.0..=MAX_TEMPERATURE).contains(&self.prompt.temperature)
        {
            return Err(Error::config(format!(
                "temperature ({}) must be between 0.0 and {MAX_TEMPERATURE}",
                self.prompt.temperature
            )));
        }

        if self.prompt.num_ctx == 0 {
            return Err(Error::config("num_ctx must be greater than 0"));
        }

        if let Some(ref template_path) = self.prompt.template_path {
            if !template_path.is_file() {
                return Err(Error::config(format!(
                    "Template file does not exist: {}",
                    template_path.display()
                )));
            }

            crate::payload::PromptTemplate::validate_template(template_path)?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            prompt: PromptSettings::default(),
            create_output_dir: false,
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    extension: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
    temperature: Option<f64>,
    num_ctx: Option<u32>,
    template_path: Option<PathBuf>,
    create_output_dir: bool,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the directory to walk.
    #[must_use]
    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(path.into());
        self
    }

    /// Sets the output directory for generated payloads.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the extension to match (case-sensitive, no leading dot).
    #[must_use]
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    /// Sets the model name.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the context window size.
    #[must_use]
    pub fn num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = Some(num_ctx);
        self
    }

    /// Sets the path to a Tera template for the user message.
    ///
    /// The template sees `content` (the document text) and `name` (the file
    /// stem).
    #[must_use]
    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    /// Creates the output directory before writing when enabled.
    #[must_use]
    pub fn create_output_dir(mut self, enabled: bool) -> Self {
        self.create_output_dir = enabled;
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let defaults = PromptSettings::default();

        let config = Config {
            input_dir: self
                .input_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            extension: self
                .extension
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            prompt: PromptSettings {
                model: self.model.unwrap_or(defaults.model),
                system_prompt: self.system_prompt.unwrap_or(defaults.system_prompt),
                temperature: self.temperature.unwrap_or(defaults.temperature),
                num_ctx: self.num_ctx.unwrap_or(defaults.num_ctx),
                template_path: self.template_path,
            },
            create_output_dir: self.create_output_dir,
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}
