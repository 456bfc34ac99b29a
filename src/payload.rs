//! Chat request payloads built from records.
//!
//! The user message is rendered through a Tera template so it can be swapped
//! out from the command line; the built-in template wraps the document in the
//! fixed delimiter text.

use crate::{
    config::{Config, PromptSettings},
    error::{Error, Result},
    record::Record,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tera::{Context, Tera};
use tracing::debug;

/// Built-in user message template.
pub const DEFAULT_USER_TEMPLATE: &str = "Начало текста: {{ content }}\n\nКонец текста.";

const USER_TEMPLATE_NAME: &str = "user_message";

/// Maximum template file size (1MB)
const MAX_TEMPLATE_SIZE: u64 = 1024 * 1024;

/// Request body for a chat completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,

    /// Conversation, system message first
    pub messages: Vec<ChatMessage>,

    /// Sampling options
    pub options: ChatOptions,

    /// Whether the server should stream the answer
    pub stream: bool,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system` or `user`
    pub role: String,

    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Model options sent with the request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Sampling temperature
    pub temperature: f64,

    /// Context window size
    pub num_ctx: u32,
}

#[derive(Serialize)]
struct UserContext<'a> {
    name: &'a str,
    content: &'a str,
}

/// Turns records into serialized chat requests.
pub struct PromptTemplate {
    tera: Tera,
    settings: PromptSettings,
}

impl PromptTemplate {
    /// Creates a template from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the custom template cannot be read or parsed.
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_settings(config.prompt.clone())
    }

    /// Creates a template from prompt settings alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the custom template cannot be read or parsed.
    pub fn from_settings(settings: PromptSettings) -> Result<Self> {
        let mut tera = Tera::default();
        // Markdown must reach the model untouched
        tera.autoescape_on(vec![]);

        let source = match settings.template_path {
            Some(ref path) => {
                debug!("Loading user template from {}", path.display());
                fs::read_to_string(path).map_err(|e| Error::io(path, e))?
            }
            None => DEFAULT_USER_TEMPLATE.to_string(),
        };

        tera.add_raw_template(USER_TEMPLATE_NAME, &source)
            .map_err(|e| Error::template(USER_TEMPLATE_NAME, e))?;

        Ok(Self { tera, settings })
    }

    /// Validates an external template file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, too large, empty, or not
    /// valid Tera syntax.
    pub fn validate_template(path: &Path) -> Result<()> {
        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        if metadata.len() > MAX_TEMPLATE_SIZE {
            return Err(Error::config(format!(
                "Template file too large: {} bytes (max: {MAX_TEMPLATE_SIZE} bytes)",
                metadata.len()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        if content.trim().is_empty() {
            return Err(Error::config(format!(
                "Template file is empty: {}",
                path.display()
            )));
        }

        let mut tera = Tera::default();
        tera.add_raw_template("validation", &content)
            .map_err(|e| Error::template(path.to_string_lossy(), e))?;

        if !content.contains("content") {
            tracing::warn!(
                "Template {} never references `content`; documents will be dropped from the prompt",
                path.display()
            );
        }

        Ok(())
    }

    /// Renders the user message for a record.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn user_message(&self, record: &Record) -> Result<String> {
        let context = Context::from_serialize(UserContext {
            name: &record.name,
            content: &record.content,
        })?;

        self.tera
            .render(USER_TEMPLATE_NAME, &context)
            .map_err(|e| Error::template(USER_TEMPLATE_NAME, e))
    }

    /// Builds the request for a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the user message cannot be rendered.
    pub fn build(&self, record: &Record) -> Result<ChatRequest> {
        Ok(ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(self.settings.system_prompt.as_str()),
                ChatMessage::user(self.user_message(record)?),
            ],
            options: ChatOptions {
                temperature: self.settings.temperature,
                num_ctx: self.settings.num_ctx,
            },
            stream: false,
        })
    }

    /// Builds and serializes the request as pretty JSON (2-space indent).
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or serialization fails.
    pub fn render(&self, record: &Record) -> Result<String> {
        let request = self.build(record)?;
        Ok(serde_json::to_string_pretty(&request)?)
    }
}
