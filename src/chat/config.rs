//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::chat::template::{PromptMode, PromptTemplate};
use crate::error::{Error, Result};
use crate::render::DEFAULT_MARKER;
use crate::types::Model;

/// Default system instruction: a helpful-assistant persona.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "너는 도움이 되는 AI 어시스턴트야";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command-line arguments for the promptsmith-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-2.5-flash)", "MODEL")]
    pub model: Option<String>,

    /// System instruction to steer the model.
    #[arrrg(optional, "System instruction for the model", "TEXT")]
    pub system: Option<String>,

    /// Prompt mode.
    #[arrrg(optional, "Prompt mode: raw or templated (default: raw)", "MODE")]
    pub mode: Option<String>,

    /// Conversation continuity policy.
    #[arrrg(optional, "History policy: keep or single-turn (default: keep)", "POLICY")]
    pub history: Option<String>,

    /// Heading that introduces the optimized prompt in a reply.
    #[arrrg(optional, "Marker heading that starts the optimized prompt block", "TEXT")]
    pub marker: Option<String>,

    /// File holding a replacement prompt-engineering template.
    #[arrrg(optional, "Read the prompt-engineering template from FILE", "FILE")]
    pub template_file: Option<String>,

    /// API key; overrides GOOGLE_API_KEY.
    #[arrrg(optional, "Gemini API key (default: $GOOGLE_API_KEY)", "KEY")]
    pub api_key: Option<String>,

    /// Prompt for the API key when none is configured.
    #[arrrg(flag, "Ask for the API key interactively if none is configured")]
    pub ask_key: bool,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max output tokens per response", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Append every request and response to this file as JSON lines.
    #[arrrg(optional, "Log API traffic to FILE as JSON lines", "FILE")]
    pub log_file: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// What happens to earlier turns when a new message arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HistoryPolicy {
    /// Keep every turn for the life of the session.
    #[default]
    Keep,
    /// Forget all earlier turns before each new message.
    SingleTurn,
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryPolicy::Keep => write!(f, "keep"),
            HistoryPolicy::SingleTurn => write!(f, "single-turn"),
        }
    }
}

impl FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" | "full" => Ok(HistoryPolicy::Keep),
            "single-turn" | "single_turn" | "single" => Ok(HistoryPolicy::SingleTurn),
            _ => Err(format!(
                "Invalid history policy: {s}. Valid options: keep, single-turn"
            )),
        }
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Instruction that steers tone and behavior; empty means none.
    pub system_instruction: String,

    /// Whether user input is wrapped in the prompt-engineering template.
    pub prompt_mode: PromptMode,

    /// Conversation continuity policy.
    pub history: HistoryPolicy,

    /// Heading that splits a reply into analysis and optimized prompt.
    pub marker: String,

    /// Template used in templated mode.
    pub template: PromptTemplate,

    /// Optional cap on output tokens.
    pub max_tokens: Option<u32>,

    /// Timeout applied to each request.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Where to log API traffic, if anywhere.
    pub log_file: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.5-flash
    /// - System instruction: helpful-assistant persona
    /// - Prompt mode: raw
    /// - History: keep
    /// - Timeout: 60 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            prompt_mode: PromptMode::default(),
            history: HistoryPolicy::default(),
            marker: DEFAULT_MARKER.to_string(),
            template: PromptTemplate::default(),
            max_tokens: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_color: true,
            log_file: None,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Sets the prompt mode.
    pub fn with_prompt_mode(mut self, mode: PromptMode) -> Self {
        self.prompt_mode = mode;
        self
    }

    /// Sets the history policy.
    pub fn with_history(mut self, history: HistoryPolicy) -> Self {
        self.history = history;
        self
    }

    /// Sets the marker heading.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Sets the template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Sets the output token cap.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the traffic log path.
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    /// The system instruction, or `None` when it is blank.
    pub fn system_instruction(&self) -> Option<&str> {
        let instruction = self.system_instruction.trim();
        if instruction.is_empty() {
            None
        } else {
            Some(instruction)
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut config = ChatConfig::new();
        if let Some(model) = args.model {
            config.model = model
                .parse()
                .map_err(|err: String| Error::configuration(err, Some("model".to_string())))?;
        }
        if let Some(system) = args.system {
            config.system_instruction = system;
        }
        if let Some(mode) = args.mode {
            config.prompt_mode = mode
                .parse()
                .map_err(|err: String| Error::configuration(err, Some("mode".to_string())))?;
        }
        if let Some(history) = args.history {
            config.history = history
                .parse()
                .map_err(|err: String| Error::configuration(err, Some("history".to_string())))?;
        }
        if let Some(marker) = args.marker {
            if marker.trim().is_empty() {
                return Err(Error::configuration(
                    "marker must not be empty",
                    Some("marker".to_string()),
                ));
            }
            config.marker = marker;
        }
        if let Some(path) = args.template_file {
            config.template = PromptTemplate::from_file(path)?;
        }
        if let Some(secs) = args.timeout_secs {
            if secs == 0 {
                return Err(Error::configuration(
                    "timeout must be at least one second",
                    Some("timeout_secs".to_string()),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        config.max_tokens = args.max_tokens;
        config.log_file = args.log_file.map(PathBuf::from);
        config.use_color = !args.no_color;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Flash));
        assert_eq!(config.system_instruction(), Some(DEFAULT_SYSTEM_INSTRUCTION));
        assert_eq!(config.prompt_mode, PromptMode::Raw);
        assert_eq!(config.history, HistoryPolicy::Keep);
        assert_eq!(config.marker, DEFAULT_MARKER);
        assert_eq!(config.template, PromptTemplate::default());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.max_tokens.is_none());
        assert!(config.use_color);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Flash));
        assert_eq!(config.prompt_mode, PromptMode::Raw);
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("gemini-2.5-pro".to_string()),
            system: Some("You are terse.".to_string()),
            mode: Some("templated".to_string()),
            history: Some("single-turn".to_string()),
            marker: Some("## Optimized prompt".to_string()),
            max_tokens: Some(2048),
            timeout_secs: Some(15),
            log_file: Some("traffic.jsonl".to_string()),
            no_color: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Pro));
        assert_eq!(config.system_instruction(), Some("You are terse."));
        assert_eq!(config.prompt_mode, PromptMode::Templated);
        assert_eq!(config.history, HistoryPolicy::SingleTurn);
        assert_eq!(config.marker, "## Optimized prompt");
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.log_file, Some(PathBuf::from("traffic.jsonl")));
        assert!(!config.use_color);
    }

    #[test]
    fn bad_args_are_configuration_errors() {
        let args = ChatArgs {
            mode: Some("fancy".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_configuration());

        let args = ChatArgs {
            marker: Some("  ".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_configuration());

        let args = ChatArgs {
            timeout_secs: Some(0),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_configuration());
    }

    #[test]
    fn blank_system_instruction_means_none() {
        let config = ChatConfig::new().with_system_instruction("   ");
        assert!(config.system_instruction().is_none());
    }

    #[test]
    fn history_policy_parsing() {
        assert_eq!("keep".parse::<HistoryPolicy>(), Ok(HistoryPolicy::Keep));
        assert_eq!(
            "single-turn".parse::<HistoryPolicy>(),
            Ok(HistoryPolicy::SingleTurn)
        );
        assert!("sometimes".parse::<HistoryPolicy>().is_err());
        assert_eq!(HistoryPolicy::SingleTurn.to_string(), "single-turn");
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(Model::Known(KnownModel::Gemini20Flash))
            .with_system_instruction("Be helpful")
            .with_prompt_mode(PromptMode::Templated)
            .with_history(HistoryPolicy::SingleTurn)
            .with_marker("MARK")
            .with_template(PromptTemplate::new("T"))
            .with_max_tokens(Some(100))
            .with_timeout(Duration::from_secs(5))
            .without_color()
            .with_log_file(Some(PathBuf::from("log.jsonl")));
        assert_eq!(config.model, Model::Known(KnownModel::Gemini20Flash));
        assert_eq!(config.system_instruction(), Some("Be helpful"));
        assert_eq!(config.prompt_mode, PromptMode::Templated);
        assert_eq!(config.history, HistoryPolicy::SingleTurn);
        assert_eq!(config.marker, "MARK");
        assert_eq!(config.template.text(), "T");
        assert_eq!(config.max_tokens, Some(100));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.use_color);
        assert_eq!(config.log_file, Some(PathBuf::from("log.jsonl")));
    }
}
