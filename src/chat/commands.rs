//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

use crate::chat::config::HistoryPolicy;
use crate::chat::template::PromptMode;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Change the model.
    Model(String),

    /// Set the system instruction.
    /// `None` restores the default persona.
    System(Option<String>),

    /// Switch between raw and templated prompts.
    Mode(PromptMode),

    /// Change the conversation continuity policy.
    History(HistoryPolicy),

    /// Change the marker heading.
    Marker(String),

    /// Reprint the conversation so far.
    Log,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics (turn count, current model, etc.).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use promptsmith::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/mode templated").is_some());
/// assert!(parse_command("여행 블로그 써줘").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "reset" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "mode" => match argument.map(str::parse::<PromptMode>) {
            Some(Ok(mode)) => ChatCommand::Mode(mode),
            Some(Err(err)) => ChatCommand::Invalid(err),
            None => ChatCommand::Invalid("/mode expects 'raw' or 'templated'".to_string()),
        },
        "history" => match argument.map(str::parse::<HistoryPolicy>) {
            Some(Ok(policy)) => ChatCommand::History(policy),
            Some(Err(err)) => ChatCommand::Invalid(err),
            None => ChatCommand::Invalid("/history expects 'keep' or 'single-turn'".to_string()),
        },
        "marker" => match argument {
            Some(marker) => ChatCommand::Marker(marker.to_string()),
            None => ChatCommand::Invalid("/marker requires heading text".to_string()),
        },
        "log" => ChatCommand::Log,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /model <name>          Change the model (e.g., /model gemini-2.5-pro)
  /system [text]         Set system instruction (no argument restores the default)
  /mode raw|templated    Send input as typed, or wrapped in the prompt template
  /history keep|single-turn
                         Keep all turns, or forget them before each message
  /marker <heading>      Heading that starts the optimized prompt block
  /log                   Reprint the conversation
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
