//! Chat application module for interactive conversations with Gemini.
//!
//! This module provides a REPL chat interface built on top of the
//! promptsmith client library. It supports:
//!
//! - Raw prompts, or prompts wrapped in a prompt-engineering template
//! - Splitting templated replies into analysis and a copy-pastable prompt block
//! - Slash commands for session control
//! - Configurable model, system instruction, history policy, and marker
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`conversation`]: The ordered log of turns
//! - [`template`]: Prompt composition
//! - [`session`]: The orchestrator tying input, history, and the client together
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod conversation;
mod session;
mod template;

pub use crate::render::{PlainTextRenderer, RenderPlan, Renderer, render_reply};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_SYSTEM_INSTRUCTION, HistoryPolicy};
pub use conversation::{Conversation, Role, Turn};
pub use session::{ChatSession, SessionStats, TurnOutcome};
pub use template::{DEFAULT_TEMPLATE, PromptMode, PromptTemplate};
