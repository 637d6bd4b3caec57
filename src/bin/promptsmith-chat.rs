//! Interactive chat application for conversing with Gemini.
//!
//! This binary provides a REPL interface for chatting with Gemini models, optionally wrapping
//! every message in a prompt-engineering template whose replies end with a copy-pastable
//! optimized prompt.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage; the key comes from GOOGLE_API_KEY or a .env file
//! promptsmith-chat
//!
//! # Rewrite every message as an optimized prompt
//! promptsmith-chat --mode templated
//!
//! # Forget earlier turns before each message
//! promptsmith-chat --history single-turn
//!
//! # Enter the key by hand if none is configured
//! promptsmith-chat --ask-key
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/mode raw|templated` - Switch prompt mode
//! - `/system [text]` - Set or restore the system instruction
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::process;
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use promptsmith::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, Role,
    TurnOutcome, help_text, parse_command, render_reply,
};
use promptsmith::{Error, FileLogger, Gemini, Model, api_key_from_env};

/// Main entry point for the promptsmith-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (mut args, _) = ChatArgs::from_command_line_relaxed("promptsmith-chat [OPTIONS]");
    let explicit_key = args.api_key.take();
    let ask_key = args.ask_key;
    let config = ChatConfig::try_from(args).unwrap_or_else(|err| fatal(&err));
    let use_color = config.use_color;

    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    let api_key = match explicit_key.or_else(api_key_from_env) {
        Some(key) => Some(key),
        None if ask_key => read_api_key(&mut rl),
        None => None,
    };
    let mut client = Gemini::with_options(
        api_key,
        None,
        Some(config.timeout),
        Some(config.model.clone()),
    )
    .unwrap_or_else(|err| fatal(&err));
    if let Some(path) = &config.log_file {
        let logger = FileLogger::open(path).unwrap_or_else(|err| fatal(&err));
        client = client.with_logger(Arc::new(logger));
    }
    renderer.print_info(&format!("API key loaded (ends with {})", client.key_hint()));

    let mut session = ChatSession::new(client, config);

    println!(
        "Gemini Chat (model: {}, mode: {})",
        session.model(),
        session.prompt_mode()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.reset();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model_name) => match model_name.parse::<Model>() {
                            Ok(model) => {
                                session.set_model(model);
                                renderer.print_info(&format!("Model changed to: {}", model_name));
                            }
                            Err(err) => renderer.print_error(&err),
                        },
                        ChatCommand::System(instruction) => {
                            let restored = instruction.is_none();
                            session.set_system_instruction(instruction);
                            if restored {
                                renderer.print_info("System instruction restored to default.");
                            } else {
                                renderer.print_info(&format!(
                                    "System instruction set to: {}",
                                    session.system_instruction().unwrap_or("(none)")
                                ));
                            }
                        }
                        ChatCommand::Mode(mode) => {
                            session.set_prompt_mode(mode);
                            renderer.print_info(&format!("Prompt mode set to {mode}"));
                        }
                        ChatCommand::History(policy) => {
                            session.set_history_policy(policy);
                            renderer.print_info(&format!("History policy set to {policy}"));
                        }
                        ChatCommand::Marker(marker) => {
                            renderer.print_info(&format!("Marker set to: {marker}"));
                            session.set_marker(marker);
                        }
                        ChatCommand::Log => {
                            print_log(&session, &mut renderer);
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API
                println!("Gemini:");
                match session.send(line, &mut renderer).await {
                    Ok(TurnOutcome::Failed { error }) if error.is_configuration() => {
                        fatal(&error);
                    }
                    Ok(TurnOutcome::Failed { error }) if error.is_retryable() => {
                        renderer.print_info("This is usually temporary; try again.");
                    }
                    Ok(_) => {}
                    Err(err) if err.is_configuration() => fatal(&err),
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn fatal(err: &Error) -> ! {
    eprintln!("Error: {err}");
    if err.is_configuration() {
        eprintln!("Set GOOGLE_API_KEY (environment or .env), pass --api-key, or use --ask-key.");
    }
    process::exit(1);
}

fn read_api_key(rl: &mut DefaultEditor) -> Option<String> {
    match rl.readline("Gemini API key: ") {
        Ok(key) if !key.trim().is_empty() => Some(key.trim().to_string()),
        _ => None,
    }
}

fn print_log(session: &ChatSession<Gemini>, renderer: &mut PlainTextRenderer) {
    if session.conversation().is_empty() {
        renderer.print_info("(no messages yet)");
        return;
    }
    for turn in session.conversation() {
        match turn.role() {
            Role::User => println!("You: {}", turn.content()),
            Role::Assistant => {
                println!("Gemini:");
                render_reply(renderer, turn.content(), session.marker());
            }
        }
    }
}

fn print_stats(session: &ChatSession<Gemini>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Turns: {}", stats.turn_count);
    println!("      Prompt mode: {}", stats.prompt_mode);
    println!("      History: {}", stats.history);
    println!(
        "      Replies: {} ok / {} failed",
        stats.completed_turns, stats.failed_turns
    );
}

fn print_config(session: &ChatSession<Gemini>) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Model: {}", stats.model);
    println!("      Prompt mode: {}", stats.prompt_mode);
    println!("      History: {}", stats.history);
    println!("      Marker: {}", stats.marker);
    match stats.max_tokens {
        Some(tokens) => println!("      Max tokens: {tokens}"),
        None => println!("      Max tokens: default"),
    }
    match stats.system_instruction.as_deref() {
        Some(instruction) => println!("      System instruction: {instruction}"),
        None => println!("      System instruction: (none)"),
    }
    println!("      Timeout: {}s", session.client().timeout().as_secs());
}
