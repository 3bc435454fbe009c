use alice::agent::Assistant;
use alice::capabilities::render_catalog;
use anyhow::Result;
use cliclack::spinner;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::render::{print_markdown, print_models, print_outcome, print_status};

const PROMPT: &str = "\x1b[1m\x1b[38;5;30malice> \x1b[0m";

/// A line typed at the prompt
#[derive(Debug, PartialEq)]
pub enum ReplInput {
    Message(String),
    SwitchModel(String),
    Models,
    Tools,
    Status,
    Help,
    Exit,
    Empty,
    Unknown(String),
}

pub fn parse_input(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    if !line.starts_with('/') {
        return ReplInput::Message(line.to_string());
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next().map(str::trim).unwrap_or_default();

    match command.as_str() {
        "/exit" | "/quit" => ReplInput::Exit,
        "/help" | "/?" => ReplInput::Help,
        "/models" => ReplInput::Models,
        "/tools" => ReplInput::Tools,
        "/status" => ReplInput::Status,
        "/model" if !argument.is_empty() => ReplInput::SwitchModel(argument.to_string()),
        _ => ReplInput::Unknown(line.to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("/model <key> - Switch to another model");
    println!("/models - List models and whether their credentials are set");
    println!("/tools - List the capabilities Alice can use");
    println!("/status - Show the current model and catalog size");
    println!("/exit - Exit the session");
    println!("/? | /help - Display this help message");
}

pub async fn run(assistant: &Assistant) -> Result<()> {
    let mut editor = DefaultEditor::new()?;

    println!(
        "Alice, your academic assistant {}",
        style("- type \"/help\" for commands, \"/exit\" to end the session").dim()
    );
    println!();

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        };
        let _ = editor.add_history_entry(line.as_str());

        match parse_input(&line) {
            ReplInput::Empty => continue,
            ReplInput::Exit => break,
            ReplInput::Help => print_help(),
            ReplInput::Models => print_models(&assistant.status().await),
            ReplInput::Status => print_status(&assistant.status().await),
            ReplInput::Tools => {
                let tools = assistant.catalog().discover().await;
                println!("{}", render_catalog(&tools));
            }
            ReplInput::SwitchModel(key) => match assistant.switch_model(&key).await {
                Ok(_) => println!("Switched to {}", style(&key).bold()),
                Err(e) => eprintln!("{}", style(e).red()),
            },
            ReplInput::Unknown(command) => {
                eprintln!("Unknown command: {} (try /help)", command);
            }
            ReplInput::Message(message) => {
                let spin = spinner();
                spin.start("thinking...");
                let outcome = assistant.chat(&message).await;
                spin.stop("");
                if let Err(e) = print_outcome(&outcome) {
                    // Fall back to plain text when the terminal cannot be styled
                    tracing::debug!(error = %e, "markdown rendering failed");
                    println!("{}", outcome.response);
                }
            }
        }
        println!();
    }

    print_markdown("Goodbye! Good luck with your studies.")?;
    Ok(())
}
