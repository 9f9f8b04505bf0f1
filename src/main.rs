use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fitchat::client::{ClientError, HttpChatClient};
use fitchat::config::{ChatConfig, ConfigError, TransportMode};
use fitchat::conversation::{Conversation, ConversationError, MessageId, QuickAction, Rating};
use fitchat::session::{ChatSession, ChatUpdate};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error("reading input failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("no bot reply yet")]
    NoReply,
}

#[derive(Parser, Debug)]
#[command(name = "fitchat", about = "Fitness assistant chat client")]
struct Cli {
    /// Chat backend root URL.
    #[arg(long, env = "FITCHAT_BASE_URL")]
    base_url: Option<String>,

    /// `stream` or `json`.
    #[arg(long, env = "FITCHAT_TRANSPORT")]
    transport: Option<TransportMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message and print the streamed reply.
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Interactive conversation.
    Chat,
}

type Session = ChatSession<HttpChatClient>;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ChatConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    tracing::info!(base_url = %config.base_url, transport = ?config.transport, "fitchat starting");

    let client = Arc::new(HttpChatClient::new(&config)?);
    match cli.command {
        Command::Ask { message } => {
            let mut session = ChatSession::new(client, Conversation::new());
            send_and_print(&mut session, &message.join(" ")).await?;
            Ok(())
        }
        Command::Chat => run_chat(ChatSession::new(client, Conversation::with_greeting())).await,
    }
}

enum Input {
    Empty,
    Quit,
    Prompt(String),
    Quick(QuickAction),
    Regenerate,
    Rate(Rating),
    Save,
    ListSaved,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return if line.is_empty() { Input::Empty } else { Input::Prompt(line.to_owned()) };
    };
    match command {
        "quit" | "exit" => Input::Quit,
        "regen" => Input::Regenerate,
        "up" => Input::Rate(Rating::Up),
        "down" => Input::Rate(Rating::Down),
        "save" => Input::Save,
        "saved" => Input::ListSaved,
        other => other.parse().map_or_else(|_| Input::Unknown(other.to_owned()), Input::Quick),
    }
}

async fn run_chat(mut session: Session) -> Result<(), CliError> {
    for message in session.conversation().messages() {
        println!("bot: {}", message.content);
    }
    println!("commands: /workout /meal /equipment /regen /up /down /save /saved /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let result = match parse_input(&line) {
            Input::Empty => Ok(()),
            Input::Quit => break,
            Input::Prompt(text) => send_and_print(&mut session, &text).await,
            Input::Quick(action) => send_and_print(&mut session, action.prompt()).await,
            Input::Regenerate => regenerate_and_print(&mut session).await,
            Input::Rate(direction) => rate_last(&mut session, direction),
            Input::Save => save_last(&mut session),
            Input::ListSaved => {
                for item in session.conversation().saved() {
                    println!("- {}", item.content);
                }
                Ok(())
            }
            Input::Unknown(command) => {
                eprintln!("unknown command: /{command}");
                Ok(())
            }
        };
        if let Err(e) = result {
            eprintln!("{e}");
        }
    }
    Ok(())
}

async fn send_and_print(session: &mut Session, text: &str) -> Result<(), CliError> {
    let mut printed = 0;
    print!("bot: ");
    session.send(text, |update| print_update(&mut printed, &update)).await?;
    Ok(())
}

async fn regenerate_and_print(session: &mut Session) -> Result<(), CliError> {
    let id = last_reply_id(session)?;
    let mut printed = 0;
    print!("bot: ");
    session.regenerate(id, |update| print_update(&mut printed, &update)).await?;
    Ok(())
}

fn rate_last(session: &mut Session, direction: Rating) -> Result<(), CliError> {
    let id = last_reply_id(session)?;
    let rating = session.conversation_mut().rate(id, direction)?;
    let label = match rating {
        Some(Rating::Up) => "up",
        Some(Rating::Down) => "down",
        None => "none",
    };
    println!("rating: {label}");
    Ok(())
}

fn save_last(session: &mut Session) -> Result<(), CliError> {
    let id = last_reply_id(session)?;
    session.conversation_mut().save(id)?;
    println!("saved ({} total)", session.conversation().saved().len());
    Ok(())
}

fn last_reply_id(session: &Session) -> Result<MessageId, CliError> {
    session.conversation().last_bot_message().map(|m| m.id).ok_or(CliError::NoReply)
}

/// Print the unseen tail of the reply; list video links once the reply ends.
fn print_update(printed: &mut usize, update: &ChatUpdate<'_>) {
    if let Some(reply) = update.conversation.message(update.ticket.message_id) {
        let fresh = reply.content.get(*printed..).unwrap_or(&reply.content);
        print!("{fresh}");
        *printed = reply.content.len();
    }
    if update.done {
        println!();
        for link in update.conversation.video_links() {
            println!("  [{}] {} | full: {} | short: {}", link.difficulty, link.exercise, link.video_url, link.short_url);
        }
    }
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
