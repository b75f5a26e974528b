use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser};
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use cove_client_core::config::Config;
use cove_client_core::logging::{self, LogConfig, LogLevel};
use cove_client_core::protocol::ChannelId;
use cove_client_core::session::{ChatSession, SendTarget, SessionError};
use cove_client_core::transport::Transport;
use cove_client_core::transport::websocket::WebSocketTransport;
use cove_client_core::view::{ActiveChannel, RenderSink};

#[derive(Parser, Debug)]
#[command(name = "cove", about = "Channel chat over a single WebSocket")]
struct Cli {
    #[arg(
        long,
        env = "COVE_SERVER",
        help = "Chat server endpoint (host:port or ws:// url)"
    )]
    server: Option<String>,

    #[arg(long, short = 'n', help = "User name to identify as")]
    name: String,

    #[arg(
        long,
        env = "COVE_PASSWD",
        hide_env_values = true,
        help = "Password for register_name (prompted when omitted)"
    )]
    passwd: Option<String>,

    #[command(flatten)]
    logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "COVE_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "COVE_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    file: Option<PathBuf>,
}

/// Render sink over stdout, timestamping each line the way the message
/// pane does.
struct StdoutSink;

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
}

impl RenderSink for StdoutSink {
    fn render_line(&mut self, text: &str) {
        println!("[{}] {}", timestamp(), text);
    }

    fn clear_log(&mut self) {
        // Replay is a full repaint, so wipe the pane first.
        print!("\x1b[2J\x1b[H");
        let _ = io::stdout().flush();
    }

    fn set_channel_options(&mut self, channels: &[ChannelId], selected: &ActiveChannel) {
        let mut line = String::from("channels:");
        for channel in channels {
            line.push_str(if selected.matches(channel) {
                " *#"
            } else {
                " #"
            });
            line.push_str(channel);
        }
        println!("[{}] {}", timestamp(), line);
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogConfig {
        level: cli.logging.level,
        file: cli.logging.file.clone(),
    })?;

    let config = match cli.server {
        Some(server) => Config { server },
        None => Config::from_env(),
    };
    let url = config.server_url()?;

    let passwd = match cli.passwd {
        Some(passwd) => passwd,
        None => rpassword::prompt_password("password: ")?,
    };

    let transport = WebSocketTransport::connect(url.as_str()).await?;
    let mut session =
        ChatSession::establish(transport, url.as_str(), &cli.name, &passwd, StdoutSink).await?;

    // Feed stdin lines through a channel so the main loop can select over
    // user input and inbound frames.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            pumped = session.pump() => match pumped {
                Ok(true) => {}
                Ok(false) => break, // transport closed, notice already rendered
                Err(err) => return Err(err.into()),
            },
            maybe_line = line_rx.recv() => match maybe_line {
                Some(line) => {
                    if !handle_input(&mut session, line.trim()).await? {
                        break;
                    }
                }
                None => break, // stdin closed
            },
        }
    }

    Ok(())
}

/// One line of user input: a `/command` or chat text for the active
/// channel. Returns `false` when the client should exit.
async fn handle_input<T, S>(session: &mut ChatSession<T, S>, line: &str) -> Result<bool>
where
    T: Transport,
    S: RenderSink,
{
    if line.is_empty() {
        return Ok(true);
    }

    let (command, rest) = match line.split_once(' ') {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" => return Ok(false),
        "/channels" => session.request_channel_list().await?,
        "/join" => {
            if rest.is_empty() {
                println!("usage: /join <channel>");
            } else {
                session.join(rest).await?;
                session.select_channel(ActiveChannel::Channel(rest.to_string()));
            }
        }
        "/leave" => match session.active_channel().clone() {
            ActiveChannel::Channel(id) => session.leave(&id).await?,
            ActiveChannel::Manual => println!("no channel selected"),
        },
        "/switch" => {
            if rest == "manual" {
                session.select_channel(ActiveChannel::Manual);
            } else if rest.is_empty() {
                println!("usage: /switch <channel|manual>");
            } else {
                session.select_channel(ActiveChannel::Channel(rest.to_string()));
            }
        }
        "/send" => match rest.split_once(' ') {
            Some((channel, text)) => {
                send(session, SendTarget::ManualText(channel.to_string()), text.trim()).await?;
            }
            None => println!("usage: /send <channel> <text>"),
        },
        _ if command.starts_with('/') => println!("unknown command {command}"),
        _ => match session.active_channel().clone() {
            ActiveChannel::Channel(id) => send(session, SendTarget::Channel(id), line).await?,
            ActiveChannel::Manual => {
                println!("no channel selected; /switch <channel> or /send <channel> <text>");
            }
        },
    }

    Ok(true)
}

async fn send<T, S>(
    session: &mut ChatSession<T, S>,
    target: SendTarget,
    content: &str,
) -> Result<()>
where
    T: Transport,
    S: RenderSink,
{
    match session.send_message(target, content).await {
        Ok(()) => Ok(()),
        Err(SessionError::EmptyManualChannel) => {
            // Rejected locally, nothing went out; tell the user and move on.
            println!("You need to type a channel you want!");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
