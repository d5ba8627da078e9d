use anyhow::{Context, bail};
use std::env;
use std::sync::Arc;
use stylegpt::{
    ApiClient, AuthContext, ChatMessage, ChatMode, ChatSession, ClientConfig, FileStorage,
    MessageKind, Storage,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOCAL_API_URL: &str = "http://localhost:5000";
const HELP: &str = "Commands: /clear starts a new conversation, /plain <text> waits for the whole reply, /quit exits. Ctrl-C stops a reply, or exits when idle.";

fn load_dotenv() {
    // A missing .env is fine; the process environment still applies.
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("ignoring unreadable .env: {err}");
    }
}

fn init_tracing() {
    // Logs go to stderr so they never interleave with streamed replies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stylegpt=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_mode(arg: Option<&str>) -> anyhow::Result<ChatMode> {
    match arg {
        None | Some("fashion") => Ok(ChatMode::Fashion),
        Some("wardrobe") => Ok(ChatMode::Wardrobe),
        Some(other) => bail!("unknown mode '{other}', expected 'fashion' or 'wardrobe'"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let mode = parse_mode(env::args().nth(1).as_deref())?;
    let mut config = ClientConfig::from_env();
    if config.api_url.is_empty() {
        // No page origin to fall back on outside a browser.
        config = config.with_api_url(LOCAL_API_URL);
    }
    let store: Arc<dyn Storage> = Arc::new(FileStorage::new(config.storage_dir.clone()));
    let api = ApiClient::new(config, store);

    let mut auth = AuthContext::new(api.clone());
    auth.hydrate().await;
    if !auth.is_authenticated()
        && let (Ok(email), Ok(password)) = (env::var("STYLEGPT_EMAIL"), env::var("STYLEGPT_PASSWORD"))
    {
        let outcome = auth.login(&email, &password).await;
        if let Some(error) = outcome.error {
            warn!(%error, "login failed");
        }
    }
    if mode == ChatMode::Wardrobe && !auth.is_authenticated() {
        bail!("wardrobe chat needs a signed-in user; set STYLEGPT_EMAIL and STYLEGPT_PASSWORD");
    }

    let user_id = auth
        .user()
        .map(|user| user.id.clone())
        .unwrap_or_else(|| "guest".to_string());
    let session = Arc::new(ChatSession::open(&api, mode, &user_id));
    info!(?mode, session_id = %session.session_id(), "chat ready");

    {
        let session = session.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interrupt(&session) == Interrupt::Exit {
                    session.close();
                    std::process::exit(130);
                }
            }
        });
    }

    run_repl(&session).await?;
    session.close();
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    StopReply,
    Exit,
}

/// Ctrl-C stops a streaming reply; at an idle prompt it quits.
fn interrupt(session: &ChatSession) -> Interrupt {
    if session.is_loading() {
        session.cancel_reply();
        Interrupt::StopReply
    } else {
        Interrupt::Exit
    }
}

async fn run_repl(session: &ChatSession) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    for message in session.messages() {
        print_message(&mut stdout, &message).await?;
    }
    stdout.write_all(format!("{HELP}\n").as_bytes()).await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                session.clear();
                stdout.write_all(b"(conversation cleared)\n").await?;
            }
            _ => {
                if let Some(text) = line.strip_prefix("/plain ") {
                    session.send(text, None).await?;
                    if let Some(reply) = session.messages().last() {
                        print_message(&mut stdout, reply).await?;
                    }
                } else {
                    stream_reply(session, line, &mut stdout).await?;
                }
            }
        }
    }
    Ok(())
}

/// Send `text` and echo the reply to stdout as it grows.
async fn stream_reply(session: &ChatSession, text: &str, stdout: &mut Stdout) -> anyhow::Result<()> {
    let mut updates = session.subscribe();
    let send = session.send_streaming(text, None);
    tokio::pin!(send);

    let mut printed = String::new();
    loop {
        tokio::select! {
            result = &mut send => {
                result?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = updates.borrow_and_update().last().cloned();
                if let Some(message) = latest {
                    print_progress(stdout, &mut printed, &message).await?;
                }
            }
        }
    }

    if let Some(message) = session.messages().last() {
        print_progress(stdout, &mut printed, message).await?;
        stdout.write_all(b"\n").await?;
        print_extras(stdout, message).await?;
    }
    stdout.flush().await?;
    Ok(())
}

async fn print_progress(
    stdout: &mut Stdout,
    printed: &mut String,
    message: &ChatMessage,
) -> anyhow::Result<()> {
    if message.kind != MessageKind::Ai {
        return Ok(());
    }
    if let Some(rest) = message.content.strip_prefix(printed.as_str()) {
        stdout.write_all(rest.as_bytes()).await?;
    } else {
        // Content was replaced (error fallback or trailing cleanup).
        stdout
            .write_all(format!("\n{}", message.content).as_bytes())
            .await?;
    }
    stdout.flush().await?;
    printed.clone_from(&message.content);
    Ok(())
}

async fn print_message(stdout: &mut Stdout, message: &ChatMessage) -> anyhow::Result<()> {
    let who = match message.kind {
        MessageKind::User => "you",
        MessageKind::Ai => "stylist",
    };
    stdout
        .write_all(format!("{who}: {}\n", message.content).as_bytes())
        .await?;
    print_extras(stdout, message).await
}

async fn print_extras(stdout: &mut Stdout, message: &ChatMessage) -> anyhow::Result<()> {
    if let Some(items) = message.selected_items.as_ref().filter(|items| !items.is_empty()) {
        let names: Vec<String> = items
            .iter()
            .map(|item| format!("{} ({})", item.category, item.style))
            .collect();
        stdout
            .write_all(format!("  items: {}\n", names.join(", ")).as_bytes())
            .await?;
    }
    if let Some(url) = &message.avatar_preview_url {
        stdout
            .write_all(format!("  preview: {url}\n").as_bytes())
            .await?;
    }
    Ok(())
}
