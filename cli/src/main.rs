use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use client::{ApiClient, ClientError, ImageAttachment, Pipeline, Transport};
use protocol::{Content, ContentPart, Role};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing session token; pass --session-token or set CHAT_SESSION_TOKEN")]
    MissingSessionToken,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not read image file {path}: {source}")]
    ImageRead { path: PathBuf, source: io::Error },
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
}

#[derive(Parser, Debug)]
#[command(name = "chat-cli", about = "Conversation API and streaming chat CLI")]
struct Cli {
    #[arg(long, env = "CHAT_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "CHAT_SESSION_TOKEN")]
    session_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Mint a development session and print its token.
    Login {
        #[arg(long, default_value = "dev")]
        name: String,
    },
    /// Show the identity behind the current session token.
    Me,
    /// Invalidate the current session token.
    Logout,
    /// List conversations, most recent first.
    List,
    /// Print a conversation's transcript.
    Show { conversation_id: Uuid },
    /// Send a message and stream the reply to stdout.
    Send {
        text: String,
        /// Continue an existing conversation instead of starting a new one.
        #[arg(long)]
        conversation: Option<Uuid>,
        /// Keep the conversation local: nothing is stored server-side.
        #[arg(long, default_value_t = false)]
        temporary: bool,
        /// Attach an image file to the message.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Rename {
        conversation_id: Uuid,
        title: String,
    },
    Delete {
        conversation_id: Uuid,
    },
    /// Resolve a stored asset path to a time-limited URL.
    Sign { path: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let api = api(&cli);

    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Login { name } => run_login(&cli.base_url, &name).await,
        Command::Me => run_me(&api?).await,
        Command::Logout => run_logout(&api?).await,
        Command::List => run_list(&api?).await,
        Command::Show { conversation_id } => run_show(&api?, conversation_id).await,
        Command::Send { text, conversation, temporary, image } => {
            run_send(api?, &text, conversation, temporary, image).await
        }
        Command::Rename { conversation_id, title } => {
            run_rename(api?, conversation_id, &title).await
        }
        Command::Delete { conversation_id } => run_delete(api?, conversation_id).await,
        Command::Sign { path } => run_sign(&api?, &path).await,
    }
}

fn api(cli: &Cli) -> Result<ApiClient, CliError> {
    let token = cli.session_token.as_deref().ok_or(CliError::MissingSessionToken)?;
    Ok(ApiClient::new(&cli.base_url, token)?)
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_login(base_url: &str, name: &str) -> Result<(), CliError> {
    let (client, user_id) = ApiClient::dev_session(base_url, name).await?;
    let identity = client.me().await?;
    println!("user_id: {user_id}");
    println!("name: {}", identity.name);
    println!("token: {}", client.token());
    Ok(())
}

async fn run_me(api: &ApiClient) -> Result<(), CliError> {
    let identity = api.me().await?;
    println!("{} ({})", identity.name, identity.id);
    Ok(())
}

async fn run_logout(api: &ApiClient) -> Result<(), CliError> {
    api.logout().await?;
    println!("logged out");
    Ok(())
}

async fn run_list(api: &ApiClient) -> Result<(), CliError> {
    for conv in api.list().await? {
        println!("{}  {}  {}", conv.id, conv.updated_at, conv.title);
    }
    Ok(())
}

async fn run_show(api: &ApiClient, conversation_id: Uuid) -> Result<(), CliError> {
    let detail = api.detail(conversation_id).await?;
    println!("# {} ({})", detail.title, detail.id);
    for turn in &detail.turns {
        let speaker = match turn.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        let tool_note = if turn.tool_used { " [tool]" } else { "" };
        println!("\n[{speaker}]{tool_note}");
        print_content(&turn.content);
    }
    if !detail.voice_sessions.is_empty() {
        println!("\n{} voice session(s) attached", detail.voice_sessions.len());
    }
    Ok(())
}

async fn run_send(
    api: ApiClient,
    text: &str,
    conversation: Option<Uuid>,
    temporary: bool,
    image: Option<PathBuf>,
) -> Result<(), CliError> {
    let attachment = match image {
        Some(path) => Some(read_attachment(path)?),
        None => None,
    };

    let mut pipeline = Pipeline::new(api);
    match conversation {
        Some(id) => {
            pipeline.refresh().await;
            pipeline.load(id).await?;
        }
        None => {
            pipeline.create(temporary);
        }
    }

    let mut stdout = io::stdout();
    let final_id = pipeline
        .send_with(text, attachment, |fragment| {
            print!("{fragment}");
            let _ = stdout.flush();
        })
        .await?;
    println!();

    if !temporary {
        if let Some(conv) = pipeline.cache().get(final_id) {
            eprintln!("[{}] {}", conv.id, conv.title);
        }
    }
    Ok(())
}

async fn run_rename(api: ApiClient, conversation_id: Uuid, title: &str) -> Result<(), CliError> {
    let mut pipeline = Pipeline::new(api);
    pipeline.refresh().await;
    pipeline.rename(conversation_id, title).await?;
    println!("renamed");
    Ok(())
}

async fn run_delete(api: ApiClient, conversation_id: Uuid) -> Result<(), CliError> {
    let mut pipeline = Pipeline::new(api);
    pipeline.refresh().await;
    pipeline.remove(conversation_id).await?;
    println!("deleted");
    Ok(())
}

async fn run_sign(api: &ApiClient, path: &str) -> Result<(), CliError> {
    let signed = api.sign(path).await?;
    println!("{}", signed.url);
    println!("expires: {}", signed.expires_at);
    Ok(())
}

fn read_attachment(path: PathBuf) -> Result<ImageAttachment, CliError> {
    let bytes =
        std::fs::read(&path).map_err(|source| CliError::ImageRead { path: path.clone(), source })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());
    Ok(ImageAttachment { filename, bytes })
}

fn print_content(content: &Content) {
    match content {
        Content::Text(text) => println!("{text}"),
        Content::Parts(parts) => {
            for part in parts {
                match part {
                    ContentPart::Text { text } => println!("{text}"),
                    ContentPart::ImageUrl { image_url } => println!("(image: {})", image_url.url),
                    ContentPart::Unknown => {}
                }
            }
        }
    }
}
