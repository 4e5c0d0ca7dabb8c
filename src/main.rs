use std::io;
use std::process::ExitCode;

use chatbot_cli::cli::chat::{ChatContext, DEFAULT_TITLE};
use chatbot_cli::cli::{check_health, ClientArgs};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input to send to the chat
    #[arg(short, long)]
    input: Option<String>,

    /// Name shown for the assistant
    #[arg(long, default_value = DEFAULT_TITLE)]
    title: String,

    #[command(flatten)]
    client: ClientArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Input to send to the chat
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Check that the chat service is up
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let input = match cli.command {
        Some(Commands::Health) => {
            let backend = cli.client.backend()?;
            let healthy = check_health(&mut io::stdout(), &backend).await?;
            return Ok(if healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Some(Commands::Chat { input }) => input.or(cli.input),
        // Default to chat if no subcommand is provided
        None => cli.input,
    };

    let client = cli.client.build_client()?;
    let settings = client.settings();
    info!(
        model = %settings.model,
        temperature = settings.temperature,
        max_tokens = settings.max_tokens,
        "Using chat service at {}",
        client.backend().chat_url()
    );

    let interactive = input.is_none();
    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        input,
        interactive,
        cli.title,
        client,
    );
    chat_context.run().await
}
