//! scribe - user-story assistant CLI

mod commands;
mod config;
mod refresh;

use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use commands::CommandResult;
use refresh::HttpProjectRefresher;
use scribe_chat::{
    ApiTransport, ChatConfig, Conversation, Error, PreconditionError, SessionEvent, SessionState,
    StreamSession,
};

/// scribe - user-story assistant
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: gpt-4o-mini)
    #[arg(short, long)]
    model: Option<String>,

    /// Project whose user stories the assistant works on
    #[arg(short, long)]
    project: Option<String>,

    /// Chat backend base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scribe=debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // CLI takes precedence over the file
    let base_url = args
        .base_url
        .or(cfg.base_url.clone())
        .unwrap_or_else(|| config::DEFAULT_BASE_URL.to_string());

    let mut chat_config = ChatConfig {
        api_key: cfg.get_api_key(),
        project_id: args.project.or(cfg.project.clone()),
        ..Default::default()
    };
    if let Some(model) = args.model.or(cfg.model.clone()) {
        chat_config.model = model;
    }
    if let Some(prompt) = cfg.system_prompt.clone() {
        chat_config.system_prompt = prompt;
    }

    if chat_config.api_key.is_none() {
        eprintln!("Error: No API key found");
        eprintln!();
        eprintln!(
            "Set {} or add api_key to {}",
            config::API_KEY_ENV,
            config::Config::config_path().display()
        );
        std::process::exit(1);
    }

    let transport = Arc::new(ApiTransport::new(base_url.as_str())?);
    let refresher = Arc::new(HttpProjectRefresher::new(base_url.as_str()));
    let mut conversation = Conversation::new(chat_config, transport, refresher);

    tracing::info!(base_url = %base_url, model = %conversation.config().model, "Starting scribe");

    // Announce reconciled project data for the whole run
    let mut changes = conversation.subscribe_changes();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(_) => println!("\n[project data refreshed]"),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if let Some(command) = args.command {
        println!("scribe> {}", command);
        println!();
        let Some(mut session) = exchange(&conversation, &command).await? else {
            std::process::exit(1);
        };
        // Let the refresh land before exiting
        if let Some(reconciliation) = session.take_reconciliation() {
            reconciliation.await?;
        }
        if *session.state() != SessionState::Finished {
            std::process::exit(1);
        }
        return Ok(());
    }

    run_interactive(&mut conversation).await
}

/// Run one send to completion, printing the answer as it streams.
///
/// Returns `None` when the send was rejected before it started.
async fn exchange(
    conversation: &Conversation,
    text: &str,
) -> anyhow::Result<Option<StreamSession>> {
    let mut events = conversation.subscribe();
    let mut session = conversation.session();

    match session.start(text).await {
        Ok(()) => {}
        Err(Error::Precondition(e)) => {
            eprintln!("{}", precondition_hint(&e));
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let handle = session.handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!(session_id = handle.session_id(), "Interrupted");
            handle.cancel();
        }
    });

    tokio::join!(session.run(), render(&mut events));
    interrupt.abort();

    Ok(Some(session))
}

/// Print session events until the session reaches a terminal state
async fn render(events: &mut broadcast::Receiver<SessionEvent>) {
    let mut printed = 0;
    let mut stdout = std::io::stdout();

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Renderer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let terminal = event.is_terminal();

        match event {
            SessionEvent::Started { .. } => printed = 0,
            SessionEvent::MessageUpdate { content } => {
                // Updates carry the whole message; print only what is new
                if let Some(tail) = content.get(printed..) {
                    print!("{}", tail);
                    let _ = stdout.flush();
                }
                printed = content.len();
            }
            SessionEvent::Finished { .. } => println!(),
            SessionEvent::Errored { error } => {
                if printed > 0 {
                    println!();
                }
                eprintln!("Error: {}", error);
            }
            SessionEvent::Cancelled => println!("\n[cancelled]"),
        }

        if terminal {
            break;
        }
    }
}

fn precondition_hint(error: &PreconditionError) -> String {
    match error {
        PreconditionError::NoProjectSelected => {
            format!("{}. Use /project <id> or --project.", error)
        }
        PreconditionError::MissingApiKey => {
            format!("{}. Set {}.", error, config::API_KEY_ENV)
        }
        _ => error.to_string(),
    }
}

async fn run_interactive(conversation: &mut Conversation) -> anyhow::Result<()> {
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let config = conversation.config();
        match &config.project_id {
            Some(project) => eprintln!("scribe ({}) project: {}", config.model, project),
            None => eprintln!("scribe ({}) no project selected", config.model),
        }
        eprintln!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        // EOF
        let Some(line) = line else { break };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::parse_command(input) {
            match result {
                CommandResult::Exit => break,
                CommandResult::Message(msg) => println!("{}", msg),
                CommandResult::Project(Some(project)) => {
                    println!("Project set to: {}", project);
                    conversation.set_project(Some(project));
                }
                CommandResult::Project(None) => match &conversation.config().project_id {
                    Some(project) => println!("Project: {}", project),
                    None => println!("No project selected."),
                },
                CommandResult::Model(Some(model)) => {
                    println!("Switched to: {}", model);
                    conversation.set_model(model);
                }
                CommandResult::Model(None) => println!("Model: {}", conversation.config().model),
                CommandResult::History => {
                    let history = conversation.history();
                    for message in history.read().messages().iter().skip(1) {
                        println!("[{}] {}", message.role.as_str(), message.content);
                    }
                }
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        exchange(conversation, input).await?;
    }

    Ok(())
}
