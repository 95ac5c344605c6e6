//! atlas - BI analysis chat CLI

mod config;
mod ui;

use std::sync::Arc;

use clap::Parser;

use atlas_session::{
    ChatSession, Conversation, ConversationStore, FileStore, HttpStore,
};
use atlas_stream::AnalysisClient;

/// atlas - chat with your business data
#[derive(Parser, Debug)]
#[command(name = "atlas")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Analysis service base URL
    #[arg(short, long)]
    server: Option<String>,

    /// User id owning the conversation
    #[arg(short, long)]
    user: Option<String>,

    /// Business whose data queries run against
    #[arg(short, long)]
    business: Option<String>,

    /// Resume a conversation by id (default: start a new one)
    #[arg(long)]
    conversation: Option<String>,

    /// Run a single query and exit
    #[arg(short = 'q', long)]
    query: Option<String>,

    /// Persist transcripts to local files instead of the remote service
    #[arg(long)]
    file_store: bool,

    /// List saved conversations and exit
    #[arg(long)]
    conversations: bool,

    /// Delete a conversation by id and exit
    #[arg(long)]
    delete: Option<String>,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("atlas=debug")
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

    // Load config file, CLI args take precedence
    let cfg = config::Config::load();

    let server = args
        .server
        .or(cfg.server.clone())
        .unwrap_or_else(|| "http://127.0.0.1:8000".to_string());

    let Some(user) = args.user.or(cfg.user.clone()) else {
        eprintln!("Error: no user id");
        eprintln!("Pass --user or set `user` in the config file (atlas --init-config)");
        std::process::exit(1);
    };

    let use_file_store = args.file_store || cfg.store.as_deref() == Some("file");
    let store: Arc<dyn ConversationStore> = if use_file_store {
        let dir = cfg
            .data_dir
            .clone()
            .map(Into::into)
            .unwrap_or_else(FileStore::default_dir);
        Arc::new(FileStore::new(dir))
    } else {
        Arc::new(HttpStore::new(&server))
    };

    // List conversations and exit
    if args.conversations {
        let summaries = store.list(&user).await?;
        ui::render_summaries(&summaries);
        return Ok(());
    }

    // Delete a conversation and exit
    if let Some(id) = args.delete {
        store.delete(&id).await?;
        println!("Deleted conversation {}", id);
        return Ok(());
    }

    let Some(business) = args.business.or(cfg.business.clone()) else {
        eprintln!("Error: no business id");
        eprintln!("Pass --business or set `business` in the config file");
        std::process::exit(1);
    };

    let conversation = match args.conversation {
        Some(id) => Conversation::new(id, &user, &business),
        None => Conversation::with_generated_id(&user, &business),
    };

    let transport = Arc::new(AnalysisClient::new(&server));
    let mut session = ChatSession::open(conversation, transport, store).await;

    if !session.messages().is_empty() {
        println!(
            "Resuming conversation {} ({} messages)\n",
            session.conversation().id,
            session.messages().len()
        );
        ui::render_history(session.messages());
    }

    // Non-interactive mode
    if let Some(query) = args.query {
        println!("> {}", query);
        return run_query(&mut session, &query).await;
    }

    run_interactive(&mut session).await
}

/// Drive one query to its terminal message, printing events as they arrive.
/// Ctrl-C cancels the in-flight query instead of killing the process.
async fn run_query(session: &mut ChatSession, query: &str) -> anyhow::Result<()> {
    let mut receiver = session.subscribe();
    // Every ask() outcome ends in a terminal event, so the printer drains
    // everything and then returns on its own.
    let printer = tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            let terminal = event.is_terminal();
            ui::render_event(&event);
            if terminal {
                break;
            }
        }
    });

    let handle = session.handle();
    let canceller = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let result = session.ask(query).await;

    canceller.abort();
    let _ = printer.await;

    if let Err(e) = result {
        tracing::debug!("Query failed: {}", e);
    }
    Ok(())
}

/// Interactive mode (simple stdin/stdout)
async fn run_interactive(session: &mut ChatSession) -> anyhow::Result<()> {
    use std::io::{self, IsTerminal, Write};

    if io::stderr().is_terminal() {
        eprintln!("atlas (conversation: {})", session.conversation().id);
        eprintln!("Type a question, /history to reprint, /quit to exit.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/history" => {
                println!();
                ui::render_history(session.messages());
                continue;
            }
            _ => {}
        }

        run_query(session, input).await?;
        println!();
    }

    Ok(())
}
