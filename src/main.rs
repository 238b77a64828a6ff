use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use docdesk::config::ConfigError;
use docdesk::net::types::{Document, DocumentStats, ProcessingStatus};
use docdesk::notice::Notice;
use docdesk::query::FetchMode;
use docdesk::state::assistant::{self, AssistantPanel, QUICK_ACTIONS, Role, SubmitOutcome};
use docdesk::state::auth::{self, AuthOutcome};
use docdesk::state::documents::{
    Confirm, DeleteOutcome, DocumentLibrary, DocumentListState, SortKey, TypeFacet, UnknownOption,
};
use docdesk::state::sidebar::RecentQueries;
use docdesk::state::upload::{UploadEvent, UploadLimits, UploadQueue, UploadSource};
use docdesk::util::files::{file_type_label, format_file_size};
use docdesk::{ApiClient, ApiError, ClientConfig, QueryStore, TokenStore};
use serde_json::Value;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// A chat prompt idle this long counts as the user coming back.
const CHAT_RESUME_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Rejected(Notice),
    #[error(transparent)]
    InvalidOption(#[from] UnknownOption),
    #[error("no recent query #{0}")]
    NoRecentQuery(usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "docdesk", about = "Document library and retrieval assistant CLI")]
struct Cli {
    /// Overrides `DOCDESK_BASE_URL` from the environment.
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token for this invocation only; not saved.
    #[arg(long, env = "DOCDESK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and save the token.
    Login(CredentialArgs),
    /// Create an account.
    Register(CredentialArgs),
    /// End the session and forget the saved token.
    Logout,
    Docs(DocsCommand),
    /// Upload files one at a time.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask the assistant one question.
    Ask { query: String },
    /// Interactive assistant session.
    Chat,
    /// Show the most recent assistant queries.
    Recent,
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    username: String,

    #[arg(long, env = "DOCDESK_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct DocsCommand {
    #[command(subcommand)]
    command: DocsSubcommand,
}

#[derive(Subcommand, Debug)]
enum DocsSubcommand {
    List {
        #[arg(long = "type", default_value = "all")]
        facet: TypeFacet,
        #[arg(long, default_value = "recent")]
        sort: SortKey,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Stats {
        /// Count from the document list instead of asking the server.
        #[arg(long, default_value_t = false)]
        local: bool,
    },
    Delete {
        id: i64,
        #[arg(long, short, default_value_t = false)]
        yes: bool,
    },
    /// Print processing status changes until interrupted.
    Watch {
        #[arg(long = "type", default_value = "all")]
        facet: TypeFacet,
    },
}

struct CliContext {
    config: ClientConfig,
    client: ApiClient,
    store: QueryStore,
}

impl CliContext {
    fn new(base_url: Option<&str>, token: Option<String>) -> Result<Self, CliError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(raw) = base_url {
            config = config.with_base_url(raw)?;
        }

        let mut tokens = match &config.token_file {
            Some(path) => TokenStore::open(path.clone())?,
            None => TokenStore::in_memory(),
        };
        if let Some(token) = token {
            tokens = tokens.with_token(token);
        }

        let client = ApiClient::new(&config, tokens)?;
        Ok(Self { config, client, store: QueryStore::new() })
    }

    fn library(&self) -> DocumentLibrary {
        DocumentLibrary::new(self.client.clone(), self.store.clone(), self.config.poll_interval)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext::new(cli.base_url.as_deref(), cli.token)?;

    match cli.command {
        Command::Login(args) => run_auth(&ctx, args, false).await,
        Command::Register(args) => run_auth(&ctx, args, true).await,
        Command::Logout => {
            auth::logout(&ctx.client).await?;
            println!("Logged out");
            Ok(())
        }
        Command::Docs(docs) => run_docs(&ctx, docs).await,
        Command::Upload { paths } => run_upload(&ctx, paths).await,
        Command::Ask { query } => run_ask(&ctx, &query).await,
        Command::Chat => run_chat(&ctx).await,
        Command::Recent => run_recent(&ctx).await,
    }
}

async fn run_auth(ctx: &CliContext, args: CredentialArgs, register: bool) -> Result<(), CliError> {
    let credentials = auth::credentials(&args.username, &args.password)
        .map_err(|e| CliError::Rejected(Notice::error("Invalid input", e.to_string())))?;
    let outcome = if register {
        auth::register(&ctx.client, &credentials).await
    } else {
        auth::login(&ctx.client, &credentials).await
    };

    match outcome {
        AuthOutcome::Success { notice, redirect } => {
            println!("{notice}");
            tracing::debug!(redirect, "auth redirect");
            Ok(())
        }
        AuthOutcome::Failure(notice) => Err(CliError::Rejected(notice)),
    }
}

async fn run_docs(ctx: &CliContext, docs: DocsCommand) -> Result<(), CliError> {
    let library = ctx.library();
    match docs.command {
        DocsSubcommand::List { facet, sort, json } => {
            let mut state = DocumentListState::new(facet, sort);
            library.load(&mut state, FetchMode::Cached).await?;
            let visible = state.visible();
            if json {
                print_json(&serde_json::to_value(&visible)?)?;
            } else if visible.is_empty() {
                println!("No documents");
            } else {
                visible.iter().for_each(print_document);
            }
            Ok(())
        }
        DocsSubcommand::Stats { local } => {
            let mut state = DocumentListState::default();
            library.load(&mut state, FetchMode::Cached).await?;
            let stats = if local { DocumentStats::tally(&state.documents) } else { state.stats };
            print_json(&serde_json::to_value(stats)?)
        }
        DocsSubcommand::Delete { id, yes } => {
            let always = |_: &str| true;
            let confirm: &dyn Confirm = if yes { &always } else { &stdin_confirm };
            let mut state = DocumentListState::default();
            match library.delete(&mut state, id, confirm).await {
                DeleteOutcome::Cancelled => println!("Cancelled"),
                DeleteOutcome::Deleted(notice) => println!("{notice}"),
                DeleteOutcome::Failed(notice) => return Err(CliError::Rejected(notice)),
            }
            Ok(())
        }
        DocsSubcommand::Watch { facet } => run_watch(&library, facet).await,
    }
}

async fn run_watch(library: &DocumentLibrary, facet: TypeFacet) -> Result<(), CliError> {
    let mut state = DocumentListState::new(facet, SortKey::Recent);
    library.load(&mut state, FetchMode::Force).await?;
    let mut seen: HashMap<i64, ProcessingStatus> = HashMap::new();
    report_status_changes(&state, &mut seen);

    let Some((_handle, mut events)) = library.watch(facet) else {
        return Err(CliError::Rejected(Notice::error(
            "Polling disabled",
            "Set DOCDESK_POLL_INTERVAL_MS above zero to watch documents",
        )));
    };
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                state.apply_poll(event)?;
                if let Some(error) = &state.error {
                    eprintln!("poll failed: {error}");
                }
                report_status_changes(&state, &mut seen);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn report_status_changes(state: &DocumentListState, seen: &mut HashMap<i64, ProcessingStatus>) {
    for doc in state.visible() {
        let previous = seen.insert(doc.id, doc.processing_status);
        if previous != Some(doc.processing_status) {
            println!("{:>5}  {:<10}  {}", doc.id, doc.processing_status.label(), doc.original_name);
        }
    }
}

async fn run_upload(ctx: &CliContext, paths: Vec<PathBuf>) -> Result<(), CliError> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in &paths {
        sources.push(UploadSource::from_path(path).await?);
    }

    let mut queue = UploadQueue::new(UploadLimits::from(&ctx.config));
    queue.add(sources);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                UploadEvent::Started { name, .. } => println!("uploading {name}"),
                UploadEvent::Progress { .. } => {}
                UploadEvent::Completed { index } => println!("  #{} done", index + 1),
                UploadEvent::Failed { index, message } => println!("  #{} failed: {message}", index + 1),
                UploadEvent::Drained(_) => break,
            }
        }
    });

    let summary = queue.run(&ctx.client, Some(&tx)).await;
    drop(tx);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "upload printer task failed");
    }

    if let Some(notice) = summary.notice() {
        println!("{notice}");
    }
    if summary.completed == 0 {
        return Err(CliError::Rejected(Notice::error("Upload failed", format!("{} file(s) failed", summary.failed))));
    }
    Ok(())
}

async fn run_ask(ctx: &CliContext, query: &str) -> Result<(), CliError> {
    let mut panel = AssistantPanel::new();
    match panel.submit_text(&ctx.client, query).await {
        SubmitOutcome::Answered => {
            print_last_answer(&panel);
            Ok(())
        }
        SubmitOutcome::Failed(notice) => Err(CliError::Rejected(notice)),
        SubmitOutcome::Ignored => Err(CliError::Rejected(Notice::error("Empty query", "Nothing to ask"))),
    }
}

async fn run_chat(ctx: &CliContext) -> Result<(), CliError> {
    let (handle, mut inbox) = assistant::channel();
    let mut recent = RecentQueries::new(handle);
    let mut panel = AssistantPanel::new();

    println!("{}", panel.transcript().messages()[0].content);
    println!("Commands: /recent [N], /quick N, /refresh, /quit");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut last_input = Instant::now();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if last_input.elapsed() >= CHAT_RESUME_AFTER && line != "/refresh" {
            ctx.store.refocus_api(&ctx.client).await;
        }
        last_input = Instant::now();

        let outcomes = if line == "/quit" {
            break;
        } else if line == "/refresh" {
            let refreshed = ctx.store.refocus_api(&ctx.client).await;
            println!("Refreshed {refreshed} quer{}", if refreshed == 1 { "y" } else { "ies" });
            continue;
        } else if let Some(rest) = line.strip_prefix("/recent") {
            recent.load(&ctx.client, &ctx.store, FetchMode::Force).await?;
            match rest.trim().parse::<usize>() {
                Ok(n) => {
                    if n == 0 || !recent.select(n - 1) {
                        eprintln!("{}", CliError::NoRecentQuery(n));
                        continue;
                    }
                    panel.drain(&mut inbox, &ctx.client).await
                }
                Err(_) => {
                    print_recent(recent.items());
                    continue;
                }
            }
        } else if let Some(rest) = line.strip_prefix("/quick") {
            let Some(action) = rest.trim().parse::<usize>().ok().and_then(|n| QUICK_ACTIONS.get(n.wrapping_sub(1)))
            else {
                QUICK_ACTIONS.iter().enumerate().for_each(|(i, action)| println!("{:>2}. {action}", i + 1));
                continue;
            };
            panel.quick_action(action);
            vec![panel.submit_input(&ctx.client).await]
        } else {
            vec![panel.submit_text(&ctx.client, line).await]
        };

        for outcome in outcomes {
            match outcome {
                SubmitOutcome::Answered => print_last_answer(&panel),
                SubmitOutcome::Failed(notice) => eprintln!("{notice}"),
                SubmitOutcome::Ignored => {}
            }
        }
    }
    Ok(())
}

async fn run_recent(ctx: &CliContext) -> Result<(), CliError> {
    let (handle, _inbox) = assistant::channel();
    let mut recent = RecentQueries::new(handle);
    recent.load(&ctx.client, &ctx.store, FetchMode::Cached).await?;
    print_recent(recent.items());
    Ok(())
}

fn print_recent(items: &[String]) {
    if items.is_empty() {
        println!("No recent queries");
    }
    for (i, query) in items.iter().enumerate() {
        println!("{:>2}. {query}", i + 1);
    }
}

fn print_last_answer(panel: &AssistantPanel) {
    let Some(message) = panel.transcript().last().filter(|m| m.role == Role::Assistant) else {
        return;
    };
    println!("{}", message.content);
    for source in &message.sources {
        println!("  [{}] {}", source.document_name, source.relevant_text);
    }
}

fn print_document(doc: &Document) {
    println!(
        "{:>5}  {:<10}  {:>9}  {:<10}  {}",
        doc.id,
        file_type_label(&doc.file_type),
        format_file_size(doc.file_size),
        doc.processing_status.label(),
        doc.original_name
    );
}

fn stdin_confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
