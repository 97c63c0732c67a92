use std::future::Future;
use std::path::{Path, PathBuf};

use canvas::{CanvasBackend, DocStore, Primitive};
use clap::{Parser, Subcommand};
use flowsketch::client::{Credentials, DiagramClient};
use flowsketch::config::{ClientConfig, ConfigError};
use flowsketch::error::{ErrorCode, error_json};
use flowsketch::scene::{SceneError, StoredDiagram, TAG_NODE_ID, latest_root, stored_diagram};
use flowsketch::session::{CancelToken, DiagramSession, SessionError, SessionManager, SessionOptions, SessionOutcome, SessionState};
use flowsketch::stream::source::DEFAULT_REPLAY_CHUNK;
use flowsketch::stream::{ChunkSource, EventStream, ReplaySource, TransportError};
use flowsketch::{AnchorPolicy, LayoutConfig, Orientation};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("canvas file {path}: {source}")]
    CanvasIo { path: String, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("modify needs a saved canvas; pass --canvas <file>")]
    MissingCanvas,
    #[error("no diagram found on the canvas")]
    NoDiagram,
    #[error("session failed: {0}")]
    SessionFailed(String),
}

impl ErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Transport(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
            Self::Scene(e) => e.error_code(),
            Self::CanvasIo { .. } => "E_CANVAS_IO",
            Self::InvalidJson(_) => "E_INVALID_JSON",
            Self::MissingCanvas => "E_MISSING_CANVAS",
            Self::NoDiagram => "E_NO_DIAGRAM",
            Self::SessionFailed(_) => "E_SESSION_FAILED",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "flowsketch", about = "Stream a natural-language description into a diagram")]
struct Cli {
    /// Layout direction: TB, TD, BT, LR or RL (default from FLOWSKETCH_ORIENTATION).
    #[arg(long, global = true)]
    orientation: Option<Orientation>,

    /// Honour side hints the model attaches to links.
    #[arg(long, global = true, default_value_t = false)]
    suggested_anchors: bool,

    /// Canvas document (JSON) to load before drawing.
    #[arg(long, global = true)]
    canvas: Option<PathBuf>,

    /// Where to write the canvas document afterwards.
    #[arg(long, global = true)]
    save: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the endpoint for a new diagram.
    Generate { description: Vec<String> },
    /// Ask the endpoint to rework a diagram already on the canvas.
    Modify {
        instructions: Vec<String>,
        /// Logical id of the node to modify from; defaults to the latest root.
        #[arg(long)]
        node: Option<String>,
    },
    /// Replay a captured response body from disk.
    Replay {
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_REPLAY_CHUNK)]
        chunk_size: usize,
    },
    /// Draw the built-in sample without contacting the endpoint.
    Stub {
        #[arg(long, default_value_t = DEFAULT_REPLAY_CHUNK)]
        chunk_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    if let Err(e) = dotenvy::dotenv() {
        debug!(error = %e, "no .env file loaded");
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => Ok(()),
        Err(err) => {
            print_json(&serde_json::json!({ "error": error_json(&err) }))?;
            Err(err)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let options = SessionOptions {
        orientation: cli.orientation.unwrap_or(config.orientation),
        anchor_policy: if cli.suggested_anchors { AnchorPolicy::Suggested } else { AnchorPolicy::Computed },
        layout: LayoutConfig::default(),
    };
    let canvas = Mutex::new(load_canvas(cli.canvas.as_deref()).await?);
    let mut manager = SessionManager::new(options);

    let outcome = match cli.command {
        Command::Generate { description } => {
            let session = manager.begin();
            let payload = session.request(&description.join(" "), &credentials(&config))?;
            let client = DiagramClient::new(&config)?;
            drive(session, &canvas, move |cancel| async move { client.open(&payload, &cancel).await }).await
        }
        Command::Modify { instructions, node } => {
            if cli.canvas.is_none() {
                return Err(CliError::MissingCanvas);
            }
            let target = modify_target(&*canvas.lock().await, node.as_deref())?;
            info!(diagram_id = %target.diagram_id, node = ?target.node_id, "modifying diagram");
            let session = manager.begin_modify(target);
            let payload = session.request(&instructions.join(" "), &credentials(&config))?;
            let client = DiagramClient::new(&config)?;
            drive(session, &canvas, move |cancel| async move { client.open(&payload, &cancel).await }).await
        }
        Command::Replay { file, chunk_size } => {
            let source = ReplaySource::from_file(&file, chunk_size).await?;
            drive(manager.begin(), &canvas, |_| std::future::ready(source)).await
        }
        Command::Stub { chunk_size } => {
            let source = ReplaySource::stub(chunk_size)?;
            drive(manager.begin(), &canvas, |_| std::future::ready(source)).await
        }
    };
    manager.finish(&outcome.id);

    if let Some(path) = cli.save.as_deref() {
        save_canvas(path, &*canvas.lock().await).await?;
    }
    print_json(&serde_json::to_value(&outcome)?)?;

    match (outcome.state, outcome.error) {
        (SessionState::Failed, Some(message)) => Err(CliError::SessionFailed(message)),
        _ => Ok(()),
    }
}

fn credentials(config: &ClientConfig) -> Credentials {
    Credentials { license_key: config.license_key.clone(), model: config.model }
}

/// Open the source and run one session to its end; Ctrl-C cancels either step.
async fn drive<S, F, Fut>(mut session: DiagramSession, canvas: &Mutex<DocStore>, open: F) -> SessionOutcome
where
    S: ChunkSource,
    F: FnOnce(CancelToken) -> Fut,
    Fut: Future<Output = S>,
{
    let token = session.cancel_token();
    let interrupt = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                token.cancel();
            }
        }
    });
    let mut events = EventStream::new(open(token).await);
    let outcome = session.run(&mut events, canvas).await;
    interrupt.abort();
    outcome
}

fn modify_target(store: &DocStore, node: Option<&str>) -> Result<StoredDiagram, CliError> {
    let handle = match node {
        Some(id) => store.find_by_tag(TAG_NODE_ID, id).pop(),
        None => latest_root(store),
    }
    .ok_or(CliError::NoDiagram)?;
    stored_diagram(store, handle)?.ok_or(CliError::NoDiagram)
}

// =============================================================================
// CANVAS FILES
// =============================================================================

async fn load_canvas(path: Option<&Path>) -> Result<DocStore, CliError> {
    let mut store = DocStore::new();
    let Some(path) = path else {
        return Ok(store);
    };
    let exists = tokio::fs::try_exists(path).await.map_err(|e| canvas_io(path, e))?;
    if exists {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| canvas_io(path, e))?;
        let primitives: Vec<Primitive> = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), primitives = primitives.len(), "loaded canvas");
        store.load_snapshot(primitives);
    }
    Ok(store)
}

async fn save_canvas(path: &Path, store: &DocStore) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(&store.snapshot())?;
    tokio::fs::write(path, rendered).await.map_err(|e| canvas_io(path, e))?;
    debug!(path = %path.display(), primitives = store.len(), "saved canvas");
    Ok(())
}

fn canvas_io(path: &Path, source: std::io::Error) -> CliError {
    CliError::CanvasIo { path: path.display().to_string(), source }
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
