use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use lsp_assist::completion::CompletionProcessor;
use lsp_assist::config::{self, AssistConfig};
use lsp_assist::document::{Document, TextDocument};
use lsp_assist::folding::{FoldingReconciler, ProjectionModel, ReconcileTrigger};
use lsp_assist::logging;
use lsp_assist::server::StaticPeers;
use tower_lsp::lsp_types::Url;
use tracing::info;

#[derive(Parser)]
#[command(name = "lsp-assist")]
#[command(
    version,
    about = "Run recorded language server responses through the completion and folding engine"
)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the completion proposals at an offset
    Complete {
        #[arg(long)]
        file: PathBuf,
        /// Character offset of the invocation
        #[arg(long)]
        offset: usize,
        /// JSON file listing the recorded servers
        #[arg(long)]
        servers: PathBuf,
        /// Apply the proposal with this index and print the resulting document
        #[arg(long)]
        apply: Option<usize>,
    },
    /// Print the folding ranges of a file
    Fold {
        #[arg(long)]
        file: PathBuf,
        /// JSON file listing the recorded servers
        #[arg(long)]
        servers: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AssistConfig::load(path)?,
        None => AssistConfig::default(),
    };
    let _guard = logging::init(&config::log_path(), cli.log_json)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}

async fn run(command: Command, config: AssistConfig) -> anyhow::Result<()> {
    match command {
        Command::Complete {
            file,
            offset,
            servers,
            apply,
        } => complete(&file, offset, &servers, apply, config).await,
        Command::Fold { file, servers } => fold(&file, &servers, config).await,
    }
}

async fn complete(
    file: &Path,
    offset: usize,
    servers: &Path,
    apply: Option<usize>,
    config: AssistConfig,
) -> anyhow::Result<()> {
    let document = load_document(file)?;
    let processor = CompletionProcessor::new(load_peers(servers)?, config.completion);

    let proposals = processor
        .compute_completion_proposals(&document, offset)
        .await;
    for (index, proposal) in proposals.iter().enumerate() {
        println!("{}\t{}", index, proposal.display_string());
    }

    let Some(index) = apply else {
        return Ok(());
    };
    let proposal = proposals
        .get(index)
        .with_context(|| format!("No proposal with index {}", index))?;
    let Some(cursor) = proposal.apply(&document)? else {
        bail!("Proposal {} cannot be applied", index);
    };
    info!("Applied proposal {}, cursor at {}", index, cursor);

    println!();
    print!("{}", document.text());
    Ok(())
}

async fn fold(file: &Path, servers: &Path, config: AssistConfig) -> anyhow::Result<()> {
    let document = Arc::new(load_document(file)?);
    let model = Arc::new(ProjectionModel::new());
    let reconciler = FoldingReconciler::new(load_peers(servers)?, &config.folding);

    reconciler.set_document(Some(document.clone()));
    reconciler.install(model.clone());
    reconciler.reconcile(ReconcileTrigger::Initial);
    reconciler.settle().await;

    for (_, span, annotation) in model.folding_spans() {
        let (start, end) = span.lines(&*document)?;
        let state = if annotation.is_collapsed() {
            "collapsed"
        } else {
            "expanded"
        };
        println!("{}..{}\t{}", start, end, state);
    }
    Ok(())
}

fn load_document(path: &Path) -> anyhow::Result<TextDocument> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {:?}", path))?;
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let uri = Url::from_file_path(&path).map_err(|_| anyhow!("Invalid file path {:?}", path))?;
    Ok(TextDocument::with_uri(uri, &text))
}

fn load_peers(path: &Path) -> anyhow::Result<Arc<StaticPeers>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(Arc::new(StaticPeers::from_json(&json)?))
}
