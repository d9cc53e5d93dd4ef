//! `blockcanvas` command-line entry point.

mod script;

use anyhow::{Context, Result, bail};
use blockcanvas_core::storage::{LAST_DOCUMENT_KEY, restore_last};
use blockcanvas_core::{
    AutoSave, CanvasDocument, EditorConfig, EditorSession, FileStorage, MemoryRemote, RemoteStore,
    SaveStatus, ShortcutRegistry, Storage,
};
use clap::{Parser, Subcommand};
use script::{Replayer, Script};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Headless BlockCanvas editor
#[derive(Parser, Debug)]
#[command(name = "blockcanvas")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of locally saved documents
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted editing session and persist the result
    Replay {
        /// Script file (JSON)
        script: PathBuf,

        /// Editor configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Credential for the remote tier
        #[arg(long)]
        credential: Option<String>,
    },

    /// Print a stored document as JSON
    Show {
        /// Document id
        id: String,
    },

    /// List stored document ids
    List,

    /// Print the keyboard shortcuts
    Shortcuts,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            script,
            config,
            credential,
        } => replay(cli.store, &script, config.as_deref(), credential).await,
        Command::Show { id } => {
            let storage = open_storage(cli.store)?;
            let document = storage
                .load(&id)
                .await
                .with_context(|| format!("failed to load document `{id}`"))?;
            println!("{}", document.to_json()?);
            Ok(())
        }
        Command::List => {
            let storage = open_storage(cli.store)?;
            for id in storage.list().await? {
                if id != LAST_DOCUMENT_KEY {
                    println!("{id}");
                }
            }
            Ok(())
        }
        Command::Shortcuts => {
            for shortcut in ShortcutRegistry::all() {
                println!("{:<24} {}", shortcut.format(), shortcut.description);
            }
            Ok(())
        }
    }
}

fn open_storage(path: Option<PathBuf>) -> Result<FileStorage> {
    let storage = match path {
        Some(path) => FileStorage::new(path)?,
        None => FileStorage::default_location()?,
    };
    log::info!("Using document store {}", storage.base_path().display());
    Ok(storage)
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EditorConfig::from_json(&json).with_context(|| format!("invalid config {}", path.display()))
}

async fn replay(
    store: Option<PathBuf>,
    script_path: &Path,
    config: Option<&Path>,
    credential: Option<String>,
) -> Result<()> {
    let config = load_config(config)?;
    let json = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {}", script_path.display()))?;
    let script = Script::from_json(&json)?;

    let storage: Arc<dyn Storage> = Arc::new(open_storage(store)?);
    let remote = Arc::new(MemoryRemote::new());

    let (document, seeded) = match script.document {
        Some(document) => (document, true),
        None => match restore_last(storage.as_ref()).await? {
            Some(document) => {
                log::info!("Restored last document {}", document.id);
                (document, false)
            }
            None => (CanvasDocument::new(), true),
        },
    };

    let mut autosave = config.autosave(document.id.clone());
    autosave.credential = credential;
    let autosave = AutoSave::spawn(autosave, storage, Some(remote.clone() as Arc<dyn RemoteStore>));
    let mut session = EditorSession::new(document, config).with_autosave(autosave);
    if seeded {
        session.save_now();
    }

    let mut replayer = Replayer::new();
    for (index, command) in script.commands.into_iter().enumerate() {
        replayer
            .run(&mut session, command)
            .await
            .with_context(|| format!("command #{} failed", index + 1))?;
    }

    let state = session.flush().await.unwrap_or_default();
    let (document, _) = session.close().await;

    println!("document {} ({})", document.id, document.name);
    for block in document.blocks_ordered() {
        let label = replayer
            .name_of(&block.id)
            .map(|name| format!(" [{name}]"))
            .unwrap_or_default();
        println!(
            "  {}{label} {} at ({}, {}) {}x{} z={}",
            block.id,
            block.kind(),
            block.position.x,
            block.position.y,
            block.size.width,
            block.size.height,
            block.z_index,
        );
    }
    println!("remote writes: {}", remote.writes().len());
    match state.last_saved_label() {
        Some(at) => println!("status: {} (last saved {at})", state.status),
        None => println!("status: {}", state.status),
    }

    if state.status == SaveStatus::Error {
        bail!("save failed: {}", state.error.unwrap_or_default());
    }
    Ok(())
}
