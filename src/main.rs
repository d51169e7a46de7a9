use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ccli::cluster::{ClusterClient, ClusterFlavor, DirectorySecretSource};
use ccli::codec::CredentialResource;
use ccli::config::{default_config_path, ResolvedConfig};
use ccli::format::{render_credential, render_report, render_teams};
use ccli::models::{resolve_folder, Id};
use ccli::remote::CryptopusClient;
use ccli::session::{SessionData, SessionStore, SessionUpdate};
use ccli::sync::{SyncAction, SyncEngine, SyncReport};

/// Exit status for every handled failure (EX_USAGE).
const EXIT_FAILURE: u8 = 64;

#[derive(Parser)]
#[command(name = "cry")]
#[command(about = "Sync OpenShift and Kubernetes secrets with Cryptopus")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with an API user token, given as <token>@<url>
    Login { credentials: String },

    /// Forget the stored session
    Logout,

    /// Select a folder by id
    Folder { id: String },

    /// Select a folder by <team>/<folder>
    Use { selector: String },

    /// List teams and their folders
    Teams,

    /// Show an encryptable
    Encryptable {
        id: String,
        /// Print only this field (username, password, token, ...)
        #[arg(long)]
        field: Option<String>,
    },

    /// Show an account (older servers)
    Account {
        id: String,
        /// Print only this field (username, password, ...)
        #[arg(long)]
        field: Option<String>,
    },

    /// Copy an OpenShift secret (or all of them) into the selected folder
    #[command(name = "ose-secret-pull")]
    OseSecretPull { name: Option<String> },

    /// Write a record (or every record of the selected folder) to OpenShift
    #[command(name = "ose-secret-push")]
    OseSecretPush { name: Option<String> },

    /// Copy a Kubernetes secret (or all of them) into the selected folder
    #[command(name = "k8s-secret-pull")]
    K8sSecretPull { name: Option<String> },

    /// Write a record (or every record of the selected folder) to Kubernetes
    #[command(name = "k8s-secret-push")]
    K8sSecretPush { name: Option<String> },

    /// List OpenShift secret names
    #[command(name = "ose-secrets")]
    OseSecrets,

    /// List Kubernetes secret names
    #[command(name = "k8s-secrets")]
    K8sSecrets,

    /// Copy every secret of a local ose-secrets directory into the selected folder
    #[command(name = "dir-secret-pull")]
    DirSecretPull { path: PathBuf },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("CCLI_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILURE),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Returns `false` when a batch finished with failed items.
async fn run(cli: Cli) -> Result<bool> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    let store = SessionStore::new(&config.session_file);

    match cli.command {
        Command::Login { credentials } => {
            let Some((token, url)) = credentials.split_once('@') else {
                bail!("expected <token>@<url>");
            };
            let update = SessionUpdate::from_encoded_token(token, url)?;

            let mut session = SessionData::default();
            session.merge(update.clone());
            let client = CryptopusClient::from_session(&session, config.credential_resource)?;
            let fresh_token = client.renew_auth_token().await?;

            let session = store.save(update.with_token(fresh_token))?;
            println!(
                "Successfully logged in as {} to {}",
                session.username.unwrap_or_default(),
                client.root_url()
            );
        }
        Command::Logout => {
            store.clear()?;
            println!("Successfully logged out");
        }
        Command::Folder { id } => {
            store.require()?;
            store.save(SessionUpdate::new().with_folder(Id::new(id.trim())))?;
            println!("Selected folder {}", id.trim());
        }
        Command::Use { selector } => {
            let client = remote(&store, config.credential_resource)?;
            let teams = client.list_teams().await?;
            let folder = resolve_folder(&teams, &selector)?;
            store.save(SessionUpdate::new().with_folder(folder.id.clone()))?;
            println!("Selected folder {} ({})", folder.name, folder.id);
        }
        Command::Teams => {
            let client = remote(&store, config.credential_resource)?;
            let teams = client.list_teams().await?;
            if teams.is_empty() {
                println!("No teams found");
            } else {
                println!("{}", render_teams(&teams));
            }
        }
        Command::Encryptable { id, field } => {
            show_credential(&store, CredentialResource::Encryptables, &id, field).await?;
        }
        Command::Account { id, field } => {
            show_credential(&store, CredentialResource::Accounts, &id, field).await?;
        }
        Command::OseSecretPull { name } => {
            return pull(&store, &config, ClusterFlavor::OpenShift, name).await;
        }
        Command::K8sSecretPull { name } => {
            return pull(&store, &config, ClusterFlavor::Kubernetes, name).await;
        }
        Command::OseSecretPush { name } => {
            return push(&store, &config, ClusterFlavor::OpenShift, name).await;
        }
        Command::K8sSecretPush { name } => {
            return push(&store, &config, ClusterFlavor::Kubernetes, name).await;
        }
        Command::OseSecrets => list_secrets(&config, ClusterFlavor::OpenShift)?,
        Command::K8sSecrets => list_secrets(&config, ClusterFlavor::Kubernetes)?,
        Command::DirSecretPull { path } => {
            let engine = engine(&store, &config)?;
            let report = engine.pull_all(&DirectorySecretSource::new(path)).await?;
            return Ok(print_report(&report));
        }
    }

    Ok(true)
}

fn remote(store: &SessionStore, resource: CredentialResource) -> Result<CryptopusClient> {
    let session = store.require()?;
    Ok(CryptopusClient::from_session(&session, resource)?)
}

fn engine(store: &SessionStore, config: &ResolvedConfig) -> Result<SyncEngine> {
    let client = remote(store, config.credential_resource)?;
    Ok(SyncEngine::new(client).with_sync_label(config.sync_label.clone()))
}

fn cluster(config: &ResolvedConfig, flavor: ClusterFlavor) -> ClusterClient {
    ClusterClient::new(flavor)
        .with_sync_label(config.sync_label.clone())
        .with_tmp_dir(config.tmp_dir.clone())
}

async fn show_credential(
    store: &SessionStore,
    resource: CredentialResource,
    id: &str,
    field: Option<String>,
) -> Result<()> {
    let client = remote(store, resource)?;
    let credential = client.fetch_credential(&Id::new(id)).await?;

    match field {
        Some(field) => match credential.field(&field) {
            Some(value) => println!("{value}"),
            None => bail!("field {field:?} is not set on {}", credential.name),
        },
        None => println!("{}", render_credential(&credential)),
    }
    Ok(())
}

async fn pull(
    store: &SessionStore,
    config: &ResolvedConfig,
    flavor: ClusterFlavor,
    name: Option<String>,
) -> Result<bool> {
    let engine = engine(store, config)?;
    let cluster = cluster(config, flavor);

    match name {
        Some(name) => {
            let action = engine.pull_secret(&cluster, &name).await?;
            print_action(&name, &action);
            Ok(true)
        }
        None => {
            let report = engine.pull_all(&cluster).await?;
            Ok(print_report(&report))
        }
    }
}

async fn push(
    store: &SessionStore,
    config: &ResolvedConfig,
    flavor: ClusterFlavor,
    name: Option<String>,
) -> Result<bool> {
    let engine = engine(store, config)?;
    let cluster = cluster(config, flavor);

    match name {
        Some(name) => {
            let action = engine.push_credential(&cluster, &name).await?;
            print_action(&name, &action);
            Ok(true)
        }
        None => {
            let report = engine.push_all(&cluster).await?;
            Ok(print_report(&report))
        }
    }
}

fn list_secrets(config: &ResolvedConfig, flavor: ClusterFlavor) -> Result<()> {
    for name in cluster(config, flavor).list_secret_names()? {
        println!("{name}");
    }
    Ok(())
}

fn print_action(name: &str, action: &SyncAction) {
    match action {
        SyncAction::Saved { id } => println!("{name}: saved as {id}"),
        SyncAction::Inserted => println!("{name}: pushed"),
    }
}

fn print_report(report: &SyncReport) -> bool {
    if report.items.is_empty() {
        println!("Nothing to sync");
    } else {
        println!("{}", render_report(report));
    }
    !report.has_failures()
}
