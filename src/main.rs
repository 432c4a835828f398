// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::{Parser, Subcommand};
use kube::Client;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use helmdeck::chart::{ChartLocator, DigestVerifier};
use helmdeck::config::Config;
use helmdeck::kubernetes::create_release_client;
use helmdeck::repo::{HelmHome, HttpFetcher, RepositoryStore};

/// Helm repository management and Tiller access for the dashboard backend
#[derive(Parser, Debug)]
#[command(name = "helmdeck", version, about, long_about = None)]
struct Cli {
    /// Helm home directory (overrides HELM_HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the Helm home layout and seed the default repository
    Home,

    /// Manage chart repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Resolve a chart reference to a local archive, downloading it if needed
    Locate {
        /// Chart path or repo/chart reference
        chart: String,

        /// Version constraint
        #[arg(long, default_value = "")]
        version: String,

        /// Check the chart's SHA-256 digest against its provenance file (the OpenPGP signature is not validated)
        #[arg(long)]
        verify: bool,

        /// Keyring used for verification (default: ~/.gnupg/pubring.gpg)
        #[arg(long)]
        keyring: Option<PathBuf>,

        /// Directory downloads are written to
        #[arg(long, default_value = ".")]
        destination: PathBuf,
    },

    /// Open a tunnel to Tiller and keep it open until interrupted
    Tiller,
}

#[derive(Subcommand, Debug)]
enum RepoCommands {
    /// List configured repositories
    List,
    /// Show one repository
    Get { name: String },
    /// Add a repository
    Add { name: String, url: String },
    /// Remove a repository and its cached index
    Remove { name: String },
    /// List the charts of a repository's cached index
    Charts { name: String },
    /// Re-download a repository's index
    Update { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(home) = cli.home {
        config.helm_home = home;
    }
    info!("Using helm home {}", config.helm_home.display());

    let home = HelmHome::new(&config.helm_home);

    match cli.command {
        Commands::Home => {
            RepositoryStore::new(home, HttpFetcher::default())
                .ensure_home()
                .await?;
        }
        Commands::Repo { command } => {
            let store = RepositoryStore::new(home, HttpFetcher::default());
            store.ensure_home().await?;
            run_repo_command(&store, command).await?;
        }
        Commands::Locate {
            chart,
            version,
            verify,
            keyring,
            destination,
        } => {
            let locator = ChartLocator::new(home, HttpFetcher::default(), DigestVerifier)
                .with_destination(destination);
            let keyring = keyring.unwrap_or_else(default_keyring);
            let path = locator.locate(&chart, &version, verify, &keyring).await?;
            println!("{}", path.display());
        }
        Commands::Tiller => {
            let client = Client::try_default().await?;
            info!("Connected to Kubernetes cluster");

            let release_client = create_release_client(&client, &config).await?;
            release_client.ping().await?;
            println!("{}", release_client.host());

            tokio::signal::ctrl_c().await?;
            release_client.close().await;
        }
    }

    Ok(())
}

async fn run_repo_command(
    store: &RepositoryStore<HttpFetcher>,
    command: RepoCommands,
) -> Result<()> {
    match command {
        RepoCommands::List => print_json(&store.list().await)?,
        RepoCommands::Get { name } => match store.get(&name).await {
            Ok(spec) => print_json(&spec)?,
            Err(partial) => {
                print_json(&partial.view)?;
                return Err(partial.into());
            }
        },
        RepoCommands::Add { name, url } => store.add(&name, &url).await?,
        RepoCommands::Remove { name } => store.remove(&name)?,
        RepoCommands::Charts { name } => print_json(&store.list_charts(&name)?)?,
        RepoCommands::Update { name } => store.update(&name).await?,
    }
    Ok(())
}

fn default_keyring() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".gnupg")
        .join("pubring.gpg")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
