//! # ClaudeSync CLI (`claudesync`)
//!
//! Synchronize local files with Claude.ai projects.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `claudesync auth login\|logout\|ls` | Manage session keys |
//! | `claudesync config set\|get\|ls` | Read and write configuration |
//! | `claudesync organization ls\|set` | Choose the active organization |
//! | `claudesync project create\|archive\|set\|ls` | Manage projects |
//! | `claudesync chat pull\|ls\|rm\|init\|message` | Manage chats |
//! | `claudesync push` | Mirror the sync root into the active project |
//!
//! Logging goes to stderr; set `CLAUDESYNC_LOG` (e.g. `claudesync=debug`)
//! or pass `-v`.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use claudesync::config::{ConfigStore, DEFAULT_PROVIDER};
use claudesync::progress::ProgressMode;
use claudesync::sync::ChangeDetection;
use claudesync::{auth, chat, config_cmd, organization, project, push};

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "CLAUDESYNC_LOG";

#[derive(Parser)]
#[command(
    name = "claudesync",
    about = "Synchronize local files with Claude.ai projects",
    version
)]
struct Cli {
    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage authentication.
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Manage configuration values.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage the active organization.
    Organization {
        #[command(subcommand)]
        action: OrganizationAction,
    },

    /// Manage projects within the active organization.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage and synchronize chats.
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Synchronize the local sync root with the active project.
    ///
    /// Uploads new and changed files, then deletes remote documents that no
    /// longer exist locally.
    Push {
        /// Progress output on stderr. Defaults to human when stderr is a
        /// terminal, otherwise off.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// How existing remote documents are judged changed. Overrides the
        /// `sync_change_detection` configuration key.
        #[arg(long, value_enum)]
        change_detection: Option<ChangeDetection>,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Authenticate with a provider by storing its session key.
    Login {
        #[arg(short, long, default_value = DEFAULT_PROVIDER)]
        provider: String,

        /// Session key; prompted for when omitted.
        #[arg(long)]
        session_key: Option<String>,

        /// Key expiry (RFC 3339 or RFC 2822). Defaults to 30 days from now.
        #[arg(long)]
        expires: Option<String>,
    },
    /// Log out from all providers.
    Logout,
    /// List authenticated providers.
    Ls,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value.
    Set {
        key: String,
        value: String,
        /// Write to the local (per-directory) layer instead of the global one.
        #[arg(long)]
        local: bool,
    },
    /// Print a configuration value.
    Get { key: String },
    /// Print the merged configuration.
    Ls,
}

#[derive(Subcommand)]
enum OrganizationAction {
    /// List available organizations.
    Ls,
    /// Set the active organization.
    Set {
        #[arg(long)]
        org_id: Option<String>,
        #[arg(long, default_value = DEFAULT_PROVIDER)]
        provider: String,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a new project and make it active here.
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = project::DEFAULT_DESCRIPTION)]
        description: String,
        #[arg(long, default_value = ".")]
        local_path: String,
        #[arg(long, default_value = DEFAULT_PROVIDER)]
        provider: String,
        /// Organization ID; defaults to the active organization.
        #[arg(long)]
        organization: Option<String>,
    },
    /// Archive an existing project.
    Archive {
        #[arg(long)]
        project_id: Option<String>,
    },
    /// Set the active project for syncing.
    Set {
        #[arg(long)]
        project_id: Option<String>,
        #[arg(long, default_value = DEFAULT_PROVIDER)]
        provider: String,
    },
    /// List projects in the active organization.
    Ls {
        /// Include archived projects.
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Download chats and published artifacts into `claude_chats/`.
    Pull,
    /// List chats of the active project.
    Ls,
    /// Delete chat conversations.
    Rm {
        /// Delete every chat of the active project.
        #[arg(long)]
        all: bool,
        ids: Vec<String>,
    },
    /// Create a new chat conversation.
    Init {
        #[arg(long)]
        name: Option<String>,
        /// Project UUID; defaults to the active project.
        #[arg(long)]
        project: Option<String>,
    },
    /// Send a message, creating a chat first unless `--chat` is given.
    Message {
        #[arg(long)]
        chat: Option<String>,
        #[arg(long, default_value = "UTC")]
        timezone: String,
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Arc::new(ConfigStore::open()?);

    match cli.command {
        Commands::Auth { action } => match action {
            AuthAction::Login {
                provider,
                session_key,
                expires,
            } => auth::run_login(config, &provider, session_key, expires).await?,
            AuthAction::Logout => auth::run_logout(&config)?,
            AuthAction::Ls => auth::run_list(&config)?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Set { key, value, local } => {
                config_cmd::run_set(&config, &key, &value, local)?
            }
            ConfigAction::Get { key } => config_cmd::run_get(&config, &key)?,
            ConfigAction::Ls => config_cmd::run_list(&config)?,
        },
        Commands::Organization { action } => match action {
            OrganizationAction::Ls => organization::run_list(config).await?,
            OrganizationAction::Set { org_id, provider } => {
                organization::run_set(config, org_id, &provider).await?
            }
        },
        Commands::Project { action } => match action {
            ProjectAction::Create {
                name,
                description,
                local_path,
                provider,
                organization,
            } => {
                project::run_create(
                    config,
                    project::CreateOptions {
                        name,
                        description,
                        local_path,
                        provider,
                        organization,
                    },
                )
                .await?
            }
            ProjectAction::Archive { project_id } => {
                project::run_archive(config, project_id).await?
            }
            ProjectAction::Set {
                project_id,
                provider,
            } => project::run_set(config, project_id, &provider).await?,
            ProjectAction::Ls { all } => project::run_list(config, all).await?,
        },
        Commands::Chat { action } => match action {
            ChatAction::Pull => chat::run_pull(config).await?,
            ChatAction::Ls => chat::run_list(config).await?,
            ChatAction::Rm { all, ids } => chat::run_remove(config, all, ids).await?,
            ChatAction::Init { name, project } => chat::run_init(config, name, project).await?,
            ChatAction::Message {
                chat: chat_id,
                timezone,
                prompt,
            } => chat::run_message(config, chat_id, &timezone, &prompt.join(" ")).await?,
        },
        Commands::Push {
            progress,
            change_detection,
        } => {
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            push::run_push(config, progress, change_detection).await?
        }
    }

    Ok(())
}
