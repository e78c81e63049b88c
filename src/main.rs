use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};

use tokrot::config::{OutputMode, PermissionPolicy, RotationConfig, RotationInputs};
use tokrot::{GhCliStore, RotateError, Rotator, WorkflowCommands};

#[derive(Parser)]
#[command(name = "tokrot", version, about = "Rotate an OAuth access token and hand it to a CI pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the token, update repository secrets, and write step outputs
    Rotate(RotateArgs),

    /// Report on the current token and test a refresh without writing outputs
    Check(CheckArgs),
}

#[derive(Args)]
struct RefreshArgs {
    /// Long-lived refresh token
    #[arg(long, env = "CLAUDE_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    /// OAuth token endpoint
    #[arg(long, env = "TOKROT_TOKEN_ENDPOINT")]
    token_endpoint: Option<String>,

    /// OAuth client id sent with the refresh grant
    #[arg(long, env = "TOKROT_CLIENT_ID")]
    client_id: Option<String>,

    /// Do not send a client id
    #[arg(long, conflicts_with = "client_id")]
    no_client_id: bool,

    /// HTTP timeout in seconds
    #[arg(long, env = "TOKROT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Args)]
struct RotateArgs {
    #[command(flatten)]
    refresh: RefreshArgs,

    /// Repository owner
    #[arg(long, env = "GITHUB_REPOSITORY_OWNER")]
    owner: Option<String>,

    /// Repository as owner/repo (or bare repo)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Write the new tokens back to repository secrets
    #[arg(long, env = "UPDATE_GITHUB_SECRET", value_parser = BoolishValueParser::new())]
    update_secrets: bool,

    /// Secret that receives the access token
    #[arg(long, env = "TOKROT_ACCESS_SECRET")]
    access_secret: Option<String>,

    /// Secret that receives a rotated refresh token
    #[arg(long, env = "TOKROT_REFRESH_SECRET")]
    refresh_secret: Option<String>,

    /// Step output file
    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,

    /// Step environment file
    #[arg(long, env = "GITHUB_ENV")]
    github_env: Option<PathBuf>,

    /// Prefix for variables exported to later steps
    #[arg(long, env = "TOKROT_ENV_PREFIX")]
    env_prefix: Option<String>,

    /// Only write legacy ::set-output lines
    #[arg(long, conflicts_with = "with_legacy")]
    legacy_only: bool,

    /// Also write legacy ::set-output lines next to the step output file
    #[arg(long)]
    with_legacy: bool,

    /// Fail the run when any secret cannot be updated
    #[arg(long)]
    strict_permissions: bool,

    /// GitHub CLI executable
    #[arg(long, env = "TOKROT_GH", default_value = "gh")]
    gh: String,

    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    refresh: RefreshArgs,

    /// Current access token (only checked for presence)
    #[arg(long, env = "CLAUDE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Current expiry as epoch seconds
    #[arg(long, env = "CLAUDE_EXPIRES_AT")]
    expires_at: Option<String>,
}

impl RefreshArgs {
    fn into_inputs(self) -> RotationInputs {
        RotationInputs {
            refresh_token: self.refresh_token,
            token_endpoint: self.token_endpoint,
            client_id: self.client_id,
            omit_client_id: self.no_client_id,
            timeout: self.timeout_secs.map(Duration::from_secs),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TOKROT_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = matches!(&cli.command, Commands::Rotate(args) if args.json);

    if let Err(e) = run(cli).await {
        tokrot::cli::report::print_error(&e, json);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RotateError> {
    let is_tty = std::io::stdout().is_terminal();
    match cli.command {
        Commands::Rotate(args) => {
            let output_mode = if args.legacy_only {
                OutputMode::LegacyOnly
            } else if args.with_legacy {
                OutputMode::FullWithLegacy
            } else {
                OutputMode::Full
            };
            let permission_policy = if args.strict_permissions {
                PermissionPolicy::Strict
            } else {
                PermissionPolicy::Tolerant
            };
            let inputs = RotationInputs {
                owner: args.owner,
                repository: args.repository,
                update_secrets: args.update_secrets,
                access_secret_name: args.access_secret,
                refresh_secret_name: args.refresh_secret,
                github_output: args.github_output,
                github_env: args.github_env,
                env_prefix: args.env_prefix,
                output_mode,
                permission_policy,
                ..args.refresh.into_inputs()
            };
            let config = RotationConfig::from_inputs(inputs)?;
            let mut rotator = Rotator::new(
                config,
                Box::new(GhCliStore::new(args.gh)),
                WorkflowCommands::stdout(),
            )?;
            let report = rotator.run().await?;
            tokrot::cli::report::print_report(&mut std::io::stdout(), &report, args.json, is_tty)?;
            Ok(())
        }
        Commands::Check(args) => {
            let check_inputs = tokrot::cli::check::CheckInputs {
                access_token_set: args.access_token.is_some_and(|t| !t.is_empty()),
                expires_at: args.expires_at.filter(|e| !e.is_empty()),
            };
            let config = RotationConfig::from_inputs(args.refresh.into_inputs())?;
            tokrot::cli::check::run_check(
                &mut std::io::stdout(),
                &config,
                &check_inputs,
                tokrot::oauth::expiry::now_epoch_seconds(),
                is_tty,
            )
            .await
        }
    }
}
