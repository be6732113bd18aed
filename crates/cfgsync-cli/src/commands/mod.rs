use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tracing::error;

use cfgsync_config::{Config, InitOptions, SearchPaths};

mod show;
mod watch;

/// Load configuration from a file, the environment or etcd, and keep it in sync
#[derive(Parser, Debug)]
#[command(name = "cfgsync", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config locator: a file path or provider+protocol://host[:port]/path.ext
    #[arg(long, global = true)]
    config: Option<String>,

    /// Treat --config as a remote locator; plain paths are rejected
    #[arg(
        long = "isRemoteConfig",
        global = true,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set
    )]
    is_remote_config: bool,

    /// Prefix for environment overrides (PREFIX_SERVER_PORT → server.port)
    #[arg(long, global = true, default_value = "CFGSYNC")]
    env_prefix: String,

    /// Config file stem searched for when --config is not given
    #[arg(long, global = true, default_value = "config")]
    name: String,

    /// Application name used for the /etc/<app> and ~/.<app> search directories
    #[arg(long, global = true, default_value = "cfgsync")]
    app: String,

    /// Explicit override, highest precedence (repeatable)
    #[arg(long = "set", global = true, value_parser = parse_key_val)]
    overrides: Vec<(String, String)>,

    /// Seconds between remote re-fetches
    #[arg(long, global = true, default_value = "5")]
    poll_interval: u64,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a single value
    Get {
        /// Dotted key, e.g. server.port
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the merged configuration
    Show {
        /// Output as nested JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how --config resolves, without loading anything
    Resolve,
    /// Load, then print every applied reload until Ctrl-C
    Watch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Parse "key=value" CLI arguments.
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

impl Cli {
    /// Loader options derived from the global flags.
    pub fn init_options(&self) -> InitOptions {
        let mut options = InitOptions::new(self.env_prefix.clone(), self.name.clone());
        options.locator = self.config.clone();
        options.force_remote = self.is_remote_config;
        options.search_paths = SearchPaths::for_app(&self.app);
        options.overrides = self
            .overrides
            .iter()
            .map(|(k, v)| (k.clone(), cfgsync_config::decode::parse_scalar(v)))
            .collect();
        options.poll_interval = Duration::from_secs(self.poll_interval.max(1));
        options.watch = matches!(self.command, Commands::Watch);
        options
    }

    fn init_tracing(&self) {
        // Resolve log level: --verbose > --quiet > --log-level > default
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or("info")
        };

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

        match self.log_format {
            LogFormat::Json => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .with_target(true)
                .init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init(),
        }
    }

    async fn load(&self) -> cfgsync_core::Result<Config> {
        cfgsync_config::init(self.init_options()).await.inspect_err(|e| {
            error!(error = %e, "failed to load configuration");
        })
    }

    pub async fn run(self) -> cfgsync_core::Result<()> {
        self.init_tracing();

        match &self.command {
            Commands::Resolve => show::cmd_resolve(&self),
            Commands::Get { key, json } => {
                let config = self.load().await?;
                show::cmd_get(&config, key, *json)
            }
            Commands::Show { json } => {
                let config = self.load().await?;
                show::cmd_show(&config, *json)
            }
            Commands::Watch => {
                let config = self.load().await?;
                watch::cmd_watch(config).await
            }
        }
    }
}
