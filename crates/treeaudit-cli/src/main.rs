use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use treeaudit_core::config::Config;
use treeaudit_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

mod audit;
mod output;
mod prompt;
mod scan;

#[derive(Parser)]
#[command(name = "treeaudit")]
#[command(about = "Audit a project tree against a free-text structure policy.")]
struct Cli {
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan ROOT, ask the model, print the report.
    Audit {
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        #[arg(long, value_name = "PATH")]
        policy: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
        #[arg(long, value_name = "FORMAT", default_value = "markdown")]
        format: String,
        #[arg(long, value_name = "N")]
        max_entries: Option<usize>,
        #[arg(long, value_name = "NAME")]
        provider: Option<String>,
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Print the directory summary without contacting the model.
    Scan {
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Print the prompt an audit would send.
    Prompt {
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        #[arg(long, value_name = "PATH")]
        policy: Option<PathBuf>,
        #[arg(long, value_name = "N")]
        max_entries: Option<usize>,
        #[command(flatten)]
        scan: ScanArgs,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Extra glob to skip; repeatable.
    #[arg(long, value_name = "GLOB")]
    ignore: Vec<String>,
    #[arg(long)]
    no_default_ignores: bool,
    #[arg(long)]
    include_hidden: bool,
    #[arg(long, value_name = "CHARS")]
    preview_chars: Option<usize>,
}

impl ScanArgs {
    fn apply(&self, config: &mut Config) {
        config.scan.ignore.extend(self.ignore.iter().cloned());
        if self.no_default_ignores {
            config.scan.use_default_ignores = false;
        }
        if self.include_hidden {
            config.scan.skip_hidden = false;
        }
        if let Some(chars) = self.preview_chars {
            config.scan.preview_chars = chars;
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{}", err.message());
        process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> AppResult<()> {
    init_logging(&cli.log_level, &cli.log_format)?;

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Audit {
            root,
            policy,
            out,
            overwrite,
            format,
            max_entries,
            provider,
            endpoint,
            model,
            scan: scan_args,
        } => {
            scan_args.apply(&mut config);
            let overrides = audit::AuditOverrides {
                max_entries,
                provider,
                endpoint,
                model,
            };
            audit::audit_command(
                &root,
                policy,
                out,
                overwrite,
                &format,
                overrides,
                config,
            )
        }
        Commands::Scan {
            root,
            json,
            scan: scan_args,
        } => {
            scan_args.apply(&mut config);
            scan::scan_command(&root, json, &config)
        }
        Commands::Prompt {
            root,
            policy,
            max_entries,
            scan: scan_args,
        } => {
            scan_args.apply(&mut config);
            if let Some(n) = max_entries {
                config.prompt.max_entries = n;
            }
            prompt::prompt_command(&root, policy, &config)
        }
    }
}

fn init_logging(level: &str, format: &str) -> AppResult<()> {
    validate_log_level(level)?;
    validate_log_format(format)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = if format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| AppError::internal(format!("failed to install logger: {e}")))
}

fn validate_log_level(value: &str) -> AppResult<()> {
    match value {
        "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
        _ => Err(AppError::usage(format!(
            "invalid --log-level '{value}'; expected error|warn|info|debug|trace"
        ))),
    }
}

fn validate_log_format(value: &str) -> AppResult<()> {
    match value {
        "text" | "json" => Ok(()),
        _ => Err(AppError::usage(format!(
            "invalid --log-format '{value}'; expected text|json"
        ))),
    }
}
