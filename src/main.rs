//! apk2aab - convert an Android APK into a signed Android App Bundle.
//!
//! Decodes the APK, rebuilds every module in the bundle's proto layout,
//! optionally carves matching assets into an on-demand asset pack, then
//! builds and signs the AAB.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use apk2aab::config::{Config, ConfigOverrides};
use apk2aab::error::PipelineError;

#[derive(Parser)]
#[command(name = "apk2aab")]
#[command(about = "Convert an APK into a signed Android App Bundle")]
#[command(
    after_help = "QUICK START:\n  apk2aab preflight -i app.apk   Check tools and inputs\n  apk2aab build -i app.apk -o app.aab\n  apk2aab show config            Print resolved configuration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an APK into a signed AAB
    Build {
        /// Input APK
        #[arg(short, long)]
        input: PathBuf,

        /// Output AAB
        #[arg(short, long)]
        output: PathBuf,

        /// Move assets whose path (relative to assets/) matches this
        /// pattern into an on-demand asset-pack module
        #[arg(long)]
        split_pattern: Option<String>,

        /// Name of the asset-pack module
        #[arg(long, requires = "split_pattern")]
        split_name: Option<String>,

        #[command(flatten)]
        tools: ToolArgs,
    },

    /// Run preflight checks (verify inputs and tools before a build)
    Preflight {
        /// Input APK
        #[arg(short, long)]
        input: PathBuf,

        /// Output AAB (only shown in the report)
        #[arg(short, long, default_value = "output.aab")]
        output: PathBuf,

        #[command(flatten)]
        tools: ToolArgs,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration (passwords masked)
    Config,
}

/// Tool, keystore and directory overrides shared by `build` and `preflight`.
#[derive(Args, Debug, Clone, Default)]
struct ToolArgs {
    /// Signing keystore
    #[arg(long)]
    keystore: Option<PathBuf>,
    /// Keystore password
    #[arg(long)]
    store_password: Option<String>,
    /// Key alias
    #[arg(long)]
    key_alias: Option<String>,
    /// Key password
    #[arg(long)]
    key_password: Option<String>,
    /// apktool jar
    #[arg(long)]
    apktool: Option<PathBuf>,
    /// aapt2 binary
    #[arg(long)]
    aapt2: Option<PathBuf>,
    /// Platform android.jar
    #[arg(long)]
    android: Option<PathBuf>,
    /// bundletool jar
    #[arg(long)]
    bundletool: Option<PathBuf>,
    /// Directory the temporary work tree is created in
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

impl ToolArgs {
    fn into_overrides(self, split_module: Option<String>) -> ConfigOverrides {
        ConfigOverrides {
            apktool: self.apktool,
            aapt2: self.aapt2,
            android_jar: self.android,
            bundletool: self.bundletool,
            keystore: self.keystore,
            store_password: self.store_password,
            key_alias: self.key_alias,
            key_password: self.key_password,
            work_root: self.work_dir,
            split_module,
        }
    }
}

fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<PipelineError>()
            .map_or(1, PipelineError::exit_code);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let base_dir = std::env::current_dir()?;
    let config = Config::load();

    match cli.command {
        Commands::Build {
            input,
            output,
            split_pattern,
            split_name,
            tools,
        } => {
            let config = config
                .apply(tools.into_overrides(split_name))
                .absolutize(&base_dir);
            commands::cmd_build(&config, input, output, split_pattern)?;
        }

        Commands::Preflight {
            input,
            output,
            tools,
        } => {
            let config = config
                .apply(tools.into_overrides(None))
                .absolutize(&base_dir);
            commands::cmd_preflight(&config, input, output)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(show_target, &config.absolutize(&base_dir))?;
        }
    }

    Ok(())
}
