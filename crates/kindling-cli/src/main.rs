//! `kindling`: compile a parsed script and place it on a plot.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use kindling_compiler::{
    compile_ast_json, compile_to_result, deliver_live, CompileConfig, CompileError, DeliveryMode,
    ErrorDetail, PlotTier,
};
use kindling_types::SourceFile;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kindling")]
#[command(version, about = "Compile Kindling scripts into plot code templates", long_about = None)]
struct Cli {
    /// AST JSON produced by the parser
    ast: PathBuf,

    /// Compile for a basic plot (50 slots)
    #[arg(short = 'B', long, group = "tier")]
    basic: bool,

    /// Compile for a large plot (100 slots)
    #[arg(short = 'L', long, group = "tier")]
    large: bool,

    /// Compile for a massive plot (300 slots)
    #[arg(short = 'M', long, group = "tier")]
    massive: bool,

    /// Send templates to the companion client instead of printing commands
    #[arg(short, long)]
    recode: bool,

    /// Log every stage and print the formatted templates
    #[arg(short, long)]
    verbose: bool,

    /// Print full error details
    #[arg(short, long)]
    debug: bool,

    /// Script source, used to quote lines in errors
    #[arg(long)]
    source: Option<PathBuf>,

    /// Companion client address
    #[arg(long)]
    address: Option<String>,

    /// Base settings as a JSON file; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the structured compile result as JSON; diagnostics in it are
    /// always complete and nothing is sent
    #[arg(long, conflicts_with_all = ["recode", "debug"])]
    json: bool,
}

impl Cli {
    fn tier(&self) -> Option<PlotTier> {
        if self.massive {
            Some(PlotTier::Massive)
        } else if self.large {
            Some(PlotTier::Large)
        } else if self.basic {
            Some(PlotTier::Basic)
        } else {
            None
        }
    }

    fn to_config(&self, base: CompileConfig) -> CompileConfig {
        let mut config = base;
        if let Some(tier) = self.tier() {
            config.tier = tier;
        }
        if self.recode {
            config.delivery = DeliveryMode::Live;
        }
        if self.verbose {
            config.verbose = true;
        }
        if self.debug {
            config.error_detail = ErrorDetail::Full;
        }
        if let Some(address) = &self.address {
            config.session.address = address.clone();
        }
        config
    }
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}

fn load_config(cli: &Cli) -> Result<CompileConfig, String> {
    let base = match &cli.config {
        Some(path) => CompileConfig::from_json_str(&read(path)?)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))?,
        None => CompileConfig::default(),
    };
    Ok(cli.to_config(base))
}

fn init_tracing(config: &CompileConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli, config: &CompileConfig) -> Result<(), String> {
    let ast = read(&cli.ast)?;
    let source = match &cli.source {
        Some(path) => Some(SourceFile::new(path.display().to_string(), read(path)?)),
        None => None,
    };
    let report = |err: CompileError| err.render_with(config.error_detail, source.as_ref());

    if cli.json {
        if config.delivery == DeliveryMode::Live {
            return Err("--json cannot be used with live delivery".into());
        }
        let result = compile_to_result(&ast, config);
        println!("{}", result.to_json().map_err(|e| e.to_string())?);
        return if result.success {
            Ok(())
        } else {
            Err("compilation failed".into())
        };
    }

    let compilation = compile_ast_json(&ast, config).map_err(report)?;
    println!(
        "Compiled {} template(s) for a {} plot ({} slots)",
        compilation.templates.len(),
        config.tier,
        config.tier.capacity()
    );
    if config.verbose {
        println!("{}", compilation.listing());
    }

    match config.delivery {
        DeliveryMode::Offline => {
            for command in compilation.package.give_commands() {
                println!("{command}");
            }
            if config.verbose {
                println!("Artifact: {}", compilation.package.artifact);
            }
        }
        DeliveryMode::Live => {
            let progress = deliver_live(compilation.codes(), &config.session)
                .await
                .map_err(report)?;
            println!("Delivered {progress}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
