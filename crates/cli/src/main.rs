use anyhow::{Context, Result};
use batch_renamer_core::{
    app_paths, list_available_extensions, load_config, save_config, AppConfig, BatchProcessor,
    FileFilter, ModeOptions, ProcessingResult,
};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "batch-renamer-cli")]
#[command(about = "Renames the files of a folder by rule and moves them into an output folder")]
struct Cli {
    /// Increase diagnostic output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Run(RunArgs),
    Extensions(ExtensionsArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the current settings (defaults if none exist) to the config file
    Init,
}

#[derive(Debug, Args)]
struct ExtensionsArgs {
    #[arg(long)]
    source: PathBuf,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    source: PathBuf,
    /// Defaults to <source>/<output_dir_name> from the config
    #[arg(long)]
    output: Option<PathBuf>,
    /// Comma separated extensions, e.g. "*.jpg, *.png"
    #[arg(long)]
    filter: Option<String>,
    /// edit, size, sequence, or resequence combined with --strategy
    #[arg(long)]
    mode: String,
    /// size or sequence; used by --mode resequence, defaults to the config
    #[arg(long)]
    strategy: Option<String>,
    #[arg(long, default_value = "")]
    target: String,
    #[arg(long, default_value = "")]
    replace: String,
    /// stem, suffix or both
    #[arg(long)]
    scope: Option<String>,
    #[arg(long)]
    start: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config()?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Run(args) => cmd_run(args, &config),
        Commands::Extensions(args) => cmd_extensions(args),
        Commands::Config(config_args) => match config_args.action {
            ConfigAction::Show => cmd_config_show(&config),
            ConfigAction::Init => cmd_config_init(&config),
        },
    }
}

fn init_logging(config: &AppConfig, verbose: u8) {
    let configured = config
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Warn);
    let level = match verbose {
        0 => configured,
        1 => configured.max(LevelFilter::Info),
        _ => LevelFilter::Debug,
    };
    if let Err(err) = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("warning: diagnostics disabled: {}", err);
    }
}

fn cmd_run(args: RunArgs, config: &AppConfig) -> Result<()> {
    let options = ModeOptions {
        mode: args.mode,
        strategy: args.strategy.unwrap_or_else(|| config.strategy.clone()),
        target: args.target,
        replacement: args.replace,
        scope: args.scope.unwrap_or_else(|| config.scope.clone()),
        start_number: args.start.unwrap_or_else(|| config.start_number.clone()),
    };
    let mode = options.to_mode()?;

    let filter = match args.filter.as_deref() {
        Some(text) => FileFilter::parse(text),
        None => config.file_filter(),
    };
    let output = args
        .output
        .unwrap_or_else(|| config.default_output_dir(&args.source));

    let processor = BatchProcessor::new(&args.source, &output, &filter)?;
    if !filter.is_empty() {
        eprintln!("filter: {}", filter);
    }
    if processor.total_files() == 0 {
        eprintln!("no files in the source folder match the filter; nothing to do");
        return Ok(());
    }
    eprintln!("found {} file(s), starting", processor.total_files());

    let result = match args.output_format {
        OutputFormat::Text => {
            processor.process_files(&mode, &mut |line: &str| println!("{}", line))?
        }
        OutputFormat::Json => {
            let result =
                processor.process_files(&mode, &mut |line: &str| eprintln!("{}", line))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            result
        }
    };

    print_summary(&result, processor.total_files(), processor.output_dir());
    Ok(())
}

fn print_summary(result: &ProcessingResult, total: usize, output: &Path) {
    eprintln!("\nprocessed {} of {} file(s)", result.success_count, total);
    if result.failed_count() > 0 {
        eprintln!(
            "{} file(s) failed and remain in the source folder",
            result.failed_count()
        );
    }
    eprintln!("output: {}", output.display());
}

fn cmd_extensions(args: ExtensionsArgs) -> Result<()> {
    let extensions = list_available_extensions(&args.source)
        .with_context(|| format!("cannot list extensions in {}", args.source.display()))?;
    if extensions.is_empty() {
        eprintln!("no files with an extension found");
        return Ok(());
    }
    println!("{}", FileFilter::from_extensions(&extensions));
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn cmd_config_init(config: &AppConfig) -> Result<()> {
    save_config(config)?;
    let paths = app_paths()?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}
