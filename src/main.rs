use anyhow::Result;
use clap::Parser;
use markersync::cli::{AppContext, Cli, Commands};
use markersync::cli_ext::{parse_cmd, plan_cmd, timecode_cmd};
use markersync::core::{ImportError, TimecodeError};
use markersync::load_config;
use tracing_subscriber::EnvFilter;

/// Exit code for malformed input (bad timecodes, bad frame rates)
const EXIT_INVALID: i32 = 3;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("markersync=debug")
    } else {
        EnvFilter::try_from_env("MSYNC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(cli: Cli) -> Result<()> {
    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Parse(args) => parse_cmd::run(args, &load_config()?, &ctx),
        Commands::Plan(args) => plan_cmd::run(args, &load_config()?, &ctx),
        Commands::Timecode(cmd) => timecode_cmd::run(cmd, &load_config()?, &ctx),
        Commands::Init(args) => markersync::infra::config::init(args, &ctx),
        Commands::Completions(args) => markersync::completion::run(args, &ctx),
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<ImportError>() {
        e.exit_code()
    } else if err.downcast_ref::<TimecodeError>().is_some() {
        EXIT_INVALID
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = dispatch(cli) {
        let code = exit_code(&err);

        // Bare timecode errors get miette's field-level rendering
        if err.chain().count() == 1 {
            match err.downcast::<TimecodeError>() {
                Ok(e) => eprintln!("{:?}", miette::Report::new(e)),
                Err(err) => eprintln!("Error: {err:#}"),
            }
        } else {
            eprintln!("Error: {err:#}");
        }
        std::process::exit(code);
    }
}
