use anyhow::{Context, Result};

mod args;
mod cmd_clone;
mod cmd_create_repos;
mod cmd_prune;
mod cmd_revert;
mod reportable;
mod util;

use args::{CommandLineArgs, GlobalArgs};

/// Set up the logging / tracing system for the application.
fn configure_tracing(global_args: &GlobalArgs) -> Result<()> {
    use tracing_log::{AsLog, LogTracer};
    use tracing_subscriber::{filter::LevelFilter, EnvFilter};

    // Set the tracing level according to the `-q`/`--quiet` and `-v`/`--verbose` options
    let level_filter = if global_args.quiet {
        LevelFilter::ERROR
    } else {
        match global_args.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // Configure the bridge from the `log` crate to the `tracing` crate
    LogTracer::builder()
        .with_max_level(level_filter.as_log())
        .init()?;

    // Configure logging filters according to the `COURSEKIT_LOG` environment variable
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("COURSEKIT_LOG")
        .from_env()
        .context("Failed to parse filters from COURSEKIT_LOG environment variable")?;

    // Install the global tracing subscriber
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_ansi(global_args.use_color(std::io::stderr()))
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Enable or disable colored output according to the global arguments.
fn configure_color(global_args: &GlobalArgs) {
    console::set_colors_enabled(global_args.use_color(std::io::stdout()));
    console::set_colors_enabled_stderr(global_args.use_color(std::io::stderr()));
}

/// Run the selected command, returning the process exit code.
///
/// Commands that process many items return 1 when any item failed. Errors that stop a command
/// before or during its run are returned as `Err`.
fn try_main(args: &CommandLineArgs) -> Result<i32> {
    let global_args = &args.global_args;

    configure_color(global_args);
    configure_tracing(global_args).context("Failed to initialize logging")?;

    match &args.command {
        args::Command::CreateRepos(args) => cmd_create_repos::run(global_args, args),
        args::Command::Clone(args) => cmd_clone::run(global_args, args),
        args::Command::Revert(args) => cmd_revert::run(global_args, args),
        args::Command::Prune(args) => cmd_prune::run(global_args, args),
    }
}

fn main() {
    let args = &CommandLineArgs::parse_args();
    match try_main(args) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Use the more verbose format that includes a backtrace when running with -vv or
            // higher, otherwise use a more compact one-line error format.
            if args.global_args.verbose > 1 {
                eprintln!("Error: {e:?}");
            } else {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(2);
        }
    }
}
