mod commands;
mod shell;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{CommandError, GlobalOptions, OutputFormat, EXIT_FAILURE};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(
    name = "atriumctl",
    version,
    about = "Staged boot controller for on-disk Atrium instances"
)]
struct Cli {
    /// Directory to start instance discovery from (defaults to the current directory).
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Print boot lifecycle events and a timing summary.
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    /// Username to log in as at the final boot level (the admin account when omitted).
    #[arg(short, long, default_value = "", global = true)]
    user: String,

    /// Start an interactive shell instead of running a single command.
    #[arg(short = 's', long, default_value_t = false)]
    shell: bool,

    /// Run every shell command in its own subprocess.
    #[arg(long, default_value_t = false, requires = "shell")]
    process_isolation: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Boot the instance through every level and report what was reached.
    Status {
        /// Output format for the report.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show release properties of the instance (flavor, version, build).
    Info {
        /// Property name; all known properties when omitted.
        property: Option<String>,
        /// Re-read release metadata instead of using the cached copy.
        #[arg(long, default_value_t = false)]
        refresh: bool,
        /// Output format for the report.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ATRIUMCTL_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let options = GlobalOptions {
        path: cli.path,
        debug: cli.debug,
        user: cli.user,
    };

    let started = Instant::now();
    let result = if cli.shell {
        shell::run(&options, cli.process_isolation)
    } else {
        match cli.command {
            Some(command) => dispatch(&command, &options),
            None => {
                // Without a subcommand or --shell there is nothing to do.
                let mut cmd = <Cli as clap::CommandFactory>::command();
                let _ = cmd.print_help();
                Ok(EXIT_FAILURE)
            }
        }
    };

    if options.debug {
        let elapsed = started.elapsed();
        match peak_rss_kib() {
            Some(kib) => eprintln!("finished in {elapsed:.2?}, peak rss {kib} KiB"),
            None => eprintln!("finished in {elapsed:.2?}"),
        }
    }

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.code)
        }
    }
}

fn dispatch(command: &Commands, options: &GlobalOptions) -> Result<u8, CommandError> {
    match command {
        Commands::Status { format } => commands::status::run(options, *format),
        Commands::Info {
            property,
            refresh,
            format,
        } => commands::info::run(options, property.as_deref(), *refresh, *format),
        Commands::Completions { shell } => commands::completions::run::<Cli>(*shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(dir),
    }
}

fn peak_rss_kib() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        let line = status.lines().find(|l| l.starts_with("VmHWM:"))?;
        line.split_whitespace().nth(1)?.parse().ok()
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
