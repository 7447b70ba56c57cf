use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use chdforge::cli::Cli;
use chdforge::run;
use chdforge::settings::{parse_path_lines, Settings};
use chdforge_core::Config;
use chdforge_disc::supported_formats;
use chdforge_tools::ToolRegistry;

/// Exit code for errors that stop the run before any job starts.
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "chdforge=debug,chdforge_core=debug,chdforge_disc=debug,chdforge_tools=debug".to_string()
        } else {
            "chdforge=warn,chdforge_core=warn,chdforge_disc=warn,chdforge_tools=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match execute(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn execute(cli: Cli) -> Result<u8> {
    if cli.list_examples {
        list_examples();
        return Ok(0);
    }

    if cli.list_formats {
        list_formats();
        return Ok(0);
    }

    let config = Config::load_or_default(cli.config.as_deref()).context("failed to load configuration")?;

    let stdin_paths = if cli.reads_stdin() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read paths from stdin")?;
        parse_path_lines(&text)
    } else {
        Vec::new()
    };

    let settings = Settings::resolve(&cli, config, stdin_paths)?;
    let registry = ToolRegistry::discover(&settings.tools);

    if cli.list_programs {
        list_programs(&registry);
        return Ok(0);
    }

    if settings.fallback {
        println!("Fallback to default options: -X .");
    }

    // Sequential runs never need more than one thread.
    let runtime = if settings.workers > 1 {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(settings.workers)
            .enable_all()
            .build()?
    } else {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
    };

    let outcome = runtime.block_on(run::run(&settings, &registry))?;
    Ok(outcome.exit_code())
}

const EXAMPLES: &[(&str, &str)] = &[
    ("", "--help"),
    ("", "-q ."),
    ("", "--quiet --stats --names ~/Downloads"),
    ("", "-p -- *.7z"),
    ("find . -name '*.gdi'", "-"),
];

fn list_examples() {
    for (stdin, arguments) in EXAMPLES {
        if stdin.is_empty() {
            println!("$ chdforge {arguments}");
        } else {
            println!("$ {stdin} | chdforge {arguments}");
        }
    }
}

fn list_formats() {
    for (kind, extensions) in supported_formats() {
        println!("{kind}: {}", extensions.join(", "));
    }
}

fn list_programs(registry: &ToolRegistry) {
    for info in registry.check_all() {
        match (&info.path, &info.version) {
            (Some(path), Some(version)) => println!("{}: {} ({version})", info.name, path.display()),
            (Some(path), None) => println!("{}: {}", info.name, path.display()),
            (None, _) => println!("{}: not found", info.name),
        }
    }
}
