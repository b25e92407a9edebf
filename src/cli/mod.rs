use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use url::Url;

use crate::config::ConfigStore;
use crate::credentials::KeyringStore;
use crate::prompt::TerminalPrompt;

mod check;
mod run;
mod settings;

#[derive(Subcommand)]
enum Command {
    /// Check requirements and start the chat application
    #[clap(name = "run", alias = "")]
    Run,
    /// Store an API key for NanoGPT
    Login {
        /// Don't open the API key page in a browser
        #[clap(long)]
        no_browser: bool,
    },
    /// Remove the stored API key
    Logout,
    /// Check whether the requirements are installed
    Check {
        /// Print the report as JSON
        #[clap(long)]
        json: bool,
    },
    /// Show the configuration with the API key masked
    Config {
        /// Use this provider endpoint instead of the public API
        #[clap(long, value_name = "URL")]
        endpoint: Option<Url>,
        /// Go back to the public API endpoint
        #[clap(long, conflicts_with = "endpoint")]
        clear_endpoint: bool,
    },
}

#[derive(Parser)]
#[clap(version, author, about, long_about = None)]
struct Cli {
    /// Enable trace logging
    #[clap(long, global = true)]
    trace: bool,
    /// Enable debug logging
    #[clap(long, global = true)]
    debug: bool,
    /// Configuration file to use instead of the default location
    #[clap(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// Python interpreter that runs the chat UI
    #[clap(long, global = true, default_value = "python3", env = "NANOGPT_PYTHON")]
    python: String,
    #[clap(subcommand)]
    command: Option<Command>,
}

fn log_level(trace: bool, debug: bool) -> LevelFilter {
    match (trace, debug) {
        (true, _) => LevelFilter::Trace,
        (false, true) => LevelFilter::Debug,
        (false, false) => LevelFilter::Warn,
    }
}

pub fn exec() {
    let cli = Cli::parse();
    // Plain messages on stderr; `RUST_LOG` still applies on top of the flags.
    env_logger::Builder::new()
        .filter_level(log_level(cli.trace, cli.debug))
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .format_level(cli.trace || cli.debug)
        .init();

    let store = match cli.config_path {
        Some(path) => ConfigStore::at(path),
        None => match ConfigStore::default_location() {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        },
    };
    log::debug!("Using config file {}", store.path().display());

    let code = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run::run(store, &cli.python),
        Command::Login { no_browser } => {
            let prompt = TerminalPrompt::new().with_browser(!no_browser);
            settings::login(&KeyringStore, prompt)
        }
        Command::Logout => settings::logout(&KeyringStore),
        Command::Check { json } => check::check(&cli.python, json),
        Command::Config {
            endpoint,
            clear_endpoint,
        } => {
            let update = settings::EndpointUpdate {
                endpoint,
                clear: clear_endpoint,
            };
            settings::show(&store, &KeyringStore, update)
        }
    };
    std::process::exit(code);
}
