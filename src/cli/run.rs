use crate::config::ConfigStore;
use crate::credentials::KeyringStore;
use crate::launcher::{LaunchError, Launcher};
use crate::preconditions::{Requirement, SystemEnvironment};
use crate::prompt::TerminalPrompt;
use crate::session::ChatProcess;

const REQUIREMENTS: [Requirement; 3] = [
    Requirement::RuntimeVersion,
    Requirement::GuiToolkit,
    Requirement::ChatBackend,
];

pub fn banner() -> String {
    let mut text = format!(
        "NanoGPT Chat Desktop Application v{}\nUsage: nanogpt [run|login|logout|check|config]\nRequirements:\n",
        env!("CARGO_PKG_VERSION")
    );
    for requirement in REQUIREMENTS {
        text.push_str(&format!("  - {requirement}\n"));
    }
    text.push_str("  - API key configured via `nanogpt login`\n");
    text
}

/// Launch the chat application. Returns the process exit code.
pub fn run(store: ConfigStore, python: &str) -> i32 {
    print!("{}", banner());
    println!("Starting application...");

    let config_path = store.path().to_path_buf();
    let mut launcher = Launcher::new(
        SystemEnvironment::new(python),
        store,
        KeyringStore,
        TerminalPrompt::new(),
        ChatProcess::new(python),
    );

    match launcher.launch() {
        Ok(exit) => {
            if !exit.success() {
                log::warn!("Chat UI exited with code {}", exit.code);
            }
            exit.code
        }
        Err(e) => {
            log::debug!("Launch path: {:?}", launcher.history());
            eprintln!("{e}");
            match &e {
                LaunchError::PreconditionUnmet { which } => {
                    for requirement in which {
                        eprintln!("  - {}", requirement.remedy());
                    }
                    eprintln!("Run `nanogpt check` for details.");
                }
                LaunchError::Configuration { .. } => {
                    eprintln!("Check {} and the system keyring, then try again.", config_path.display());
                }
                LaunchError::Startup { .. } => {
                    eprintln!("Run `nanogpt check` for details.");
                }
                LaunchError::Cancelled => {
                    eprintln!("Run `nanogpt login` to store an API key.");
                }
            }
            e.exit_code()
        }
    }
}
