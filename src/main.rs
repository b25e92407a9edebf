mod cli;
mod config;
mod credentials;
mod launcher;
mod preconditions;
mod prompt;
mod secret;
mod session;

pub fn main() {
    cli::exec();
}
