use clap::Parser;

use sit_helpdesk::cli::{self, Cli};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    if let Err(e) = cli::run(args) {
        log::error!("{}", e);
        eprintln!("{}", serde_json::json!({ "error": e }));
        std::process::exit(1);
    }
}
