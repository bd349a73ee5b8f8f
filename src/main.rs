mod calendar;
mod cli;
mod config;
mod finalize;
mod gate;
mod hex;
mod model;
mod projector;
mod rollover;
mod storage;
mod trails;

use std::process;

use config::Config;
use storage::Storage;

fn main() {
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let root = Storage::default_root().unwrap_or_else(|| {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    });
    let storage = match Storage::new(root) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Failed to initialize storage: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&config, &storage) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
