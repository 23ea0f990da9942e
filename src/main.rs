use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tagdb::loader::read;
use tagdb::settings::Settings;

// usage: tagdb <store file> [query]
fn main() -> ExitCode {
    let settings = match Settings::load("tagdb") {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(file) = args.next() else {
        error!("usage: tagdb <store file> [query]");
        return ExitCode::FAILURE;
    };
    let query = args.next().unwrap_or_default();
    let db = match read(Path::new(&file), None, &settings) {
        Ok(db) => db,
        Err(e) => {
            error!(%e, "could not load store");
            return ExitCode::FAILURE;
        }
    };
    info!(%file, ids = db.len(), columns = db.columns().count(), "store loaded");
    match db.query(&query) {
        Ok(ids) => {
            for id in ids {
                println!("{id}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(%e, %query, "query failed");
            ExitCode::FAILURE
        }
    }
}
