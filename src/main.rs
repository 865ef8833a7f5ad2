mod app;
mod args;
mod config;
mod domain;
mod echo;
mod entry;
mod error;
mod logger;
mod report;
mod runtime;
mod samples;
mod shutdown;
mod shutdown_handlers;

use error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
