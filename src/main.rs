mod app;
mod i18n;
mod model;
mod profile;
mod services;
mod theme;
mod ui;
mod widgets;

use anyhow::{Context, Result};

// Logs go to a file: stderr shares the terminal with the alternate screen.
fn init_logging() -> Result<()> {
    let Ok(path) = std::env::var("HUB_PROFILE_LOG") else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {path}"))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("initializing logger")?;
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    ui::run()
}
