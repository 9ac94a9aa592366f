use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::error::Result;
use crate::pdf;

pub async fn handle_serve(config_path: Option<PathBuf>, bind: Option<SocketAddr>) -> Result<()> {
    let mut config = Config::load(config_path.as_deref())?;
    if let Some(bind) = bind {
        config.bind = bind;
    }

    let state = AppState::from_config(&config)?;
    let app = api::router(state, &config)?;
    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(database = %config.database.display(), "opened document store");

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
        trigger.cancel();
    });

    api::serve(listener, app, shutdown).await
}

#[derive(Serialize)]
struct PdfResult<'a> {
    output: &'a Path,
    pages: usize,
}

fn report(output: &Path, pages: usize, json: bool, verb: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&PdfResult { output, pages })?);
    } else {
        println!("{} {} page(s) into {}", verb, pages, output.display());
    }
    Ok(())
}

pub fn handle_pdf_merge(inputs: Vec<PathBuf>, output: PathBuf, json: bool) -> Result<()> {
    let pages = pdf::merge_files(&inputs, &output)?;
    report(&output, pages, json, "Merged")
}

pub fn handle_pdf_rotate(input: PathBuf, output: PathBuf, json: bool) -> Result<()> {
    let pages = pdf::rotate_file(&input, &output)?;
    report(&output, pages, json, "Rotated")
}
