use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Map, Value};
use std::{io::Write, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use vitiscraper::{Pipeline, Settings};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Fetch Vitibrasil datasets and reshape them into year series"
)]
struct Args {
    /// Dataset name, `all` for every dataset, or `list` to print the names
    target: String,
    /// Write JSON here instead of stdout
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging (stderr, stdout is for JSON) ────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vitiscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) arguments ────────────────────────────────────────────────
    let Args { target, output } = Args::parse();

    // ─── 3) settings + catalog, loaded once ──────────────────────────
    let settings = Settings::from_env().context("reading settings")?;
    let catalog = settings.load_catalog().context("loading dataset catalog")?;
    info!(datasets = catalog.len(), timeout = ?settings.timeout, "startup");

    if target == "list" {
        for name in catalog.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let pipeline = Pipeline::new(catalog, settings);

    // ─── 4) run ──────────────────────────────────────────────────────
    let value = if target == "all" {
        let mut out = Map::new();
        for (name, result) in pipeline.run_all().await {
            let entry = match result {
                Ok(records) => serde_json::to_value(records)?,
                Err(e) => json!({ "error": e.to_string() }),
            };
            out.insert(name, entry);
        }
        Value::Object(out)
    } else {
        match pipeline.run(&target).await {
            Ok(records) => serde_json::to_value(records)?,
            Err(e) => {
                error!(dataset = %target, error = %e, "failed");
                return Err(e).with_context(|| format!("dataset {target}"));
            }
        }
    };

    // ─── 5) write ────────────────────────────────────────────────────
    let body = serde_json::to_vec_pretty(&value)?;
    match output {
        Some(path) => {
            std::fs::write(&path, &body)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), bytes = body.len(), "written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}
