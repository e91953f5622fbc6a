//! dsfind: find files across every datastore of a catalog, in parallel.

mod cli;
mod output;

use crate::cli::Args;
use crate::output::ProgressBarSink;
use clap::Parser;
use dsfind_catalog::CatalogHandle;
use dsfind_catalog::backend::LocalCatalog;
use dsfind_config::{CatalogConfig, Config};
use dsfind_scanner::{ProgressSink, TracingSink, find_files};
use miette::{IntoDiagnostic, WrapErr, miette};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Some volumes could not be searched.
const EXIT_PARTIAL: u8 = 2;
/// Interrupted with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> miette::Result<ExitCode> {
    let args = Args::parse();
    setup_logging();

    let config = Config::load(args.config.as_deref()).map_err(|e| miette!("{e:?}"))?;
    let catalog = open_catalog(&args, &config)?;
    let request = args.request(&config.scan).map_err(|e| miette!("{e:?}"))?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(cancel.clone()));

    let bar = (!args.quiet).then(ProgressBarSink::new);
    // Without a bar, progress goes to the log (visible with RUST_LOG=info).
    let sink: &dyn ProgressSink = match &bar {
        Some(bar) => bar,
        None => &TracingSink,
    };
    let result = find_files(&catalog, &request, sink, &cancel).await;
    if let Some(bar) = &bar {
        bar.finish();
    }
    let report = result.map_err(|e| miette!("{e:?}"))?;

    output::print_matches(&report.matches, request.spec.details.size);
    output::print_summary(&report);
    output::print_errors(&report.errors);

    Ok(match (report.cancelled, report.is_clean()) {
        (true, _) => ExitCode::from(EXIT_INTERRUPTED),
        (false, false) => ExitCode::from(EXIT_PARTIAL),
        (false, true) => ExitCode::SUCCESS,
    })
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

/// `--root` wins over the configured catalog.
fn open_catalog(args: &Args, config: &Config) -> miette::Result<CatalogHandle> {
    let (name, root) = match (&args.root, &config.catalog) {
        (Some(root), _) => ("local".to_string(), root.clone()),
        (None, Some(CatalogConfig::Local { root, name })) => {
            (name.clone().unwrap_or_else(|| "local".to_string()), root.clone())
        },
        (None, None) => {
            return Err(miette!(help = "pass --root or set catalog.root in the configuration", "no catalog configured"));
        },
    };
    let root = root
        .canonicalize()
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot open catalog root {}", root.display()))?;
    let catalog = LocalCatalog::new(name, root).map_err(|e| miette!("{e:?}"))?;
    tracing::debug!(root = %catalog.root().display(), "Using local catalog");
    Ok(Arc::new(catalog))
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("Interrupted; cancelling outstanding searches");
        cancel.cancel();
    }
}
