// fakeout-viewer: drives the list and detail pipelines from the command line
// and prints each resulting snapshot as JSON.
mod cli;

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use shared::models::{Candle, Fakeout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ViewArgs};
use viewer::config::AppConfig;
use viewer::services::{ApiClient, ContextKey, CsvDataSource, DataSource, FakeoutQuery, LoadCriteria, Loadable};
use viewer::state::{FilterKey, ListStatus, Navigator, Screen, ViewController};

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn show_page<R>(
    config: &AppConfig,
    source: &dyn DataSource,
    criteria: R::Criteria,
    filters: &[(FilterKey, Option<String>)],
    view: &ViewArgs,
) -> Result<()>
where
    R: Loadable + Clone + Serialize,
{
    let mut controller = ViewController::<R>::from_settings(&config.view);
    if let Some(order) = view.order {
        controller.set_sort(order.into());
    }
    if let Some(size) = view.page_size {
        if !config.view.page_size_options.contains(&size) {
            warn!(size, options = ?config.view.page_size_options, "Page size is not one of the configured options");
        }
        if !controller.set_page_size(size) {
            bail!("page size must be positive");
        }
    }

    controller.load(source, &criteria).await;
    for (key, value) in filters {
        if value.is_some() {
            controller.set_filter(*key, value.as_deref());
        }
    }
    controller.set_page(view.page);

    let snapshot = controller.snapshot();
    print_json(&snapshot)?;
    if let ListStatus::Failed { message } = snapshot.status {
        bail!(message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load_default()?,
    };
    init_tracing(&config.logging.filter);
    info!(version = %config.version, "Starting fakeout viewer");

    let source: Box<dyn DataSource> = match &args.csv_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Using CSV tables");
            Box::new(CsvDataSource::new(dir, config.symbols.clone()))
        }
        None => {
            let client = ApiClient::from_settings(&config.api)?;
            info!(base_url = %client.base_url(), "Using scanner API");
            Box::new(client)
        }
    };
    let source = &*source;

    match args.command {
        Command::Candles { symbol, timeframe, limit, view } => {
            config.ensure_timeframe(timeframe)?;
            let criteria = LoadCriteria {
                symbol: symbol.to_lowercase(),
                timeframe,
                limit: limit.unwrap_or(config.view.default_limit),
            };
            show_page::<Candle>(&config, source, criteria, &[], &view).await?;
        }
        Command::Fakeouts { symbol, timeframe, fakeout_type, limit, view } => {
            if let Some(timeframe) = timeframe {
                config.ensure_timeframe(timeframe)?;
            }
            // Fetch the latest fakeouts unfiltered and narrow them client-side.
            let query = FakeoutQuery::latest(limit.unwrap_or(config.view.default_limit));
            let filters = [
                (FilterKey::Symbol, symbol),
                (FilterKey::Timeframe, timeframe.map(|tf| tf.to_string())),
                (FilterKey::Type, fakeout_type.map(|t| t.to_string())),
            ];
            show_page::<Fakeout>(&config, source, query, &filters, &view).await?;
        }
        Command::Detail { id, symbol, timeframe } => {
            config.ensure_timeframe(timeframe)?;
            let key = ContextKey { id, symbol: symbol.to_lowercase(), timeframe };
            let mut navigator = Navigator::new();
            match navigator.open_by_key(source, &key).await? {
                Screen::Detail(view) => print_json(view)?,
                Screen::List => bail!("detail screen was not opened"),
            }
        }
        Command::Stats => print_json(&source.fetch_summary_counts().await?)?,
        Command::Status => print_json(&source.fetch_status().await?)?,
    }

    Ok(())
}
