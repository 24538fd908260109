use anyhow::Context;
use clap::Parser;
use relm4::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use wikispiral::config::{self, Overrides};
use wikispiral::gui::app::{AppInit, AppModel};
use wikispiral::source::WikidataClient;
use wikispiral::sys::runtime;

#[derive(Parser, Debug)]
#[command(name = "wikispiral", version, about = "Browse Wikidata as a spiral menu")]
struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the default configuration file and print its path
    #[arg(long)]
    write_config: bool,

    #[command(flatten)]
    overrides: Overrides,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.write_config {
        let path = config::write_default_config().context("Failed to write default config")?;
        println!("{}", path.display());
        return Ok(());
    }

    let config = config::load_or_default(cli.config.as_deref(), &cli.overrides);
    config.validate()?;
    let config_path = cli.config.clone().or_else(|| config::get_config_path().ok());

    let source = Arc::new(WikidataClient::new().context("Failed to set up the HTTP client")?);
    let (event_tx, event_rx) = async_channel::bounded(32);
    let (request_tx, request_rx) = async_channel::unbounded();

    // Start Background Services
    runtime::start_background_services(source, request_rx, event_tx, config_path.clone());

    let app = RelmApp::new("org.wikispiral.WikiSpiral").with_args(Vec::new());

    app.run::<AppModel>(AppInit {
        config,
        config_path,
        overrides: cli.overrides,
        requests: request_tx,
        events: event_rx,
    });
    Ok(())
}
