pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod datastore;
pub mod filter;
pub mod render;
pub mod router;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use crate::cli::GlobalCli;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::router::Route;
use crate::store::Store;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let split = cli::split_rc_overrides(&raw_args);
    let cli = GlobalCli::parse_from(split.argv);
    cli::init_tracing(cli.verbose, cli.quiet)?;
    info!(verbose = cli.verbose, quiet = cli.quiet, "starting todo CLI");

    let mut cfg = Config::load(cli.todorc.as_deref())?;
    let overrides = split.overrides.into_iter().chain(cli.rc_overrides.iter().cloned());
    cfg.apply_overrides(overrides.map(|rc| (rc.key, rc.value)));

    let mut store = open_store(&cfg, &cli)?;
    let route = initial_route(&cfg, &cli);
    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;

    commands::dispatch(&mut store, &mut renderer, &route, inv)?;

    info!("done");
    Ok(())
}

fn open_store(cfg: &Config, cli: &GlobalCli) -> anyhow::Result<Store> {
    let data_dir = config::resolve_data_dir(cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    let datastore = DataStore::open(&data_dir)
        .with_context(|| format!("failed to open datastore at {}", data_dir.display()))?;
    Ok(Store::new(datastore))
}

// --route wins over the configured default.route.
fn initial_route(cfg: &Config, cli: &GlobalCli) -> Route {
    let fragment = cli.route.clone().unwrap_or_else(|| cfg.default_route());
    let route = Route::from_fragment(&fragment);
    debug!(fragment = %fragment, filter_by = ?route.filter_by, "initial route");
    route
}
