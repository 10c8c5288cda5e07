//! Command-line interface for `GeoScan`, spatial scan utilities for feature collections.
//!
//! This binary provides a thin CLI over the [`geoscan_core`] library, running its scan
//! workflows against a workspace opened through a provider.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! Library crates log through the `log` facade, which is bridged into `tracing` at startup.
//!
//! # Available Commands
//!
//! - `nearest` - Find the feature closest to a reference geometry
//! - `extent` - Compute the aggregated, expanded extent of a workspace or dataset
//! - `copy` - Copy matching features from one feature class into another
//! - `ids` - List the identifiers of matching records
//! - `info` - Describe the collections of a workspace
//! - `providers` - List the workspace providers and their capabilities

mod display;

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use geozero::ToGeo;
use geozero::wkt::Wkt;
use tracing::{Level, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use geoscan_core::catalog::feature_class_names;
use geoscan_core::operations::{self, SearchOptions};
use geoscan_core::providers::{self, Provider, get_providers};
use geoscan_core::utils::format_envelope;
use geoscan_core_common::{Geometry, Shape, SpatialReference};
use geoscan_geojson::DirectoryWorkspace;

use crate::display::{COORDINATE_PRECISION, display_collections, display_providers};

#[derive(Parser)]
#[command(
    name = "geoscan",
    version,
    about = "Spatial scan utilities for vector feature collections",
    long_about = "GeoScan runs nearest-feature searches, extent aggregation and feature copies\n\
                  over the collections of a workspace."
)]
/// Command-line arguments and options for the `GeoScan` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    /// Provider used to open the workspace.
    #[arg(long, global = true, value_name = "PROVIDER", default_value = "GeoJSON")]
    provider: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `GeoScan` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Finds the feature nearest to a reference geometry.
    Nearest {
        /// Workspace directory.
        #[arg(short, long, value_name = "DIR")]
        workspace: String,

        /// Feature class to search.
        #[arg(short, long, value_name = "NAME")]
        layer: String,

        /// Reference geometry as WKT (e.g., "POINT (2600000 1200000)").
        #[arg(short, long, value_name = "WKT")]
        reference: String,

        /// Spatial reference (WKID) of the reference geometry.
        #[arg(long, value_name = "WKID")]
        wkid: Option<u32>,

        /// Only consider features within this distance; zero or less disables the buffer.
        #[arg(long, value_name = "DISTANCE", allow_negative_numbers = true)]
        radius: Option<f64>,

        /// Attribute filter applied to candidates.
        #[arg(long = "where", value_name = "CLAUSE")]
        where_clause: Option<String>,

        /// Require the layer to belong to this feature dataset.
        #[arg(long, value_name = "DATASET")]
        dataset: Option<String>,
    },

    /// Computes the extent of the feature classes at the root or in a dataset,
    /// expanded by 25% on both axes.
    Extent {
        /// Workspace directory.
        #[arg(short, long, value_name = "DIR")]
        workspace: String,

        /// Feature dataset to aggregate instead of the workspace root.
        #[arg(long, value_name = "DATASET")]
        dataset: Option<String>,
    },

    /// Copies features between two feature classes of the same workspace, mapping
    /// fields by name.
    Copy {
        /// Workspace directory.
        #[arg(short, long, value_name = "DIR")]
        workspace: String,

        /// Feature class to read from.
        #[arg(short, long, value_name = "NAME")]
        source: String,

        /// Feature class to append to.
        #[arg(short, long, value_name = "NAME")]
        target: String,

        /// Attribute filter selecting the source features.
        #[arg(long = "where", value_name = "CLAUSE")]
        where_clause: Option<String>,

        /// Write the updated target here instead of back to its own file.
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,
    },

    /// Lists the identifiers of the records matching a filter.
    Ids {
        /// Workspace directory.
        #[arg(short, long, value_name = "DIR")]
        workspace: String,

        /// Collection to scan.
        #[arg(short, long, value_name = "NAME")]
        layer: String,

        /// Attribute filter.
        #[arg(long = "where", value_name = "CLAUSE")]
        where_clause: Option<String>,

        /// Integer field to report instead of the object identifier.
        #[arg(long, value_name = "FIELD")]
        id_field: Option<String>,
    },

    /// Describes the collections of a workspace.
    Info {
        /// Workspace directory.
        #[arg(short, long, value_name = "DIR")]
        workspace: String,

        /// Only describe this feature dataset.
        #[arg(long, value_name = "DATASET")]
        dataset: Option<String>,
    },

    /// Lists all workspace providers and their capabilities.
    Providers,
}

/// Entry point for the `GeoScan` command-line interface.
///
/// # Errors
///
/// Returns an error if command execution fails or if the logging system cannot be initialized.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Nearest {
            workspace,
            layer,
            reference,
            wkid,
            radius,
            where_clause,
            dataset,
        } => {
            let options = SearchOptions { radius, where_clause };
            let reference = parse_reference(&reference, wkid)?;
            handle_nearest(
                &cli.provider,
                &workspace,
                &layer,
                &reference,
                &options,
                dataset.as_deref(),
            )?;
        },
        Commands::Extent { workspace, dataset } => {
            handle_extent(&cli.provider, &workspace, dataset.as_deref())?;
        },
        Commands::Copy {
            workspace,
            source,
            target,
            where_clause,
            output,
        } => {
            info!("Copying {source} to {target}");
            handle_copy(
                &cli.provider,
                &workspace,
                &source,
                &target,
                where_clause.as_deref(),
                output.as_deref(),
            )?;
        },
        Commands::Ids {
            workspace,
            layer,
            where_clause,
            id_field,
        } => {
            handle_ids(
                &cli.provider,
                &workspace,
                &layer,
                where_clause.as_deref(),
                id_field.as_deref(),
            )?;
        },
        Commands::Info { workspace, dataset } => {
            info!("Displaying info for {workspace}");
            handle_info(&cli.provider, &workspace, dataset.as_deref())?;
        },
        Commands::Providers => {
            display_providers(&get_providers());
        },
    }

    Ok(())
}

/// Parses a WKT reference geometry, tagging it with `wkid` when given.
fn parse_reference(wkt: &str, wkid: Option<u32>) -> Result<Shape> {
    let geometry: geo_types::Geometry<f64> = Wkt(wkt)
        .to_geo()
        .map_err(|err| anyhow!("Invalid reference geometry '{wkt}': {err}"))?;
    let shape = Shape::new(Geometry::from_geo(geometry));
    Ok(match wkid {
        Some(wkid) => shape.with_spatial_reference(SpatialReference(wkid)),
        None => shape,
    })
}

fn resolve_provider(name: &str) -> Result<Provider> {
    providers::find_provider(name).ok_or_else(|| anyhow!("Provider '{name}' not found."))
}

fn open_workspace(provider: &Provider, path: &str) -> Result<DirectoryWorkspace> {
    if !provider.short_name.eq_ignore_ascii_case("GeoJSON") {
        return Err(anyhow!(
            "Provider '{}' cannot open workspaces yet.",
            provider.short_name
        ));
    }
    DirectoryWorkspace::open(path).with_context(|| format!("Failed to open workspace '{path}'"))
}

fn handle_nearest(
    provider_name: &str,
    workspace_path: &str,
    layer: &str,
    reference: &Shape,
    options: &SearchOptions,
    dataset: Option<&str>,
) -> Result<()> {
    let provider = resolve_provider(provider_name)?;
    if !provider.capabilities.search.is_supported() {
        return Err(anyhow!("Provider '{provider_name}' does not support search."));
    }
    let workspace = open_workspace(&provider, workspace_path)?;

    if let Some(dataset) = dataset
        && !feature_class_names(&workspace, Some(dataset))?
            .iter()
            .any(|name| name == layer)
    {
        return Err(anyhow!("'{layer}' is not a feature class of dataset '{dataset}'."));
    }

    let result = operations::nearest(&workspace, &provider, layer, reference, options)?;
    match result.oid {
        Some(oid) => println!("Nearest feature: OID {oid} at distance {:.3}", result.distance),
        None => println!("No feature found."),
    }
    Ok(())
}

fn handle_extent(provider_name: &str, workspace_path: &str, dataset: Option<&str>) -> Result<()> {
    let provider = resolve_provider(provider_name)?;
    if !provider.capabilities.extent.is_supported() {
        return Err(anyhow!("Provider '{provider_name}' does not support extent."));
    }
    let workspace = open_workspace(&provider, workspace_path)?;

    match operations::extent(&workspace, &provider, dataset)? {
        Some(extent) => println!("Extent: {}", format_envelope(&extent, COORDINATE_PRECISION)),
        None => println!("No features found."),
    }
    Ok(())
}

fn handle_copy(
    provider_name: &str,
    workspace_path: &str,
    source: &str,
    target: &str,
    where_clause: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    let provider = resolve_provider(provider_name)?;
    if !provider.capabilities.insert.is_supported() {
        return Err(anyhow!("Provider '{provider_name}' does not support insert."));
    }
    let workspace = open_workspace(&provider, workspace_path)?;

    let written = operations::copy(&workspace, &provider, source, target, where_clause)?;
    println!("Copied {written} feature(s) from '{source}' to '{target}'.");

    match output {
        Some(path) => {
            workspace.save_collection_to(target, Path::new(path))?;
            info!("Saved '{target}' to {path}");
        },
        None if written > 0 => {
            workspace.save()?;
        },
        None => {},
    }
    Ok(())
}

fn handle_ids(
    provider_name: &str,
    workspace_path: &str,
    layer: &str,
    where_clause: Option<&str>,
    id_field: Option<&str>,
) -> Result<()> {
    let provider = resolve_provider(provider_name)?;
    let workspace = open_workspace(&provider, workspace_path)?;

    for id in operations::list_ids(&workspace, &provider, layer, where_clause, id_field)? {
        println!("{id}");
    }
    Ok(())
}

fn handle_info(provider_name: &str, workspace_path: &str, dataset: Option<&str>) -> Result<()> {
    let provider = resolve_provider(provider_name)?;
    let workspace = open_workspace(&provider, workspace_path)?;

    let infos = operations::describe(&workspace, dataset)?;
    display_collections(workspace_path, &infos);
    Ok(())
}
