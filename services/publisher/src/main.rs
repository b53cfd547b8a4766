//! geoserver-publish command line.
//!
//! Publishes GRASS temporal raster datasets to GeoServer as discrete
//! layers or as a time-enabled image mosaic, publishes datasets through
//! the GRASS coverage store, and styles existing layers.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{ConnectionArgs, TransportArgs};
use geoserver_client::GeoServerClient;
use grass_store::GrassCli;
use publish_common::{DatasetType, PublishTarget};
use publishing::{
    publish_grass_layer, style_existing_layer, GrassLayerOptions, PublishOptions, Publisher,
    StyleOptions,
};

#[derive(Parser, Debug)]
#[command(name = "geoserver-publish")]
#[command(about = "Publish GRASS raster data to GeoServer")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export an STRDS and publish it as discrete layers or one mosaic
    PublishStrds {
        /// Name of the STRDS
        #[arg(long)]
        input: String,

        /// Publish one layer per timestep, named <prefix>_1 ... <prefix>_N
        #[arg(long, conflicts_with = "mosaic_layername")]
        layername_prefix: Option<String>,

        /// Publish one time-enabled mosaic layer
        #[arg(long)]
        mosaic_layername: Option<String>,

        /// Color ramp; rescales the maps to 1..255 and attaches a style
        #[arg(long)]
        color: Option<String>,

        /// Do not add the transparent quantity-0 entry to the style
        #[arg(long)]
        no_nodata_entry: bool,

        #[command(flatten)]
        transport: TransportArgs,
    },

    /// Publish a raster or STRDS read in place through the GRASS coverage store
    PublishGrass {
        /// Raster or STRDS name
        #[arg(long)]
        input: String,

        /// Dataset type: auto, raster or strds
        #[arg(long = "type", default_value = "auto")]
        dataset_type: DatasetType,

        #[arg(long)]
        storename: String,

        #[arg(long)]
        layername: String,

        /// Layer title, defaults to the layer name
        #[arg(long)]
        title: Option<String>,

        /// Path of the current mapset as seen by GeoServer
        #[arg(long)]
        gs_file_path: String,
    },

    /// Attach a style generated from a map's color table to a published layer
    Style {
        #[arg(long)]
        layername: String,

        /// Map or STRDS providing the color table; defaults to the layer's native coverage
        #[arg(long)]
        grassmap: Option<String>,

        /// Dataset type: auto, raster or strds
        #[arg(long = "type", default_value = "auto")]
        dataset_type: DatasetType,

        /// Do not add the transparent quantity-0 entry to the style
        #[arg(long)]
        no_nodata_entry: bool,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_tracing(level: Level, json: bool) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let level = parse_level(&args.log_level);
    init_tracing(level, args.log_json)?;

    let store = if level == Level::DEBUG || level == Level::TRACE {
        GrassCli::new().verbose()
    } else {
        GrassCli::new()
    };
    let client = GeoServerClient::new(args.connection.to_config())
        .context("Failed to create GeoServer client")?;
    info!(rest_root = %client.config().rest_root(), workspace = %client.workspace(), "Starting");

    match args.command {
        Command::PublishStrds {
            input,
            layername_prefix,
            mosaic_layername,
            color,
            no_nodata_entry,
            transport,
        } => {
            let target = PublishTarget::from_options(layername_prefix, mosaic_layername)?;
            let mut options = PublishOptions::new(input, target, transport.to_mode()?);
            options.color = color;
            options.nodata_entry = !no_nodata_entry;

            let publisher = Publisher::new(Arc::new(store), client);
            let report = publisher.publish_strds(&options).await?;
            println!("{}", report.summary());
        }
        Command::PublishGrass {
            input,
            dataset_type,
            storename,
            layername,
            title,
            gs_file_path,
        } => {
            let options = GrassLayerOptions {
                input,
                dataset_type,
                store_name: storename,
                layer: layername,
                title,
                gs_file_path,
            };
            let report = publish_grass_layer(&store, &client, &options).await?;
            println!("Published {} <{}> as layer {}.", report.kind, options.input, report.layer);
        }
        Command::Style {
            layername,
            grassmap,
            dataset_type,
            no_nodata_entry,
        } => {
            let options = StyleOptions {
                layer: layername,
                grass_map: grassmap,
                dataset_type,
                nodata_entry: !no_nodata_entry,
            };
            let map = style_existing_layer(&store, &client, &options).await?;
            println!("Styled layer {} from map {}.", options.layer, map);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTION: [&str; 11] = [
        "geoserver-publish",
        "--host",
        "http://localhost",
        "--port",
        "8080",
        "--user",
        "admin",
        "--password",
        "geoserver",
        "--workspace",
        "ws",
    ];

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(CONNECTION.iter().chain(extra.iter()).copied())
    }

    #[test]
    fn test_publish_strds_args() {
        let args = parse(&[
            "publish-strds",
            "--input",
            "lst",
            "--mosaic-layername",
            "lst_mosaic",
            "--color",
            "greens",
        ])
        .unwrap();

        assert_eq!(args.connection.to_config().rest_root(), "http://localhost:8080/geoserver/rest");
        match args.command {
            Command::PublishStrds {
                mosaic_layername,
                color,
                no_nodata_entry,
                ..
            } => {
                assert_eq!(mosaic_layername.as_deref(), Some("lst_mosaic"));
                assert_eq!(color.as_deref(), Some("greens"));
                assert!(!no_nodata_entry);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_prefix_and_mosaic_conflict() {
        let err = parse(&[
            "publish-strds",
            "--input",
            "lst",
            "--layername-prefix",
            "p",
            "--mosaic-layername",
            "m",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_dataset_type_parsed() {
        let args = parse(&["style", "--layername", "lst", "--type", "strds"]).unwrap();
        match args.command {
            Command::Style { dataset_type, .. } => assert_eq!(dataset_type, DatasetType::Strds),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(parse(&["style", "--layername", "lst", "--type", "vector"]).is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("bogus"), Level::INFO);
    }
}
