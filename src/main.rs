use mapbox_vt_rs::config;
use mapbox_vt_rs::mapbox::common::map_error::MapError;
use mapbox_vt_rs::mapbox::style;
use mapbox_vt_rs::mapbox::style_model::Style;
use mapbox_vt_rs::mapbox::vector_tile_decoder::DecodedTile;
use mapbox_vt_rs::mapbox::vector_tile_id::VectorTileID;
use mapbox_vt_rs::mapbox::vector_tile_manager::VectorTileManager;

use clap::Parser;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Decodes Mapbox vector tiles and evaluates a style against their features.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tiles to decode, as `z/x/y=path/to/tile.pbf`
    #[arg(required = true, value_parser = parse_tile_arg)]
    tiles: Vec<(VectorTileID, PathBuf)>,

    /// Style document used to skip unused layers and count visible features
    #[arg(short, long)]
    style: Option<PathBuf>,

    /// Zoom used when evaluating the style; defaults to each tile's zoom
    #[arg(short, long)]
    zoom: Option<f64>,

    /// Print the decoded tiles as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Decode worker threads
    #[arg(short, long, default_value_t = config::DECODE_WORKER_COUNT)]
    workers: usize,
}

fn parse_tile_arg(arg: &str) -> Result<(VectorTileID, PathBuf), String> {
    let mut split = arg.splitn(2, '=');
    let (id, path) = match (split.next(), split.next()) {
        (Some(id), Some(path)) if !path.is_empty() => (id, path),
        _ => return Err(format!("expected z/x/y=path, got '{}'", arg)),
    };
    let id = id.parse::<VectorTileID>().map_err(|err| err.to_string())?;
    Ok((id, PathBuf::from(path)))
}

fn main() {
    env_logger::init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), MapError> {
    let style = match &cli.style {
        Some(path) => {
            let style = style::load_str(&fs::read_to_string(path)?)?;
            info!("Loaded style '{}' with {} layers", style.name, style.layers.len());
            Some(Arc::new(style))
        }
        None => None,
    };

    let mut requests = vec![];
    for (tile_id, path) in &cli.tiles {
        requests.push((*tile_id, fs::read(path)?));
    }

    let manager = VectorTileManager::new(style.clone(), cli.workers);
    let mut failed = 0;
    for (tile_id, result) in manager.decode_tiles(requests) {
        match result {
            Ok(tile) if cli.json => println!("{}", serde_json::to_string_pretty(&tile)?),
            Ok(tile) => {
                let zoom = cli.zoom.unwrap_or(tile_id.z as f64);
                print_summary(&tile_id, &tile, style.as_deref(), zoom);
            }
            Err(err) => {
                println!("Error: VectorTile {} failed: {}", tile_id, err);
                failed += 1;
            }
        }
    }

    if let Some(style) = &style {
        for source in &style.sources {
            if let Some(attribution) = &source.attribution {
                println!("[{}] {}", source.name, attribution);
            }
        }
    }

    if failed > 0 {
        return Err(MapError::pbf(&format!("{} tile(s) failed to decode", failed)));
    }
    Ok(())
}

fn print_summary(tile_id: &VectorTileID, tile: &DecodedTile, style: Option<&Style>, zoom: f64) {
    println!("> VectorTile {} ({} layers)", tile_id, tile.layers.len());
    for layer in &tile.layers {
        println!(" -- {}: {} features", layer.name, layer.features.len());

        let style = match style {
            Some(style) => style,
            None => continue,
        };
        for style_layer in style.layers_for(&layer.name, tile_id.z) {
            let visible = layer
                .features
                .iter()
                .filter(|feature| style_layer.is_visible(&feature.attributes_at(zoom)))
                .count();
            println!(
                "    [{}] {}: {} visible",
                style_layer.kind.name(),
                style_layer.id,
                visible
            );
        }
    }
}
