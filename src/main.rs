//! Command line front end for the grid engine.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use flexi_logger::Logger;
use geojson::FeatureCollection;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use tasking_grid::{
    generate_grid, multi_polygon_to_feature_collection, parse_feature_collection, GridConfig,
    GridService,
};

fn aoi_arg() -> Arg {
    Arg::new("aoi")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("GeoJSON FeatureCollection with the area of interest")
}

fn clip_arg() -> Arg {
    Arg::new("clip")
        .long("clip")
        .action(ArgAction::SetTrue)
        .help("Clip partially covered tiles to the AOI")
}

fn cli() -> Command {
    Command::new("Tasking Grid")
        .version("1.0")
        .about("Builds mapping-project task grids from an area of interest")
        .subcommand_required(true)
        .arg(
            Arg::new("srid")
                .long("srid")
                .global(true)
                .value_parser(value_parser!(u32))
                .default_value("4326")
                .help("SRID the input collections must use"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Write the result here instead of stdout"),
        )
        .subcommand(
            Command::new("merge")
                .about("Merge an AOI into a single MultiPolygon")
                .arg(aoi_arg())
                .arg(
                    Arg::new("dissolve")
                        .long("dissolve")
                        .action(ArgAction::SetTrue)
                        .help("Union the polygons, removing shared boundaries"),
                ),
        )
        .subcommand(
            Command::new("trim")
                .about("Keep the tiles of a grid that overlap the AOI")
                .arg(
                    Arg::new("grid")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("GeoJSON FeatureCollection of tiles with x/y/zoom properties"),
                )
                .arg(aoi_arg())
                .arg(clip_arg()),
        )
        .subcommand(
            Command::new("tasks")
                .about("Turn each AOI feature into an arbitrary task")
                .arg(aoi_arg()),
        )
        .subcommand(
            Command::new("grid")
                .about("Generate a tile grid over the AOI and trim it")
                .arg(aoi_arg())
                .arg(
                    Arg::new("zoom")
                        .short('z')
                        .long("zoom")
                        .required(true)
                        .value_parser(value_parser!(u8))
                        .help("Tile zoom level"),
                )
                .arg(clip_arg()),
        )
}

fn read_collection(matches: &ArgMatches, id: &str) -> Result<FeatureCollection> {
    let path = matches.get_one::<PathBuf>(id).context("missing input path")?;
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_feature_collection(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_collection(fc: &FeatureCollection, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(fc)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Output written to: {}", path.display());
        },
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> Result<()> {
    let _logger = Logger::try_with_env_or_str("info")?.start()?;
    let matches = cli().get_matches();

    let srid = matches.get_one::<u32>("srid").copied().unwrap_or(tasking_grid::DEFAULT_SRID);
    let output = matches.get_one::<PathBuf>("output").map(PathBuf::as_path);
    let service = GridService::new(GridConfig { srid });

    let result = match matches.subcommand() {
        Some(("merge", sub)) => {
            let aoi = read_collection(sub, "aoi")?;
            let merged = service.merge_to_multi_polygon(&aoi, sub.get_flag("dissolve"))?;
            multi_polygon_to_feature_collection(&merged)
        },
        Some(("trim", sub)) => {
            let grid = read_collection(sub, "grid")?;
            let aoi = read_collection(sub, "aoi")?;
            service.trim_grid_to_aoi(&grid, &aoi, sub.get_flag("clip"))?
        },
        Some(("tasks", sub)) => {
            let aoi = read_collection(sub, "aoi")?;
            service.tasks_from_aoi_features(&aoi)?
        },
        Some(("grid", sub)) => {
            let aoi = read_collection(sub, "aoi")?;
            let zoom = sub.get_one::<u8>("zoom").copied().context("missing zoom")?;
            let merged = service.merge_to_multi_polygon(&aoi, true)?;
            let grid = generate_grid(&merged, zoom)?;
            service.trim_grid_to_aoi(&grid, &aoi, sub.get_flag("clip"))?
        },
        _ => unreachable!("a subcommand is required"),
    };

    write_collection(&result, output)
}
