mod geotiff;
mod output;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use canopy_vector::{
    COMBINED_NAME, Crs, FeatureSet, RasterLayer, RunConfig, build_combined_mask, clean_mask,
    pixel_area_m2, run_all,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::geotiff::read_geotiff;
use crate::output::{OutputSummary, read_json, save_mask_png, write_geojson, write_json};

#[derive(Parser, Debug)]
#[command(name = "canopy_vector")]
#[command(about = "Extract canopy candidate polygons from vegetation index rasters")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Threshold, clean and vectorize every layer and their intersection.
    #[command(name = "run")]
    Run(RunArgs),
    /// Print georeferencing and value range of a GeoTIFF.
    #[command(name = "info")]
    Info(InfoArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// JSON run configuration.
    #[arg(long, required = true)]
    config: PathBuf,
    /// Index layer as NAME=PATH; repeat once per layer.
    #[arg(long = "layer", value_parser = parse_layer_arg, required = true)]
    layers: Vec<(String, PathBuf)>,
    #[arg(long, default_value = "out")]
    out: PathBuf,
    /// CRS for inputs without GeoKeys, e.g. EPSG:32748.
    #[arg(long)]
    crs: Option<Crs>,
    /// Also write the combined mask before and after cleaning as PNG.
    #[arg(long, default_value_t = false)]
    mask_png: bool,
}

#[derive(Args, Debug, Clone)]
struct InfoArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long)]
    crs: Option<Crs>,
}

#[derive(Debug, Clone, Serialize)]
struct RunSummary {
    config: RunConfig,
    outputs: BTreeMap<String, OutputSummary>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Run(args) => run(args),
        Command::Info(args) => info(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config: RunConfig = read_json(&args.config)?;
    config
        .validate_for(args.layers.iter().map(|(name, _)| name.as_str()))
        .with_context(|| format!("validating {}", args.config.display()))?;

    let mut layers = BTreeMap::new();
    for (name, path) in &args.layers {
        let tif = read_geotiff(path, args.crs)?;
        tracing::info!(
            layer = %name,
            path = %path.display(),
            width = tif.layer.width(),
            height = tif.layer.height(),
            crs = %tif.layer.crs(),
            "loaded layer"
        );
        if layers.insert(name.clone(), tif.layer).is_some() {
            bail!("layer `{name}` given more than once");
        }
    }

    let report = run_all(&layers, &config)?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    let crs = reference_crs(&layers)?;
    let mut outputs = BTreeMap::new();
    for (name, set) in report.outputs() {
        let file = match set {
            Some(set) => {
                let file = format!("{name}_polygons.geojson");
                write_geojson(&args.out.join(&file), set)?;
                tracing::info!(output = name, features = set.len(), file = %file, "wrote features");
                Some(file)
            }
            None => None,
        };
        let summary = match set {
            Some(set) => set.summary(),
            None => FeatureSet::empty(crs).summary(),
        };
        outputs.insert(name.to_string(), OutputSummary { file, summary });
    }

    if args.mask_png && report.combined.is_ok() {
        let combined = build_combined_mask(&layers, &config)?;
        let cleaned = clean_mask(
            &combined,
            config.morph_open_radius,
            config.morph_close_radius,
        );
        save_mask_png(&args.out.join("Combined_mask_raw.png"), &combined)?;
        save_mask_png(&args.out.join("Combined_mask_clean.png"), &cleaned)?;
    }

    write_json(&args.out.join("summary.json"), &RunSummary { config, outputs })?;

    match report.combined {
        Ok(combined) => {
            let features = combined.as_ref().map_or(0, FeatureSet::len);
            tracing::info!(output = COMBINED_NAME, features, "run finished");
            Ok(())
        }
        Err(err) => Err(err).context("combined run failed after writing per-layer outputs"),
    }
}

fn info(args: InfoArgs) -> Result<()> {
    let tif = read_geotiff(&args.input, args.crs)?;
    let layer = &tif.layer;
    let t = layer.transform();

    println!("file:        {}", args.input.display());
    println!("size:        {} x {} ({} band(s))", layer.width(), layer.height(), tif.bands);
    println!("crs:         {} ({:?})", layer.crs(), layer.crs().kind);
    println!(
        "transform:   [{}, {}, {}, {}, {}, {}]",
        t.a, t.b, t.c, t.d, t.e, t.f
    );
    println!("pixel size:  {} x {}", t.a.abs(), t.e.abs());
    let pixel_area = pixel_area_m2(t, layer.crs(), layer.width(), layer.height())
        .context("measuring pixel area")?;
    println!("pixel area:  {pixel_area:.3} m2");
    match tif.nodata {
        Some(nd) => println!("nodata:      {nd}"),
        None => println!("nodata:      none"),
    }
    match layer.finite_range() {
        Some((lo, hi)) => println!("value range: [{lo}, {hi}]"),
        None => println!("value range: no finite samples"),
    }
    Ok(())
}

fn reference_crs(layers: &BTreeMap<String, RasterLayer>) -> Result<Crs> {
    layers
        .values()
        .next()
        .map(|layer| *layer.crs())
        .context("no layers loaded")
}

fn parse_layer_arg(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got `{s}`")),
    }
}
