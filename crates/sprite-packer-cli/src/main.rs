use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::{DynamicImage, ImageReader, RgbaImage};
use serde::Deserialize;
use sprite_packer_core::{
    AtlasLayout, AtlasMetadata, ExpandStrategy, InputImage, PackSettings, PackStats,
    RankStrategy, pack_images, pack_layout, to_json, to_json_hash,
};
use tracing::{error, info};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "sprite-packer",
    about = "Pack a directory of sprites into texture atlases",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack images into atlases and write images + metadata
    Pack(PackArgs),
    /// Layout-only export: compute placements and write metadata, no images
    Layout(PackArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Atlas naming pattern with one integer placeholder (%d, %02d, {})
    #[arg(short, long, default_value = "atlas_%02d", help_heading = "Input/Output")]
    name: String,
    /// Atlas image format (file extension)
    #[arg(long, default_value = "png", help_heading = "Input/Output")]
    format: String,
    /// YAML config file path (its fields override the command line)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Layout
    /// Max atlas width
    #[arg(long, default_value_t = 4096, help_heading = "Layout")]
    max_width: u32,
    /// Max atlas height
    #[arg(long, default_value_t = 4096, help_heading = "Layout")]
    max_height: u32,
    /// Padding around the whole atlas
    #[arg(long, default_value_t = 0, help_heading = "Layout")]
    border_padding: u32,
    /// Padding between sprites
    #[arg(long, default_value_t = 2, help_heading = "Layout")]
    shape_padding: u32,
    /// Grow width and height together
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    force_square: bool,
    /// Grow by doubling
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    force_pot: bool,
    /// Expand strategy: both|width|height|short|long
    #[arg(long, default_value = "short", help_heading = "Layout")]
    expand: String,
    /// Rank heuristic: baf|bssf|blsf
    #[arg(long, default_value = "baf", help_heading = "Layout")]
    rank: String,
    /// Allow 90° rotated placements
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    allow_rotation: bool,

    // Image Processing
    /// Resample factor applied before trimming
    #[arg(long, default_value_t = 1.0, help_heading = "Image Processing")]
    scale: f64,
    /// Trim pixels with alpha below this (0 disables trimming)
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    trim_threshold: u8,
    /// Repeat edge pixels this far around each sprite
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    extrude: u32,
    /// Bleed edge colours into transparent atlas pixels
    #[arg(long, default_value_t = false, help_heading = "Image Processing")]
    reduce_border_artifacts: bool,
    /// Number of bleeding passes
    #[arg(long, default_value_t = 4, help_heading = "Image Processing")]
    bleed_iterations: u32,

    // Export
    /// Metadata format: json-array | json (alias) | json-hash
    #[arg(long, default_value = "json-array", value_parser = ["json-array", "json", "json-hash"], help_heading = "Export")]
    metadata: String,
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: compute layout and stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let show_progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Pack(args) => run_pack(args, show_progress, false),
        Commands::Layout(args) => run_pack(args, show_progress, true),
    }
}

fn settings_from_args(cli: &PackArgs) -> anyhow::Result<PackSettings> {
    let expand_strategy: ExpandStrategy = cli
        .expand
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown expand strategy: {}", cli.expand))?;
    let rank_strategy: RankStrategy = cli
        .rank
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown rank heuristic: {}", cli.rank))?;
    let settings = PackSettings::builder()
        .with_max_dimensions(cli.max_width, cli.max_height)
        .border_padding(cli.border_padding)
        .shape_padding(cli.shape_padding)
        .force_square(cli.force_square)
        .force_pot(cli.force_pot)
        .scale(cli.scale)
        .trim_alpha_threshold(cli.trim_threshold)
        .extrude_size(cli.extrude)
        .reduce_border_artifacts(cli.reduce_border_artifacts)
        .bleed_iterations(cli.bleed_iterations)
        .output_naming_pattern(cli.name.clone())
        .output_format(cli.format.clone())
        .expand_strategy(expand_strategy)
        .rank_strategy(rank_strategy)
        .allow_rotation(cli.allow_rotation)
        .build();

    // Config file overrides the command line field by field
    let settings = match &cli.config {
        Some(path) => {
            let file = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            let y: YamlConfig = serde_yaml::from_str(&file)
                .with_context(|| format!("parse config {}", path.display()))?;
            y.into_pack_settings(settings)?
        }
        None => settings,
    };
    Ok(settings)
}

fn run_pack(cli: &PackArgs, show_progress: bool, layout_only: bool) -> anyhow::Result<()> {
    let settings = settings_from_args(cli)?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&settings)?),
            _ => println!("{}", serde_json::to_string_pretty(&settings)?),
        }
        return Ok(());
    }
    settings.validate()?;

    let paths = gather_paths(&cli.input, &cli.include, &cli.exclude)?;
    let inputs = load_images_with_progress(&paths, show_progress)?;
    info!(count = inputs.len(), "loaded input images");

    let write = !cli.dry_run;
    if write {
        fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
    }

    let stats = if layout_only {
        let out = pack_layout(inputs, settings)?;
        if write {
            for layout in &out.atlases {
                write_metadata(cli, layout)?;
            }
        }
        info!(atlases = out.atlases.len(), "atlases written (layout-only)");
        out.stats
    } else {
        let out = pack_images(inputs, settings.clone())?;
        if write {
            for page in &out.pages {
                let image_path = cli.out_dir.join(&page.layout.file_name);
                save_page(&page.rgba, &image_path, &settings.output_format)?;
                info!(?image_path, index = page.layout.index, "wrote atlas");
                write_metadata(cli, &page.layout)?;
            }
        }
        out.stats
    };

    info!(
        atlases = stats.num_atlases,
        sprites = stats.num_sprites,
        used_area = stats.used_area,
        total_area = stats.total_atlas_area,
        occupancy = format!("{:.2}%", stats.occupancy * 100.0),
        "stats"
    );

    if cli.dry_run {
        println!("{}", stats.summary());
    }
    if let Some(stats_path) = &cli.export_stats {
        export_stats(&stats, stats_path, write)?;
    }
    Ok(())
}

fn metadata_json(format: &str, meta: &AtlasMetadata) -> anyhow::Result<serde_json::Value> {
    Ok(match format {
        // "json" is an alias of "json-array"
        "json-array" | "json" => to_json(meta),
        "json-hash" => to_json_hash(meta),
        other => anyhow::bail!("unknown metadata format: {}", other),
    })
}

fn write_metadata(cli: &PackArgs, layout: &AtlasLayout) -> anyhow::Result<()> {
    let json_path = cli.out_dir.join(format!("{}.json", layout.name));
    let json_value = metadata_json(&cli.metadata, &layout.metadata)?;
    let json = serde_json::to_string_pretty(&json_value)?;
    fs::write(&json_path, json).with_context(|| format!("write {}", json_path.display()))?;
    info!(
        ?json_path,
        frames = layout.metadata.frames.len(),
        "metadata written"
    );
    Ok(())
}

fn save_page(rgba: &RgbaImage, path: &Path, format: &str) -> anyhow::Result<()> {
    // JPEG has no alpha channel
    if matches!(format.to_ascii_lowercase().as_str(), "jpg" | "jpeg") {
        DynamicImage::ImageRgba8(rgba.clone())
            .to_rgb8()
            .save(path)
            .with_context(|| format!("write {}", path.display()))?;
    } else {
        rgba.save(path)
            .with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

fn export_stats(stats: &PackStats, stats_path: &Path, write: bool) -> anyhow::Result<()> {
    let value = serde_json::json!({
        "atlases": stats.num_atlases,
        "sprites": stats.num_sprites,
        "used_area": stats.used_area,
        "total_area": stats.total_atlas_area,
        "wasted_area": stats.wasted_area(),
        "occupancy": stats.occupancy,
        "max_atlas_width": stats.max_atlas_width,
        "max_atlas_height": stats.max_atlas_height,
        "rotated": stats.num_rotated,
        "trimmed": stats.num_trimmed,
    });
    if write {
        fs::write(stats_path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", stats_path.display()))?;
        info!(?stats_path, "stats exported");
    }
    Ok(())
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("bad glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

/// Image files under `path`, sorted so sprite keys are assigned deterministically.
fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    list.sort();
    Ok(list)
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if exclude.is_some_and(|ex| ex.is_match(&s)) {
        return true;
    }
    if include.is_some_and(|inc| !inc.is_match(&s)) {
        return true;
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "webp" | "tga" | "gif")
    )
}

fn load_images_with_progress(
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<InputImage>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match load_image(p) {
            Ok(img) => {
                let key = p.to_string_lossy().replace('\\', "/");
                list.push(InputImage { key, image: img });
            }
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Settings file; every field is optional and overrides the command line.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    max_width: Option<u32>,
    max_height: Option<u32>,
    border_padding: Option<u32>,
    shape_padding: Option<u32>,
    force_square: Option<bool>,
    force_pot: Option<bool>,
    scale: Option<f64>,
    trim_alpha_threshold: Option<u8>,
    extrude_size: Option<u32>,
    reduce_border_artifacts: Option<bool>,
    bleed_iterations: Option<u32>,
    output_naming_pattern: Option<String>,
    output_format: Option<String>,
    expand_strategy: Option<String>,
    rank_strategy: Option<String>,
    allow_rotation: Option<bool>,
}

impl YamlConfig {
    fn into_pack_settings(self, mut cfg: PackSettings) -> anyhow::Result<PackSettings> {
        if let Some(v) = self.max_width {
            cfg.max_width = v;
        }
        if let Some(v) = self.max_height {
            cfg.max_height = v;
        }
        if let Some(v) = self.border_padding {
            cfg.border_padding = v;
        }
        if let Some(v) = self.shape_padding {
            cfg.shape_padding = v;
        }
        if let Some(v) = self.force_square {
            cfg.force_square = v;
        }
        if let Some(v) = self.force_pot {
            cfg.force_pot = v;
        }
        if let Some(v) = self.scale {
            cfg.scale = v;
        }
        if let Some(v) = self.trim_alpha_threshold {
            cfg.trim_alpha_threshold = v;
        }
        if let Some(v) = self.extrude_size {
            cfg.extrude_size = v;
        }
        if let Some(v) = self.reduce_border_artifacts {
            cfg.reduce_border_artifacts = v;
        }
        if let Some(v) = self.bleed_iterations {
            cfg.bleed_iterations = v;
        }
        if let Some(v) = self.output_naming_pattern {
            cfg.output_naming_pattern = v;
        }
        if let Some(v) = self.output_format {
            cfg.output_format = v;
        }
        if let Some(v) = self.expand_strategy {
            cfg.expand_strategy = v
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown expand strategy: {}", v))?;
        }
        if let Some(v) = self.rank_strategy {
            cfg.rank_strategy = v
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown rank heuristic: {}", v))?;
        }
        if let Some(v) = self.allow_rotation {
            cfg.allow_rotation = v;
        }
        Ok(cfg)
    }
}
