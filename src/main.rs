use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use inkmark::{
    Config, WatermarkError,
    datestamp::stamp_batch,
    export::{DATESTAMP_EXTENSIONS, IMPORT_EXTENSIONS, export_batch, resolve_inputs},
    templates::load_template,
    watermark::{Position, RgbaColor, WatermarkKind},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "inkmark.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watermark images and export the copies
    Apply(ApplyArgs),

    /// Stamp images with their EXIF capture date
    Datestamp(DatestampArgs),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output folder
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Output format (jpeg or png)
    #[arg(long)]
    format: Option<String>,

    /// JPEG quality
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    suffix: Option<String>,

    /// TrueType font to render text with instead of the built-in bitmap face
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Image files or folders to watermark
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,

    /// Template file to read the watermark from
    #[arg(long, requires = "template_name")]
    template: Option<PathBuf>,

    /// Name of the template inside the template file
    #[arg(long, requires = "template")]
    template_name: Option<String>,

    /// Watermark text
    #[arg(long, conflicts_with = "image")]
    text: Option<String>,

    /// Watermark image
    #[arg(long)]
    image: Option<PathBuf>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    font_size: Option<u32>,

    /// Color as #RRGGBB or #RRGGBBAA
    #[arg(long)]
    color: Option<String>,

    /// Opacity percentage
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    opacity: Option<u8>,

    /// Anchor position, e.g. bottom-right
    #[arg(long)]
    position: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    offset_x: Option<i32>,

    #[arg(long, allow_hyphen_values = true)]
    offset_y: Option<i32>,

    /// Rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<f32>,
}

#[derive(Args, Debug)]
struct DatestampArgs {
    /// Image files or folders to stamp
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,

    /// strftime pattern for the date text
    #[arg(long)]
    date_format: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    font_size: Option<u32>,

    /// Color as #RRGGBB or #RRGGBBAA
    #[arg(long)]
    color: Option<String>,

    /// Anchor position, e.g. bottom-right
    #[arg(long)]
    position: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Apply(args) => run_apply(&mut config, args)?,
        Commands::Datestamp(args) => run_datestamp(&mut config, args)?,
    }

    Ok(())
}

fn apply_output_args(config: &mut Config, args: OutputArgs) -> Result<(), WatermarkError> {
    if let Some(out) = args.out {
        config.export.output_folder = out;
    }
    if let Some(format) = args.format {
        config.export.format = format.parse()?;
    }
    if let Some(quality) = args.quality {
        config.export.quality = quality;
    }
    if let Some(prefix) = args.prefix {
        config.export.prefix = prefix;
    }
    if let Some(suffix) = args.suffix {
        config.export.suffix = suffix;
    }
    if let Some(font) = args.font {
        config.app.font_path = Some(font);
    }
    Ok(())
}

fn run_apply(config: &mut Config, args: ApplyArgs) -> Result<(), WatermarkError> {
    apply_output_args(config, args.output)?;

    if let (Some(path), Some(name)) = (&args.template, &args.template_name) {
        info!("Using template '{}' from {:?}", name, path);
        config.watermark = load_template(path, name)?;
    }

    let spec = &mut config.watermark;
    if let Some(text) = args.text {
        spec.kind = WatermarkKind::Text;
        spec.text = text;
    }
    if let Some(image) = args.image {
        spec.kind = WatermarkKind::Image;
        spec.image_path = Some(image);
    }
    if let Some(font_size) = args.font_size {
        spec.font_size = font_size;
    }
    if let Some(color) = args.color {
        spec.color = color.parse::<RgbaColor>()?;
    }
    if let Some(opacity) = args.opacity {
        spec.opacity = opacity;
    }
    if let Some(position) = args.position {
        spec.position = position.parse::<Position>()?;
    }
    if let Some(offset_x) = args.offset_x {
        spec.offset_x = offset_x;
    }
    if let Some(offset_y) = args.offset_y {
        spec.offset_y = offset_y;
    }
    if let Some(rotation) = args.rotation {
        spec.rotation = rotation;
    }

    let spec = config.watermark.clone().clamped();
    let images = resolve_inputs(&args.inputs, IMPORT_EXTENSIONS)?;
    let face = config.glyph_face()?;

    info!(
        "Watermarking {} images ({:?} watermark at {})",
        images.len(),
        spec.kind,
        spec.position
    );
    let written = export_batch(&images, &spec, face.as_ref(), &config.export)?;
    println!(
        "Exported {} images to {}",
        written.len(),
        config.export.output_folder.display()
    );
    Ok(())
}

fn run_datestamp(config: &mut Config, args: DatestampArgs) -> Result<(), WatermarkError> {
    apply_output_args(config, args.output)?;

    let settings = &mut config.datestamp;
    if let Some(date_format) = args.date_format {
        settings.format = date_format;
    }
    if let Some(font_size) = args.font_size {
        settings.font_size = font_size;
    }
    if let Some(color) = args.color {
        settings.color = color.parse::<RgbaColor>()?;
    }
    if let Some(position) = args.position {
        settings.position = position.parse::<Position>()?;
    }

    let images = resolve_inputs(&args.inputs, DATESTAMP_EXTENSIONS)?;
    let face = config.glyph_face()?;

    let summary = stamp_batch(&images, &config.datestamp, face.as_ref(), &config.export)?;
    println!(
        "Stamped {} images to {} ({} without a capture date)",
        summary.written.len(),
        config.export.output_folder.display(),
        summary.skipped.len()
    );
    Ok(())
}
