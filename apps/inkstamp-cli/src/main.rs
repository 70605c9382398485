//! inkstamp command line
//!
//! Place signatures and text on PDFs and images, and produce signature
//! images from strokes, typed text or uploads.

mod layout;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use inkstamp_core::{
    Config, DocumentKind, DocumentSession, ExportOptions, OutlineFont, Point, Rgb,
    SignatureArtifact, StrokeCanvas, TypedSignature, UploadedSignature, SIGNATURE_FONTS,
};
use layout::Layout;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "inkstamp")]
#[command(version, about = "Stamp signatures and text onto PDFs and images")]
struct Cli {
    /// Log at debug level (RUST_LOG still applies)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the document type and page sizes
    Info {
        file: PathBuf,
    },
    /// Flatten the fields of a layout file onto a document
    Stamp {
        file: PathBuf,

        /// JSON layout describing the fields
        #[arg(short, long)]
        layout: PathBuf,

        /// Directory the signed copy is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Create a signature image
    Signature {
        #[command(subcommand)]
        mode: SignatureCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SignatureCommand {
    /// Render freehand strokes (JSON: [[{"x":..,"y":..}, ...], ...])
    Draw {
        #[arg(long)]
        strokes: PathBuf,

        #[arg(short, long)]
        out: PathBuf,
    },
    /// Render a typed name in a signature font
    Type {
        #[arg(long)]
        text: String,

        /// Font family from [fonts.signature], or a path to a TTF/OTF file
        #[arg(long)]
        font: String,

        #[arg(long)]
        size: Option<u32>,

        /// Hex color, e.g. "#1f3a93"
        #[arg(long)]
        color: Option<String>,

        #[arg(short, long)]
        out: PathBuf,
    },
    /// Resize an existing signature image
    Upload {
        image: PathBuf,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long)]
        height: Option<f64>,

        /// Let width and height change independently
        #[arg(long)]
        no_lock: bool,

        #[arg(short, long)]
        out: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn open_document(file: &Path, config: Config) -> Result<DocumentSession> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    DocumentSession::open(&name, bytes, None, config)
        .with_context(|| format!("Failed to open {}", file.display()))
}

fn info(file: &Path, config: Config) -> Result<()> {
    let session = open_document(file, config)?;
    let kind = match session.kind() {
        DocumentKind::Pdf => "PDF".to_string(),
        DocumentKind::Raster(format) => format!("{:?} image", format),
    };
    println!("{}: {} ({})", session.name(), kind, session.mime());
    println!("pages: {}", session.page_count());
    for page in 1..=session.page_count() {
        if let Some(mb) = session.page_box(page) {
            let unit = if session.kind() == DocumentKind::Pdf { "pt" } else { "px" };
            println!("  {}: {} x {} {}", page, mb.width, mb.height, unit);
        }
    }
    Ok(())
}

fn stamp(file: &Path, layout_path: &Path, out_dir: &Path, config: Config) -> Result<()> {
    let layout = Layout::from_file(layout_path)?;
    let text_font_path = config.text.font_path.clone();
    let raster = config.raster.clone();
    let text = config.text.clone();

    let mut session = open_document(file, config)?;
    let preview = layout
        .preview
        .unwrap_or_else(|| session.natural_preview(None));
    session
        .set_preview(preview.width, preview.height)
        .context("Invalid preview size in layout")?;

    let base_dir = layout_path.parent().unwrap_or_else(|| Path::new("."));
    layout.apply(session.overlays_mut(), preview, base_dir, &text)?;

    let text_font = match (session.kind(), text_font_path) {
        (DocumentKind::Raster(_), Some(path)) => Some(OutlineFont::from_file(&path)?),
        _ => None,
    };
    let mut options = ExportOptions::from_config(&raster);
    if let Some(font) = &text_font {
        options = options.with_text_font(font);
    }

    let artifact = session.export(&options).context("Export failed")?;

    let out_path = save_output(out_dir, &artifact.file_name, |file| {
        Ok(session.deliver(&artifact, BufWriter::new(file))?)
    })?;

    println!("{}", out_path.display());
    Ok(())
}

/// Write `file_name` inside `out_dir` through a staging file that only
/// takes the final name once `write` succeeds.
fn save_output<F>(out_dir: &Path, file_name: &str, write: F) -> Result<PathBuf>
where
    F: FnOnce(&File) -> Result<()>,
{
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let out_path = out_dir.join(file_name);

    let staged = tempfile::Builder::new()
        .prefix(".inkstamp-")
        .suffix(".partial")
        .tempfile_in(out_dir)
        .with_context(|| format!("Failed to create a temporary file in {}", out_dir.display()))?;
    write(staged.as_file())
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    staged
        .persist(&out_path)
        .with_context(|| format!("Failed to save {}", out_path.display()))?;
    Ok(out_path)
}

fn write_signature(artifact: &SignatureArtifact, out: &Path) -> Result<()> {
    fs::write(out, artifact.png_bytes()?)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    tracing::info!(
        width = artifact.width,
        height = artifact.height,
        out = %out.display(),
        "wrote signature"
    );
    println!("{}", out.display());
    Ok(())
}

fn signature(mode: SignatureCommand, config: Config) -> Result<()> {
    match mode {
        SignatureCommand::Draw { strokes, out } => {
            let json = fs::read_to_string(&strokes)
                .with_context(|| format!("Failed to read {}", strokes.display()))?;
            let strokes: Vec<Vec<Point>> =
                serde_json::from_str(&json).context("Strokes must be a list of point lists")?;

            let mut canvas = StrokeCanvas::from_config(&config.freehand)?;
            for stroke in strokes {
                let mut points = stroke.into_iter();
                if let Some(first) = points.next() {
                    canvas.begin_stroke(first);
                    points.for_each(|p| canvas.add_point(p));
                }
            }
            write_signature(&canvas.finish()?, &out)
        }
        SignatureCommand::Type {
            text,
            font,
            size,
            color,
            out,
        } => {
            let path = config.signature_font_path(&font).ok_or_else(|| {
                anyhow!(
                    "No font file for {:?}; map it under [fonts.signature] (known families: {})",
                    font,
                    SIGNATURE_FONTS.join(", ")
                )
            })?;
            let outline = OutlineFont::from_file(&path)?;

            let mut typed = TypedSignature::new(&text, &outline, &config.typed)?;
            if let Some(size) = size {
                typed = typed.with_size(size);
            }
            if let Some(color) = color {
                typed = typed.with_color(Rgb::from_hex(&color)?);
            }
            if typed.fitted_size() != typed.size() {
                tracing::info!(
                    requested = typed.size(),
                    fitted = typed.fitted_size(),
                    "shrunk typed signature to fit"
                );
            }
            write_signature(&typed.finish()?, &out)
        }
        SignatureCommand::Upload {
            image,
            width,
            height,
            no_lock,
            out,
        } => {
            let bytes =
                fs::read(&image).with_context(|| format!("Failed to read {}", image.display()))?;
            let mut upload = UploadedSignature::load(&bytes, &config.upload)?;
            upload.set_aspect_lock(!no_lock);
            if width.is_some() || height.is_some() {
                let w = width.unwrap_or(upload.width());
                let h = height.unwrap_or(upload.height());
                upload.resize(w, h)?;
            }
            write_signature(&upload.finish()?, &out)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Info { file } => info(&file, config),
        Command::Stamp {
            file,
            layout,
            out_dir,
        } => stamp(&file, &layout, &out_dir, config),
        Command::Signature { mode } => signature(mode, config),
    }
}
