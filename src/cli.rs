use crate::{
    classify::Classification,
    config::Config,
    context::RunContext,
    engine::{self, PageRenderer, poppler::PopplerRenderer, tesseract::TesseractCli},
    extract::document_id,
    imaging,
    pipeline::BatchRunner,
    registry::PixelBox,
    report::RunReport,
    store::{CheckpointStore, DbSettings, MemoryStore, PgStore, RecordStore},
    template::TemplateVariant,
    util::ensure_dir,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "lab-ingest.toml";
const DEFAULT_LOG_FILE: &str = "logs/lab-ingest.log";

#[derive(Parser, Debug)]
#[command(name = "lab-ingest", version)]
#[command(about = "Resumable batch extraction of scanned lab reports into PostgreSQL")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Folder of documents to ingest.
    pub folder: Option<PathBuf>,

    /// Path to config TOML. If omitted, uses ./lab-ingest.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Run against in-memory stores; nothing is written to the database.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the render and recognition tools are runnable.
    Doctor,
    /// Print the template a document classifies as.
    Classify { file: PathBuf },
    /// Print the record extracted from a document.
    Extract {
        file: PathBuf,
        /// Skip classification and read this template's regions.
        #[arg(long, value_enum)]
        template: Option<TemplateVariant>,
    },
    /// Draw a template's regions on the rendered first page.
    Overlay {
        file: PathBuf,
        #[arg(long, value_enum)]
        template: TemplateVariant,
        #[arg(long)]
        out: PathBuf,
    },
    /// Dump the region registry as pixel boxes at the configured DPI.
    Regions {
        #[arg(long, value_enum)]
        template: Option<TemplateVariant>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(anyhow!("loading .env: {e}")),
    }

    let cfg = load_config(args.config.as_deref())?;
    let _guard = init_logging(&args, &cfg)?;

    if cfg.debug.dump_effective_config {
        debug!("effective config:\n{}", cfg.to_toml());
    }

    let ctx = RunContext::new(cfg).context("building run context")?;

    match &args.cmd {
        Some(Command::Doctor) => doctor(&ctx),
        Some(Command::Classify { file }) => classify(&ctx, file),
        Some(Command::Extract { file, template }) => extract(&ctx, file, *template),
        Some(Command::Overlay {
            file,
            template,
            out,
        }) => overlay(&ctx, file, *template, out),
        Some(Command::Regions { template }) => regions(&ctx, *template),
        None => match &args.folder {
            Some(folder) => run(&args, &ctx, folder),
            None => Err(anyhow!("missing FOLDER argument")),
        },
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = PathBuf::from(DEFAULT_CONFIG);
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = resolve_log_path(cfg) {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(DEFAULT_LOG_FILE))
}

fn engines(cfg: &Config) -> (PopplerRenderer, TesseractCli) {
    (PopplerRenderer::new(&cfg.render), TesseractCli::new(&cfg.ocr))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn doctor(ctx: &RunContext) -> Result<()> {
    let (renderer, recognizer) = engines(&ctx.cfg);
    let diag = engine::doctor(&renderer, &recognizer);
    print_json(&diag)?;
    if !diag.ok {
        return Err(anyhow!("one or more external tools are unavailable"));
    }
    Ok(())
}

fn classify(ctx: &RunContext, file: &Path) -> Result<()> {
    let (renderer, recognizer) = engines(&ctx.cfg);
    let classification = ctx.classifier.classify(&renderer, &recognizer, file);
    print_json(&serde_json::json!({
        "file": document_id(file),
        "classification": classification,
    }))
}

fn extract(ctx: &RunContext, file: &Path, template: Option<TemplateVariant>) -> Result<()> {
    let (renderer, recognizer) = engines(&ctx.cfg);
    let variant = match template {
        Some(v) => v,
        None => match ctx.classifier.classify(&renderer, &recognizer, file) {
            Classification::Known { template } => template,
            Classification::Unknown { reason } => {
                return Err(anyhow!("{}: unknown template: {reason}", file.display()));
            }
        },
    };

    let record = ctx
        .extractor()
        .extract(&renderer, &recognizer, file, variant)
        .with_context(|| format!("extracting {}", file.display()))?;
    print_json(&record)
}

fn overlay(ctx: &RunContext, file: &Path, template: TemplateVariant, out: &Path) -> Result<()> {
    let (renderer, _) = engines(&ctx.cfg);
    let dpi = ctx.page.dpi;
    let regions = ctx.registry.regions_for(template)?;

    let mut page = renderer
        .render_first_page(file, dpi)
        .with_context(|| format!("rendering {}", file.display()))?
        .to_rgb8();

    for region in regions {
        imaging::draw_box(&mut page, region.bbox.to_pixels(dpi), [220, 30, 30], 3);
    }
    imaging::draw_box(
        &mut page,
        ctx.classifier.header_box().to_pixels(dpi),
        [30, 90, 220],
        3,
    );

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    page.save(out)
        .with_context(|| format!("writing overlay: {}", out.display()))?;
    info!(
        "wrote {} ({} regions of {})",
        out.display(),
        regions.len(),
        template
    );
    Ok(())
}

fn regions(ctx: &RunContext, template: Option<TemplateVariant>) -> Result<()> {
    let dpi = ctx.page.dpi;
    let variants: Vec<TemplateVariant> = match template {
        Some(v) => vec![v],
        None => ctx.registry.variants().collect(),
    };

    let mut out = serde_json::Map::new();
    for variant in variants {
        let boxes = ctx
            .registry
            .regions_for(variant)?
            .iter()
            .map(|r| {
                let px: PixelBox = r.bbox.to_pixels(dpi);
                serde_json::json!({
                    "field": r.field,
                    "bbox": px,
                    "options": r.options,
                })
            })
            .collect::<Vec<_>>();
        out.insert(variant.to_string(), serde_json::Value::Array(boxes));
    }

    print_json(&serde_json::json!({
        "dpi": dpi,
        "header": ctx.classifier.header_box().to_pixels(dpi),
        "templates": out,
    }))
}

fn run(args: &Args, ctx: &RunContext, folder: &Path) -> Result<()> {
    let (renderer, recognizer) = engines(&ctx.cfg);

    let report = if args.dry_run || ctx.cfg.global.dry_run {
        warn!("dry run: records and checkpoint are kept in memory only");
        let mut store = MemoryStore::default();
        run_batch(ctx, &renderer, &recognizer, &mut store, folder)?
    } else {
        let settings = DbSettings::from_env(&ctx.cfg.database)?;
        let mut store = PgStore::connect(&settings)?;
        store.migrate()?;
        run_batch(ctx, &renderer, &recognizer, &mut store, folder)?
    };

    if ctx.cfg.global.print_summary {
        print_json(&report)?;
    }
    Ok(())
}

fn run_batch<S: RecordStore + CheckpointStore>(
    ctx: &RunContext,
    renderer: &PopplerRenderer,
    recognizer: &TesseractCli,
    store: &mut S,
    folder: &Path,
) -> Result<RunReport> {
    let report = BatchRunner::new(ctx, renderer, recognizer, store)
        .run(folder)
        .with_context(|| format!("ingesting {}", folder.display()))?;
    Ok(report)
}
