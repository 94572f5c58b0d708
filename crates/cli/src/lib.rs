use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_engine::{default_engine, parse_hex_color, OpenSource, PageStyle, PdfEngine, RenderRequest};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use viewer_core::{
    BoxMetrics, ContainerHandle, DocumentOptions, DocumentResource, Layout, PageRender,
    ViewerConfig,
};
use viewer_host::{spawn_viewer, EngineLoader, ViewerEvent};

/// Environment variable holding the `tracing` filter directives.
pub const LOG_ENV: &str = "FOLIO_LOG";

#[derive(Debug, Parser)]
#[command(name = "folio")]
#[command(about = "Responsive resume viewer tooling")]
pub struct Cli {
    /// JSON viewer configuration; every key is optional.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the page height the viewer uses for a container width.
    Layout {
        #[arg(long)]
        width: Option<f32>,
    },
    /// Run the viewer against a document and print the settled page plan.
    Plan {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        width: Option<f32>,
        #[arg(long, default_value_t = 5_000)]
        timeout_ms: u64,
    },
    /// Render one page PNG at the viewer height for a container width.
    RenderPage {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        width: Option<f32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    first_page_size_pt: Option<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct LayoutOutput {
    width_px: f32,
    height_px: u32,
}

impl From<Layout> for LayoutOutput {
    fn from(layout: Layout) -> Self {
        Self { width_px: layout.width_px, height_px: layout.height_px }
    }
}

#[derive(Debug, Serialize)]
struct PlanOutput {
    resource: String,
    width_px: f32,
    height_px: u32,
    page_count: u32,
    pages: Vec<PageRender>,
    document_options: DocumentOptions,
}

/// Installs the stderr `tracing` subscriber, filtered by `FOLIO_LOG`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Layout { width } => {
            let config = load_config(cli.config.as_deref())?;
            run_layout(&config, width)
        }
        Commands::Plan { file, width, timeout_ms } => {
            let config = load_config(cli.config.as_deref())?;
            run_plan(config, &file, width, Duration::from_millis(timeout_ms))
        }
        Commands::RenderPage { file, page, width, output } => {
            let config = load_config(cli.config.as_deref())?;
            run_render_page(&config, &file, page, width, output.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let config = match path {
        Some(path) => ViewerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    config.with_env_overrides().context("invalid environment override")
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let first_page_size_pt = if page_count > 0 {
        let size = engine.page_size(handle, 0)?;
        Some(PageSizeOutput { width: size.width_pt, height: size.height_pt })
    } else {
        None
    };

    let payload = InfoOutput { path: file.display().to_string(), page_count, first_page_size_pt };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    engine.close(handle)?;

    Ok(())
}

fn run_layout(config: &ViewerConfig, width: Option<f32>) -> Result<()> {
    let layout = layout_for(config, width)?;

    let json = serde_json::to_string_pretty(&LayoutOutput::from(layout))?;
    println!("{json}");

    Ok(())
}

fn run_plan(
    config: ViewerConfig,
    file: &Path,
    width: Option<f32>,
    timeout: Duration,
) -> Result<()> {
    ensure_pdf_exists(file)?;
    let width = layout_for(&config, width)?.width_px;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let plan = runtime.block_on(settle_plan(config, file, width, timeout))?;

    let json = serde_json::to_string_pretty(&plan)?;
    println!("{json}");

    Ok(())
}

/// Mounts a viewer, sizes it to `width`, loads `file`, and waits until the
/// page plan reflects both.
async fn settle_plan(
    config: ViewerConfig,
    file: &Path,
    width: f32,
    timeout: Duration,
) -> Result<PlanOutput> {
    let resource = DocumentResource::new(file.display().to_string());
    let document_options = config.document_options();
    let (handle, mut events, task) =
        spawn_viewer(config, ContainerHandle::new(1), Arc::new(EngineLoader::new()));

    handle.resize(BoxMetrics::from_content_width(width))?;
    handle.load(resource.clone())?;

    let deadline = tokio::time::Instant::now() + timeout;
    let mut layout: Option<Layout> = None;
    let mut pages: Option<Vec<PageRender>> = None;

    loop {
        if let (Some(layout), Some(pages)) = (layout, pages.as_ref()) {
            if pages.iter().all(|page| page.height_px == layout.height_px) {
                break;
            }
        }

        let event = tokio::time::timeout_at(deadline, events.recv())
            .await
            .context("timed out waiting for the viewer to settle")?;

        match event {
            Some(ViewerEvent::Layout(settled)) => layout = Some(settled),
            Some(ViewerEvent::Pages { page_count: Some(_), pages: settled, .. }) => {
                pages = Some(settled)
            }
            Some(ViewerEvent::LoadFailed { error, .. }) => {
                anyhow::bail!("failed to open PDF: {error}")
            }
            Some(_) => {}
            None => anyhow::bail!("viewer stopped before settling"),
        }
    }

    handle.unmount()?;
    task.await.context("viewer task failed")?;

    let (Some(layout), Some(pages)) = (layout, pages) else {
        anyhow::bail!("viewer stopped before settling");
    };

    Ok(PlanOutput {
        resource: resource.to_string(),
        width_px: layout.width_px,
        height_px: layout.height_px,
        page_count: pages.len() as u32,
        pages,
        document_options,
    })
}

fn run_render_page(
    config: &ViewerConfig,
    file: &Path,
    page: u32,
    width: Option<f32>,
    output: Option<&Path>,
) -> Result<()> {
    ensure_pdf_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let layout = layout_for(config, width)?;
    let style = PageStyle {
        background: parse_hex_color(&config.canvas_background)?,
        border: Some(parse_hex_color(&config.page_border)?),
    };

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let image = engine
        .render_page(
            handle,
            RenderRequest { page_index: page - 1, height_px: layout.height_px, style },
        )
        .context("failed to render page")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_page_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    engine.close(handle)?;

    Ok(())
}

fn layout_for(config: &ViewerConfig, width: Option<f32>) -> Result<Layout> {
    let width = width.unwrap_or(config.default_width_px);

    if !width.is_finite() || width <= 0.0 {
        anyhow::bail!("--width must be a positive number of pixels");
    }

    Ok(Layout::for_width(width, config.page_aspect))
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_page_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
