use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use route_charts::chart::render_relays;
use route_charts::color::ColorResolver;
use route_charts::document;
use route_charts::options::{ChartOptions, Config};
use route_charts::routes::{SAMPLE_ROUTES, load_routes};
use route_charts::PageDrawing;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUTPUT: &str = "charts.pdf";
const SAMPLE_OUTPUT: &str = "sample_data_chart.pdf";

/// Printable pie charts of climbing routes, one A4 page per relay
#[derive(Parser, Debug)]
#[command(name = "route-charts")]
#[command(version)]
#[command(
    about = "Render climbing routes as one pie chart per relay (SVG, PNG or multi-page PDF)",
    long_about = "Render climbing routes as one pie chart per relay. The input table needs the \
                  columns Relais, Couleur, Cotation and Ouvreur, comma- or tab-separated."
)]
struct Args {
    /// Route table (use "-" for stdin; omit to render the built-in sample)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file (extension picks the format: .pdf, .svg or .png)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Config file with chart options and extra colour names (TOML, YAML or JSON)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Pie chart radius in mm [default: 69.5]
    #[arg(long)]
    radius: Option<f64>,

    /// Title font size [default: 14]
    #[arg(long, alias = "title_fs")]
    title_fs: Option<f64>,

    /// Grade font size [default: 18]
    #[arg(long, alias = "grade_fs")]
    grade_fs: Option<f64>,

    /// Route setter font size [default: 8]
    #[arg(long, alias = "setter_fs")]
    setter_fs: Option<f64>,

    /// Leave out relays whose page fails instead of aborting
    #[arg(long)]
    skip_failed: bool,

    /// Print the active colour palette and exit
    #[arg(long)]
    list_colors: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    /// Log every page as it is rendered
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "route-charts", &mut io::stdout());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let table = config
        .color_table()
        .context("invalid colour entries in config")?;

    if args.list_colors {
        for (name, color) in table.iter() {
            println!("{color}  {name}");
        }
        return Ok(());
    }

    let options = chart_options(&config, &args);

    let (text, output) = match &args.input {
        None => {
            info!("no input given, rendering the sample table");
            let output = args.output.clone().unwrap_or_else(|| SAMPLE_OUTPUT.into());
            (SAMPLE_ROUTES.to_string(), output)
        }
        Some(input) => {
            let output = args.output.clone().unwrap_or_else(|| DEFAULT_OUTPUT.into());
            (read_input(input)?, output)
        }
    };

    let resolver = ColorResolver::new(&table);
    let loaded = load_routes(&text, &resolver).context("failed to load route table")?;
    if loaded.groups.is_empty() {
        bail!("route table has no routes");
    }
    info!(
        relays = loaded.groups.len(),
        routes = loaded.route_count(),
        "loaded route table"
    );

    let pages = collect_pages(render_relays(&loaded.groups, &options), args.skip_failed)?;
    write_output(&pages, &output)
}

/// Defaults, then the config file, then command-line flags.
fn chart_options(config: &Config, args: &Args) -> ChartOptions {
    let base = config.chart;
    ChartOptions {
        radius: args.radius.unwrap_or(base.radius),
        title_font_size: args.title_fs.unwrap_or(base.title_font_size),
        grade_font_size: args.grade_fs.unwrap_or(base.grade_font_size),
        setter_font_size: args.setter_fs.unwrap_or(base.setter_font_size),
    }
}

fn read_input(input: &Path) -> Result<String> {
    if input.to_str() == Some("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read input file {}", input.display()))
    }
}

fn collect_pages(
    results: Vec<Result<PageDrawing, route_charts::RelayRenderError>>,
    skip_failed: bool,
) -> Result<Vec<PageDrawing>> {
    let mut pages = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(page) => pages.push(page),
            Err(err) => {
                warn!(relay = %err.relay, error = %err.source, "relay page failed");
                failures.push(err.relay);
            }
        }
    }

    if !failures.is_empty() && !skip_failed {
        bail!("failed to render relays: {}", failures.join(", "));
    }
    if pages.is_empty() {
        bail!("no page could be rendered");
    }
    Ok(pages)
}

fn write_output(pages: &[PageDrawing], output: &Path) -> Result<()> {
    let output_ext = output
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("output file has no extension"))?
        .to_ascii_lowercase();

    match output_ext.as_str() {
        "pdf" => {
            let svgs: Vec<String> = pages.iter().map(PageDrawing::to_svg).collect();
            let pdf = document::assemble_pdf(&svgs)?;
            std::fs::write(output, pdf)
                .with_context(|| format!("failed to write PDF {}", output.display()))?;
            info!(pages = pages.len(), "PDF saved to {}", output.display());
        }
        "svg" | "png" => {
            let renderer = (output_ext == "png").then(document::PngRenderer::new);
            for page in pages {
                let path = page_path(output, &page.relay, &output_ext);
                let svg = page.to_svg();
                let written = match &renderer {
                    Some(renderer) => std::fs::write(&path, renderer.render(&svg)?),
                    None => std::fs::write(&path, svg),
                };
                written.with_context(|| format!("failed to write {}", path.display()))?;
                info!("page saved to {}", path.display());
            }
        }
        _ => bail!("unsupported output format: .{output_ext} (use .pdf, .svg or .png)"),
    }

    Ok(())
}

/// `charts.svg` + relay `2` becomes `charts-relais-2.svg`.
fn page_path(output: &Path, relay: &str, ext: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("charts");
    let relay: String = relay
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    output.with_file_name(format!("{stem}-relais-{relay}.{ext}"))
}
