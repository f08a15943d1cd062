use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rfclone::model::LayoutModel;
use rfclone::render::{page_from_markup, RenderedPage};
use rfclone::{analyzer, generator, CloneConfig};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "rfclone",
    version,
    about = "Clone a web page into an editable HTML approximation and tune it against screenshots"
)]
struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More logging (debug)
    #[arg(short, long, global = true, action = ArgAction::SetTrue, conflicts_with = "quiet")]
    verbose: bool,
    /// Less logging (warnings only)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the layout model of a page as JSON
    Analyze(AnalyzeArgs),
    /// Generate HTML from a layout model JSON file
    Generate(GenerateArgs),
    /// Run the full clone loop against a live page (needs the `cdp` feature)
    Clone(CloneArgs),
    /// Score an HTML file against reference screenshots (needs the `cdp` feature)
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Page URL to load
    url: Option<String>,
    /// Analyze a local HTML file instead of loading a URL
    #[arg(long, conflicts_with = "url")]
    html: Option<PathBuf>,
    /// Base URL for resolving links when using --html
    #[arg(long, requires = "html")]
    base_url: Option<String>,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Layout model JSON file
    layout: PathBuf,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CloneArgs {
    /// Page URL to clone
    url: String,
    /// Directory for artifacts (layout, iterations, diffs, final.html, report.json)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Override the iteration cap
    #[arg(long)]
    max_iterations: Option<u32>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Desktop reference screenshot (PNG)
    #[arg(long)]
    desktop: PathBuf,
    /// Mobile reference screenshot (PNG)
    #[arg(long)]
    mobile: PathBuf,
    /// Generated HTML to score
    page: PathBuf,
    /// Directory to write diff images to
    #[arg(long)]
    out: Option<PathBuf>,
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CloneConfig> {
    match path {
        Some(path) => CloneConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(CloneConfig::default()),
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

#[cfg(feature = "cdp")]
fn render_live(url: &str, config: &CloneConfig) -> Result<RenderedPage> {
    use rfclone::render::PageRenderer;
    let renderer = rfclone::render::cdp::CdpRenderer::launch(config)?;
    let mut session = renderer.session()?;
    Ok(session.render_url(url)?)
}

#[cfg(all(not(feature = "cdp"), feature = "fetch"))]
fn render_live(url: &str, config: &CloneConfig) -> Result<RenderedPage> {
    use rfclone::render::PageRenderer;
    log::warn!("built without `cdp`: fetching raw markup only, computed styles and colors are unavailable");
    let mut renderer = rfclone::render::fetch::HttpRenderer::new(config)?;
    Ok(renderer.render_url(url)?)
}

#[cfg(all(not(feature = "cdp"), not(feature = "fetch")))]
fn render_live(_url: &str, _config: &CloneConfig) -> Result<RenderedPage> {
    bail!("no page renderer compiled in; enable the `cdp` or `fetch` feature")
}

fn analyze(args: AnalyzeArgs, config: &CloneConfig) -> Result<()> {
    let page = match (&args.html, &args.url) {
        (Some(file), _) => {
            let html = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
            page_from_markup(args.base_url.as_deref().unwrap_or(""), &html)
        }
        (None, Some(url)) => render_live(url, config)?,
        (None, None) => bail!("either a URL or --html FILE is required"),
    };
    let model = analyzer::analyze(&page, config);
    write_output(args.output.as_deref(), &model.to_json_pretty()?)
}

fn generate(args: GenerateArgs) -> Result<()> {
    let json = fs::read_to_string(&args.layout)
        .with_context(|| format!("failed to read {}", args.layout.display()))?;
    let model = LayoutModel::from_json(&json).context("layout file is not a valid layout model")?;
    model.validate()?;
    let html = generator::generate(&model, &args.title, &args.description);
    write_output(args.output.as_deref(), &html)
}

#[cfg(feature = "cdp")]
fn clone(args: CloneArgs, mut config: CloneConfig) -> Result<()> {
    use rfclone::artifacts::ArtifactStore;

    if let Some(n) = args.max_iterations {
        config.max_iterations = n;
    }
    if let Some(out) = args.out {
        config.artifact_dir = Some(out);
    }
    config.validate()?;

    let artifacts = ArtifactStore::from_config(&config)?;
    let renderer = rfclone::render::cdp::CdpRenderer::launch(&config)?;
    let mut session = renderer.session()?;
    let report = rfclone::clone_page(&mut session, &args.url, &config, &artifacts)
        .with_context(|| format!("cloning {} failed", args.url))?;

    if artifacts.is_enabled() {
        write_output(None, &serde_json::to_string_pretty(&report)?)
    } else {
        write_output(None, &report.html)
    }
}

#[cfg(not(feature = "cdp"))]
fn clone(_args: CloneArgs, _config: CloneConfig) -> Result<()> {
    bail!("the `clone` command needs the `cdp` feature")
}

#[cfg(feature = "cdp")]
fn score(args: ScoreArgs, config: &CloneConfig) -> Result<()> {
    use rfclone::artifacts::ArtifactStore;
    use rfclone::render::{Screenshot, ScreenshotPair};

    let read_png = |path: &Path| -> Result<Screenshot> {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Screenshot::from_png(bytes)?)
    };
    let references = ScreenshotPair {
        desktop: read_png(&args.desktop)?,
        mobile: read_png(&args.mobile)?,
    };
    let html = fs::read_to_string(&args.page).with_context(|| format!("failed to read {}", args.page.display()))?;
    let artifacts = match args.out {
        Some(dir) => ArtifactStore::new(dir)?,
        None => ArtifactStore::disabled(),
    };

    let renderer = rfclone::render::cdp::CdpRenderer::launch(config)?;
    let mut session = renderer.session()?;
    let scorer = rfclone::VisualScorer::new(config);
    let score = scorer.score(&mut session, &references, &html, 1, &artifacts);
    write_output(None, &serde_json::to_string_pretty(&score)?)
}

#[cfg(not(feature = "cdp"))]
fn score(_args: ScoreArgs, _config: &CloneConfig) -> Result<()> {
    bail!("the `score` command needs the `cdp` feature")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze(args) => analyze(args, &config),
        Commands::Generate(args) => generate(args),
        Commands::Clone(args) => clone(args, config),
        Commands::Score(args) => score(args, &config),
    }
}
