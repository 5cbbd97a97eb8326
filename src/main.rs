use anyhow::{Context, Result};
use arxiv_mind::client::{ResearchBackend, ResearchClient};
use arxiv_mind::config::{
    default_config_path, find_config_file, get_config, load_config, render_config, save_config,
    Config, DisplayConfig, LoggingConfig,
};
use arxiv_mind::models::{AnalysisResult, Paper, ResearchEvent, ResearchResult, SearchState};
use arxiv_mind::stream::{decode_chunks_with, DecodeStats, DecoderOptions, StreamError};
use arxiv_mind::ui::{self, PhaseSpinner, Status};
use arxiv_mind::utils::{publication_timeline, PaperFilter, SortMode, YearCount};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ArxivMind - Turn a research idea into a ranked reading list
#[derive(Parser, Debug)]
#[command(name = "arxiv-mind")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stream research progress, papers and analysis for a research idea", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Research server base URL (overrides the configuration)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Request timeout in seconds, 0 for none (overrides the configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Fail when a result line cannot be parsed instead of skipping it
    #[arg(long, global = true)]
    strict_results: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

/// Sort field for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortField {
    /// Highest relevance score first
    Score,
    /// Most recently published first
    Date,
    /// Keep the server's order
    Relevance,
}

impl From<SortField> for SortMode {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Score => SortMode::Score,
            SortField::Date => SortMode::Date,
            SortField::Relevance => SortMode::Relevance,
        }
    }
}

/// Options controlling which papers are shown and how
#[derive(Args, Debug, Clone, Default)]
struct DisplayArgs {
    /// Sort papers by field (default from configuration: score)
    #[arg(long, value_enum)]
    sort: Option<SortField>,

    /// Hide papers scoring below this value
    #[arg(long)]
    min_score: Option<f64>,

    /// Maximum number of papers to show
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Show the publication timeline
    #[arg(long)]
    timeline: bool,

    /// Show each paper as a detailed card instead of a table row
    #[arg(long)]
    detailed: bool,
}

/// Resolved presentation settings
#[derive(Debug, Clone, Copy, PartialEq)]
struct View {
    filter: PaperFilter,
    timeline: bool,
    detailed: bool,
}

impl DisplayArgs {
    fn resolve(&self, display: &DisplayConfig) -> View {
        View {
            filter: PaperFilter::new(self.sort.map(SortMode::from).unwrap_or(display.sort))
                .min_score(self.min_score.unwrap_or(display.min_score))
                .limit(self.limit.or(display.limit)),
            timeline: self.timeline || display.timeline,
            detailed: self.detailed,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Research an idea: stream progress, then show papers and analysis
    #[command(alias = "r")]
    Research {
        /// The research idea, in plain language
        #[arg(required = true, num_args = 1..)]
        idea: Vec<String>,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Decode a captured NDJSON response body from a file ("-" for stdin)
    Replay {
        /// Captured response body
        input: PathBuf,

        /// Bytes per simulated network chunk
        #[arg(long, default_value_t = 4096)]
        chunk_size: usize,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a configuration file with default values
    Init {
        /// Where to write (default: the user configuration directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

/// Load the configuration from `path`, a discovered file, or the environment
fn load_settings(path: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let found = path.map(Path::to_path_buf).or_else(find_config_file);
    let config = match &found {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => get_config().context("Failed to read configuration from the environment")?,
    };
    Ok((config, found))
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(server) = &cli.server {
        config.server.base_url = server.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.server.timeout_secs = timeout;
    }
    if cli.strict_results {
        config.decoder.strict_results = true;
    }
}

fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let log_level = match cli.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };
    let json = logging.is_json();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arxiv_mind={}", env_filter)),
        ))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

/// Progress of one session as shown on the terminal
struct Session {
    state: SearchState,
    spinner: PhaseSpinner,
    result: Option<ResearchResult>,
}

impl Session {
    fn new(visible: bool) -> Self {
        let state = SearchState::started();
        let spinner = PhaseSpinner::new(&state, visible);
        Self {
            state,
            spinner,
            result: None,
        }
    }

    fn on_event(&mut self, event: ResearchEvent) {
        self.state.apply(&event);
        self.spinner.update(&self.state);
        match event {
            ResearchEvent::Progress { step, message, .. } => {
                debug!(step = step.as_str(), "{}", message);
            }
            ResearchEvent::Result(result) => {
                info!("Received {} papers", result.papers.len());
                self.result = Some(result);
            }
        }
    }

    fn finish(mut self, outcome: Result<DecodeStats, StreamError>) -> Result<Option<ResearchResult>> {
        match outcome {
            Ok(stats) => {
                debug!(
                    chunks = stats.chunks,
                    events = stats.events,
                    malformed = stats.malformed_lines,
                    "Stream complete"
                );
                match &self.result {
                    Some(result) => self
                        .spinner
                        .finish_with_success(&format!("Found {} papers", result.papers.len())),
                    None => self
                        .spinner
                        .finish_with_error("The stream ended without results"),
                }
                Ok(self.result)
            }
            Err(err) => {
                self.state.fail(err.to_string());
                self.spinner.finish_with_error(&err.to_string());
                Err(err.into())
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_path) = load_settings(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    init_logging(&cli, &config.logging);
    if let Some(path) = &config_path {
        info!("Using config file: {}", path.display());
    }

    let show_progress = !cli.quiet && std::io::stderr().is_terminal();

    match &cli.command {
        Commands::Research { idea, display } => {
            let idea = idea.join(" ");
            let view = display.resolve(&config.display);
            let client = ResearchClient::from_config(&config.server, &config.decoder)?;
            info!("Researching via {} ({})", client.name(), client.endpoint());

            let mut session = Session::new(show_progress);
            let outcome = client
                .research(&idea, &mut |event: ResearchEvent| session.on_event(event))
                .await;
            if let Some(result) = session.finish(outcome)? {
                output_result(&result, &view, cli.output)?;
            } else {
                warn!("No result event received");
            }
        }

        Commands::Replay {
            input,
            chunk_size,
            display,
        } => {
            let body = read_input(input).await?;
            let view = display.resolve(&config.display);
            let options = DecoderOptions::default().strict_results(config.decoder.strict_results);
            debug!("Replaying {} bytes in {}-byte chunks", body.len(), chunk_size);

            let mut session = Session::new(show_progress);
            let outcome = decode_chunks_with(body.chunks((*chunk_size).max(1)), options, |event| {
                session.on_event(event)
            });
            if let Some(result) = session.finish(outcome)? {
                output_result(&result, &view, cli.output)?;
            } else if !cli.quiet {
                ui::print_status(Status::Warning, "The capture contains no result event");
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => {
                let path = match path.clone().or_else(default_config_path) {
                    Some(path) => path,
                    None => anyhow::bail!("Could not determine the configuration directory"),
                };
                save_config(&Config::default(), &path, *force)?;
                if !cli.quiet {
                    ui::print_status(
                        Status::Success,
                        &format!("Wrote configuration to {}", path.display()),
                    );
                }
            }
            ConfigAction::Show => {
                if let Some(path) = &config_path {
                    eprintln!("# {}", path.display());
                }
                print!("{}", render_config(&config)?);
            }
        },

        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "arxiv-mind",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Read a whole capture from a file, or from stdin for `-`
async fn read_input(input: &Path) -> Result<Vec<u8>> {
    if input == Path::new("-") {
        use tokio::io::AsyncReadExt;
        let mut body = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut body)
            .await
            .context("Failed to read stdin")?;
        Ok(body)
    } else {
        tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

/// JSON document printed for `--output json`
#[derive(Serialize)]
struct Report<'a> {
    papers: &'a [Paper],
    analysis: &'a AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeline: Option<Vec<YearCount>>,
}

fn output_result(result: &ResearchResult, view: &View, format: OutputFormat) -> Result<()> {
    let papers: Vec<Paper> = view
        .filter
        .apply(&result.papers)
        .into_iter()
        .cloned()
        .collect();
    let timeline = view.timeline.then(|| publication_timeline(&papers));

    match format.resolve() {
        OutputFormat::Json => {
            let report = Report {
                papers: &papers,
                analysis: &result.analysis,
                timeline,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => {
            output_plain(&papers, &result.analysis);
            if let Some(timeline) = &timeline {
                println!();
                for line in ui::timeline_lines(timeline, 40) {
                    println!("{}", line);
                }
            }
        }
        OutputFormat::Table => {
            if papers.is_empty() {
                ui::print_status(Status::Info, "No papers matched");
            } else if view.detailed {
                for (i, paper) in papers.iter().enumerate() {
                    ui::print_paper_card(i + 1, paper);
                }
            } else {
                output_table(&papers);
            }
            ui::print_analysis(&result.analysis);
            if let Some(timeline) = &timeline {
                ui::print_timeline(timeline);
            }
        }
        OutputFormat::Auto => unreachable!(),
    }
    Ok(())
}

fn output_plain(papers: &[Paper], analysis: &AnalysisResult) {
    for (i, paper) in papers.iter().enumerate() {
        let score = ui::score_badge(paper).unwrap_or_else(|| "unscored".to_string());
        println!("{}. {} [{}]", i + 1, paper.title, score);
        println!(
            "   {} | {} | {}",
            ui::short_date(paper),
            paper.author_line(),
            paper.primary_category()
        );
        if let Some(reason) = &paper.reason {
            println!("   Match: {}", reason);
        }
        println!("   {}", paper.link);
        println!();
    }

    if !analysis.summary.is_empty() {
        println!("Summary: {}", analysis.summary);
    }
    for trend in &analysis.key_trends {
        println!("Trend: {}", trend);
    }
    for direction in &analysis.suggested_directions {
        println!("Direction: {}", direction);
    }
}

fn output_table(papers: &[Paper]) {
    use comfy_table::{Attribute, Cell, Table};
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["#", "Title", "Score", "Published", "Authors", "Category"]);

    for (i, paper) in papers.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(ui::truncate_with_ellipsis(&paper.title, 50)).add_attribute(Attribute::Bold),
            Cell::new(ui::score_badge(paper).unwrap_or_default()),
            Cell::new(ui::short_date(paper)),
            Cell::new(ui::truncate_with_ellipsis(&paper.author_line(), 30)),
            Cell::new(paper.primary_category()),
        ]);
    }
    println!("{table}");
}
