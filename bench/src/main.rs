mod generators;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use category_distance_core::{
    CategoryGraph, CategoryId, CategorySearch, CostModel, GraphSnapshot, Language, MembershipIndex, PageId,
    SearchBatch, SearchConfig,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use generators::Shape;

#[derive(Debug, Parser)]
#[command(name = "category-distance-bench", version, about = "Benchmark and query category distance searches")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Time searches over synthetic hierarchies
    Bench(BenchArgs),
    /// Run one search over a JSON snapshot and print distances as JSON
    Query(QueryArgs),
    /// Write a synthetic hierarchy as a JSON snapshot
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CostArg {
    Uniform,
    PageCount,
}

impl From<CostArg> for CostModel {
    fn from(arg: CostArg) -> Self {
        match arg {
            CostArg::Uniform => CostModel::default(),
            CostArg::PageCount => CostModel::PageCount,
        }
    }
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Do not descend into subcategories of visited ancestors
    #[arg(long)]
    no_descendants: bool,

    /// Do not record page distances
    #[arg(long)]
    no_pages: bool,
}

impl SearchArgs {
    fn config(&self, max_results: usize) -> SearchConfig {
        SearchConfig::new(max_results)
            .with_explore_descendants(!self.no_descendants)
            .with_track_pages(!self.no_pages)
    }
}

#[derive(Debug, Args)]
struct BenchArgs {
    /// Graph shape to generate; all shapes when omitted
    #[arg(long, value_enum)]
    shape: Option<Shape>,

    /// Number of categories per graph
    #[arg(long, default_value_t = 1_000_000)]
    categories: u64,

    /// Start pages sampled per graph
    #[arg(long, default_value_t = 20)]
    queries: usize,

    /// Result limits to time, one table row each
    #[arg(long, value_delimiter = ',', default_values_t = vec![10usize, 100, 1_000, 10_000])]
    limits: Vec<usize>,

    #[arg(long, value_enum, default_value = "uniform")]
    cost_model: CostArg,

    #[arg(long, env = "CATEGORY_DISTANCE_LANGUAGE", default_value = "en")]
    language: String,

    #[command(flatten)]
    search: SearchArgs,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Graph snapshot (JSON) to search
    #[arg(long)]
    graph: PathBuf,

    /// Start page id
    #[arg(long)]
    page: PageId,

    /// Language of the start page; defaults to the snapshot's language
    #[arg(long, env = "CATEGORY_DISTANCE_LANGUAGE")]
    language: Option<String>,

    #[arg(long, default_value_t = 500)]
    max_results: usize,

    /// Stop after this many steps even if results remain
    #[arg(long)]
    steps: Option<usize>,

    /// Only record these pages (comma separated)
    #[arg(long, value_delimiter = ',')]
    allow: Vec<PageId>,

    #[command(flatten)]
    search: SearchArgs,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, value_enum, default_value = "dag")]
    shape: Shape,

    #[arg(long, default_value_t = 10_000)]
    categories: u64,

    #[arg(long, value_enum, default_value = "uniform")]
    cost_model: CostArg,

    #[arg(long, env = "CATEGORY_DISTANCE_LANGUAGE", default_value = "en")]
    language: String,

    /// Write here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Bench(args) => run_bench(&args),
        Command::Query(args) => run_query(&args),
        Command::Generate(args) => run_generate(&args),
    }
}

/// Logs go to stderr so `query` and `generate` output stays clean. `RUST_LOG`
/// wins over the flags.
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("RUST_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// bench
// ---------------------------------------------------------------------------

fn run_bench(args: &BenchArgs) -> anyhow::Result<()> {
    if args.queries == 0 {
        bail!("--queries must be at least 1");
    }
    let language = Language::new(&args.language).context("invalid --language")?;
    let shapes: Vec<Shape> = match args.shape {
        Some(shape) => vec![shape],
        None => Shape::ALL.to_vec(),
    };

    println!("category-distance-bench");
    println!("=======================");
    println!();

    for shape in shapes {
        bench_shape(shape, args, &language)?;
    }
    Ok(())
}

fn bench_shape(shape: Shape, args: &BenchArgs, language: &Language) -> anyhow::Result<()> {
    println!("--- {} ---", shape.describe());
    println!("Target: {} categories", args.categories);

    let t = Instant::now();
    let graph = shape
        .generate(args.categories, args.cost_model.into(), language.clone())
        .with_context(|| format!("generating {:?} graph", shape))?;
    let membership = MembershipIndex::from_graph(&graph);
    let gen_time = t.elapsed();
    println!(
        "Generated in {:.2}s, {} categories, {} edges, {} page links, ~{:.0}MB",
        gen_time.as_secs_f64(),
        graph.category_count(),
        graph.edge_count(),
        graph.page_link_count(),
        graph.memory_usage() as f64 / 1_048_576.0
    );

    let starts = sample_pages(&graph, args.queries);
    if starts.is_empty() {
        println!("No pages generated, skipping");
        println!();
        return Ok(());
    }
    tracing::debug!(queries = starts.len(), "sampled start pages");

    println!();
    println!(
        "{:>8} {:>10} {:>12} {:>12} {:>10}",
        "limit", "steps", "pages", "categories", "avg time"
    );
    println!("{:->8} {:->10} {:->12} {:->12} {:->10}", "", "", "", "", "");

    for &limit in &args.limits {
        let config = args.search.config(limit);
        let mut steps = 0usize;
        let mut pages = 0usize;
        let mut categories = 0usize;

        let t = Instant::now();
        for &start in &starts {
            let mut search = CategorySearch::new(&graph, &membership, start, language.clone(), config.clone())
                .with_context(|| format!("starting search from page {}", start))?;
            search.run(None);
            steps += search.steps_taken();
            pages += search.page_distances().len();
            categories += search.category_distances().count();
        }
        let elapsed = t.elapsed();

        let n = starts.len();
        println!(
            "{:>8} {:>10} {:>12} {:>12} {:>8.2}ms",
            limit,
            steps / n,
            pages / n,
            categories / n,
            elapsed.as_secs_f64() * 1000.0 / n as f64
        );
    }

    // Interleaved: every start page stepped round-robin at the largest limit.
    let limit = args.limits.iter().copied().max().unwrap_or(500);
    let config = args.search.config(limit);
    let mut batch = SearchBatch::new();
    for &start in &starts {
        let search = CategorySearch::new(&graph, &membership, start, language.clone(), config.clone())?;
        batch.push(start, search);
    }
    let t = Instant::now();
    let rounds = batch.run(None);
    let elapsed = t.elapsed();
    println!();
    println!(
        "Batch of {} searches (limit {}): {} rounds in {:.1}ms",
        batch.len(),
        limit,
        rounds,
        elapsed.as_secs_f64() * 1000.0
    );
    println!();
    Ok(())
}

/// Evenly spaced distinct page ids, ascending.
fn sample_pages(graph: &CategoryGraph, count: usize) -> Vec<PageId> {
    let mut all: Vec<PageId> = graph
        .indices()
        .flat_map(|ci| graph.pages(ci).iter().copied())
        .collect();
    all.sort_unstable();
    all.dedup();

    if all.len() <= count {
        return all;
    }
    let stride = all.len() / count;
    all.into_iter().step_by(stride).take(count).collect()
}

// ---------------------------------------------------------------------------
// query
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct QueryOutput {
    page: PageId,
    language: Language,
    steps: usize,
    exhausted: bool,
    categories: Vec<CategoryDistance>,
    pages: Vec<PageDistance>,
}

#[derive(Debug, Serialize)]
struct CategoryDistance {
    id: CategoryId,
    title: String,
    distance: f64,
}

#[derive(Debug, Serialize)]
struct PageDistance {
    id: PageId,
    distance: f64,
}

fn load_snapshot(path: &Path) -> anyhow::Result<GraphSnapshot> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing snapshot {}", path.display()))
}

fn run_query(args: &QueryArgs) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&args.graph)?;
    let graph = CategoryGraph::from_snapshot(&snapshot).context("building graph from snapshot")?;
    let membership = MembershipIndex::from_graph(&graph);

    let language = match &args.language {
        Some(code) => Language::new(code).context("invalid --language")?,
        None => graph.language().clone(),
    };

    let mut config = args.search.config(args.max_results);
    if !args.allow.is_empty() {
        let allowed: HashSet<PageId> = args.allow.iter().copied().collect();
        config = config.with_allowed_pages(Arc::new(allowed));
    }

    let mut search = CategorySearch::new(&graph, &membership, args.page, language, config)
        .with_context(|| format!("starting search from page {}", args.page))?;
    search.run(args.steps);
    tracing::info!(
        page = args.page,
        steps = search.steps_taken(),
        exhausted = !search.has_more_results(),
        "search finished"
    );

    let output = query_output(&graph, &search);
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    serde_json::to_writer_pretty(&mut out, &output).context("writing results")?;
    writeln!(out)?;
    Ok(())
}

/// Collect a search's distances, nearest first, ties by id.
fn query_output(graph: &CategoryGraph, search: &CategorySearch<'_>) -> QueryOutput {
    let mut categories: Vec<CategoryDistance> = search
        .category_distances()
        .map(|(id, distance)| CategoryDistance {
            id,
            title: graph
                .index_of(id)
                .map(|ci| graph.title(ci).to_string())
                .unwrap_or_default(),
            distance,
        })
        .collect();
    categories.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));

    let mut pages: Vec<PageDistance> = search
        .page_distances()
        .iter()
        .map(|(&id, &distance)| PageDistance { id, distance })
        .collect();
    pages.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));

    QueryOutput {
        page: search.start_page(),
        language: search.language().clone(),
        steps: search.steps_taken(),
        exhausted: !search.has_more_results(),
        categories,
        pages,
    }
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

fn run_generate(args: &GenerateArgs) -> anyhow::Result<()> {
    let language = Language::new(&args.language).context("invalid --language")?;
    let graph = args
        .shape
        .generate(args.categories, args.cost_model.into(), language)
        .with_context(|| format!("generating {:?} graph", args.shape))?;
    let snapshot = graph.to_snapshot();

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut out = BufWriter::new(file);
            serde_json::to_writer(&mut out, &snapshot).context("writing snapshot")?;
            out.flush()?;
            tracing::info!(
                path = %path.display(),
                categories = graph.category_count(),
                "snapshot written"
            );
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            serde_json::to_writer(&mut out, &snapshot).context("writing snapshot")?;
            writeln!(out)?;
        }
    }
    Ok(())
}
