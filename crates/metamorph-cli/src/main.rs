//! CLI binary for running metamorph transformations over a source directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use metamorph_engine::{
    default_registry, ExclusivityPolicy, NameStyle, RetryPolicy, RunConfig, TransformationScope,
};
use metamorph_tree::{NodeKind, SourceLoader, SyntaxTree, DEFAULT_PATTERN};

#[derive(Parser)]
#[command(
    name = "metamorph",
    version,
    about = "Randomized, semantics-preserving source transformations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform every source file and write the result
    Run {
        /// JSON run configuration; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding the sources
        #[arg(short, long)]
        source: Option<String>,

        /// Directory receiving the transformed sources
        #[arg(short, long)]
        output: Option<String>,

        /// global, perClass, perClassEach, perMethod or perMethodEach
        #[arg(long)]
        scope: Option<String>,

        /// Transformations per scope unit
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        count: Option<i64>,

        #[arg(long)]
        seed: Option<u64>,

        /// Write a JSON manifest of every attempt to this file
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Weight for one transformer, e.g. `IfTrue=3`. Repeatable.
        #[arg(short, long = "weight", value_name = "NAME=WEIGHT")]
        weights: Vec<String>,

        /// Redraw failed attempts up to this many times
        #[arg(long)]
        redraw: Option<usize>,

        /// Skip transformers that conflict with one already applied to the same node
        #[arg(long)]
        exclusive: bool,

        /// Remove all comments from every class after transforming
        #[arg(long)]
        remove_comments: bool,

        /// Generate gibberish instead of dictionary names
        #[arg(long)]
        random_names: bool,

        /// Transform without writing output files
        #[arg(long)]
        no_output: bool,

        /// Capture before/after snippets in the results
        #[arg(long)]
        debug: bool,
    },

    /// Parse every source file and report syntax errors
    Validate {
        /// Directory holding the sources
        source: PathBuf,

        /// Glob selecting the source files
        #[arg(short, long, default_value = DEFAULT_PATTERN)]
        pattern: String,
    },

    /// Show the classes and methods found in a source directory
    Info {
        /// Directory holding the sources
        source: PathBuf,

        /// Glob selecting the source files
        #[arg(short, long, default_value = DEFAULT_PATTERN)]
        pattern: String,
    },

    /// List the built-in transformers
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            config,
            source,
            output,
            scope,
            count,
            seed,
            manifest,
            weights,
            redraw,
            exclusive,
            remove_comments,
            random_names,
            no_output,
            debug,
        } => {
            let mut run = match config {
                Some(path) => RunConfig::load(&path)
                    .with_context(|| format!("reading configuration {}", path.display()))?,
                None => RunConfig::default(),
            };
            if let Some(source) = source {
                run.source = source;
            }
            if let Some(output) = output {
                run.output = output;
            }
            if let Some(scope) = scope {
                run.scope = scope.parse::<TransformationScope>()?;
            }
            if let Some(count) = count {
                run.transformations = count;
            }
            if let Some(seed) = seed {
                run.seed = seed;
            }
            if manifest.is_some() {
                run.manifest = manifest;
            }
            for weight in &weights {
                let (name, weight) = parse_weight(weight)?;
                run.weights.insert(name, weight);
            }
            if let Some(max_redraws) = redraw {
                run.retry = RetryPolicy::Redraw { max_redraws };
            }
            if exclusive {
                run.exclusivity = ExclusivityPolicy::PerNode;
            }
            if random_names {
                run.names = NameStyle::Random;
            }
            run.remove_all_comments |= remove_comments;
            run.write_output &= !no_output;
            run.debug |= debug;
            cmd_run(run)?;
        }
        Commands::Validate { source, pattern } => {
            cmd_validate(&source, &pattern)?;
        }
        Commands::Info { source, pattern } => {
            cmd_info(&source, &pattern)?;
        }
        Commands::List { json } => {
            cmd_list(json)?;
        }
    }

    Ok(())
}

/// `Name=3` into `("Name", 3)`.
fn parse_weight(raw: &str) -> anyhow::Result<(String, i64)> {
    let (name, weight) = raw
        .split_once('=')
        .with_context(|| format!("weight '{raw}' is not of the form NAME=WEIGHT"))?;
    let weight = weight
        .trim()
        .parse()
        .with_context(|| format!("weight '{raw}' has no integer value"))?;
    Ok((name.trim().to_string(), weight))
}

fn load_tree(source: &Path, pattern: &str) -> anyhow::Result<SyntaxTree> {
    let loader = SourceLoader::with_pattern(source, pattern)?;
    Ok(loader.load()?)
}

fn cmd_run(config: RunConfig) -> anyhow::Result<()> {
    if config.source.trim().is_empty() {
        anyhow::bail!("no source directory given (use --source or a configuration file)");
    }
    if config.output.trim().is_empty() {
        anyhow::bail!("no output directory given (use --output or a configuration file)");
    }
    tracing::debug!(config = ?config, "resolved run configuration");
    let mut tree = config.loader()?.load()?;
    let source = config.source.clone();
    let output = config.output.clone();
    let manifest = config.manifest.clone();

    let mut engine = config.into_engine()?;
    println!("Source: {source}");
    println!(
        "Scope: {} x {} (seed {})",
        engine.scope(),
        engine.transformations_per_scope(),
        engine.seed()
    );

    let outcome = engine.run(&mut tree)?;

    println!(
        "\nApplied {} of {} attempts ({} empty, {} failed)",
        outcome.applied(),
        outcome.attempts,
        outcome.malformed,
        outcome.failures
    );
    let mut per_name: BTreeMap<&str, usize> = BTreeMap::new();
    for result in outcome.results.iter().filter(|r| !r.is_empty()) {
        *per_name.entry(result.name()).or_insert(0) += 1;
    }
    for (name, count) in &per_name {
        println!("  {name}: {count}");
    }
    if outcome.write_output {
        println!("Output: {output}");
    } else {
        println!("(output disabled)");
    }
    if let Some(path) = manifest {
        println!("Manifest: {}", path.display());
    }
    Ok(())
}

fn cmd_validate(source: &Path, pattern: &str) -> anyhow::Result<()> {
    let files = SourceLoader::with_pattern(source, pattern)?.discover()?;
    if files.is_empty() {
        println!("No files matching '{pattern}' below {}", source.display());
        return Ok(());
    }
    let tree = load_tree(source, pattern)?;
    tree.validate()?;
    println!(
        "{} files are valid ({} classes, {} methods)",
        files.len(),
        tree.classes().len(),
        tree.methods().len()
    );
    Ok(())
}

fn cmd_info(source: &Path, pattern: &str) -> anyhow::Result<()> {
    let tree = load_tree(source, pattern)?;
    let units = tree.units();

    println!("Source: {}", source.display());
    println!("Files: {}", units.len());
    println!("Classes: {}", tree.classes().len());
    println!("Methods: {}", tree.methods().len());

    for unit in units {
        println!("\n{}", tree.kind(unit)?.name().unwrap_or("(unnamed)"));
        for class in tree.find_all(unit, NodeKind::is_class) {
            let methods = tree.find_all(class, NodeKind::is_method);
            println!(
                "  class {} ({} methods)",
                tree.kind(class)?.name().unwrap_or("?"),
                methods.len()
            );
            for method in methods {
                let params = tree.parameters(method).len();
                println!(
                    "    fn {} ({params} parameters)",
                    tree.kind(method)?.name().unwrap_or("?")
                );
            }
        }
    }
    Ok(())
}

fn cmd_list(json: bool) -> anyhow::Result<()> {
    let registry = default_registry(metamorph_engine::DEFAULT_SEED);

    if json {
        let entries: Vec<_> = registry
            .all()
            .into_iter()
            .map(|(id, t)| {
                serde_json::json!({
                    "id": id,
                    "name": t.name(),
                    "categories": t.categories(),
                    "exclusive_with": t.exclusive_with(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Registry: {} ({} transformers)", registry.name(), registry.len());
    for (id, transformer) in registry.all() {
        let categories: Vec<_> = transformer
            .categories()
            .iter()
            .map(|c| c.as_str())
            .collect();
        print!("  {id} {} [{}]", transformer.name(), categories.join(", "));
        if !transformer.exclusive_with().is_empty() {
            print!(" excludes {}", transformer.exclusive_with().join(", "));
        }
        println!();
    }
    Ok(())
}
