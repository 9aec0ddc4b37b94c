use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldsearch_core::persist::{load_store, save_store, IndexPaths};
use fieldsearch_core::{IndexBuilder, IndexConfig, Record, SearchEngine, SortSpec};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a boosted multi-field index and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Field table as JSON; the built-in article table is used when omitted
        #[arg(long)]
        schema: Option<String>,
    },
    /// Run one query against a built index and print the rows
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Query string
        #[arg(long)]
        query: String,
        /// Maximum hits taken from the relevance search
        #[arg(long, default_value_t = 200)]
        limit: u32,
        /// Sort field overriding the index default
        #[arg(long)]
        sort: Option<String>,
        /// Sort ascending instead of descending
        #[arg(long, default_value_t = false)]
        asc: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, schema } => {
            let config = match schema {
                Some(path) => {
                    let json =
                        fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
                    IndexConfig::from_json(&json)?
                }
                None => IndexConfig::articles(),
            };
            build_index(Path::new(&input), Path::new(&output), config)
        }
        Commands::Search { index, query, limit, sort, asc } => {
            run_search(&index, &query, limit, sort, asc)
        }
    }
}

/// `.json`/`.jsonl` files under `input`, in path order so ids are reproducible.
fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            let ext = p.extension().and_then(|s| s.to_str());
            if p.is_file() && matches!(ext, Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn read_records(file: &Path) -> Result<Vec<Record>> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    let mut records = Vec::new();
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let at = || format!("{}:{}", file.display(), n + 1);
            let value: serde_json::Value = serde_json::from_str(&line).with_context(at)?;
            records.push(Record::from_json(value).with_context(at)?);
        }
    } else {
        let value: serde_json::Value = serde_json::from_reader(reader)?;
        match value {
            serde_json::Value::Array(arr) => {
                for v in arr {
                    records.push(Record::from_json(v).with_context(|| file.display().to_string())?);
                }
            }
            v @ serde_json::Value::Object(_) => records.push(Record::from_json(v)?),
            _ => tracing::warn!(file = %file.display(), "skipping file without records"),
        }
    }
    Ok(records)
}

fn build_index(input: &Path, output: &Path, config: IndexConfig) -> Result<()> {
    let mut builder = IndexBuilder::new(config)?;
    for file in input_files(input) {
        let records = read_records(&file)?;
        tracing::info!(file = %file.display(), records = records.len(), "ingesting");
        for record in &records {
            builder.add_record(record).with_context(|| format!("indexing {}", file.display()))?;
        }
    }
    let store = builder.finish();
    let meta = save_store(&IndexPaths::new(output), &store)?;
    tracing::info!(
        output = %output.display(),
        num_docs = meta.num_docs,
        num_terms = meta.num_terms,
        "index written"
    );
    Ok(())
}

fn run_search(index: &str, query: &str, limit: u32, sort: Option<String>, asc: bool) -> Result<()> {
    let store = load_store(&IndexPaths::new(index))?;
    let engine = SearchEngine::new(Arc::new(store));
    let outcome = match sort {
        Some(field) => {
            let spec = SortSpec { field, descending: !asc };
            engine.query_with(query, limit, Some(&spec), query)?
        }
        None => engine.query(query, limit)?,
    };
    println!("Found {} results", outcome.hits.len());
    for hit in &outcome.hits {
        println!("doc {} (score {:.2})", hit.doc_id, hit.score);
        for (field, value) in &hit.fields {
            println!("  {field}: {value}");
        }
    }
    Ok(())
}
