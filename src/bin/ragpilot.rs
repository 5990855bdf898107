use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragpilot::embedder::gemini::DEFAULT_BASE_URL;
use ragpilot::prompt::build_prompt;
use ragpilot::{
    ingest_best_practices, ingest_code_dir, parse_extensions, ChunkConfig, CorpusStore,
    GeminiEmbedder, IngestReport, Retriever,
};

#[path = "ragpilot/generator.rs"]
mod generator;

use generator::{AnswerProvider, GeminiGenerator};

#[derive(Parser, Debug)]
#[command(
    name = "ragpilot",
    about = "Personal engineering copilot: RAG over best-practice notes and a code tree"
)]
struct Cli {
    /// Gemini API key used for embeddings and answers
    #[arg(long, env = "GEMINI_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Embedding model identifier
    #[arg(long, env = "GEMINI_EMBED_MODEL", global = true, default_value = "gemini-embedding-001")]
    embed_model: String,

    /// Chat model used to synthesize answers
    #[arg(long, env = "GEMINI_CHAT_MODEL", global = true, default_value = "gemini-2.5-flash")]
    chat_model: String,

    /// Base URL for the Gemini REST API
    #[arg(long, env = "GEMINI_BASE_URL", global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Directory holding the persisted index and chunk artifacts
    #[arg(long, env = "RAGPILOT_DATA_DIR", global = true, default_value = ".ragpilot")]
    data_dir: PathBuf,

    /// Max seconds to wait for a single provider call
    #[arg(long, env = "RAGPILOT_TIMEOUT_SECS", global = true, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a best-practices text file
    IngestBest {
        /// Path to the .txt file
        #[arg(long)]
        file: PathBuf,

        /// Maximum characters per chunk window
        #[arg(long, default_value_t = 1200)]
        max_chars: usize,

        /// Characters of overlap between adjacent windows
        #[arg(long, default_value_t = 200)]
        overlap: usize,
    },
    /// Ingest a source-code directory
    IngestCode {
        /// Root directory of the code tree
        #[arg(long)]
        dir: PathBuf,

        /// Comma-separated extensions to index (e.g. .py,.md,.rs)
        #[arg(long, default_value = ".py,.md,.rs")]
        ext: String,

        /// Maximum characters per chunk window
        #[arg(long, default_value_t = 1200)]
        max_chars: usize,

        /// Characters of overlap between adjacent windows
        #[arg(long, default_value_t = 200)]
        overlap: usize,
    },
    /// Interactive chat grounded by both collections
    Chat {
        /// Best-practices chunks retrieved per question
        #[arg(long, default_value_t = 4)]
        k_best: usize,

        /// Code chunks retrieved per question
        #[arg(long, default_value_t = 4)]
        k_code: usize,
    },
    /// Ask a single question (non-interactive)
    Ask {
        /// Question text
        #[arg(long)]
        question: String,

        /// Best-practices chunks retrieved
        #[arg(long, default_value_t = 4)]
        k_best: usize,

        /// Code chunks retrieved
        #[arg(long, default_value_t = 4)]
        k_code: usize,

        /// Only print the composed prompt (skip the generation call)
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Remove all persisted indexes and chunk lists
    Reset,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let store = CorpusStore::new(&cli.data_dir);

    match &cli.command {
        Command::IngestBest {
            file,
            max_chars,
            overlap,
        } => {
            let embedder = build_embedder(&cli)?;
            let config = ChunkConfig {
                max_chars: *max_chars,
                overlap: *overlap,
            };
            let report = ingest_best_practices(&embedder, &store, file, config)?;
            render_report(&report);
        }
        Command::IngestCode {
            dir,
            ext,
            max_chars,
            overlap,
        } => {
            let embedder = build_embedder(&cli)?;
            let extensions = parse_extensions(ext);
            let config = ChunkConfig {
                max_chars: *max_chars,
                overlap: *overlap,
            };
            let report = ingest_code_dir(&embedder, &store, dir, &extensions, config)?;
            render_report(&report);
        }
        Command::Chat { k_best, k_code } => {
            run_chat(&cli, &store, *k_best, *k_code)?;
        }
        Command::Ask {
            question,
            k_best,
            k_code,
            dry_run,
        } => {
            let answer = answer_question(&cli, &store, question, *k_best, *k_code, *dry_run)?;
            println!("{answer}");
        }
        Command::Reset => {
            store.reset()?;
            println!("removed all persisted artifacts under {:?}", cli.data_dir);
        }
    }
    Ok(())
}

fn build_embedder(cli: &Cli) -> Result<GeminiEmbedder> {
    let api_key = require_api_key(cli)?;
    GeminiEmbedder::new(
        api_key,
        &cli.base_url,
        &cli.embed_model,
        Duration::from_secs(cli.timeout_secs.max(1)),
    )
    .context("failed to configure the embedding client")
}

fn require_api_key(cli: &Cli) -> Result<&str> {
    cli.api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .context("GEMINI_API_KEY must be set (flag --api-key or environment)")
}

fn answer_question(
    cli: &Cli,
    store: &CorpusStore,
    question: &str,
    k_best: usize,
    k_code: usize,
    dry_run: bool,
) -> Result<String> {
    let embedder = build_embedder(cli)?;
    let retriever = Retriever::new(&embedder, store);
    let contexts = retriever.retrieve(question, k_best, k_code)?;
    let prompt = build_prompt(question, &contexts);
    if dry_run {
        return Ok(format!("--- Composed Prompt ---\n{prompt}"));
    }
    let generator = GeminiGenerator::new(
        require_api_key(cli)?,
        &cli.base_url,
        &cli.chat_model,
        Duration::from_secs(cli.timeout_secs.max(1)),
    )?;
    generator.answer(&prompt)
}

fn run_chat(cli: &Cli, store: &CorpusStore, k_best: usize, k_code: usize) -> Result<()> {
    println!("ragpilot chat — type your question (or 'exit' to quit).");
    let stdin = io::stdin();
    loop {
        print!(">> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        match answer_question(cli, store, question, k_best, k_code, false) {
            Ok(answer) => println!("\n=== Answer ===\n{answer}\n"),
            Err(err) => eprintln!("error: {err:#}"),
        }
    }
    Ok(())
}

fn render_report(report: &IngestReport) {
    println!(
        "OK! Collection '{}' rebuilt: {} chunks from {} file(s)",
        report.collection.label(),
        report.chunk_count,
        report.files_indexed
    );
    if !report.skipped.is_empty() {
        println!("skipped {} unreadable file(s):", report.skipped.len());
        for skipped in &report.skipped {
            println!("  {:?}: {}", skipped.path, skipped.reason);
        }
    }
}
