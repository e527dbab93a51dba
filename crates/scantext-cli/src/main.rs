//! Command-line interface for the scantext pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use scantext::{
    ApiKeyState, BatchItem, BatchStatus, Pipeline, PipelineConfig, SessionContext,
    TranslationDirection,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scantext", version, about = "Recognize and translate text in images and PDFs")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key for the recognition service (overrides OCR_API_KEY).
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognize text in one image or PDF.
    Process {
        file: PathBuf,

        /// Translate the recognized text (direction chosen from its script).
        #[arg(long)]
        translate: bool,

        /// Print text statistics for the recognized text.
        #[arg(long)]
        analyze: bool,

        /// Write the recognized (and translated) text to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recognize text in several files under rate-limit admission.
    Batch { files: Vec<PathBuf> },

    /// Translate text from a file (or stdin with `-`) and record it.
    Translate {
        input: PathBuf,

        /// Translation direction; omitted = chosen from the text's script.
        #[arg(long, value_enum)]
        direction: Option<Direction>,
    },

    /// List processing history, newest first.
    History {
        /// Show at most this many records.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show processing statistics.
    Stats,

    /// Remove all cached recognition results.
    CacheClear,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    RuEn,
    EnRu,
}

impl From<Direction> for TranslationDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::RuEn => TranslationDirection::RuToEn,
            Direction::EnRu => TranslationDirection::EnToRu,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scantext=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };

    let credentials = match &cli.api_key {
        Some(key) => ApiKeyState::with_key(key),
        None => ApiKeyState::from_env(),
    };

    let pipeline = Pipeline::new(config)?;
    let ctx = SessionContext::with_credentials(pipeline.config(), credentials);

    match cli.command {
        Command::Process {
            file,
            translate,
            analyze,
            output,
        } => process(&pipeline, &ctx, &file, translate, analyze, output.as_deref()).await,
        Command::Batch { files } => batch(&pipeline, &ctx, &files).await,
        Command::Translate { input, direction } => {
            translate_cmd(&pipeline, &input, direction.map(Into::into)).await
        }
        Command::History { limit } => history(&pipeline, limit),
        Command::Stats => stats(&pipeline),
        Command::CacheClear => {
            let removed = pipeline.cache().clear()?;
            println!("Removed {} cached result(s)", removed);
            Ok(())
        }
    }
}

async fn process(
    pipeline: &Pipeline,
    ctx: &SessionContext,
    file: &std::path::Path,
    translate: bool,
    analyze: bool,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file.file_name().and_then(|n| n.to_str());

    let (outcome, record) = pipeline.process_and_record(ctx, &bytes, filename, translate).await?;

    let mut content = outcome.text.clone();
    if let Some(translated) = &record.translated_text {
        content.push_str("\n\n--- translation ---\n");
        content.push_str(translated);
    }

    match output {
        Some(path) => {
            std::fs::write(path, &content).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Written to {}", path.display());
        }
        None => println!("{}", content),
    }

    eprintln!(
        "Language: {} | Time: {}{}",
        record.language,
        outcome.processing_time,
        if outcome.cache_hit { " (cached)" } else { "" }
    );

    if analyze {
        let report = scantext::text::analyze(&outcome.text);
        eprintln!(
            "Chars: {} | Words: {} | Lines: {} | Paragraphs: {}",
            report.chars, report.words, report.lines, report.paragraphs
        );
        for (word, count) in &report.top_words {
            eprintln!("  {:>4}x {}", count, word);
        }
    }

    Ok(())
}

async fn batch(pipeline: &Pipeline, ctx: &SessionContext, files: &[PathBuf]) -> anyhow::Result<()> {
    let mut items = Vec::with_capacity(files.len());
    for file in files {
        let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
        let filename = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        items.push(BatchItem { filename, bytes });
    }

    let outcomes = pipeline.process_batch(ctx, &items).await?;
    for outcome in &outcomes {
        match &outcome.status {
            BatchStatus::Done(result) => println!(
                "OK       {} ({}, {})",
                outcome.filename, result.detected_language, result.processing_time
            ),
            BatchStatus::Failed { error } => println!("FAILED   {}: {}", outcome.filename, error),
            BatchStatus::RateLimited => println!("LIMITED  {}", outcome.filename),
            BatchStatus::Skipped { reason } => println!("SKIPPED  {}: {}", outcome.filename, reason),
        }
    }

    let done = outcomes.iter().filter(|o| o.status.is_done()).count();
    eprintln!("{}/{} processed", done, outcomes.len());
    Ok(())
}

async fn translate_cmd(
    pipeline: &Pipeline,
    input: &std::path::Path,
    direction: Option<TranslationDirection>,
) -> anyhow::Result<()> {
    let text = if input.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?
    };

    let direction = direction.unwrap_or_else(|| TranslationDirection::for_text(&text));
    let (translated, _record) = pipeline.translate_item(&text, direction).await?;
    println!("{}", translated);
    Ok(())
}

fn history(pipeline: &Pipeline, limit: Option<usize>) -> anyhow::Result<()> {
    let records = pipeline.history().list_all()?;
    let shown = limit.unwrap_or(records.len()).min(records.len());

    for record in &records[..shown] {
        println!("{} | {} | {}", record.id, record.language, record.processing_time);
        for line in record.text.lines().take(2) {
            println!("    {}", line);
        }
        if let Some(target) = &record.target_language {
            println!("    (translated to {})", target);
        }
    }

    eprintln!("{} of {} record(s)", shown, records.len());
    Ok(())
}

fn stats(pipeline: &Pipeline) -> anyhow::Result<()> {
    let snapshot = pipeline.stats().load()?;
    println!("Processed: {}", snapshot.total_processed);
    println!("Succeeded: {}", snapshot.total_success);
    println!("Failed:    {}", snapshot.total_failed);
    println!(
        "Uploaded:  {:.2} MB",
        snapshot.total_size as f64 / (1024.0 * 1024.0)
    );
    if let Some(last) = &snapshot.last_processed {
        println!("Last run:  {}", last);
    }
    Ok(())
}
