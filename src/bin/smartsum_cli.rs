//! Command-line front end: summarize one PDF or every PDF under a directory.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use futures_util::{StreamExt, stream};
use smartsum::{
    config, logging,
    processing::{
        Pipeline, PipelineResult, SummarizeParams, ValidatedRequest, ValidationError,
        format::{self, ResultFormatter},
        validate::validate,
    },
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "smartsum-cli",
    about = "Role-aware PDF summarizer with OCR fallback"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a single PDF and print the rendered summary.
    Summarize {
        file: PathBuf,
        #[command(flatten)]
        request: RequestArgs,
        /// Print the full JSON response envelope instead of the rendered summary.
        #[arg(long)]
        envelope: bool,
    },
    /// Summarize every PDF under a directory, writing `<stem>_智能总结<ext>` beside each file.
    Batch {
        dir: PathBuf,
        #[command(flatten)]
        request: RequestArgs,
        /// Documents processed at the same time.
        #[arg(long, default_value_t = 2)]
        concurrency: usize,
    },
}

#[derive(Args, Clone)]
struct RequestArgs {
    /// Reader role (lawyer, student, researcher, manager, analyst or any other label).
    #[arg(long)]
    role: String,
    /// What the reader wants from the document.
    #[arg(long)]
    goal: String,
    /// brief, standard or detailed.
    #[arg(long)]
    level: Option<String>,
    /// markdown, json or text.
    #[arg(long)]
    format: Option<String>,
    /// zh-CN or en-US.
    #[arg(long)]
    language: Option<String>,
    /// Topic to emphasize; repeatable.
    #[arg(long = "focus")]
    focus_areas: Vec<String>,
    /// Narrative bound in characters.
    #[arg(long)]
    max_length: Option<usize>,
    /// Append the extracted text to the output.
    #[arg(long)]
    include_original: bool,
    /// Never run OCR, even for scanned documents.
    #[arg(long)]
    no_ocr: bool,
    /// chi_sim, eng or chi_sim+eng.
    #[arg(long)]
    ocr_language: Option<String>,
}

impl RequestArgs {
    fn params_for(&self, path: &Path) -> SummarizeParams {
        SummarizeParams {
            document_path: Some(path.display().to_string()),
            role: Some(self.role.clone()),
            goal: Some(self.goal.clone()),
            level: self.level.clone(),
            focus_areas: Some(self.focus_areas.clone()),
            output_format: self.format.clone(),
            language: self.language.clone(),
            include_original_text: Some(self.include_original),
            max_summary_length: self.max_length,
            enable_ocr: Some(!self.no_ocr),
            ocr_language: self.ocr_language.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing_with(false);
    let pipeline = Pipeline::from_config(config::get_config())
        .context("failed to initialize summarization backend")?;

    match cli.command {
        Command::Summarize {
            file,
            request,
            envelope,
        } => summarize_one(&pipeline, &file, &request, envelope).await,
        Command::Batch {
            dir,
            request,
            concurrency,
        } => summarize_dir(&pipeline, &dir, &request, concurrency.max(1)).await,
    }
}

async fn summarize_one(
    pipeline: &Pipeline,
    file: &Path,
    args: &RequestArgs,
    envelope: bool,
) -> Result<()> {
    if envelope {
        let response = pipeline.execute_params(args.params_for(file)).await;
        println!("{}", serde_json::to_string_pretty(&response.to_value())?);
        if response.success {
            return Ok(());
        }
        bail!("summarization failed");
    }

    let request = validate(args.params_for(file), pipeline.settings().limits)
        .await
        .map_err(|error| describe_rejection(&error))?;
    let result = pipeline.run(&request).await?;
    let rendered = render(pipeline, &request, &result)?;
    println!("{rendered}");
    Ok(())
}

async fn summarize_dir(
    pipeline: &Pipeline,
    dir: &Path,
    args: &RequestArgs,
    concurrency: usize,
) -> Result<()> {
    let files = collect_pdfs(dir)?;
    if files.is_empty() {
        bail!("no PDF files found under {}", dir.display());
    }
    tracing::info!(count = files.len(), concurrency, "Batch started");

    let outcomes: Vec<(PathBuf, Result<PathBuf>)> = stream::iter(files)
        .map(|file| async move {
            let outcome = summarize_to_file(pipeline, &file, args).await;
            (file, outcome)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut failed = 0usize;
    for (file, outcome) in &outcomes {
        match outcome {
            Ok(output) => println!("ok    {} -> {}", file.display(), output.display()),
            Err(err) => {
                failed += 1;
                println!("fail  {}: {err:#}", file.display());
            }
        }
    }
    let metrics = pipeline.metrics().snapshot();
    println!(
        "{} processed, {} failed, {} via OCR",
        metrics.documents_processed,
        failed,
        metrics.ocr_documents
    );
    if failed > 0 {
        bail!("{failed} of {} documents failed", outcomes.len());
    }
    Ok(())
}

async fn summarize_to_file(pipeline: &Pipeline, file: &Path, args: &RequestArgs) -> Result<PathBuf> {
    let request = validate(args.params_for(file), pipeline.settings().limits)
        .await
        .map_err(|error| describe_rejection(&error))?;
    let result = pipeline.run(&request).await?;
    if let Some(path) = &result.processing_meta.output_path {
        return Ok(path.clone());
    }
    let rendered = render(pipeline, &request, &result)?;
    let path = format::output_path(request.document.path(), request.output_format);
    format::persist(&path, &rendered).await?;
    Ok(path)
}

fn render(pipeline: &Pipeline, request: &ValidatedRequest, result: &PipelineResult) -> Result<String> {
    let formatter = ResultFormatter::new(request.summary.language)
        .with_original_cap(pipeline.settings().original_text_cap);
    let rendered = formatter.format(
        &result.summary,
        result.original_text.as_deref().unwrap_or_default(),
        request.output_format,
        request.include_original_text,
    )?;
    Ok(rendered)
}

fn describe_rejection(error: &ValidationError) -> anyhow::Error {
    let issues = error
        .issues()
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ");
    tracing::debug!(code = %error.code(), "Request rejected");
    anyhow::anyhow!("invalid request: {issues}")
}

fn collect_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        let is_pdf = entry
            .path()
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"));
        if entry.file_type().is_file() && is_pdf {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
