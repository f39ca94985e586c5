use crate::render::render_table;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use common::config::{
    DEFAULT_API_VERSION, DEFAULT_DB_PATH, DEFAULT_DEPLOYMENT, DEFAULT_ROW_LIMIT,
    DEFAULT_TABLE_NAME, DEFAULT_TIMEOUT_SECS,
};
use common::llm::AzureOpenAiClient;
use common::{AppConfig, LlmConfig, PipelineContext, PipelineSettings, Session, TabletalkError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "tabletalk")]
#[command(about = "ask questions about a csv or excel file in plain language", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV or Excel file into the local store
    Load {
        /// Input file path (.csv, .xlsx or .xls)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        options: PipelineArgs,
    },
    /// Ask questions about the stored table
    Chat {
        /// Load this file before the first question
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        options: PipelineArgs,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// SQLite database file
    #[arg(long, env = "TABLETALK_DB", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Table the file is loaded into
    #[arg(long, env = "TABLETALK_TABLE", default_value = DEFAULT_TABLE_NAME)]
    table: String,

    /// LIMIT appended to generated queries that carry none
    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT)]
    row_limit: usize,

    /// Attempts for table definition generation
    #[arg(long, default_value = "1")]
    max_attempts: usize,

    /// Chat completion service endpoint
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT_TEXT")]
    endpoint: Option<String>,

    /// Chat completion service key
    #[arg(long, env = "AZURE_OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model deployment name
    #[arg(long, env = "TABLETALK_DEPLOYMENT", default_value = DEFAULT_DEPLOYMENT)]
    deployment: String,

    /// Service API version
    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = DEFAULT_API_VERSION)]
    api_version: String,

    /// Per-call timeout for the model, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    llm_timeout_secs: u64,
}

impl PipelineArgs {
    fn into_config(self) -> common::Result<AppConfig> {
        let llm = LlmConfig::new(self.endpoint, self.api_key)?
            .with_deployment(self.deployment)
            .with_api_version(self.api_version)
            .with_timeout_secs(self.llm_timeout_secs);

        let pipeline = PipelineSettings {
            db_path: self.db,
            table: self.table,
            row_limit: self.row_limit,
            max_attempts: self.max_attempts,
            ..PipelineSettings::default()
        };

        AppConfig::new(llm, pipeline)
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let _guard = common::tracing::init_tracing("tabletalk")?;

        match self.command {
            Commands::Load { input, options } => {
                let ctx = build_context(options)?;
                load(&ctx, &input).await?;
                log_usage(&ctx);
                Ok(())
            }
            Commands::Chat { input, options } => {
                let ctx = build_context(options)?;
                if let Some(input) = input {
                    load(&ctx, &input).await?;
                }
                chat(ctx).await
            }
        }
    }
}

fn build_context(options: PipelineArgs) -> Result<PipelineContext> {
    let config = options.into_config()?;
    tracing::debug!(llm = ?config.llm, "configuration loaded");

    let model = Arc::new(AzureOpenAiClient::new(config.llm)?);
    Ok(PipelineContext::new(model, config.pipeline))
}

async fn load(ctx: &PipelineContext, input: &Path) -> Result<()> {
    tracing::info!("loading {}", input.display());
    let report = common::ingest(ctx, input).await?;

    println!("\nGenerated SQL:\n\n{}", report.table.ddl);
    println!(
        "\n--- Verification (First {} Rows) ---\n",
        ctx.settings.verify_rows
    );
    println!("{}", render_table(&report.preview, ctx.settings.verify_rows));

    tracing::info!(
        table = ctx.table(),
        rows = report.table.rows,
        attempts = report.table.attempts,
        "table ready"
    );
    Ok(())
}

async fn chat(ctx: PipelineContext) -> Result<()> {
    let session = Session::open(ctx).await?;
    let mut stdout = std::io::stdout();

    question_loop(&session, BufReader::new(tokio::io::stdin()), &mut stdout).await?;

    log_usage(session.context());
    Ok(())
}

fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// read questions until `exit` or end of input; blank lines are skipped and
/// a failed turn never ends the loop
async fn question_loop<R, W>(session: &Session, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "\nAsk something (or type exit): ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }

        if let Err(e) = answer(session, question, out).await {
            report_turn_error(&e, out)?;
        }
    }

    Ok(())
}

/// one question: statement, result preview, summary
async fn answer<W: Write>(session: &Session, question: &str, out: &mut W) -> common::Result<()> {
    let preview_rows = session.context().settings.preview_rows;

    let statement = session.prepare(question).await?;
    writeln!(out, "\nGenerated SQL:\n{}", statement)?;

    let result = session.run(&statement).await?;
    writeln!(out, "\n--- Result (First {} Rows) ---\n", preview_rows)?;
    writeln!(out, "{}", render_table(&result, preview_rows))?;

    let summary = session.summarize(question, &result).await?;
    writeln!(out, "\n--- Summary ---\n\n{}", summary)?;
    Ok(())
}

fn report_turn_error<W: Write>(e: &TabletalkError, out: &mut W) -> std::io::Result<()> {
    match e {
        TabletalkError::SafetyRejection { keyword } => {
            tracing::warn!(keyword = %keyword, "statement rejected");
            writeln!(out, "\nUnsafe query blocked.")
        }
        e if e.is_turn_local() => {
            tracing::warn!(error = %e, "question failed");
            writeln!(out, "\nError: {}", e)
        }
        e => {
            tracing::error!(error = %e, "question failed outside the pipeline");
            writeln!(out, "\nError: {}", e)
        }
    }
}

fn log_usage(ctx: &PipelineContext) {
    let totals = ctx.usage.totals();
    tracing::info!(
        calls = totals.calls,
        prompt_tokens = totals.prompt_tokens,
        completion_tokens = totals.completion_tokens,
        total_tokens = totals.total_tokens,
        "model usage"
    );
}
