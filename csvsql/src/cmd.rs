use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use common::agent::{OpenAiTranslator, SqlTranslator};
use common::config::{
    Config, DatabaseConfig, LlmConfig, TracingConfig, DEFAULT_BASE_URL, DEFAULT_DATABASE_PATH,
    DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use common::db::Database;
use common::ingest::{default_table_name, load_csv, load_into, LoadReport};
use common::output::{render, OutputFormat};
use common::schema::{ConflictResolution, SchemaConflict};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "csvsql")]
#[command(about = "load csv files into sqlite, query them, or ask in plain language", long_about = None)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "CSVSQL_DATABASE", default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    /// Output format for query results
    #[arg(long, global = true, value_enum, default_value_t = Format::Table)]
    format: Format,

    #[command(flatten)]
    llm: LlmArgs,

    /// Export spans over OTLP
    #[arg(long, global = true, env = "CSVSQL_ENABLE_TRACING")]
    enable_tracing: bool,

    /// OTLP collector endpoint
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LlmArgs {
    /// API key for the chat completions service
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used by `ask`
    #[arg(long, global = true, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the chat completions API
    #[arg(long, global = true, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout for the model API, in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV file into a table
    Load {
        /// CSV file with a header row
        csv_path: PathBuf,

        /// Target table (default: derived from the file name)
        table_name: Option<String>,

        /// What to do when the table exists with different columns (default: ask when interactive, else abort)
        #[arg(long, value_enum)]
        on_conflict: Option<ConflictPolicy>,

        /// Table name to use when renaming on conflict (implies --on-conflict rename)
        #[arg(long)]
        rename_to: Option<String>,
    },
    /// List tables in the database
    Tables {
        /// Show column definitions
        #[arg(long, default_value = "false")]
        schema: bool,
    },
    /// Run a SQL statement and print its result
    Query {
        /// SQL passed verbatim to SQLite
        sql: String,
    },
    /// Translate a plain-language request into SQL and run it
    Ask {
        /// Natural-language request
        prompt: String,

        /// Print the generated SQL without executing it
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Table => OutputFormat::Table,
            Format::Csv => OutputFormat::Csv,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConflictPolicy {
    Abort,
    Rename,
    Overwrite,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            database: DatabaseConfig {
                path: self.database.clone(),
            },
            llm: LlmConfig {
                api_key: self.llm.api_key.clone(),
                model: self.llm.model.clone(),
                base_url: self.llm.base_url.clone(),
                timeout: Duration::from_secs(self.llm.timeout_secs),
            },
            tracing: TracingConfig {
                enabled: self.enable_tracing,
                endpoint: self.otlp_endpoint.clone().filter(|e| !e.is_empty()),
            },
        }
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.config();
        let format = OutputFormat::from(self.format);

        // initialize tracing
        let _guard = common::tracing::init_tracing("csvsql", &config.tracing)?;
        tracing::debug!(?config, "configuration resolved");

        match self.command {
            Commands::Load {
                csv_path,
                table_name,
                on_conflict,
                rename_to,
            } => {
                let mut db = Database::open(&config.database)?;
                let policy = on_conflict.or(rename_to.as_ref().map(|_| ConflictPolicy::Rename));
                let interactive = io::stdin().is_terminal();

                let report = run_load(&mut db, csv_path, table_name, |conflict| {
                    resolve_conflict(conflict, policy, rename_to.as_deref(), interactive)
                })?;
                writeln!(
                    io::stdout().lock(),
                    "table '{}' {} ({} rows)",
                    report.table, report.action, report.rows
                )?;
                Ok(())
            }
            Commands::Tables { schema } => {
                let db = Database::open(&config.database)?;
                run_tables(&db, schema, &mut io::stdout().lock())
            }
            Commands::Query { sql } => {
                let db = Database::open(&config.database)?;
                run_query(&db, &sql, format, &mut io::stdout().lock())
            }
            Commands::Ask { prompt, dry_run } => {
                // fail on a missing api key before the database is touched
                let translator = OpenAiTranslator::new(&config.llm)?;
                let db = Database::open(&config.database)?;
                run_ask(&db, &translator, &prompt, dry_run, format, &mut io::stdout()).await
            }
        }
    }
}

fn run_load<F>(
    db: &mut Database,
    csv_path: PathBuf,
    table_name: Option<String>,
    resolve: F,
) -> Result<LoadReport>
where
    F: FnMut(&SchemaConflict) -> common::Result<ConflictResolution>,
{
    let table_name = table_name.unwrap_or_else(|| default_table_name(&csv_path));

    tracing::info!("loading {} into '{}'", csv_path.display(), table_name);

    let loaded = load_csv(&csv_path, &table_name)?;
    Ok(load_into(db, loaded, resolve)?)
}

fn resolve_conflict(
    conflict: &SchemaConflict,
    policy: Option<ConflictPolicy>,
    rename_to: Option<&str>,
    interactive: bool,
) -> common::Result<ConflictResolution> {
    eprintln!("schema conflict detected!\n{}", conflict);

    let suggested = format!("{}_new", conflict.incoming.name);
    match policy {
        Some(ConflictPolicy::Abort) => Ok(ConflictResolution::Abort),
        Some(ConflictPolicy::Overwrite) => Ok(ConflictResolution::Overwrite),
        Some(ConflictPolicy::Rename) => Ok(ConflictResolution::Rename(
            rename_to.map(str::to_string).unwrap_or(suggested),
        )),
        None if interactive => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            prompt_resolution(&suggested, &mut input, &mut io::stderr())
        }
        None => Ok(ConflictResolution::Abort),
    }
}

/// ask the user how to handle a conflict; end of input means abort
fn prompt_resolution<R: BufRead, W: Write>(
    suggested: &str,
    input: &mut R,
    prompt: &mut W,
) -> common::Result<ConflictResolution> {
    loop {
        write!(prompt, "Choose an option - Overwrite (O), Rename (R), Abort (A): ")?;
        prompt.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(ConflictResolution::Abort);
        }

        match line.trim().to_uppercase().as_str() {
            "O" => return Ok(ConflictResolution::Overwrite),
            "A" | "S" => return Ok(ConflictResolution::Abort),
            "R" => {
                write!(prompt, "New table name [{}]: ", suggested)?;
                prompt.flush()?;

                let mut name = String::new();
                input.read_line(&mut name)?;
                let name = name.trim();
                let name = if name.is_empty() { suggested } else { name };
                return Ok(ConflictResolution::Rename(name.to_string()));
            }
            other => writeln!(prompt, "invalid choice '{}'", other)?,
        }
    }
}

fn run_tables<W: Write>(db: &Database, with_schema: bool, out: &mut W) -> Result<()> {
    if with_schema {
        for table in db.database_schema()? {
            writeln!(out, "{}", table.signature())?;
        }
    } else {
        for name in db.list_tables()? {
            writeln!(out, "{}", name)?;
        }
    }
    Ok(())
}

fn run_query<W: Write>(db: &Database, sql: &str, format: OutputFormat, out: &mut W) -> Result<()> {
    let outcome = db.execute_raw(sql)?;
    render(&outcome, format, out)?;
    Ok(())
}

async fn run_ask<W: Write>(
    db: &Database,
    translator: &dyn SqlTranslator,
    prompt: &str,
    dry_run: bool,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let schema = db.database_schema()?;
    tracing::info!(tables = schema.len(), "asking model for sql");

    let sql = translator.translate(prompt, &schema).await?;

    if dry_run {
        writeln!(out, "{}", sql)?;
        return Ok(());
    }

    // generated sql gets no more trust than typed sql
    eprintln!("generated sql: {}", sql);
    run_query(db, &sql, format, out)
}
