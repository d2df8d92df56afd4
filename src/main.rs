use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use mojiq::dataset::Dataset;
use mojiq::encode::{to_json_string, write_array};
use mojiq::pipeline::{IdsFindRequest, LookupRequest, Pipeline, SearchRequest};
use mojiq::registry::Registry;
use mojiq::sink::{ChunkSink, WriterSink};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "mojiq", about = "Character lookup queries over mojidata", version)]
struct Cli {
    /// Path to the mojidata SQLite database
    #[arg(long, env = "MOJIQ_DB", global = true, default_value = "moji.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Characters matching every predicate
    Search {
        #[command(flatten)]
        predicates: Predicates,
        #[command(flatten)]
        page: Page,
    },
    /// Characters by decomposition, optionally narrowed by predicates
    Idsfind {
        /// Component sequence that must occur in the decomposition (repeatable)
        #[arg(long)]
        ids: Vec<String>,
        /// Exact decomposition (repeatable)
        #[arg(long)]
        whole: Vec<String>,
        #[command(flatten)]
        predicates: Predicates,
        #[command(flatten)]
        page: Page,
    },
    /// Everything known about one character
    Lookup {
        char: Option<String>,
        /// Fields to include (repeatable); all fields when omitted
        #[arg(long)]
        select: Vec<String>,
    },
    /// List the registered predicate keys
    Predicates,
}

#[derive(Args)]
struct Predicates {
    /// Predicate key (repeatable)
    #[arg(short = 'p')]
    p: Vec<String>,
    /// Argument for the predicate at the same position (repeatable)
    #[arg(short = 'q', allow_hyphen_values = true)]
    q: Vec<String>,
}

#[derive(Args)]
struct Page {
    /// Maximum number of results
    #[arg(long, allow_hyphen_values = true)]
    limit: Option<String>,
    /// Results to skip before the limit
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<String>,
    /// Include private use and compatibility characters
    #[arg(long)]
    all_results: bool,
}

enum Request {
    Search(SearchRequest),
    IdsFind(IdsFindRequest),
    Lookup(LookupRequest),
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mojiq=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = Registry::builtin().context("invalid predicate registry")?;

    let stdout = io::stdout().lock();
    let mut sink = WriterSink::new(BufWriter::with_capacity(64 * 1024, stdout));

    let request = match cli.command {
        Command::Predicates => {
            write_array(&mut sink, registry.keys())?;
            sink.write_chunk("\n")?;
            sink.finish()?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Search { predicates, page } => Request::Search(SearchRequest {
            p: predicates.p,
            q: predicates.q,
            limit: page.limit,
            offset: page.offset,
            all_results: page.all_results,
        }),
        Command::Idsfind {
            ids,
            whole,
            predicates,
            page,
        } => Request::IdsFind(IdsFindRequest {
            ids,
            whole,
            p: predicates.p,
            q: predicates.q,
            limit: page.limit,
            offset: page.offset,
            all_results: page.all_results,
        }),
        Command::Lookup { char, select } => Request::Lookup(LookupRequest { char, select }),
    };

    let dataset = Dataset::open(&cli.db)
        .with_context(|| format!("failed to open dataset: {}", cli.db.display()))?;
    let pipeline = Pipeline::new(&dataset, &registry);

    let result = match &request {
        Request::Search(req) => pipeline.search(req, &mut sink),
        Request::IdsFind(req) => pipeline.idsfind(req, &mut sink),
        Request::Lookup(req) => pipeline.lookup(req, &mut sink),
    };

    let code = match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_transport() => {
            warn!(error = %e, "output closed, response abandoned");
            return Ok(ExitCode::from(1));
        }
        Err(e) if sink.bytes_written() > 0 => {
            warn!(error = %e, "response aborted mid-stream");
            return Ok(ExitCode::from(1));
        }
        Err(e) => {
            sink.write_chunk(&to_json_string(&e.envelope()))?;
            if e.is_client_error() {
                ExitCode::from(2)
            } else {
                warn!(error = %e, "request failed");
                ExitCode::from(1)
            }
        }
    };

    sink.write_chunk("\n")?;
    sink.finish()?;
    Ok(code)
}
