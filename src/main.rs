use acskit::{
    config::Config,
    fips::FipsRegistry,
    process::{self, export::write_parquet, source::discover, DataSource},
    schema::{write_catalog, TableCatalog},
    survey::SurveyKey,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{collections::BTreeMap, path::PathBuf, time::Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Load ACS summary-file tables into Parquet")]
struct Args {
    /// YAML config; flags below override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    year: Option<u16>,
    #[arg(long, global = true)]
    span: Option<u8>,
    /// Two-letter state code; repeat for several.
    #[arg(long = "state", global = true)]
    states: Vec<String>,
    /// ACS table id; repeat for several.
    #[arg(long = "table", global = true)]
    tables: Vec<String>,
    /// Directory, ZIP, or glob pattern of summary files.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Sequence/table lookup file.
    #[arg(long, global = true)]
    lookup: Option<PathBuf>,
    /// County FIPS file (`national_county.txt`).
    #[arg(long, global = true)]
    fips: Option<PathBuf>,
    #[arg(long, global = true)]
    out: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode tables for each state and write Parquet (default).
    Load,
    /// Write the table/column listing as acsmeta.json.
    Meta,
    /// Print a table's title and columns.
    Describe { table: String },
    /// Look up a state or county by FIPS code.
    Fips { state: String, county: Option<String> },
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) resolve config ───────────────────────────────────────────
    let args = Args::parse();
    let cfg = resolve_config(&args)?;

    match args.command.unwrap_or(Command::Load) {
        Command::Load => run_load(&cfg),
        Command::Meta => {
            let catalog = load_catalog(&cfg)?;
            let path = write_catalog(&catalog, &cfg.out_dir)
                .with_context(|| format!("writing catalog to {}", cfg.out_dir.display()))?;
            info!(tables = catalog.len(), path = %path.display(), "wrote table listing");
            Ok(())
        }
        Command::Describe { table } => {
            let catalog = load_catalog(&cfg)?;
            let t = catalog.get(&table)?;
            println!("{} ({}, sequence {})", t.id(), t.subject(), t.sequence_number());
            if let Some(universe) = &t.universe {
                println!("Universe: {}", universe);
            }
            print!("{}", t.describe());
            if !t.is_complete() {
                println!(
                    "warning: {} columns, {:?} declared",
                    t.len(),
                    t.table.cell_count
                );
            }
            Ok(())
        }
        Command::Fips { state, county } => {
            let mut fips = FipsRegistry::new().with_delimiter(cfg.delimiter_byte());
            fips.load_path(&cfg.fips_file)
                .with_context(|| format!("loading FIPS file {}", cfg.fips_file.display()))?;
            let state_name = fips.state_name(&state).unwrap_or("(unknown state)");
            match county {
                Some(c) => println!(
                    "{} {}: {}, {}",
                    state,
                    c,
                    fips.county_name(&state, &c).unwrap_or("(unknown county)"),
                    state_name
                ),
                None => println!("{}: {}", state, state_name),
            }
            Ok(())
        }
    }
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(year) = args.year {
        cfg.year = year;
    }
    if let Some(span) = args.span {
        cfg.span = span;
    }
    if !args.states.is_empty() {
        cfg.states = args.states.clone();
    }
    if !args.tables.is_empty() {
        cfg.tables = args.tables.clone();
    }
    if let Some(data) = &args.data_dir {
        cfg.data_dir = data.clone();
    }
    if let Some(lookup) = &args.lookup {
        cfg.lookup_file = lookup.clone();
    }
    if let Some(fips) = &args.fips {
        cfg.fips_file = fips.clone();
    }
    if let Some(out) = &args.out {
        cfg.out_dir = out.clone();
    }
    Ok(cfg)
}

fn load_catalog(cfg: &Config) -> Result<TableCatalog> {
    info!(path = %cfg.lookup_file.display(), "loading ACS table definitions");
    let mut catalog = TableCatalog::new().with_delimiter(cfg.delimiter_byte());
    catalog
        .load_path(&cfg.lookup_file)
        .with_context(|| format!("loading lookup file {}", cfg.lookup_file.display()))?;
    info!(tables = catalog.len(), "loaded table definitions");
    Ok(catalog)
}

fn run_load(cfg: &Config) -> Result<()> {
    let start = Instant::now();
    let catalog = load_catalog(cfg)?;
    let delimiter = cfg.delimiter_byte();

    // ─── 3) find releases ────────────────────────────────────────────
    let pattern = cfg.data_dir.to_string_lossy().into_owned();
    let discovered = discover(&pattern, cfg.year, cfg.span)
        .with_context(|| format!("scanning {}", pattern))?;

    let releases: BTreeMap<SurveyKey, Option<DataSource>> = if cfg.states.is_empty() {
        discovered.into_iter().map(|(k, s)| (k, Some(s))).collect()
    } else {
        cfg.states
            .iter()
            .map(|state| {
                let key = SurveyKey::new(cfg.year, cfg.span, state);
                let source = discovered.get(&key).cloned();
                (key, source)
            })
            .collect()
    };
    if releases.is_empty() {
        warn!(data = %pattern, year = cfg.year, span = cfg.span, "no releases found");
        return Ok(());
    }
    info!(releases = releases.len(), tables = cfg.tables.len(), "starting load");

    // ─── 4) decode each (state, table) ───────────────────────────────
    let (mut written, mut failed) = (0usize, 0usize);
    for (key, source) in &releases {
        let Some(source) = source else {
            error!(key = %key, "no geography file for state, skipping");
            failed += 1;
            continue;
        };
        let geo = match process::load_geography(key, source, delimiter) {
            Ok(g) => g,
            Err(e) => {
                error!(key = %key, error = %e, "could not load geography, skipping state");
                failed += 1;
                continue;
            }
        };

        for table_id in &cfg.tables {
            info!(state = %key.state, table = %table_id, "loading");
            let table = match catalog.get(table_id) {
                Ok(t) => t,
                Err(e) => {
                    error!(error = %e, "could not load");
                    failed += 1;
                    continue;
                }
            };
            let rows = match process::read_table(table, key, source, Some(&geo), delimiter) {
                Ok(r) => r,
                Err(e) => {
                    error!(state = %key.state, table = %table_id, error = %e, "could not load");
                    failed += 1;
                    continue;
                }
            };
            let out = cfg
                .out_dir
                .join(format!("acs_{}", table.id().to_lowercase()))
                .join(format!("{}.parquet", key.state));
            match write_parquet(table, &rows.records, &out) {
                Ok(n) => {
                    info!(path = %out.display(), rows = n, skipped = rows.skipped, "wrote");
                    written += 1;
                }
                Err(e) => {
                    error!(path = %out.display(), error = ?e, "write failed");
                    failed += 1;
                }
            }
        }
    }

    info!(written, failed, elapsed = ?start.elapsed(), "all done");
    Ok(())
}
