//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis_config::{AnalysisConfig, DataSource, parse_holding_periods};
use crate::domain::catalog::IndexCatalog;
use crate::domain::comparison::{calendar_period_table, monthly_grid, return_curve};
use crate::domain::error::NavlensError;
use crate::domain::frequency::Frequency;
use crate::domain::holding::{HoldingPeriodRecord, HoldingPeriodSummary};
use crate::domain::metrics::{FrequencyMode, PerformanceRecord};
use crate::domain::resolver::SeriesResolver;
use crate::domain::series::TimeSeries;
use crate::domain::universe::{MIN_SERIES_POINTS, load_subjects};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, SeriesKind};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "navlens", about = "Fund and benchmark performance analytics")]
pub struct Cli {
    /// Debug-level logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Performance metrics per subject and benchmark index
    Performance {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long = "subject")]
        subjects: Vec<String>,
        /// Use one frequency for every metric
        #[arg(long, conflicts_with_all = ["return_frequency", "risk_frequency"])]
        frequency: Option<Frequency>,
        #[arg(long)]
        return_frequency: Option<Frequency>,
        #[arg(long)]
        risk_frequency: Option<Frequency>,
        /// Also write one record per frequency, daily through yearly
        #[arg(long)]
        all_frequencies: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rolling holding-period simulation against benchmarks
    Holding {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long = "subject")]
        subjects: Vec<String>,
        /// Comma-separated holding lengths in observations
        #[arg(long)]
        periods: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Calendar, curve and monthly comparison tables for one fund
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        benchmark: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a synthesized composite index series
    Composite {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        index: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate analysis configuration and the index catalog
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show stored data range for subjects and declared indices
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long = "subject")]
        subjects: Vec<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Performance {
            config,
            subjects,
            frequency,
            return_frequency,
            risk_frequency,
            all_frequencies,
            output,
        } => run_performance(
            &config,
            &subjects,
            FrequencyOverride {
                single: frequency,
                returns: return_frequency,
                risk: risk_frequency,
            },
            all_frequencies,
            output,
        ),
        Command::Holding {
            config,
            subjects,
            periods,
            output,
        } => run_holding(&config, &subjects, periods.as_deref(), output),
        Command::Compare {
            config,
            subject,
            benchmark,
            output,
        } => run_compare(&config, &subject, benchmark.as_deref(), output),
        Command::Composite {
            config,
            index,
            output,
        } => run_composite(&config, &index, output),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, subjects } => run_info(&config, &subjects),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, NavlensError> {
    debug!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Everything a command needs once configuration has been read.
pub struct Session {
    pub config: FileConfigAdapter,
    pub analysis: AnalysisConfig,
    pub catalog: IndexCatalog,
}

impl Session {
    pub fn load(path: &Path, output: Option<PathBuf>) -> Result<Self, NavlensError> {
        let config = load_config(path)?;
        let mut analysis = AnalysisConfig::from_config(&config)?;
        if let Some(dir) = output {
            analysis.output_dir = dir;
        }
        let catalog = IndexCatalog::from_config(&config)?;
        catalog.validate()?;
        Ok(Self {
            config,
            analysis,
            catalog,
        })
    }

    pub fn data_port(&self) -> Result<Box<dyn DataPort>, NavlensError> {
        build_data_port(&self.analysis, &self.config)
    }

    pub fn report(&self) -> CsvReportAdapter {
        CsvReportAdapter::new(self.analysis.output_dir.clone())
    }

    /// Subjects named on the command line, else `[benchmarks] subjects`.
    pub fn subjects(&self, overrides: &[String]) -> Result<Vec<String>, NavlensError> {
        let subjects = if overrides.is_empty() {
            self.catalog.subjects.clone()
        } else {
            overrides.to_vec()
        };
        if subjects.is_empty() {
            return Err(NavlensError::ConfigMissing {
                section: "benchmarks".into(),
                key: "subjects".into(),
            });
        }
        Ok(subjects)
    }
}

pub fn build_data_port(
    analysis: &AnalysisConfig,
    config: &dyn ConfigPort,
) -> Result<Box<dyn DataPort>, NavlensError> {
    info!(source = %analysis.data_source, "opening data source");
    match analysis.data_source {
        DataSource::Csv => Ok(Box::new(CsvAdapter::new(analysis.csv_dir.clone()))),
        DataSource::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
                Ok(Box::new(adapter))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                let _ = config;
                Err(NavlensError::config_invalid(
                    "data",
                    "source",
                    "sqlite feature is not enabled",
                ))
            }
        }
        DataSource::Postgres => {
            #[cfg(feature = "postgres")]
            {
                let adapter =
                    crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?;
                Ok(Box::new(adapter))
            }
            #[cfg(not(feature = "postgres"))]
            {
                let _ = config;
                Err(NavlensError::config_invalid(
                    "data",
                    "source",
                    "postgres feature is not enabled",
                ))
            }
        }
    }
}

/// Frequencies given on the command line, layered over the configured ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyOverride {
    pub single: Option<Frequency>,
    pub returns: Option<Frequency>,
    pub risk: Option<Frequency>,
}

impl FrequencyOverride {
    pub fn resolve(&self, analysis: &AnalysisConfig) -> FrequencyMode {
        if let Some(f) = self.single {
            return FrequencyMode::Single(f);
        }
        let returns = self.returns.unwrap_or(analysis.return_frequency);
        let risk = self.risk.unwrap_or(analysis.risk_frequency);
        if returns == risk {
            FrequencyMode::Single(returns)
        } else {
            FrequencyMode::Mixed { returns, risk }
        }
    }
}

/// Collaborators shared by the pipelines below.
pub struct PipelineContext<'a> {
    pub analysis: &'a AnalysisConfig,
    pub catalog: &'a IndexCatalog,
    pub data_port: &'a dyn DataPort,
    pub report: &'a dyn ReportPort,
}

impl PipelineContext<'_> {
    fn resolver(&self) -> SeriesResolver<'_> {
        SeriesResolver::new(self.catalog, self.data_port)
    }

    fn load_subjects(&self, ids: &[String]) -> Result<Vec<(String, TimeSeries)>, NavlensError> {
        let loaded = load_subjects(self.data_port, ids, MIN_SERIES_POINTS)?;
        if loaded.subjects.is_empty() {
            return Err(NavlensError::NoData { id: ids.join(",") });
        }
        Ok(loaded.subjects)
    }
}

fn run_performance(
    config_path: &Path,
    subjects: &[String],
    frequencies: FrequencyOverride,
    all_frequencies: bool,
    output: Option<PathBuf>,
) -> Result<(), NavlensError> {
    let session = Session::load(config_path, output)?;
    let subjects = session.subjects(subjects)?;
    let data_port = session.data_port()?;
    let report = session.report();
    let ctx = PipelineContext {
        analysis: &session.analysis,
        catalog: &session.catalog,
        data_port: data_port.as_ref(),
        report: &report,
    };
    let mode = frequencies.resolve(&session.analysis);
    for path in run_performance_pipeline(&ctx, &subjects, mode, all_frequencies)? {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn run_performance_pipeline(
    ctx: &PipelineContext,
    subject_ids: &[String],
    mode: FrequencyMode,
    all_frequencies: bool,
) -> Result<Vec<PathBuf>, NavlensError> {
    let subjects = ctx.load_subjects(subject_ids)?;
    let calculator = ctx.analysis.calculator();

    info!(subjects = subjects.len(), %mode, "computing performance");
    let records = calculator.evaluate_batch(&subjects, mode);
    print_performance(&records);

    let mut written = vec![ctx.report.write_performance("performance", &records)?];

    if all_frequencies {
        let by_frequency: Vec<PerformanceRecord> = subjects
            .iter()
            .flat_map(|(id, series)| calculator.evaluate_all_frequencies(id, series))
            .collect();
        written.push(
            ctx.report
                .write_performance("performance_by_frequency", &by_frequency)?,
        );
    }

    let indices = index_performance(ctx, mode)?;
    if indices.is_empty() {
        warn!("no index data for performance");
    } else {
        written.push(ctx.report.write_performance("performance_indices", &indices)?);
    }
    Ok(written)
}

/// Default comparison indices followed by every composite, each evaluated
/// under `mode`. Indices without data are left out.
pub fn index_performance(
    ctx: &PipelineContext,
    mode: FrequencyMode,
) -> Result<Vec<PerformanceRecord>, NavlensError> {
    let mut ids: Vec<String> = Vec::new();
    let declared = ctx
        .catalog
        .default_comparison
        .iter()
        .chain(ctx.catalog.composites.keys());
    for id in declared {
        let canonical = ctx.catalog.canonical_id(id);
        if !ids.contains(&canonical) {
            ids.push(canonical);
        }
    }

    let resolver = ctx.resolver();
    let mut indices: Vec<(String, TimeSeries)> = Vec::new();
    for id in ids {
        let series = resolver.resolve(&id)?;
        if series.len() < MIN_SERIES_POINTS {
            warn!(index = %id, points = series.len(), "skipping index: insufficient data");
            continue;
        }
        indices.push((id, series));
    }

    info!(indices = indices.len(), %mode, "computing index performance");
    let records = ctx.analysis.calculator().evaluate_batch(&indices, mode);
    print_performance(&records);
    Ok(records)
}

fn print_performance(records: &[PerformanceRecord]) {
    eprintln!("\n=== Performance ===");
    for r in records {
        if !r.is_valid {
            eprintln!("  {}: insufficient data", r.subject_id);
            continue;
        }
        eprintln!(
            "  {}: total {:.2}%, annual {:.2}%, vol {:.2}%, mdd {:.2}%, sharpe {:.2}",
            r.subject_id,
            r.total_return * 100.0,
            r.annual_return * 100.0,
            r.annual_volatility * 100.0,
            r.max_drawdown * 100.0,
            r.sharpe_ratio,
        );
    }
}

fn run_holding(
    config_path: &Path,
    subjects: &[String],
    periods: Option<&str>,
    output: Option<PathBuf>,
) -> Result<(), NavlensError> {
    let session = Session::load(config_path, output)?;
    let subjects = session.subjects(subjects)?;
    let lengths = match periods {
        Some(raw) => parse_holding_periods(raw)?,
        None => session.analysis.holding_periods.clone(),
    };
    let data_port = session.data_port()?;
    let report = session.report();
    let ctx = PipelineContext {
        analysis: &session.analysis,
        catalog: &session.catalog,
        data_port: data_port.as_ref(),
        report: &report,
    };
    for path in run_holding_pipeline(&ctx, &subjects, &lengths)? {
        println!("{}", path.display());
    }
    Ok(())
}

/// Simulates every subject and writes the summaries (subject and benchmark
/// distributions) and the individual windows.
pub fn run_holding_pipeline(
    ctx: &PipelineContext,
    subject_ids: &[String],
    lengths: &[usize],
) -> Result<Vec<PathBuf>, NavlensError> {
    let subjects = ctx.load_subjects(subject_ids)?;
    let simulator = ctx.analysis.simulator();
    let resolver = ctx.resolver();

    let mut summaries: Vec<HoldingPeriodSummary> = Vec::new();
    let mut records: Vec<HoldingPeriodRecord> = Vec::new();

    for (id, series) in &subjects {
        let benchmarks = resolver.resolve_named(&ctx.catalog.comparison_for(id))?;
        let analysis = simulator.analyze(id, series, lengths, &benchmarks)?;
        if analysis.is_empty() {
            warn!(subject = %id, "no holding windows");
            continue;
        }
        eprintln!("\n=== Holding periods: {id} ===");
        for summary in analysis.subject.values() {
            eprintln!(
                "  L={}: {} windows, mean {:.2}%, median {:.2}%, win rate {:.1}%",
                summary.holding_length,
                summary.count,
                summary.mean * 100.0,
                summary.median * 100.0,
                summary.win_rate * 100.0,
            );
        }
        summaries.extend(analysis.summaries());
        records.extend(analysis.records());
    }

    Ok(vec![
        ctx.report.write_holding_summaries("holding_summary", &summaries)?,
        ctx.report.write_holding_records("holding_windows", &records)?,
    ])
}

fn run_compare(
    config_path: &Path,
    subject: &str,
    benchmark: Option<&str>,
    output: Option<PathBuf>,
) -> Result<(), NavlensError> {
    let session = Session::load(config_path, output)?;
    let data_port = session.data_port()?;
    let report = session.report();
    let ctx = PipelineContext {
        analysis: &session.analysis,
        catalog: &session.catalog,
        data_port: data_port.as_ref(),
        report: &report,
    };
    for path in run_compare_pipeline(&ctx, subject, benchmark)? {
        println!("{}", path.display());
    }
    Ok(())
}

/// Benchmark first, then the fund's comparison indices.
fn comparison_ids(catalog: &IndexCatalog, subject: &str, benchmark: Option<&str>) -> Vec<String> {
    let mut ids = catalog.comparison_for(subject);
    if let Some(b) = benchmark {
        ids.retain(|id| id != b);
        ids.insert(0, b.to_string());
    }
    ids
}

pub fn run_compare_pipeline(
    ctx: &PipelineContext,
    subject: &str,
    benchmark: Option<&str>,
) -> Result<Vec<PathBuf>, NavlensError> {
    let mut loaded = ctx.load_subjects(&[subject.to_string()])?;
    let Some((subject_id, series)) = loaded.pop() else {
        return Err(NavlensError::NoData {
            id: subject.to_string(),
        });
    };

    let resolver = ctx.resolver();
    let ids = comparison_ids(ctx.catalog, &subject_id, benchmark);
    let benchmarks = resolver.resolve_named(&ids)?;
    let resampler = ctx.analysis.resampler();
    let mut written = Vec::new();

    let calendar = calendar_period_table(&subject_id, &series, &benchmarks);
    written.push(
        ctx.report
            .write_table(&format!("{subject_id}_calendar"), &calendar.to_table())?,
    );

    for (frequency, suffix) in [(Frequency::Weekly, "weekly"), (Frequency::Monthly, "monthly")] {
        let curve = return_curve(&subject_id, &series, &benchmarks, frequency, &resampler);
        written.push(
            ctx.report
                .write_table(&format!("{subject_id}_{suffix}"), &curve.to_table())?,
        );
    }

    let primary = benchmarks.first().map(|(name, s)| (name.as_str(), s));
    let comparison = match ids.first() {
        Some(bench_id) => match ctx.catalog.monthly_comparison_for(&subject_id, bench_id) {
            Some(cmp_id) if cmp_id != *bench_id => {
                Some((ctx.catalog.display_name(&cmp_id), resolver.resolve(&cmp_id)?))
            }
            _ => None,
        },
        None => None,
    };
    let grid = monthly_grid(
        &subject_id,
        &series,
        primary,
        comparison.as_ref().map(|(name, s)| (name.as_str(), s)),
        &resampler,
    );
    written.push(
        ctx.report
            .write_table(&format!("{subject_id}_monthly_grid"), &grid.to_table())?,
    );

    let calculator = ctx.analysis.calculator();
    let mode = FrequencyOverride::default().resolve(ctx.analysis);
    let mut records = vec![calculator.evaluate(&subject_id, &series, mode)];
    records.extend(
        benchmarks
            .iter()
            .map(|(name, s)| calculator.evaluate(name, s, mode)),
    );
    print_performance(&records);
    written.push(
        ctx.report
            .write_performance(&format!("{subject_id}_performance"), &records)?,
    );

    Ok(written)
}

fn run_composite(
    config_path: &Path,
    index: &str,
    output: Option<PathBuf>,
) -> Result<(), NavlensError> {
    let session = Session::load(config_path, output)?;
    let data_port = session.data_port()?;
    let report = session.report();
    let ctx = PipelineContext {
        analysis: &session.analysis,
        catalog: &session.catalog,
        data_port: data_port.as_ref(),
        report: &report,
    };
    let path = run_composite_pipeline(&ctx, index)?;
    println!("{}", path.display());
    Ok(())
}

pub fn run_composite_pipeline(ctx: &PipelineContext, index: &str) -> Result<PathBuf, NavlensError> {
    let series = ctx.resolver().synthesize(index)?;
    if series.is_empty() {
        return Err(NavlensError::NoData {
            id: index.to_string(),
        });
    }
    eprintln!(
        "{}: {} points, {} to {}",
        ctx.catalog.display_name(index),
        series.len(),
        series.start_date().map(|d| d.to_string()).unwrap_or_default(),
        series.end_date().map(|d| d.to_string()).unwrap_or_default(),
    );
    ctx.report
        .write_series(&format!("composite_{}", ctx.catalog.canonical_id(index)), &series)
}

fn run_validate(config_path: &Path) -> Result<(), NavlensError> {
    eprintln!("Validating config: {}", config_path.display());
    let session = Session::load(config_path, None)?;
    let analysis = &session.analysis;
    let catalog = &session.catalog;

    eprintln!("\nAnalysis:");
    eprintln!("  Frequencies:      {}", analysis.frequency_mode());
    eprintln!("  Resample method:  {}", analysis.resample_method);
    eprintln!("  Risk-free rate:   {:.2}%", analysis.risk_free_rate * 100.0);
    eprintln!("  Holding periods:  {:?}", analysis.holding_periods);
    eprintln!("  Data source:      {}", analysis.data_source);

    eprintln!("\nCatalog:");
    eprintln!("  Indices:          {}", catalog.indices.len());
    eprintln!("  Composites:       {}", catalog.composites.len());
    eprintln!("  Fund profiles:    {}", catalog.funds.len());
    eprintln!("  Default benchmark: {}", catalog.default_benchmark);
    if catalog.subjects.is_empty() {
        eprintln!("  warning: no subjects configured");
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(config_path: &Path, subjects: &[String]) -> Result<(), NavlensError> {
    let session = Session::load(config_path, None)?;
    let data_port = session.data_port()?;

    let funds = if subjects.is_empty() {
        session.catalog.subjects.clone()
    } else {
        subjects.to_vec()
    };
    let queries = funds
        .iter()
        .map(|id| (id.clone(), SeriesKind::Fund))
        .chain(
            session
                .catalog
                .indices
                .keys()
                .map(|id| (id.clone(), SeriesKind::Index)),
        );

    for (id, kind) in queries {
        match data_port.get_data_range(&id, kind)? {
            Some((start, end, count)) => {
                println!("{kind} {id}: {count} points, {start} to {end}");
            }
            None => eprintln!("{kind} {id}: no data found"),
        }
    }
    Ok(())
}
