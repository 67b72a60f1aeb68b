//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Session loading from INI files on disk (analysis settings, catalog
//!   validation, subject selection)
//! - Data port selection
//! - Full pipelines over a CSV data directory, writing CSV reports to a
//!   temporary output directory

mod common;

use clap::Parser;
use common::*;
use navlens::adapters::csv_report_adapter::CsvReportAdapter;
use navlens::cli::{
    Cli, Command, FrequencyOverride, PipelineContext, Session, run_compare_pipeline,
    run_composite_pipeline, run_holding_pipeline, run_performance_pipeline,
};
use navlens::domain::analysis_config::DataSource;
use navlens::domain::error::NavlensError;
use navlens::domain::frequency::Frequency;
use navlens::domain::metrics::FrequencyMode;
use navlens::domain::series::TimeSeries;
use navlens::ports::data_port::SeriesKind;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = "
[analysis]
risk_free_rate = 0.015
return_frequency = daily
risk_frequency = weekly
holding_periods = 20, 40
min_history = 60

[benchmarks]
default = 000300
comparison = 000300,HSI
subjects = F1,F2

[index:000300]
display_name = CSI 300

[index:HSI]
display_name = Hang Seng

[index:000933]
display_name = CSI Medical

[index:000012]

[composite:MED_INNOV]
display_name = Medical Innovation
components = 000933:0.8, 000012:0.2

[fund:F2]
benchmark = MED_INNOV
monthly_comparison = HSI
";

fn ini_with_data(data_dir: &Path) -> String {
    format!(
        "{VALID_INI}\n[data]\nsource = csv\ncsv_dir = {}\n",
        data_dir.display()
    )
}

fn write_fund_csv(dir: &Path, id: &str, series: &TimeSeries) {
    let funds = dir.join("funds");
    fs::create_dir_all(&funds).unwrap();
    let mut content = String::from("date,nav,cumulative_nav\n");
    for p in series.points() {
        // Unit NAV lags cumulative NAV by a constant distribution.
        content.push_str(&format!("{},{},{}\n", p.date, p.value, p.value + 0.5));
    }
    fs::write(funds.join(format!("{id}.csv")), content).unwrap();
}

fn write_index_csv(dir: &Path, id: &str, series: &TimeSeries) {
    let indices = dir.join("indices");
    fs::create_dir_all(&indices).unwrap();
    let mut content = String::from("date,close\n");
    for p in series.points() {
        content.push_str(&format!("{},{}\n", p.date, p.value * 1000.0));
    }
    fs::write(indices.join(format!("{id}.csv")), content).unwrap();
}

/// Two funds and every declared index except HSI.
fn seeded_data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let start = date(2023, 1, 2);
    write_fund_csv(dir.path(), "F1", &wave_series(start, 300, 0.0004, 0.03));
    write_fund_csv(dir.path(), "F2", &wave_series(start, 300, 0.0002, 0.05));
    write_index_csv(dir.path(), "000300", &wave_series(start, 300, 0.0003, 0.02));
    write_index_csv(dir.path(), "000933", &geometric_series(start, 300, 0.0004));
    write_index_csv(dir.path(), "000012", &geometric_series(start, 300, 0.0001));
    dir
}

mod session_loading {
    use super::*;

    #[test]
    fn valid_ini_loads() {
        let file = write_temp_ini(VALID_INI);
        let session = Session::load(file.path(), None).unwrap();

        assert_eq!(session.analysis.risk_free_rate, 0.015);
        assert_eq!(session.analysis.holding_periods, vec![20, 40]);
        assert_eq!(session.analysis.holding_policy.min_history, 60);
        assert_eq!(
            session.analysis.frequency_mode(),
            FrequencyMode::Mixed {
                returns: Frequency::Daily,
                risk: Frequency::Weekly
            }
        );
        assert_eq!(session.analysis.data_source, DataSource::Csv);
        assert_eq!(session.catalog.indices.len(), 4);
        assert!(session.catalog.is_composite("MED_INNOV"));
        assert_eq!(session.catalog.benchmark_for("F2"), "MED_INNOV");
        assert_eq!(session.catalog.benchmark_for("F1"), "000300");
    }

    #[test]
    fn output_override_replaces_configured_dir() {
        let file = write_temp_ini(VALID_INI);
        let out = TempDir::new().unwrap();
        let session = Session::load(file.path(), Some(out.path().to_path_buf())).unwrap();
        assert_eq!(session.analysis.output_dir, out.path());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Session::load(Path::new("/nonexistent/navlens.ini"), None).err().unwrap();
        assert!(matches!(err, NavlensError::Io(_)));
    }

    #[test]
    fn composite_with_undeclared_component_fails_validation() {
        let ini = "
[index:000300]

[composite:BLEND]
components = 000300:0.5, 399006:0.5
";
        let file = write_temp_ini(ini);
        let err = Session::load(file.path(), None).err().unwrap();
        match err {
            NavlensError::InvalidComposite { id, reason } => {
                assert_eq!(id, "BLEND");
                assert!(reason.contains("399006"));
            }
            other => panic!("expected InvalidComposite, got {other:?}"),
        }
    }

    #[test]
    fn composite_without_components_fails() {
        let file = write_temp_ini("[composite:BLEND]\ndisplay_name = Blend\n");
        let err = Session::load(file.path(), None).err().unwrap();
        assert!(matches!(
            err,
            NavlensError::ConfigMissing { ref section, ref key }
                if section == "composite:BLEND" && key == "components"
        ));
    }

    #[test]
    fn invalid_analysis_value_fails() {
        let file = write_temp_ini("[analysis]\nrisk_frequency = hourly\n");
        let err = Session::load(file.path(), None).err().unwrap();
        assert!(matches!(
            err,
            NavlensError::ConfigInvalid { ref section, ref key, .. }
                if section == "analysis" && key == "risk_frequency"
        ));
    }

    #[test]
    fn subjects_from_config_or_override() {
        let file = write_temp_ini(VALID_INI);
        let session = Session::load(file.path(), None).unwrap();

        assert_eq!(session.subjects(&[]).unwrap(), vec!["F1", "F2"]);
        assert_eq!(session.subjects(&["F9".to_string()]).unwrap(), vec!["F9"]);
    }

    #[test]
    fn no_subjects_anywhere_is_missing_config() {
        let file = write_temp_ini("[index:000300]\n");
        let session = Session::load(file.path(), None).unwrap();
        let err = session.subjects(&[]).unwrap_err();
        assert!(matches!(err, NavlensError::ConfigMissing { ref key, .. } if key == "subjects"));
    }

    #[test]
    fn frequency_override_from_command_line() {
        let file = write_temp_ini(VALID_INI);
        let session = Session::load(file.path(), None).unwrap();
        let cli = Cli::parse_from([
            "navlens",
            "performance",
            "-c",
            "navlens.ini",
            "--risk-frequency",
            "monthly",
        ]);
        let Command::Performance {
            frequency,
            return_frequency,
            risk_frequency,
            ..
        } = cli.command
        else {
            panic!("expected performance command");
        };
        let overrides = FrequencyOverride {
            single: frequency,
            returns: return_frequency,
            risk: risk_frequency,
        };
        assert_eq!(
            overrides.resolve(&session.analysis),
            FrequencyMode::Mixed {
                returns: Frequency::Daily,
                risk: Frequency::Monthly
            }
        );
    }
}

mod data_source {
    use super::*;

    #[test]
    fn csv_source_reads_data_dir() {
        let data = seeded_data_dir();
        let file = write_temp_ini(&ini_with_data(data.path()));
        let session = Session::load(file.path(), None).unwrap();
        let port = session.data_port().unwrap();

        let funds = port.list_series(SeriesKind::Fund).unwrap();
        assert_eq!(funds, vec!["F1", "F2"]);

        let (start, end, count) = port.get_data_range("F1", SeriesKind::Fund).unwrap().unwrap();
        assert_eq!(start, date(2023, 1, 2));
        assert!(end > start);
        assert_eq!(count, 300);

        assert!(port.get_data_range("HSI", SeriesKind::Index).unwrap().is_none());
    }

    #[test]
    fn fund_series_uses_cumulative_nav() {
        let data = seeded_data_dir();
        let file = write_temp_ini(&ini_with_data(data.path()));
        let session = Session::load(file.path(), None).unwrap();
        let series = session
            .data_port()
            .unwrap()
            .fetch_series("F1", SeriesKind::Fund)
            .unwrap();
        let expected = wave_series(date(2023, 1, 2), 300, 0.0004, 0.03);
        assert_eq!(series.len(), 300);
        assert!((series.values()[0] - (expected.values()[0] + 0.5)).abs() < 1e-9);
    }

    #[cfg(not(feature = "postgres"))]
    #[test]
    fn postgres_without_feature_is_rejected() {
        let file = write_temp_ini("[data]\nsource = postgres\n");
        let session = Session::load(file.path(), None).unwrap();
        let err = session.data_port().err().unwrap();
        assert!(matches!(err, NavlensError::ConfigInvalid { ref key, .. } if key == "source"));
    }
}

struct Workspace {
    _data: TempDir,
    out: TempDir,
    session: Session,
}

impl Workspace {
    fn new() -> Self {
        let data = seeded_data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini_with_data(data.path()));
        let session = Session::load(file.path(), Some(out.path().to_path_buf())).unwrap();
        Self {
            _data: data,
            out,
            session,
        }
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.out.path().join(name)).unwrap()
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn performance_writes_csv_reports() {
        let ws = Workspace::new();
        let port = ws.session.data_port().unwrap();
        let report = ws.session.report();
        let ctx = PipelineContext {
            analysis: &ws.session.analysis,
            catalog: &ws.session.catalog,
            data_port: port.as_ref(),
            report: &report,
        };
        let subjects = ws.session.subjects(&[]).unwrap();
        let mode = ws.session.analysis.frequency_mode();

        let written = run_performance_pipeline(&ctx, &subjects, mode, true).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0], ws.out.path().join("performance.csv"));

        let content = ws.read("performance.csv");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("F1,daily,weekly,"));
        assert!(lines[2].starts_with("F2,daily,weekly,"));
        assert!(lines[1].ends_with(",true"));

        let by_frequency = ws.read("performance_by_frequency.csv");
        assert_eq!(by_frequency.lines().count(), 1 + 2 * Frequency::ALL.len());

        // HSI has no data file and is left out.
        let indices = ws.read("performance_indices.csv");
        let lines: Vec<&str> = indices.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("000300,daily,weekly,"));
        assert!(lines[2].starts_with("MED_INNOV,daily,weekly,"));
    }

    #[test]
    fn holding_writes_summary_and_windows() {
        let ws = Workspace::new();
        let port = ws.session.data_port().unwrap();
        let report = ws.session.report();
        let ctx = PipelineContext {
            analysis: &ws.session.analysis,
            catalog: &ws.session.catalog,
            data_port: port.as_ref(),
            report: &report,
        };

        run_holding_pipeline(&ctx, &["F1".to_string()], &ws.session.analysis.holding_periods)
            .unwrap();

        let summary = ws.read("holding_summary.csv");
        let mut lines = summary.lines();
        assert!(lines.next().unwrap().starts_with("subject_id,holding_length,count,mean"));
        let rows: Vec<&str> = lines.collect();
        assert!(rows.iter().any(|r| r.starts_with("F1,20,280,")));
        assert!(rows.iter().any(|r| r.starts_with("F1,40,260,")));
        assert!(rows.iter().any(|r| r.starts_with("CSI 300,20,")));
        // HSI has no data file, so it contributes no distribution.
        assert!(!rows.iter().any(|r| r.starts_with("Hang Seng,")));

        let windows = ws.read("holding_windows.csv");
        assert_eq!(windows.lines().count(), 1 + 280 + 260);
    }

    #[test]
    fn compare_writes_five_tables() {
        let ws = Workspace::new();
        let port = ws.session.data_port().unwrap();
        let report = ws.session.report();
        let ctx = PipelineContext {
            analysis: &ws.session.analysis,
            catalog: &ws.session.catalog,
            data_port: port.as_ref(),
            report: &report,
        };

        let written = run_compare_pipeline(&ctx, "F2", None).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "F2_calendar.csv",
                "F2_weekly.csv",
                "F2_monthly.csv",
                "F2_monthly_grid.csv",
                "F2_performance.csv",
            ]
        );

        let calendar = ws.read("F2_calendar.csv");
        assert_eq!(
            calendar.lines().next().unwrap(),
            "period,F2,Medical Innovation,CSI 300,Hang Seng,excess"
        );
        assert!(calendar.lines().nth(1).unwrap().starts_with("Since inception 2023/01/02-"));

        let grid = ws.read("F2_monthly_grid.csv");
        let header = grid.lines().next().unwrap();
        assert!(header.starts_with("F2,Jan,Feb,Mar"));
        assert!(header.ends_with(
            "year,benchmark,win_rate_vs_benchmark,Hang Seng,win_rate_vs_Hang Seng"
        ));
    }

    #[test]
    fn composite_written_as_value_series() {
        let ws = Workspace::new();
        let port = ws.session.data_port().unwrap();
        let report = CsvReportAdapter::new(ws.out.path().to_path_buf());
        let ctx = PipelineContext {
            analysis: &ws.session.analysis,
            catalog: &ws.session.catalog,
            data_port: port.as_ref(),
            report: &report,
        };

        let path = run_composite_pipeline(&ctx, "INDEX_MED_INNOV").unwrap();
        assert_eq!(path, ws.out.path().join("composite_MED_INNOV.csv"));

        let content = ws.read("composite_MED_INNOV.csv");
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), "date,value");
        assert_eq!(lines.next().unwrap(), "2023-01-02,1");
        assert_eq!(lines.count(), 299);
    }

    #[test]
    fn unknown_subject_is_no_data() {
        let ws = Workspace::new();
        let port = ws.session.data_port().unwrap();
        let report = ws.session.report();
        let ctx = PipelineContext {
            analysis: &ws.session.analysis,
            catalog: &ws.session.catalog,
            data_port: port.as_ref(),
            report: &report,
        };
        let err = run_compare_pipeline(&ctx, "F404", None).unwrap_err();
        assert!(matches!(err, NavlensError::NoData { .. }));
        assert!(!ws.out.path().join("F404_calendar.csv").exists());
    }
}
