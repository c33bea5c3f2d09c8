use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

mod error;

use clap::{ArgAction, Parser};
use error::CliResult;
use log::{error, info, warn, LevelFilter};
use tdms2bin_core::{
    convert_file, ConverterConfig, LogDiagnostics, RunSummary, TrackingAllocator,
    DEFAULT_DATA_GROUP, DEFAULT_SCALE_GROUP,
};

#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator;

#[derive(Parser, Debug)]
#[command(
    name = "tdms2bin",
    version = env!("CARGO_PKG_VERSION"),
    about = "Convert a TDMS file into per-channel float32 .bin files",
    long_about = None,
)]
struct Cli {
    /// Исходный .tdms файл
    #[arg(short = 'f', long = "tdms")]
    tdms: PathBuf,
    /// Корень имён выходных файлов (по умолчанию имя .tdms без расширения)
    #[arg(short = 'o', long = "outbin")]
    outbin: Option<PathBuf>,
    /// Группа с сырыми данными
    #[arg(short = 'd', long = "datagrp", default_value = DEFAULT_DATA_GROUP)]
    datagrp: String,
    /// Группа с коэффициентами масштабирования
    #[arg(short = 's', long = "scalegrp", default_value = DEFAULT_SCALE_GROUP)]
    scalegrp: String,
    /// Подробность вывода: -v info, -vv debug
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Сохранить итоговую сводку в JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> ConverterConfig {
        ConverterConfig {
            source_path: self.tdms.clone(),
            out_root: self.outbin.clone(),
            data_group: self.datagrp.clone(),
            scale_group: self.scalegrp.clone(),
        }
    }
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn write_report(
    path: &Path,
    summary: &RunSummary,
) -> CliResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.flush()?;

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let config = cli.config();
    let started = Instant::now();

    info!("tdms2bin v{}", tdms2bin_core::VERSION);
    info!("  Source      : {}", config.source_path.display());
    info!("  Output root : {}", config.out_root().display());
    info!("  Data group  : {}", config.data_group);
    info!("  Scale group : {}", config.scale_group);

    let summary = match convert_file(config, &LogDiagnostics) {
        Ok(s) => s,
        Err(e) => {
            error!("Conversion failed: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "Finished in {:.3}s\n{summary}",
        started.elapsed().as_secs_f64()
    );

    if let Some(path) = &cli.report {
        if let Err(e) = write_report(path, &summary) {
            error!("Failed to write report {path:?}: {e}");
            std::process::exit(1);
        }
        info!("Report written to {}", path.display());
    }

    if !summary.is_success() {
        warn!(
            "{} of {} channel(s) failed",
            summary.channels_failed, summary.channels_total
        );
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tdms2bin_core::RunMetrics;
    use tempfile::tempdir;

    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tdms2bin", "-f", "run.tdms"]).unwrap();
        let config = cli.config();

        assert_eq!(cli.verbose, 0);
        assert_eq!(config.data_group, "Unscaled Data");
        assert_eq!(config.scale_group, "Scaling Coefficients");
        assert_eq!(config.out_root(), PathBuf::from("run"));
        assert!(cli.report.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "tdms2bin",
            "--tdms",
            "in.tdms",
            "--outbin",
            "out/x",
            "-d",
            "raw",
            "-s",
            "coeffs",
            "-vvv",
            "--report",
            "r.json",
        ])
        .unwrap();
        let config = cli.config();

        assert_eq!(config.out_root(), PathBuf::from("out/x"));
        assert_eq!(config.data_group, "raw");
        assert_eq!(config.scale_group, "coeffs");
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.report, Some(PathBuf::from("r.json")));
    }

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["tdms2bin"]).is_err());
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(log_level(0), LevelFilter::Warn);
        assert_eq!(log_level(1), LevelFilter::Info);
        assert_eq!(log_level(2), LevelFilter::Debug);
        assert_eq!(log_level(9), LevelFilter::Debug);
    }

    #[test]
    fn test_write_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let summary = RunMetrics::new().summary("in.tdms".into(), &Instant::now(), vec![], vec![]);

        write_report(&path, &summary).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["source"], "in.tdms");
        assert_eq!(json["channels_total"], 0);
    }

    #[test]
    fn test_write_report_into_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("report.json");
        let summary = RunMetrics::new().summary("in.tdms".into(), &Instant::now(), vec![], vec![]);

        let err = write_report(&path, &summary).unwrap_err();

        assert!(matches!(err, CliError::Io(_)));
        assert!(!path.exists());
    }
}
