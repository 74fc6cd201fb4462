use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use csv::Writer;
use serde::Serialize;
use spring_uq::{Config, Histogram, MonteCarloResult, MonteCarloSummary, RunOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct RunRow {
    pub index: usize,
    pub spring_constant: f64,
    pub mass: f64,
    pub outcome: &'static str,
    pub max_momentum: Option<f64>,
    pub divergence_step: Option<usize>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramRow {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport<'a> {
    pub config: &'a Config,
    pub summary: MonteCarloSummary,
    pub histogram: &'a Histogram,
}

/// Paths of everything one sweep wrote
#[derive(Debug, Clone)]
pub struct SweepOutputs {
    pub output_dir: PathBuf,
    pub runs_path: PathBuf,
    pub histogram_path: PathBuf,
    pub summary_path: PathBuf,
}

pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_root)
        .with_context(|| format!("failed to create output root: {}", output_root.display()))?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;
    Ok(output_dir)
}

pub fn run_rows(result: &MonteCarloResult) -> Vec<RunRow> {
    result
        .iter()
        .map(|run| {
            let (divergence_step, reason) = match &run.outcome {
                RunOutcome::Completed { .. } => (None, None),
                RunOutcome::Diverged { step, .. } => (Some(*step), None),
                RunOutcome::Rejected { reason } => (None, Some(reason.clone())),
            };
            RunRow {
                index: run.index,
                spring_constant: run.sample.spring_constant,
                mass: run.sample.mass,
                outcome: run.outcome.label(),
                max_momentum: run.outcome.max_momentum(),
                divergence_step,
                reason,
            }
        })
        .collect()
}

pub fn histogram_rows(histogram: &Histogram) -> Vec<HistogramRow> {
    histogram
        .rows()
        .map(|(lower, upper, count)| HistogramRow {
            lower,
            upper,
            count,
        })
        .collect()
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = Writer::from_path(path)
        .with_context(|| format!("failed to open {} for writing", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write per-run results, the histogram and a JSON summary into `output_dir`
pub fn write_sweep(
    output_dir: &Path,
    config: &Config,
    result: &MonteCarloResult,
    histogram: &Histogram,
) -> Result<SweepOutputs> {
    let runs_path = output_dir.join("runs.csv");
    let histogram_path = output_dir.join("histogram.csv");
    let summary_path = output_dir.join("summary.json");

    write_csv(&runs_path, &run_rows(result))?;
    write_csv(&histogram_path, &histogram_rows(histogram))?;

    let report = SweepReport {
        config,
        summary: result.summary(),
        histogram,
    };
    fs::write(&summary_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;

    Ok(SweepOutputs {
        output_dir: output_dir.to_path_buf(),
        runs_path,
        histogram_path,
        summary_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use spring_uq::MonteCarloConfig;

    fn small_config() -> Config {
        Config {
            monte_carlo: MonteCarloConfig {
                runs: 8,
                seed: Some(3),
                mean_mass: 0.05,
                sd_mass: 0.5,
                ..MonteCarloConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn rows_carry_outcome_details() {
        let config = small_config();
        let result = config.driver().unwrap().run(config.monte_carlo.runs);
        let rows = run_rows(&result);
        assert_eq!(rows.len(), 8);
        for row in &rows {
            match row.outcome {
                "completed" => assert!(row.max_momentum.is_some()),
                "rejected" => assert!(row.reason.is_some() && row.mass <= 0.0),
                "diverged" => assert!(row.divergence_step.is_some()),
                other => panic!("unexpected outcome {other}"),
            }
        }
    }

    #[test]
    fn sweep_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = create_timestamped_output_dir(dir.path()).unwrap();
        let config = small_config();
        let result = config.driver().unwrap().run(config.monte_carlo.runs);
        let histogram = result.histogram(10, None).unwrap();

        let outputs = write_sweep(&output_dir, &config, &result, &histogram).unwrap();
        let runs = fs::read_to_string(&outputs.runs_path).unwrap();
        assert!(runs.starts_with("index,spring_constant,mass,outcome"));
        assert_eq!(runs.lines().count(), 9);

        let hist = fs::read_to_string(&outputs.histogram_path).unwrap();
        assert_eq!(hist.lines().count(), 11);

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&outputs.summary_path).unwrap()).unwrap();
        assert_eq!(summary["summary"]["requested"], 8);
        assert_eq!(summary["config"]["monte_carlo"]["seed"], 3);
    }

    #[test]
    fn output_dirs_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let first = create_timestamped_output_dir(dir.path()).unwrap();
        let second = create_timestamped_output_dir(dir.path()).unwrap();
        assert_ne!(first, second);
    }
}
