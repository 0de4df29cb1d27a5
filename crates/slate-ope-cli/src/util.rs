use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use slate_ope::{EvaluationConfig, EvaluationPolicy, FeedbackSummary, LoggedFeedback};
use slate_ope_stats::descriptive::DescriptiveStats;

/// Writes `value` as pretty JSON to `output_path`, or to stdout when absent.
pub fn write_json<T>(value: &T, output_path: Option<&Path>) -> anyhow::Result<()>
where
    T: Serialize,
{
    let (mut writer, name): (Box<dyn Write>, String) = match output_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            (Box::new(BufWriter::new(file)), path.display().to_string())
        }
        None => (Box::new(io::stdout().lock()), "stdout".to_owned()),
    };
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {name}"))?;
    writeln!(writer).with_context(|| format!("Failed to write newline after JSON to {name}"))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush output to {name}"))?;
    Ok(())
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read logged feedback from a JSON file
///
/// Keys absent from the file are reported later by feedback validation.
pub fn read_feedback_file<P>(path: P) -> anyhow::Result<LoggedFeedback>
where
    P: AsRef<Path>,
{
    read_json_file("logged feedback", path)
}

/// Read evaluation-policy probabilities from a JSON file
pub fn read_policy_file<P>(path: P) -> anyhow::Result<EvaluationPolicy>
where
    P: AsRef<Path>,
{
    read_json_file("evaluation policy", path)
}

pub fn read_config_file<P>(path: P) -> anyhow::Result<EvaluationConfig>
where
    P: AsRef<Path>,
{
    read_json_file("evaluation config", path)
}

/// Envelope written by every subcommand.
#[derive(Debug, Serialize)]
pub struct Report<T> {
    pub evaluated_at: DateTime<Utc>,
    pub feedback: FeedbackSummary,
    pub behavior_policy_value: f64,
    /// Spread of the logged per-slate rewards.
    pub round_reward: Option<DescriptiveStats>,
    pub config: EvaluationConfig,
    pub result: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_json_to_file() {
        let path = std::env::temp_dir().join(format!("slate-ope-{}.json", std::process::id()));
        write_json(&serde_json::json!({ "sips": 0.5 }), Some(&path)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(written.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["sips"], 0.5);
    }

    #[test]
    fn test_write_json_reports_unwritable_path() {
        let path = std::env::temp_dir().join("slate-ope-missing-dir").join("out.json");
        let err = write_json(&1, Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to create output file"), "{err}");
    }
}
