use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One question/SQL/schema unit as produced by a dataset loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardizedRecord {
    pub question: String,
    #[serde(rename = "sql")]
    pub reference_sql: String,
    #[serde(rename = "db_id")]
    pub database_id: String,
    #[serde(rename = "db_path")]
    pub database_location: PathBuf,
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// One line of the persisted result log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(rename = "db_id")]
    pub database_id: String,
    pub question: String,
    pub generated_sql: String,
    #[serde(rename = "ground_truth_sql")]
    pub reference_sql: String,
}

impl RunResult {
    pub fn from_record(record: &StandardizedRecord, generated_sql: String) -> Self {
        Self {
            database_id: record.database_id.clone(),
            question: record.question.clone(),
            generated_sql,
            reference_sql: record.reference_sql.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Every run writes a fresh, timestamped log.
    #[default]
    Overwrite,
    /// Runs target one stable log and skip questions already recorded in it.
    Resume,
}

impl SaveMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "overwrite" => Some(SaveMode::Overwrite),
            "resume" => Some(SaveMode::Resume),
            _ => None,
        }
    }
}

/// How the orchestrator combines its providers for a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Single,
    Critic,
    Voting,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Single => "single",
            RunMode::Critic => "critic",
            RunMode::Voting => "voting",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub save_path: PathBuf,
    #[serde(default)]
    pub save_mode: SaveMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub output_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_result_wire_names() {
        let row = RunResult {
            database_id: "concert_singer".into(),
            question: "How many singers?".into(),
            generated_sql: "SELECT count(*) FROM singer".into(),
            reference_sql: "SELECT count(*) FROM singer".into(),
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["db_id"], "concert_singer");
        assert_eq!(v["question"], "How many singers?");
        assert_eq!(v["generated_sql"], "SELECT count(*) FROM singer");
        assert_eq!(v["ground_truth_sql"], "SELECT count(*) FROM singer");
        assert_eq!(v.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_save_mode_yaml() {
        let m: SaveMode = serde_yaml::from_str("resume").unwrap();
        assert_eq!(m, SaveMode::Resume);
        assert_eq!(SaveMode::default(), SaveMode::Overwrite);
        assert_eq!(SaveMode::parse("overwrite"), Some(SaveMode::Overwrite));
        assert_eq!(SaveMode::parse("append"), None);
    }
}
