//! Pipeline configuration: where records live in the export and how to read them.
//!
//! Every field has a default matching the bicycle-annotation export, so an
//! empty JSON object (`{}`) is a valid configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RECORD_PATH: &str = "results.root_node.results.*.results";
pub const DEFAULT_REFERENCE_LABEL_KEY: &str = "is_bicycle";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dotted path from the export root to the task-result arrays; `*` walks
    /// every value of an object.
    pub record_path: String,
    pub fields: FieldMap,
    /// Boolean field read from each reference entry.
    pub reference_label_key: String,
    pub rater_count_policy: RaterCountPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            record_path: DEFAULT_RECORD_PATH.to_string(),
            fields: FieldMap::default(),
            reference_label_key: DEFAULT_REFERENCE_LABEL_KEY.to_string(),
            rater_count_policy: RaterCountPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Dotted paths of the six fields the normaliser reads from each raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub image_url: String,
    pub annotator_id: String,
    pub answer: String,
    pub cant_solve: String,
    pub corrupt_data: String,
    pub duration_ms: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            image_url: "task_input.image_url".to_string(),
            annotator_id: "user.vendor_user_id".to_string(),
            answer: "task_output.answer".to_string(),
            cant_solve: "task_output.cant_solve".to_string(),
            corrupt_data: "task_output.corrupt_data".to_string(),
            duration_ms: "task_output.duration_ms".to_string(),
        }
    }
}

/// How the agreement coefficient treats items rated by different numbers of raters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaterCountPolicy {
    /// Score each item against its own rater count; items with fewer than two
    /// raters are skipped. Identical to Fleiss' kappa when counts are constant.
    #[default]
    Generalized,
    /// Fail unless every item has the same number of raters.
    Strict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.record_path, DEFAULT_RECORD_PATH);
    }

    #[test]
    fn partial_override() {
        let config = PipelineConfig::from_json_str(
            r#"{"fields": {"image_url": "input.url"}, "rater_count_policy": "strict"}"#,
        )
        .unwrap();
        assert_eq!(config.fields.image_url, "input.url");
        assert_eq!(config.fields.answer, "task_output.answer");
        assert_eq!(config.rater_count_policy, RaterCountPolicy::Strict);
    }

    #[test]
    fn unknown_policy_rejected() {
        assert!(PipelineConfig::from_json_str(r#"{"rater_count_policy": "loose"}"#).is_err());
    }
}
