//! Airflow DAG scheduling metadata
//!
//! Every field is forwarded verbatim into the rendered DAG module; only
//! `dag_id` is interpreted (it names the output file and must be identifier-safe).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DagDate {
    pub year: String,
    pub month: String,
    pub day: String,
}

fn default_retries() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct DagDefinition {
    pub dag_id: String,
    pub description: String,
    pub schedule: String,
    pub start_date: Option<DagDate>,
    pub end_date: String,
    #[serde(default = "default_retries")]
    pub retries: String,
    pub retry_delay: String,
    pub owner: String,
    pub depends_on_past: String,
    pub queue: String,
    pub pool: String,
    pub priority_weight: String,
    pub template_undefined: String,
    pub user_defined_filters: String,
    pub params: String,
    pub tags: Vec<String>,
    pub max_active_runs: String,
    pub dagrun_timeout: String,
    pub sla_miss_callback: String,
    pub default_view: String,
    pub orientation: String,
    pub catchup: String,
    pub on_failure_callback: String,
    pub is_paused_upon_creation: String,
    pub render_template_as_native_obj: String,
    pub owner_links: String,
}

impl Default for DagDefinition {
    fn default() -> Self {
        Self {
            dag_id: String::new(),
            description: String::new(),
            schedule: String::new(),
            start_date: None,
            end_date: String::new(),
            retries: default_retries(),
            retry_delay: String::new(),
            owner: String::new(),
            depends_on_past: String::new(),
            queue: String::new(),
            pool: String::new(),
            priority_weight: String::new(),
            template_undefined: String::new(),
            user_defined_filters: String::new(),
            params: String::new(),
            tags: Vec::new(),
            max_active_runs: String::new(),
            dagrun_timeout: String::new(),
            sla_miss_callback: String::new(),
            default_view: String::new(),
            orientation: String::new(),
            catchup: String::new(),
            on_failure_callback: String::new(),
            is_paused_upon_creation: String::new(),
            render_template_as_native_obj: String::new(),
            owner_links: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_take_defaults() {
        let dag: DagDefinition = serde_json::from_value(json!({
            "dag_id": "daily_iris",
            "schedule": "@daily",
            "tags": ["ml"]
        }))
        .unwrap();

        assert_eq!(dag.dag_id, "daily_iris");
        assert_eq!(dag.retries, "1");
        assert_eq!(dag.owner, "");
        assert!(dag.start_date.is_none());
        assert_eq!(dag.tags, vec!["ml".to_string()]);
    }
}
