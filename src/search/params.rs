//! Per-request search parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegcoreError};
use crate::search::DistanceMetric;

/// Parameters for a single field search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Number of results per query vector.
    pub top_k: usize,
    /// Overrides the field's default metric when set.
    #[serde(default)]
    pub metric: Option<DistanceMetric>,
    /// Index-specific knobs (`nprobe`, `ef`, ...), forwarded untouched.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 10,
            metric: None,
            extra: HashMap::new(),
        }
    }
}

impl SearchParams {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(SegcoreError::invalid_argument("top_k must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let params = SearchParams::new(5)
            .with_metric(DistanceMetric::Cosine)
            .with_param("nprobe", "16");
        assert_eq!(params.top_k, 5);
        assert_eq!(params.metric, Some(DistanceMetric::Cosine));
        assert_eq!(params.extra.get("nprobe").map(String::as_str), Some("16"));
        assert!(params.validate().is_ok());
        assert!(SearchParams::new(0).validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let params: SearchParams = serde_json::from_str(r#"{ "top_k": 3 }"#).unwrap();
        assert_eq!(params, SearchParams::new(3));
    }
}
