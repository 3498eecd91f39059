//! Distance metrics named by index metric-type strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegcoreError};

/// Metric a vector field is compared with.
///
/// Scores are always distances, so smaller is closer for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    /// `L2`: squared Euclidean distance.
    #[default]
    Euclidean,
    /// `IP`: inner product, negated.
    DotProduct,
    /// `COSINE`: one minus cosine similarity.
    Cosine,
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

impl DistanceMetric {
    /// Distance between `a` and `b`; both must have the same dimension.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(SegcoreError::invalid_argument(format!(
                "cannot compare vectors of dimension {} and {}",
                a.len(),
                b.len()
            )));
        }

        Ok(match self {
            DistanceMetric::Euclidean => squared_l2(a, b),
            DistanceMetric::DotProduct => -dot(a, b),
            DistanceMetric::Cosine => {
                let norms = (dot(a, a) * dot(b, b)).sqrt();
                // a zero vector is as far as it gets
                if norms == 0.0 { 1.0 } else { 1.0 - dot(a, b) / norms }
            }
        })
    }

    /// Metric-type string for this metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "L2",
            DistanceMetric::DotProduct => "IP",
            DistanceMetric::Cosine => "COSINE",
        }
    }

    /// Parse a metric-type string, case-insensitively.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "L2" | "EUCLIDEAN" => Ok(DistanceMetric::Euclidean),
            "IP" | "INNER_PRODUCT" | "DOT_PRODUCT" => Ok(DistanceMetric::DotProduct),
            "COSINE" => Ok(DistanceMetric::Cosine),
            _ => Err(SegcoreError::invalid_argument(format!(
                "unsupported metric type: {s}"
            ))),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
