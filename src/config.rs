use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_GROUP_SIZE: usize = 4;
pub const DEFAULT_REDUCTION_CAP: u64 = 16;
pub const DEFAULT_SPLIT_DISCOUNT: f64 = 0.9;

/// Tunables for the planner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Largest number of consecutive ops the partitioner will fuse into one subgraph
    pub max_group_size: usize,
    /// Upper bound on the reduction split chosen for matmuls
    pub reduction_cap: u64,
    /// Memory cost multiplier applied to steps of a reduction-split subgraph
    pub split_discount: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            reduction_cap: DEFAULT_REDUCTION_CAP,
            split_discount: DEFAULT_SPLIT_DISCOUNT,
        }
    }
}

impl PlannerConfig {
    pub fn max_group_size(mut self, max_group_size: usize) -> Self {
        self.max_group_size = max_group_size;
        self
    }

    pub fn reduction_cap(mut self, reduction_cap: u64) -> Self {
        self.reduction_cap = reduction_cap;
        self
    }

    pub fn split_discount(mut self, split_discount: f64) -> Self {
        self.split_discount = split_discount;
        self
    }

    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("parse config {}", path.display()))?;
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<()> {
        ensure!(self.reduction_cap >= 1, "reduction_cap must be >= 1");
        ensure!(
            self.split_discount.is_finite() && self.split_discount >= 0.0,
            "split_discount must be a non-negative number"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PlannerConfig = serde_json::from_str(r#"{"max_group_size": 2}"#).unwrap();
        assert_eq!(config.max_group_size, 2);
        assert_eq!(config.reduction_cap, DEFAULT_REDUCTION_CAP);
        assert_eq!(config.split_discount, DEFAULT_SPLIT_DISCOUNT);
    }

    #[test]
    fn check_rejects_bad_values() {
        assert!(PlannerConfig::default().check().is_ok());
        assert!(PlannerConfig::default().reduction_cap(0).check().is_err());
        assert!(PlannerConfig::default().split_discount(-0.5).check().is_err());
    }
}
