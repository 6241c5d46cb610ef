//! Kernelization configuration.

use crate::error::{SteinerError, SteinerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the metric closure around the terminals is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureStrategy {
    /// Pausable per-terminal searches whose radius doubles whenever no star is found.
    #[default]
    Incremental,
    /// One complete search per terminal, the full closure up front.
    OneShot,
}

impl fmt::Display for ClosureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosureStrategy::Incremental => write!(f, "incremental"),
            ClosureStrategy::OneShot => write!(f, "one-shot"),
        }
    }
}

impl FromStr for ClosureStrategy {
    type Err = SteinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incremental" | "fast" => Ok(ClosureStrategy::Incremental),
            "one-shot" | "one_shot" | "slow" => Ok(ClosureStrategy::OneShot),
            other => Err(SteinerError::Config(format!(
                "unknown closure strategy '{}'",
                other
            ))),
        }
    }
}

/// Kernelization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Closure strategy
    #[serde(default)]
    pub strategy: ClosureStrategy,

    /// First radius of the incremental closure
    #[serde(default = "default_initial_threshold")]
    pub initial_threshold: u64,

    /// Radius above which the incremental closure stops doubling and becomes unbounded.
    /// Without a cap, the total input edge weight is used.
    #[serde(default)]
    pub threshold_cap: Option<u64>,
}

fn default_initial_threshold() -> u64 {
    1
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            strategy: ClosureStrategy::default(),
            initial_threshold: default_initial_threshold(),
            threshold_cap: None,
        }
    }
}

impl KernelConfig {
    pub fn with_strategy(strategy: ClosureStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SteinerResult<()> {
        if self.initial_threshold == 0 {
            return Err(SteinerError::Config(
                "initial_threshold must be positive".to_string(),
            ));
        }
        if let Some(cap) = self.threshold_cap {
            if cap < self.initial_threshold {
                return Err(SteinerError::Config(format!(
                    "threshold_cap {} is below initial_threshold {}",
                    cap, self.initial_threshold
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> SteinerResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| SteinerError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::TestResult;

    #[test]
    fn test_defaults() -> TestResult {
        let config = KernelConfig::from_json("{}")?;
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.strategy, ClosureStrategy::Incremental);
        assert_eq!(config.initial_threshold, 1);
        assert_eq!(config.threshold_cap, None);
        Ok(())
    }

    #[test]
    fn test_from_json() -> TestResult {
        let config = KernelConfig::from_json(
            r#"{"strategy": "one_shot", "initial_threshold": 4, "threshold_cap": 1024}"#,
        )?;
        assert_eq!(config.strategy, ClosureStrategy::OneShot);
        assert_eq!(config.initial_threshold, 4);
        assert_eq!(config.threshold_cap, Some(1024));
        let back = serde_json::to_string(&config)?;
        assert_eq!(KernelConfig::from_json(&back)?, config);
        Ok(())
    }

    #[test]
    fn test_validate() {
        let zero = KernelConfig {
            initial_threshold: 0,
            ..KernelConfig::default()
        };
        assert!(matches!(zero.validate(), Err(SteinerError::Config(_))));
        let low_cap = KernelConfig {
            initial_threshold: 8,
            threshold_cap: Some(4),
            ..KernelConfig::default()
        };
        assert!(low_cap.validate().is_err());
        assert!(KernelConfig::from_json(r#"{"strategy": "dijkstra"}"#).is_err());
    }

    #[test]
    fn test_strategy_names() -> TestResult {
        assert_eq!("slow".parse::<ClosureStrategy>()?, ClosureStrategy::OneShot);
        assert_eq!("incremental".parse::<ClosureStrategy>()?, ClosureStrategy::Incremental);
        assert_eq!(ClosureStrategy::OneShot.to_string(), "one-shot");
        assert!("quick".parse::<ClosureStrategy>().is_err());
        Ok(())
    }
}
