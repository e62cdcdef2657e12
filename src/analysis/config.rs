//! Serializable analysis settings

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How experiments are combined during refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// One fit per experiment
    #[default]
    Single,

    /// One fit over all experiments with weighted, concatenated residuals
    Joint,
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "single" => Ok(FitMode::Single),
            "joint" => Ok(FitMode::Joint),
            other => Err(format!("unknown fit mode '{other}'")),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitMode::Single => write!(f, "single"),
            FitMode::Joint => write!(f, "joint"),
        }
    }
}

/// Settings passed through to the minimizer backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizerConfig {
    /// Maximum number of iterations. Default: 100
    pub max_iterations: usize,

    /// Tolerance for relative change in the sum of squares. Default: 1e-8
    pub ftol: f64,

    /// Tolerance for relative change in parameter values. Default: 1e-8
    pub xtol: f64,

    /// Tolerance for orthogonality of residuals and Jacobian columns. Default: 1e-8
    pub gtol: f64,

    /// Relative step for finite-difference derivatives. Default: 1e-8
    pub epsilon: f64,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            epsilon: 1e-8,
        }
    }
}

impl MinimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointFitConfig {
    /// Rescale weights so they sum to the number of experiments
    pub normalize_weights: bool,
}

/// Top-level refinement settings of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Name of the calculator to create from the factory, if none is set
    /// directly
    pub calculator: Option<String>,
    pub minimizer: String,
    pub fit_mode: FitMode,
    pub joint: JointFitConfig,
    pub minimizer_options: MinimizerConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            calculator: None,
            minimizer: "lm".to_string(),
            fit_mode: FitMode::Single,
            joint: JointFitConfig::default(),
            minimizer_options: MinimizerConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calculator(mut self, name: &str) -> Self {
        self.calculator = Some(name.to_string());
        self
    }

    pub fn with_minimizer(mut self, name: &str) -> Self {
        self.minimizer = name.to_string();
        self
    }

    pub fn with_fit_mode(mut self, fit_mode: FitMode) -> Self {
        self.fit_mode = fit_mode;
        self
    }

    pub fn with_normalized_weights(mut self, normalize: bool) -> Self {
        self.joint.normalize_weights = normalize;
        self
    }

    pub fn with_minimizer_options(mut self, options: MinimizerConfig) -> Self {
        self.minimizer_options = options;
        self
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
