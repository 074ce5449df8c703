// ============================================================
// Layer 3 — Run Configuration
// ============================================================
// Hyperparameters of one trained run, stored next to its weights
// as `<run_dir>/config.json`. Every field is a plain typed value;
// `input_size` is an explicit [channels, depth, height, width]
// array.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_size:                  [usize; 4],
    pub num_representation_features: usize,
    pub num_outputs:                 usize,
    pub temperature:                 f64,
    #[serde(default = "default_batch_size")]
    pub batch_size:                  usize,
    #[serde(default)]
    pub seed:                        u64,
}

fn default_batch_size() -> usize {
    16
}

impl RunConfig {
    /// Reject configurations the model and loaders cannot use.
    pub fn validate(&self) -> EvalResult<()> {
        if self.input_size.iter().any(|&d| d == 0) {
            return Err(EvalError::InvalidParameter {
                name:    "input_size",
                message: format!("every dimension must be positive, got {:?}", self.input_size),
            });
        }
        if self.num_representation_features == 0 || self.num_outputs == 0 {
            return Err(EvalError::InvalidParameter {
                name:    "num_representation_features",
                message: "feature sizes must be positive".to_string(),
            });
        }
        if !(self.temperature > 0.0) {
            return Err(EvalError::InvalidParameter {
                name:    "temperature",
                message: format!("must be positive, got {}", self.temperature),
            });
        }
        if self.batch_size == 0 {
            return Err(EvalError::InvalidParameter {
                name:    "batch_size",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_with_defaults() {
        let json = r#"{"input_size": [1, 12, 12, 12], "num_representation_features": 8,
                       "num_outputs": 16, "temperature": 0.1}"#;
        let cfg: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.seed, 0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_string_input_size_is_rejected() {
        let json = r#"{"input_size": "(1, 12, 12, 12)", "num_representation_features": 8,
                       "num_outputs": 16, "temperature": 0.1}"#;
        assert!(serde_json::from_str::<RunConfig>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let good = RunConfig {
            input_size:                  [1, 4, 4, 4],
            num_representation_features: 4,
            num_outputs:                 4,
            temperature:                 0.5,
            batch_size:                  2,
            seed:                        0,
        };
        assert!(RunConfig { input_size: [1, 0, 4, 4], ..good.clone() }.validate().is_err());
        assert!(RunConfig { temperature: 0.0, ..good.clone() }.validate().is_err());
        assert!(RunConfig { batch_size: 0, ..good.clone() }.validate().is_err());
        assert!(good.validate().is_ok());
    }
}
