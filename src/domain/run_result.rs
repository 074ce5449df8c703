// ============================================================
// Layer 3 — Run Result Domain Types
// ============================================================
// SilhouetteScores — configuration → silhouette score mapping
//                    for one clustering method. A `None` score
//                    means "no score" (degenerate clustering).
// RunResult        — the per-run record persisted as result.json
//
// result.json layout:
//   {
//     "val_loss": 0.41,
//     "latent_space_size": 16,
//     "temperature": 0.1,
//     "AffinityPropagation": { "4": 0.62 },
//     "DBSCAN": { "1.0": null, "1.5": 0.31, ... },
//     "KMeans": { "2": 0.58, "3": 0.49, ... }
//   }
//
// Older result files may store a method as a single float (the best
// score); those are read back as a one-entry mapping under "best".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key used when a method entry was persisted as a single float.
pub const SINGLE_SCORE_KEY: &str = "best";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScoresRepr", into = "BTreeMap<String, Option<f64>>")]
pub struct SilhouetteScores {
    scores: BTreeMap<String, Option<f64>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScoresRepr {
    Mapping(BTreeMap<String, Option<f64>>),
    Single(Option<f64>),
}

impl From<ScoresRepr> for SilhouetteScores {
    fn from(repr: ScoresRepr) -> Self {
        match repr {
            ScoresRepr::Mapping(scores) => Self { scores },
            ScoresRepr::Single(score) => {
                let mut scores = BTreeMap::new();
                scores.insert(SINGLE_SCORE_KEY.to_string(), score);
                Self { scores }
            }
        }
    }
}

impl From<SilhouetteScores> for BTreeMap<String, Option<f64>> {
    fn from(s: SilhouetteScores) -> Self {
        s.scores
    }
}

impl SilhouetteScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, config: impl ToString, score: Option<f64>) {
        self.scores.insert(config.to_string(), score);
    }

    pub fn get(&self, config: &str) -> Option<Option<f64>> {
        self.scores.get(config).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.scores.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Highest defined score and the configuration that produced it.
    pub fn best(&self) -> Option<(&str, f64)> {
        self.iter()
            .filter_map(|(k, v)| v.map(|s| (k, s)))
            .filter(|(_, s)| s.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Entries whose configuration parses as a number, sorted by it.
    /// Used for plotting a score curve over the sweep.
    pub fn numeric_curve(&self) -> Vec<(f64, Option<f64>)> {
        let mut curve: Vec<(f64, Option<f64>)> = self
            .iter()
            .filter_map(|(k, v)| k.parse::<f64>().ok().map(|x| (x, v)))
            .collect();
        curve.sort_by(|a, b| a.0.total_cmp(&b.0));
        curve
    }
}

/// Scalar outcome of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Derived from the run directory name; not stored in the file.
    #[serde(skip)]
    pub run_id: String,

    pub val_loss:          f64,
    pub latent_space_size: usize,
    pub temperature:       f64,

    /// One mapping per clustering method, keyed by method name.
    #[serde(flatten)]
    pub silhouette: BTreeMap<String, SilhouetteScores>,
}

impl RunResult {
    pub fn new(
        run_id:            impl Into<String>,
        val_loss:          f64,
        latent_space_size: usize,
        temperature:       f64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            val_loss,
            latent_space_size,
            temperature,
            silhouette: BTreeMap::new(),
        }
    }

    pub fn with_scores(mut self, method: impl Into<String>, scores: SilhouetteScores) -> Self {
        self.silhouette.insert(method.into(), scores);
        self
    }

    /// Best score recorded for `method`, if any is defined.
    pub fn best_score(&self, method: &str) -> Option<f64> {
        self.silhouette.get(method).and_then(|s| s.best()).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_ignores_missing_scores() {
        let mut s = SilhouetteScores::new();
        s.insert("1.0", None);
        s.insert("1.5", Some(0.2));
        s.insert("2.0", Some(0.7));
        assert_eq!(s.best(), Some(("2.0", 0.7)));
    }

    #[test]
    fn test_best_of_all_missing_is_none() {
        let mut s = SilhouetteScores::new();
        s.insert("2", None);
        assert!(s.best().is_none());
    }

    #[test]
    fn test_numeric_curve_sorts_by_value_not_text() {
        let mut s = SilhouetteScores::new();
        s.insert(10, Some(0.1));
        s.insert(2, Some(0.5));
        s.insert(3, None);
        let xs: Vec<f64> = s.numeric_curve().iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![2.0, 3.0, 10.0]);
    }

    #[test]
    fn test_result_json_layout() {
        let mut af = SilhouetteScores::new();
        af.insert(3, Some(0.5));
        let r = RunResult::new("run_a", 0.25, 16, 0.1).with_scores("AffinityPropagation", af);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["latent_space_size"], 16);
        assert_eq!(v["AffinityPropagation"]["3"], 0.5);
        assert!(v.get("run_id").is_none());
    }

    #[test]
    fn test_single_float_entry_is_read_as_mapping() {
        let json = r#"{"val_loss": 0.3, "latent_space_size": 8,
                       "temperature": 0.1, "AffinityPropagation": 0.42}"#;
        let r: RunResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.best_score("AffinityPropagation"), Some(0.42));
    }
}
