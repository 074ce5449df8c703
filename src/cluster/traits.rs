use crate::error::EvalResult;

/// Common interface for hard clustering algorithms (one label per point).
pub trait Clustering {
    /// Fit the model and return one cluster label per input point.
    ///
    /// Labels are dense integers starting at 0. Algorithms that mark
    /// outliers (DBSCAN) put them in one extra trailing label.
    fn fit_predict(&self, data: &[Vec<f32>]) -> EvalResult<Vec<usize>>;

    /// Method name used for result keys and artifact file names.
    fn name(&self) -> &'static str;
}
