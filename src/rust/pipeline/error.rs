use std::time::Duration;

/// Failures raised while turning a validated record into a label.
///
/// Every variant is terminal for one submission only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    /// The preprocessing transform rejected the record (unseen category,
    /// wrong input type, runtime failure)
    #[error("Transform error: {0}")]
    Transform(String),
    /// The classifier could not score the feature vector
    #[error("Classifier error: {0}")]
    Classifier(String),
    /// The feature vector does not have the width the classifier expects
    #[error("Feature vector has {actual} values, classifier expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    /// The classifier produced an index the label decoder has no class for
    #[error("Class index {index} is outside the label decoder's {num_classes} classes")]
    UnknownClass { index: i64, num_classes: usize },
    #[error("Inference did not finish within {0:?}")]
    Timeout(Duration),
    /// The inference task died before returning a result
    #[error("Inference aborted: {0}")]
    Aborted(String),
}
