//! The inference contract: record → feature vector → class index → label.
//!
//! The three stages are capability traits so the pipeline does not care how
//! a fitted artifact is stored. [`onnx`] and [`decoder`] hold the adapters
//! used in production.

use log::debug;

mod error;
pub mod decoder;
pub mod frequency;
pub mod onnx;

pub use decoder::{DecoderFormatError, LabelDecoder};
pub use error::InferenceError;
pub use frequency::{frequency_feature, MenuItemFrequencyTable};
pub use onnx::{OnnxClassifier, OnnxTransform};

use crate::label::ProfitabilityLabel;
use crate::record::MenuRecord;

/// Index of a class as produced by a classifier
pub type ClassIndex = usize;

/// Fixed-width numeric encoding of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A fitted preprocessing transform.
pub trait Transform: Send + Sync {
    /// Whether the transform consumes the `MenuItem_freq` feature
    fn requires_frequency(&self) -> bool;

    /// Encodes one record. `menu_item_freq` is `Some` exactly when
    /// [`requires_frequency`](Self::requires_frequency) is true.
    fn apply(&self, record: &MenuRecord, menu_item_freq: Option<f32>) -> Result<FeatureVector, InferenceError>;

    /// Width of the produced vector, when the artifact declares it
    fn output_width(&self) -> Option<usize> {
        None
    }
}

/// A fitted classifier over transformed feature vectors.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<ClassIndex, InferenceError>;

    /// Width of the accepted vector, when the artifact declares it
    fn input_width(&self) -> Option<usize> {
        None
    }
}

/// A fitted index → label mapping.
pub trait Decoder: Send + Sync {
    fn decode(&self, index: ClassIndex) -> Result<ProfitabilityLabel, InferenceError>;

    /// Labels in index order
    fn labels(&self) -> &[ProfitabilityLabel];
}

/// What happened during one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineTrace {
    /// The derived frequency feature, if the transform asked for one
    pub menu_item_freq: Option<f32>,
    pub feature_width: usize,
    pub class_index: ClassIndex,
    pub label: ProfitabilityLabel,
}

/// The loaded transform, classifier and decoder plus the optional
/// frequency table. Immutable once built.
pub struct InferencePipeline {
    transform: Box<dyn Transform>,
    classifier: Box<dyn Classifier>,
    decoder: Box<dyn Decoder>,
    frequencies: Option<MenuItemFrequencyTable>,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("requires_frequency", &self.transform.requires_frequency())
            .field("labels", &self.decoder.labels())
            .field("frequency_items", &self.frequencies.as_ref().map(|t| t.len()))
            .finish()
    }
}

impl InferencePipeline {
    pub fn new(
        transform: Box<dyn Transform>,
        classifier: Box<dyn Classifier>,
        decoder: Box<dyn Decoder>,
        frequencies: Option<MenuItemFrequencyTable>,
    ) -> Self {
        Self {
            transform,
            classifier,
            decoder,
            frequencies,
        }
    }

    pub fn labels(&self) -> &[ProfitabilityLabel] {
        self.decoder.labels()
    }

    pub fn has_frequency_table(&self) -> bool {
        self.frequencies.is_some()
    }

    /// Predicts the profitability label of one record.
    pub fn predict(&self, record: &MenuRecord) -> Result<ProfitabilityLabel, InferenceError> {
        self.predict_traced(record).map(|trace| trace.label)
    }

    /// Runs the four pipeline steps in order and reports the intermediate
    /// values alongside the label.
    pub fn predict_traced(&self, record: &MenuRecord) -> Result<PipelineTrace, InferenceError> {
        let menu_item_freq = self
            .transform
            .requires_frequency()
            .then(|| frequency_feature(self.frequencies.as_ref(), &record.menu_item));

        let features = self.transform.apply(record, menu_item_freq)?;
        if let Some(expected) = self.classifier.input_width() {
            if features.len() != expected {
                return Err(InferenceError::ShapeMismatch {
                    expected,
                    actual: features.len(),
                });
            }
        }

        let class_index = self.classifier.predict(&features)?;
        let label = self.decoder.decode(class_index)?;
        debug!(
            "Predicted class {} ({}) from {} features",
            class_index,
            label,
            features.len()
        );

        Ok(PipelineTrace {
            menu_item_freq,
            feature_width: features.len(),
            class_index,
            label,
        })
    }
}
