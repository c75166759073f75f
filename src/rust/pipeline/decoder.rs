use std::collections::HashSet;

use super::error::InferenceError;
use super::{ClassIndex, Decoder};
use crate::label::{ProfitabilityLabel, UnknownLabel};

#[derive(Debug, thiserror::Error)]
pub enum DecoderFormatError {
    #[error("Label decoder is not a JSON array of class names: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Label decoder has no classes")]
    Empty,
    #[error(transparent)]
    UnknownLabel(#[from] UnknownLabel),
    #[error("Label '{0}' appears more than once")]
    Duplicate(ProfitabilityLabel),
}

/// Maps a classifier index back to the label it was trained on.
///
/// Stored on disk as the fitted encoder's classes in index order, e.g.
/// `["High", "Low", "Medium"]`. Every class must be a known profitability
/// tier so that decoding can never produce an unrecognised label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDecoder {
    labels: Vec<ProfitabilityLabel>,
}

impl LabelDecoder {
    pub fn from_classes<S: AsRef<str>>(classes: &[S]) -> Result<Self, DecoderFormatError> {
        if classes.is_empty() {
            return Err(DecoderFormatError::Empty);
        }
        let mut seen = HashSet::new();
        let mut labels = Vec::with_capacity(classes.len());
        for class in classes {
            let label: ProfitabilityLabel = class.as_ref().parse()?;
            if !seen.insert(label) {
                return Err(DecoderFormatError::Duplicate(label));
            }
            labels.push(label);
        }
        Ok(Self { labels })
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, DecoderFormatError> {
        let classes: Vec<String> = serde_json::from_slice(bytes)?;
        Self::from_classes(&classes)
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }
}

impl Decoder for LabelDecoder {
    fn decode(&self, index: ClassIndex) -> Result<ProfitabilityLabel, InferenceError> {
        self.labels
            .get(index)
            .copied()
            .ok_or(InferenceError::UnknownClass {
                index: index as i64,
                num_classes: self.labels.len(),
            })
    }

    fn labels(&self) -> &[ProfitabilityLabel] {
        &self.labels
    }
}
