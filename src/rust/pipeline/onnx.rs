use std::collections::HashMap;

use log::info;
use ndarray::Array2;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};

use super::error::InferenceError;
use super::{ClassIndex, Classifier, FeatureVector, Transform};
use crate::record::MenuRecord;
use crate::runtime::{load_session, RuntimeConfig};

/// Name of the derived frequency input in the transform graph
pub const MENU_ITEM_FREQ_INPUT: &str = "MenuItem_freq";

/// A record column a transform graph can ask for, by input name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    RestaurantId,
    MenuCategory,
    MenuItem,
    Ingredients,
    Price,
    MenuItemFreq,
}

impl Column {
    fn from_input_name(name: &str) -> Option<Self> {
        match name {
            "RestaurantID" => Some(Self::RestaurantId),
            "MenuCategory" => Some(Self::MenuCategory),
            "MenuItem" => Some(Self::MenuItem),
            "Ingredients" => Some(Self::Ingredients),
            "Price" => Some(Self::Price),
            MENU_ITEM_FREQ_INPUT => Some(Self::MenuItemFreq),
            _ => None,
        }
    }

    fn is_text(&self) -> bool {
        !matches!(self, Self::Price | Self::MenuItemFreq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Text,
    Float32,
    Float64,
}

#[derive(Debug, Clone)]
struct GraphInput {
    name: String,
    column: Column,
    kind: InputKind,
}

fn tensor_shape(value_type: &ValueType) -> Option<(TensorElementType, &[i64])> {
    match value_type {
        ValueType::Tensor { ty, dimensions, .. } => Some((*ty, dimensions.as_slice())),
        _ => None,
    }
}

/// Last declared dimension, when it is static
fn static_width(dimensions: &[i64]) -> Option<usize> {
    dimensions.last().filter(|&&d| d > 0).map(|&d| d as usize)
}

fn numeric_kind(ty: TensorElementType) -> Option<InputKind> {
    match ty {
        TensorElementType::Float32 => Some(InputKind::Float32),
        TensorElementType::Float64 => Some(InputKind::Float64),
        _ => None,
    }
}

fn number_tensor(kind: InputKind, value: f64) -> Result<DynValue, ort::Error> {
    match kind {
        InputKind::Float64 => Ok(Tensor::from_array(Array2::from_elem((1, 1), value))?.into_dyn()),
        _ => Ok(Tensor::from_array(Array2::from_elem((1, 1), value as f32))?.into_dyn()),
    }
}

/// A fitted column transformer exported to ONNX.
///
/// The graph takes one `[1, 1]` input per record column, named after the
/// column, and produces a single `[1, width]` float tensor.
#[derive(Debug)]
pub struct OnnxTransform {
    session: Session,
    inputs: Vec<GraphInput>,
    output_width: Option<usize>,
}

impl OnnxTransform {
    /// Builds the transform from the serialized graph.
    pub fn from_bytes(model: &[u8], config: &RuntimeConfig) -> Result<Self, String> {
        let session = load_session(model, config)?;
        let transform = Self::from_session(session)?;
        info!(
            "Transform graph loaded: inputs [{}], output width {:?}",
            transform.inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>().join(", "),
            transform.output_width
        );
        Ok(transform)
    }

    /// Checks the graph's declared inputs and output against the record
    /// columns.
    pub fn from_session(session: Session) -> Result<Self, String> {
        let mut inputs = Vec::with_capacity(session.inputs.len());
        for input in &session.inputs {
            let column = Column::from_input_name(&input.name)
                .ok_or_else(|| format!("Transform input '{}' is not a menu record column", input.name))?;
            let (ty, _) = tensor_shape(&input.input_type)
                .ok_or_else(|| format!("Transform input '{}' is not a tensor", input.name))?;
            let kind = if column.is_text() {
                if ty != TensorElementType::String {
                    return Err(format!("Transform input '{}' must be a string tensor, found {:?}", input.name, ty));
                }
                InputKind::Text
            } else {
                numeric_kind(ty)
                    .ok_or_else(|| format!("Transform input '{}' must be a float tensor, found {:?}", input.name, ty))?
            };
            inputs.push(GraphInput {
                name: input.name.clone(),
                column,
                kind,
            });
        }
        if inputs.is_empty() {
            return Err("Transform graph declares no inputs".to_string());
        }

        let output = session
            .outputs
            .first()
            .ok_or_else(|| "Transform graph declares no outputs".to_string())?;
        let output_width = tensor_shape(&output.output_type).and_then(|(_, dims)| static_width(dims));

        Ok(Self {
            session,
            inputs,
            output_width,
        })
    }

    fn input_value(
        &self,
        input: &GraphInput,
        record: &MenuRecord,
        menu_item_freq: Option<f32>,
    ) -> Result<DynValue, InferenceError> {
        let to_error = |e: ort::Error| InferenceError::Transform(format!("Failed to create '{}' tensor: {}", input.name, e));
        let text = match input.column {
            Column::RestaurantId => &record.restaurant_id,
            Column::MenuCategory => &record.menu_category,
            Column::MenuItem => &record.menu_item,
            Column::Ingredients => &record.ingredients,
            Column::Price => return number_tensor(input.kind, record.price).map_err(to_error),
            Column::MenuItemFreq => {
                let freq = menu_item_freq.ok_or_else(|| {
                    InferenceError::Transform(format!("No value supplied for '{}'", MENU_ITEM_FREQ_INPUT))
                })?;
                return number_tensor(input.kind, f64::from(freq)).map_err(to_error);
            }
        };
        let array = Array2::from_elem((1, 1), text.clone());
        Ok(Tensor::from_string_array(array.view()).map_err(to_error)?.into_dyn())
    }
}

impl Transform for OnnxTransform {
    fn requires_frequency(&self) -> bool {
        self.inputs.iter().any(|i| i.column == Column::MenuItemFreq)
    }

    fn apply(&self, record: &MenuRecord, menu_item_freq: Option<f32>) -> Result<FeatureVector, InferenceError> {
        let mut input_tensors: HashMap<String, DynValue> = HashMap::with_capacity(self.inputs.len());
        for input in &self.inputs {
            input_tensors.insert(input.name.clone(), self.input_value(input, record, menu_item_freq)?);
        }

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| InferenceError::Transform(format!("Failed to run transform: {}", e)))?;

        let values: Vec<f32> = match outputs[0].try_extract_tensor::<f32>() {
            Ok(tensor) => tensor.iter().copied().collect(),
            Err(_) => outputs[0]
                .try_extract_tensor::<f64>()
                .map_err(|e| InferenceError::Transform(format!("Failed to extract feature tensor: {}", e)))?
                .iter()
                .map(|&v| v as f32)
                .collect(),
        };
        if let Some(width) = self.output_width {
            if values.len() != width {
                return Err(InferenceError::Transform(format!(
                    "Transform produced {} features, graph declares {}",
                    values.len(),
                    width
                )));
            }
        }
        Ok(FeatureVector::new(values))
    }

    fn output_width(&self) -> Option<usize> {
        self.output_width
    }
}

/// A fitted classifier exported to ONNX.
///
/// The first input is the `[1, width]` feature tensor. The first output is
/// either the predicted label index (int64) or per-class scores, in which
/// case the highest score wins.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    input_kind: InputKind,
    input_width: Option<usize>,
}

impl OnnxClassifier {
    pub fn from_bytes(model: &[u8], config: &RuntimeConfig) -> Result<Self, String> {
        let session = load_session(model, config)?;
        let classifier = Self::from_session(session)?;
        info!(
            "Classifier graph loaded: input '{}', width {:?}",
            classifier.input_name, classifier.input_width
        );
        Ok(classifier)
    }

    pub fn from_session(session: Session) -> Result<Self, String> {
        let input = session
            .inputs
            .first()
            .ok_or_else(|| "Classifier graph declares no inputs".to_string())?;
        if session.inputs.len() > 1 {
            return Err(format!(
                "Classifier graph must take a single feature tensor, found {} inputs",
                session.inputs.len()
            ));
        }
        let (ty, dims) = tensor_shape(&input.input_type)
            .ok_or_else(|| format!("Classifier input '{}' is not a tensor", input.name))?;
        let input_kind = numeric_kind(ty)
            .ok_or_else(|| format!("Classifier input '{}' must be a float tensor, found {:?}", input.name, ty))?;
        let input_width = static_width(dims);
        let input_name = input.name.clone();

        if session.outputs.is_empty() {
            return Err("Classifier graph declares no outputs".to_string());
        }

        Ok(Self {
            session,
            input_name,
            input_kind,
            input_width,
        })
    }

    fn feature_tensor(&self, features: &FeatureVector) -> Result<DynValue, String> {
        let width = features.len();
        let tensor = match self.input_kind {
            InputKind::Float64 => {
                let values = features.as_slice().iter().map(|&v| f64::from(v)).collect();
                let array = Array2::from_shape_vec((1, width), values).map_err(|e| e.to_string())?;
                Tensor::from_array(array).map(|t| t.into_dyn())
            }
            _ => {
                let array = Array2::from_shape_vec((1, width), features.as_slice().to_vec()).map_err(|e| e.to_string())?;
                Tensor::from_array(array).map(|t| t.into_dyn())
            }
        };
        tensor.map_err(|e| e.to_string())
    }
}

fn argmax(scores: impl Iterator<Item = f32>) -> Option<usize> {
    scores
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<ClassIndex, InferenceError> {
        let tensor = self
            .feature_tensor(features)
            .map_err(|e| InferenceError::Classifier(format!("Failed to create feature tensor: {}", e)))?;

        let mut input_tensors: HashMap<String, DynValue> = HashMap::with_capacity(1);
        input_tensors.insert(self.input_name.clone(), tensor);
        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| InferenceError::Classifier(format!("Failed to run classifier: {}", e)))?;

        if let Ok(labels) = outputs[0].try_extract_tensor::<i64>() {
            let index = labels
                .iter()
                .next()
                .copied()
                .ok_or_else(|| InferenceError::Classifier("Classifier returned no label".into()))?;
            return usize::try_from(index)
                .map_err(|_| InferenceError::Classifier(format!("Classifier returned negative label {}", index)));
        }

        let scores = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Classifier(format!("Failed to extract classifier output: {}", e)))?;
        argmax(scores.iter().copied()).ok_or_else(|| InferenceError::Classifier("Classifier returned no scores".into()))
    }

    fn input_width(&self) -> Option<usize> {
        self.input_width
    }
}
