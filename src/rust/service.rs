use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::artifact_store::{ArtifactContext, ArtifactError, ArtifactStore};
use crate::config::{AppConfig, ValidationMode};
use crate::label::ProfitabilityLabel;
use crate::pipeline::InferenceError;
use crate::record::{MenuForm, MenuRecord, ValidationError};

/// Why one submission produced no label.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    /// Artifacts failed to load at startup; no prediction is possible
    #[error(transparent)]
    ArtifactMissing(#[from] ArtifactError),
    /// The user can fix the input and resubmit
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Prediction failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Decorative figures shown next to the label.
///
/// None of these come from the model. They are fixed or derived from the
/// price alone and are always presented as illustrative.
#[derive(Debug, Clone, PartialEq)]
pub struct CosmeticMetrics {
    pub confidence_pct: u32,
    pub confidence_vs_average_pct: u32,
    pub adjusted_price: f64,
    pub adjusted_price_change_pct: u32,
    pub similar_items: u32,
}

impl CosmeticMetrics {
    pub fn for_price(price: f64) -> Self {
        Self {
            confidence_pct: 92,
            confidence_vs_average_pct: 3,
            adjusted_price: (price * 1.1 * 100.0).round() / 100.0,
            adjusted_price_change_pct: 10,
            similar_items: 24,
        }
    }
}

/// A successful submission, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub record: MenuRecord,
    pub label: ProfitabilityLabel,
    /// The frequency feature fed to the transform, if it asked for one
    pub menu_item_freq: Option<f32>,
    pub metrics: CosmeticMetrics,
}

/// Turns form submissions into predictions against one immutable artifact
/// set.
///
/// The artifact outcome is fixed at construction. When loading failed,
/// every submission is answered with that failure and nothing else runs.
#[derive(Debug, Clone)]
pub struct ProfitabilityService {
    artifacts: Result<Arc<ArtifactContext>, ArtifactError>,
    validation: ValidationMode,
    timeout: Option<Duration>,
}

impl ProfitabilityService {
    pub fn new(artifacts: Result<Arc<ArtifactContext>, ArtifactError>) -> Self {
        Self {
            artifacts,
            validation: ValidationMode::default(),
            timeout: None,
        }
    }

    /// Loads the artifacts described by `config` and applies its
    /// validation and timeout settings.
    pub fn from_config(config: &AppConfig) -> Self {
        let store = ArtifactStore::from_config(config);
        Self::new(store.context())
            .with_validation(config.validation)
            .with_timeout(config.inference_timeout)
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validation(&self) -> ValidationMode {
        self.validation
    }

    /// The loaded artifacts, or the error that prevented loading them
    pub fn artifacts(&self) -> Result<&ArtifactContext, &ArtifactError> {
        self.artifacts.as_deref()
    }

    fn prepare(&self, form: &MenuForm) -> Result<(Arc<ArtifactContext>, MenuRecord), SubmitError> {
        let context = self.artifacts.clone()?;
        let record = form.validate(self.validation).map_err(|e| {
            warn!("Submission rejected: {}", e);
            e
        })?;
        Ok((context, record))
    }

    /// Validates the form and runs one prediction on the calling thread.
    pub fn submit(&self, form: &MenuForm) -> Result<Prediction, SubmitError> {
        let (context, record) = self.prepare(form)?;
        run_prediction(&context, record)
    }

    /// Same as [`submit`](Self::submit) but runs inference on the blocking
    /// pool, bounded by the configured timeout.
    pub async fn submit_async(&self, form: &MenuForm) -> Result<Prediction, SubmitError> {
        let (context, record) = self.prepare(form)?;
        let task = tokio::task::spawn_blocking(move || run_prediction(&context, record));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| InferenceError::Timeout(limit))?,
            None => task.await,
        };
        joined.map_err(|e| InferenceError::Aborted(e.to_string()))?
    }
}

fn run_prediction(context: &ArtifactContext, record: MenuRecord) -> Result<Prediction, SubmitError> {
    let trace = context.pipeline.predict_traced(&record)?;
    info!("Predicted {} for menu item '{}'", trace.label, record.menu_item);
    let metrics = CosmeticMetrics::for_price(record.price);
    Ok(Prediction {
        label: trace.label,
        menu_item_freq: trace.menu_item_freq,
        metrics,
        record,
    })
}
