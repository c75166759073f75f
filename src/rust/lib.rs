//! Menu item profitability predictor.
//!
//! A single form collects a menu item's restaurant, category, name, price
//! and ingredients. The record goes through a frozen preprocessing
//! transform and classifier (both ONNX graphs), and the predicted class is
//! decoded to a [`ProfitabilityLabel`].
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use menu_profit::{ArtifactPaths, ArtifactStore, MenuRecord};
//!
//! let store = ArtifactStore::new(ArtifactPaths::in_dir("artifacts"));
//! let context = store.context()?;
//!
//! let record = MenuRecord::new("R1", "Appetizer", "Spring Roll", "cabbage, flour, oil", 5.50);
//! let label = context.pipeline.predict(&record)?;
//! println!("Predicted profitability: {}", label);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The loaded [`ArtifactContext`] is immutable and `Send + Sync`; share it
//! with an `Arc` and call `predict` from as many threads as needed.

pub mod artifact_store;
pub mod config;
pub mod label;
pub mod pipeline;
pub mod record;
mod runtime;
pub mod service;
pub mod web;

pub use artifact_store::{ArtifactContext, ArtifactError, ArtifactFingerprint, ArtifactKind, ArtifactPaths, ArtifactStore};
pub use config::{AppConfig, ConfigError, MissingFrequencyPolicy, ValidationMode};
pub use label::{Framing, ProfitabilityLabel};
pub use pipeline::{
    ClassIndex, Classifier, Decoder, FeatureVector, InferenceError, InferencePipeline, LabelDecoder,
    MenuItemFrequencyTable, PipelineTrace, Transform,
};
pub use record::{MenuForm, MenuRecord, ValidationError};
pub use runtime::RuntimeConfig;
pub use service::{CosmeticMetrics, Prediction, ProfitabilityService, SubmitError};

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ArtifactContext>();
        assert_send_sync::<ProfitabilityService>();
    }
};

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
