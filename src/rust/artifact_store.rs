use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use sha2::{Digest, Sha256};

use crate::config::{AppConfig, MissingFrequencyPolicy};
use crate::pipeline::{
    Classifier, InferencePipeline, LabelDecoder, MenuItemFrequencyTable, OnnxClassifier, OnnxTransform, Transform,
};
use crate::runtime::RuntimeConfig;

/// The serialized objects the pipeline is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Preprocessor,
    LabelDecoder,
    Classifier,
    MenuItemFrequency,
}

impl ArtifactKind {
    pub const REQUIRED: [ArtifactKind; 3] = [Self::Preprocessor, Self::LabelDecoder, Self::Classifier];

    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::Preprocessor => "preprocessor.onnx",
            Self::LabelDecoder => "label_encoder.json",
            Self::Classifier => "xgb_model.onnx",
            Self::MenuItemFrequency => "menu_item_freq.json",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, Self::MenuItemFrequency)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preprocessor => "preprocessing transform",
            Self::LabelDecoder => "label decoder",
            Self::Classifier => "classifier",
            Self::MenuItemFrequency => "menu item frequency table",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    #[error("Required artifact missing: {artifact} not found at {}", path.display())]
    Missing { artifact: ArtifactKind, path: PathBuf },
    #[error("Artifact {artifact} at {} could not be loaded: {reason}", path.display())]
    Invalid {
        artifact: ArtifactKind,
        path: PathBuf,
        reason: String,
    },
    #[error("Artifacts are incompatible: {0}")]
    Incompatible(String),
}

/// SHA-256 of one artifact file as it was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFingerprint {
    pub artifact: ArtifactKind,
    pub path: PathBuf,
    pub sha256: String,
}

impl ArtifactFingerprint {
    /// First 12 hex characters, enough to tell artifact sets apart
    pub fn short(&self) -> &str {
        &self.sha256[..self.sha256.len().min(12)]
    }
}

/// Everything inference needs, loaded once and never mutated.
#[derive(Debug)]
pub struct ArtifactContext {
    pub pipeline: InferencePipeline,
    pub fingerprints: Vec<ArtifactFingerprint>,
}

impl ArtifactContext {
    pub fn new(pipeline: InferencePipeline, fingerprints: Vec<ArtifactFingerprint>) -> Self {
        Self { pipeline, fingerprints }
    }
}

/// Where each artifact lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub preprocessor: PathBuf,
    pub label_decoder: PathBuf,
    pub classifier: PathBuf,
    pub menu_item_frequency: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            preprocessor: dir.join(ArtifactKind::Preprocessor.default_file_name()),
            label_decoder: dir.join(ArtifactKind::LabelDecoder.default_file_name()),
            classifier: dir.join(ArtifactKind::Classifier.default_file_name()),
            menu_item_frequency: dir.join(ArtifactKind::MenuItemFrequency.default_file_name()),
        }
    }

    pub fn get(&self, artifact: ArtifactKind) -> &Path {
        match artifact {
            ArtifactKind::Preprocessor => &self.preprocessor,
            ArtifactKind::LabelDecoder => &self.label_decoder,
            ArtifactKind::Classifier => &self.classifier,
            ArtifactKind::MenuItemFrequency => &self.menu_item_frequency,
        }
    }
}

/// Loads the artifact set from disk exactly once.
///
/// The first call to [`context`](Self::context) reads and validates every
/// artifact; the outcome, success or failure, is kept for the lifetime of
/// the store and returned to every later caller without touching the disk
/// again.
#[derive(Debug)]
pub struct ArtifactStore {
    paths: ArtifactPaths,
    runtime_config: RuntimeConfig,
    missing_frequency: MissingFrequencyPolicy,
    loaded: OnceLock<Result<Arc<ArtifactContext>, ArtifactError>>,
}

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            runtime_config: RuntimeConfig::default(),
            missing_frequency: MissingFrequencyPolicy::default(),
            loaded: OnceLock::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ArtifactPaths::in_dir(&config.artifacts_dir))
            .with_runtime_config(config.runtime.clone())
            .with_missing_frequency(config.missing_frequency)
    }

    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    pub fn with_missing_frequency(mut self, policy: MissingFrequencyPolicy) -> Self {
        self.missing_frequency = policy;
        self
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn is_present(&self, artifact: ArtifactKind) -> bool {
        self.paths.get(artifact).is_file()
    }

    /// Required artifacts that are not on disk, in load order
    pub fn missing_required(&self) -> Vec<ArtifactKind> {
        ArtifactKind::REQUIRED
            .into_iter()
            .filter(|&artifact| !self.is_present(artifact))
            .collect()
    }

    /// Returns the loaded context, loading it on first use.
    pub fn context(&self) -> Result<Arc<ArtifactContext>, ArtifactError> {
        self.loaded.get_or_init(|| self.load().map(Arc::new)).clone()
    }

    /// Reads every artifact from disk. Prefer [`context`](Self::context),
    /// which caches the result.
    ///
    /// Each file is read once; the fingerprint is taken from the same bytes
    /// that are parsed.
    pub fn load(&self) -> Result<ArtifactContext, ArtifactError> {
        log::info!("Loading artifacts:");
        for artifact in ArtifactKind::REQUIRED {
            let path = self.paths.get(artifact);
            log::info!("  {}: {:?} (exists: {})", artifact, path, path.is_file());
        }

        // Nothing is opened until every required file is known to exist
        if let Some(artifact) = self.missing_required().into_iter().next() {
            let path = self.paths.get(artifact).to_path_buf();
            log::error!("Required artifact {} not found at {:?}", artifact, path);
            return Err(ArtifactError::Missing { artifact, path });
        }

        let preprocessor_bytes = self.read(ArtifactKind::Preprocessor)?;
        let decoder_bytes = self.read(ArtifactKind::LabelDecoder)?;
        let classifier_bytes = self.read(ArtifactKind::Classifier)?;
        let mut fingerprints = vec![
            self.fingerprint_bytes(ArtifactKind::Preprocessor, &preprocessor_bytes),
            self.fingerprint_bytes(ArtifactKind::LabelDecoder, &decoder_bytes),
            self.fingerprint_bytes(ArtifactKind::Classifier, &classifier_bytes),
        ];

        let decoder = LabelDecoder::from_json_slice(&decoder_bytes)
            .map_err(|e| self.invalid(ArtifactKind::LabelDecoder, e.to_string()))?;
        log::info!("Label decoder loaded with {} classes", decoder.num_classes());

        let transform = OnnxTransform::from_bytes(&preprocessor_bytes, &self.runtime_config)
            .map_err(|reason| self.invalid(ArtifactKind::Preprocessor, reason))?;
        let classifier = OnnxClassifier::from_bytes(&classifier_bytes, &self.runtime_config)
            .map_err(|reason| self.invalid(ArtifactKind::Classifier, reason))?;

        if let (Some(produced), Some(accepted)) = (transform.output_width(), classifier.input_width()) {
            if produced != accepted {
                log::error!("Transform produces {} features but classifier expects {}", produced, accepted);
                return Err(ArtifactError::Incompatible(format!(
                    "transform produces {} features, classifier expects {}",
                    produced, accepted
                )));
            }
        }

        let frequencies = match self.load_frequency_table()? {
            Some((table, fingerprint)) => {
                fingerprints.push(fingerprint);
                Some(table)
            }
            None => None,
        };
        if transform.requires_frequency() && frequencies.is_none() {
            log::warn!("Transform uses MenuItem_freq but no frequency table is loaded, every item counts as 0");
        }

        for fingerprint in &fingerprints {
            log::info!("  {} sha256 {}", fingerprint.artifact, fingerprint.sha256);
        }
        log::info!("Artifacts ready to use");

        let pipeline = InferencePipeline::new(Box::new(transform), Box::new(classifier), Box::new(decoder), frequencies);
        Ok(ArtifactContext::new(pipeline, fingerprints))
    }

    /// Loads the optional frequency table according to the configured
    /// [`MissingFrequencyPolicy`], together with the fingerprint of the
    /// bytes it was parsed from.
    ///
    /// A table that exists but does not parse is an error under either
    /// policy.
    pub fn load_frequency_table(
        &self,
    ) -> Result<Option<(MenuItemFrequencyTable, ArtifactFingerprint)>, ArtifactError> {
        let path = &self.paths.menu_item_frequency;
        if !path.is_file() {
            return match self.missing_frequency {
                MissingFrequencyPolicy::Zero => {
                    log::warn!("Frequency table not found at {:?}, using 0 for every menu item", path);
                    Ok(None)
                }
                MissingFrequencyPolicy::Fail => {
                    log::error!("Frequency table not found at {:?}", path);
                    Err(ArtifactError::Missing {
                        artifact: ArtifactKind::MenuItemFrequency,
                        path: path.clone(),
                    })
                }
            };
        }

        let bytes = self.read(ArtifactKind::MenuItemFrequency)?;
        let table = MenuItemFrequencyTable::from_json_slice(&bytes)
            .map_err(|e| self.invalid(ArtifactKind::MenuItemFrequency, e.to_string()))?;
        log::info!("Frequency table loaded with {} menu items", table.len());
        Ok(Some((table, self.fingerprint_bytes(ArtifactKind::MenuItemFrequency, &bytes))))
    }

    pub fn fingerprint(&self, artifact: ArtifactKind) -> Result<ArtifactFingerprint, ArtifactError> {
        let bytes = self.read(artifact)?;
        Ok(self.fingerprint_bytes(artifact, &bytes))
    }

    fn fingerprint_bytes(&self, artifact: ArtifactKind, bytes: &[u8]) -> ArtifactFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        ArtifactFingerprint {
            artifact,
            path: self.paths.get(artifact).to_path_buf(),
            sha256: format!("{:x}", hasher.finalize()),
        }
    }

    fn read(&self, artifact: ArtifactKind) -> Result<Vec<u8>, ArtifactError> {
        fs::read(self.paths.get(artifact)).map_err(|e| self.invalid(artifact, e.to_string()))
    }

    fn invalid(&self, artifact: ArtifactKind, reason: String) -> ArtifactError {
        let path = self.paths.get(artifact).to_path_buf();
        log::error!("Failed to load {} from {:?}: {}", artifact, path, reason);
        ArtifactError::Invalid { artifact, path, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ArtifactStore {
        ArtifactStore::new(ArtifactPaths::in_dir(dir.path()))
    }

    #[test]
    fn test_default_paths() {
        let paths = ArtifactPaths::in_dir("/srv/menu");
        assert!(paths.preprocessor.ends_with("preprocessor.onnx"));
        assert!(paths.classifier.ends_with("xgb_model.onnx"));
        assert!(paths.label_decoder.ends_with("label_encoder.json"));
        assert!(paths.menu_item_frequency.ends_with("menu_item_freq.json"));
    }

    #[test]
    fn test_missing_required_in_load_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("label_encoder.json"), r#"["High","Low","Medium"]"#).unwrap();
        let store = store_in(&dir);
        assert_eq!(
            store.missing_required(),
            vec![ArtifactKind::Preprocessor, ArtifactKind::Classifier]
        );
    }

    #[test]
    fn test_load_reports_first_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        match store.load() {
            Err(ArtifactError::Missing { artifact, path }) => {
                assert_eq!(artifact, ArtifactKind::Preprocessor);
                assert_eq!(path, dir.path().join("preprocessor.onnx"));
            }
            other => panic!("expected missing artifact, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_context_is_cached_and_not_retried() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let first = store.context().unwrap_err();

        // Files appearing later are not picked up by the same store
        for artifact in ArtifactKind::REQUIRED {
            fs::write(store.paths().get(artifact), b"placeholder").unwrap();
        }
        let second = store.context().unwrap_err();
        assert_eq!(first, second);
        assert!(matches!(second, ArtifactError::Missing { .. }));
    }

    #[test]
    fn test_invalid_label_decoder() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for artifact in ArtifactKind::REQUIRED {
            fs::write(store.paths().get(artifact), b"not json").unwrap();
        }
        assert!(matches!(
            store.load(),
            Err(ArtifactError::Invalid { artifact: ArtifactKind::LabelDecoder, .. })
        ));
    }

    #[test]
    fn test_missing_frequency_table_defaults_to_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load_frequency_table(), Ok(None));
    }

    #[test]
    fn test_missing_frequency_table_can_be_required() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).with_missing_frequency(MissingFrequencyPolicy::Fail);
        assert!(matches!(
            store.load_frequency_table(),
            Err(ArtifactError::Missing { artifact: ArtifactKind::MenuItemFrequency, .. })
        ));
    }

    #[test]
    fn test_frequency_table_loaded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("menu_item_freq.json"), r#"{"Spring Roll": 12}"#).unwrap();
        let (table, fingerprint) = store_in(&dir).load_frequency_table().unwrap().unwrap();
        assert_eq!(table.count("Spring Roll"), 12);
        assert_eq!(fingerprint.artifact, ArtifactKind::MenuItemFrequency);
        assert_eq!(fingerprint, store_in(&dir).fingerprint(ArtifactKind::MenuItemFrequency).unwrap());
    }

    #[test]
    fn test_corrupt_frequency_table_is_invalid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("menu_item_freq.json"), "{oops").unwrap();
        assert!(matches!(
            store_in(&dir).load_frequency_table(),
            Err(ArtifactError::Invalid { artifact: ArtifactKind::MenuItemFrequency, .. })
        ));
    }

    #[test]
    fn test_fingerprint() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("label_encoder.json"), b"abc").unwrap();
        let fingerprint = store_in(&dir).fingerprint(ArtifactKind::LabelDecoder).unwrap();
        assert_eq!(
            fingerprint.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fingerprint.short(), "ba7816bf8f01");
    }
}
