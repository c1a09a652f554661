//! Boundary around the opaque leaf classifier.
//!
//! The adapter owns everything the network needs from an upload: RGB
//! conversion, resizing to the model's input size and ImageNet
//! normalization. Weights and labels are loaded once at start and shared
//! read-only; concurrent inference is bounded by a semaphore.

pub mod labels;
pub mod model;

use std::sync::Arc;

use anyhow::{ensure, Context};
use image::{imageops::FilterType, RgbImage};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::config::ModelConfig;
use crate::error::AppError;

use self::labels::LabelSet;
use self::model::{softmax, top1, Classifier, LinearClassifier};

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

/// Decodes PNG or JPEG bytes into an RGB raster.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, AppError> {
    let img = image::load_from_memory(bytes).map_err(|e| AppError::InvalidImage(e.to_string()))?;
    Ok(img.to_rgb8())
}

/// Resizes to `size`x`size` and lays the normalized pixels out as CHW.
pub fn preprocess(img: &RgbImage, size: u32) -> Vec<f32> {
    let resized = image::imageops::resize(img, size, size, FilterType::Triangle);
    let plane = (size as usize) * (size as usize);
    let mut out = vec![0f32; 3 * plane];
    for (i, px) in resized.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = (f32::from(px[c]) / 255.0 - MEAN[c]) / STD[c];
        }
    }
    out
}

pub struct InferenceAdapter {
    classifier: Arc<dyn Classifier>,
    labels: Arc<LabelSet>,
    permits: Arc<Semaphore>,
}

impl InferenceAdapter {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        labels: LabelSet,
        max_concurrency: usize,
    ) -> anyhow::Result<Self> {
        ensure!(
            classifier.num_classes() == labels.len(),
            "model has {} outputs but the label mapping has {} labels",
            classifier.num_classes(),
            labels.len()
        );
        Ok(Self {
            classifier,
            labels: Arc::new(labels),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        })
    }

    pub fn load(cfg: &ModelConfig) -> anyhow::Result<Self> {
        let labels = LabelSet::load(&cfg.labels_path)?;
        let classifier = LinearClassifier::load(&cfg.weights_path)?;
        Self::new(Arc::new(classifier), labels, cfg.max_concurrency)
            .context("model does not match label mapping")
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Runs the classifier on the blocking pool, at most `max_concurrency`
    /// at a time.
    pub async fn predict(&self, image: RgbImage) -> Result<Prediction, AppError> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let classifier = self.classifier.clone();
        let labels = self.labels.clone();
        let prediction = tokio::task::spawn_blocking(move || {
            predict_with(classifier.as_ref(), &labels, &image)
        })
        .await
        .map_err(anyhow::Error::from)??;

        debug!(label = %prediction.label, confidence = prediction.confidence, "prediction");
        Ok(prediction)
    }
}

fn predict_with(
    classifier: &dyn Classifier,
    labels: &LabelSet,
    image: &RgbImage,
) -> anyhow::Result<Prediction> {
    let input = preprocess(image, classifier.input_size());
    let probs = softmax(&classifier.logits(&input)?);
    let (index, p) = top1(&probs).context("classifier produced no outputs")?;
    ensure!(
        p.is_finite(),
        "classifier produced a non-finite probability for class {index}"
    );
    let label = labels
        .name(index)
        .with_context(|| format!("class index {index} has no label"))?;
    Ok(Prediction {
        label: label.to_owned(),
        confidence: f64::from(p).clamp(0.0, 1.0),
    })
}

/// Result of the one-time model load at process start.
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<InferenceAdapter>),
    Unavailable(String),
}

impl ModelState {
    /// Never fails: a load error is logged loudly and the service keeps
    /// running with inference refused.
    pub fn load(cfg: &ModelConfig) -> Self {
        match InferenceAdapter::load(cfg) {
            Ok(adapter) => {
                info!(
                    weights = %cfg.weights_path,
                    labels = adapter.labels().len(),
                    labels_version = %adapter.labels().version(),
                    "model loaded"
                );
                ModelState::Ready(Arc::new(adapter))
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(error = %reason, "model failed to load; /analyze will refuse requests");
                ModelState::Unavailable(reason)
            }
        }
    }

    pub fn adapter(&self) -> Result<&InferenceAdapter, AppError> {
        match self {
            ModelState::Ready(a) => Ok(a),
            ModelState::Unavailable(reason) => Err(AppError::ModelUnavailable(reason.clone())),
        }
    }
}
