use std::path::Path;

use anyhow::{bail, ensure, Context};
use serde::Deserialize;

/// The opaque network: a normalized CHW float tensor in, one logit per class out.
pub trait Classifier: Send + Sync {
    /// Side length of the square RGB input.
    fn input_size(&self) -> u32;
    fn num_classes(&self) -> usize;
    fn logits(&self, input: &[f32]) -> anyhow::Result<Vec<f32>>;
}

/// Linear classification head read from a JSON weights file:
/// `{ "input_size": n, "weights": [[f32; 3*n*n]; classes], "bias": [f32; classes] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearClassifier {
    input_size: u32,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl LinearClassifier {
    pub fn new(input_size: u32, weights: Vec<Vec<f32>>, bias: Vec<f32>) -> anyhow::Result<Self> {
        let model = Self {
            input_size,
            weights,
            bias,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read model weights {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parse model weights {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let model: Self = serde_json::from_str(raw)?;
        model.validate()?;
        Ok(model)
    }

    fn features(&self) -> usize {
        3 * (self.input_size as usize) * (self.input_size as usize)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.input_size > 0, "input_size must be positive");
        ensure!(!self.weights.is_empty(), "weights have no classes");
        ensure!(
            self.bias.len() == self.weights.len(),
            "bias has {} entries for {} classes",
            self.bias.len(),
            self.weights.len()
        );
        let features = self.features();
        for (class, row) in self.weights.iter().enumerate() {
            if row.len() != features {
                bail!("class {class} has {} weights, expected {features}", row.len());
            }
            if row.iter().any(|w| !w.is_finite()) {
                bail!("class {class} has non-finite weights");
            }
        }
        ensure!(self.bias.iter().all(|b| b.is_finite()), "bias has non-finite entries");
        Ok(())
    }
}

impl Classifier for LinearClassifier {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn num_classes(&self) -> usize {
        self.weights.len()
    }

    fn logits(&self, input: &[f32]) -> anyhow::Result<Vec<f32>> {
        ensure!(
            input.len() == self.features(),
            "input has {} features, expected {}",
            input.len(),
            self.features()
        );
        Ok(self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect())
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and probability of the most likely class; ties go to the lower index.
pub fn top1(probs: &[f32]) -> Option<(usize, f32)> {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
}
