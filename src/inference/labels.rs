use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};

/// Fixed label set: class index -> disease label, a bijection over `0..n`.
#[derive(Debug, Clone)]
pub struct LabelSet {
    names: Vec<String>,
    version: String,
}

impl LabelSet {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read label mapping {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parse label mapping {}", path.display()))
    }

    /// Parses a `{ "label": index, ... }` object (the training-time
    /// class-to-index dump) and inverts it.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let map: HashMap<String, usize> = serde_json::from_str(raw)?;
        Self::from_class_indices(map)
    }

    pub fn from_class_indices(map: HashMap<String, usize>) -> anyhow::Result<Self> {
        if map.is_empty() {
            bail!("label mapping is empty");
        }
        let n = map.len();
        let mut slots: Vec<Option<String>> = vec![None; n];
        for (name, idx) in map {
            if name.trim().is_empty() {
                bail!("label at index {idx} is blank");
            }
            let Some(slot) = slots.get_mut(idx) else {
                bail!("index {idx} for {name:?} is out of range 0..{n}");
            };
            if let Some(prev) = slot.replace(name.clone()) {
                bail!("index {idx} is assigned to both {prev:?} and {name:?}");
            }
        }
        // n unique indices below n fill every slot
        let names: Vec<String> = slots.into_iter().flatten().collect();

        Ok(Self {
            version: crate::integrity::hash(names.join("\n").as_bytes())[..12].to_owned(),
            names,
        })
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.names.iter().any(|n| n == label)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Short fingerprint of the ordered label list.
    pub fn version(&self) -> &str {
        &self.version
    }
}
