//! Auto-registered preview models.
//!
//! An output can publish its channel range as a named pixel model so a
//! host UI can preview or overlay it. The registry is owned by the host;
//! the driver only describes the model it wants.

use std::collections::BTreeMap;

use crate::error::LinsnError;

/// Default model name when no description is configured.
pub const DEFAULT_MODEL_NAME: &str = "LED Panels";

// ── AutoModel ────────────────────────────────────────────────────

/// Corner of the canvas where channel data starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartCorner {
    TopLeft,
    BottomLeft,
}

impl StartCorner {
    pub const fn as_str(self) -> &'static str {
        match self {
            StartCorner::TopLeft => "TL",
            StartCorner::BottomLeft => "BL",
        }
    }
}

/// Description of a horizontally-strung RGB pixel model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoModel {
    pub name: String,
    pub start_channel: usize,
    pub channel_count: usize,
    pub channels_per_node: usize,
    pub start_corner: StartCorner,
    /// Number of strings (canvas rows).
    pub strings: usize,
    pub strands_per_string: usize,
}

// ── ModelRegistry ────────────────────────────────────────────────

/// Host-side registry of preview models.
pub trait ModelRegistry {
    fn contains(&self, name: &str) -> bool;

    fn add_auto_model(&mut self, model: AutoModel) -> Result<(), LinsnError>;

    /// First of `base`, `base-1`, `base-2`, … not yet registered.
    fn unique_name(&self, base: &str) -> String {
        let mut name = base.to_string();
        let mut count = 0;
        while self.contains(&name) {
            count += 1;
            name = format!("{base}-{count}");
        }
        name
    }
}

/// In-process registry keyed by model name.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    models: BTreeMap<String, AutoModel>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AutoModel> {
        self.models.get(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelRegistry for MemoryRegistry {
    fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    fn add_auto_model(&mut self, model: AutoModel) -> Result<(), LinsnError> {
        if self.models.contains_key(&model.name) {
            return Err(LinsnError::InvalidConfig(format!(
                "model {:?} already registered",
                model.name
            )));
        }
        self.models.insert(model.name.clone(), model);
        Ok(())
    }
}
