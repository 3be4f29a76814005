//! Shared handle to the active artifact bundle
//!
//! Inference callers take a cheap [`ModelHandle`] snapshot and keep scoring
//! against it even if a retrained bundle is swapped in meanwhile. A new
//! bundle is fully loaded and validated before the swap, so callers never
//! see a partial bundle.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::artifacts::ArtifactBundle;
use super::error::Result;

/// Immutable snapshot of a loaded bundle
#[derive(Debug, Clone)]
pub struct ModelHandle {
    /// Incremented on every replacement
    pub generation: u64,
    pub bundle: Arc<ArtifactBundle>,
}

#[derive(Debug)]
pub struct ArtifactRegistry {
    current: RwLock<ModelHandle>,
}

impl ArtifactRegistry {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self {
            current: RwLock::new(ModelHandle {
                generation: 0,
                bundle: Arc::new(bundle),
            }),
        }
    }

    /// Load a bundle from disk as generation 0
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self::new(ArtifactBundle::load(dir)?))
    }

    pub fn current(&self) -> ModelHandle {
        self.current.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Swap in a validated bundle and return the new handle
    pub fn replace(&self, bundle: ArtifactBundle) -> Result<ModelHandle> {
        bundle.validate()?;
        let bundle = Arc::new(bundle);

        let mut guard = self.current.write();
        let handle = ModelHandle {
            generation: guard.generation + 1,
            bundle,
        };
        *guard = handle.clone();
        drop(guard);

        tracing::info!(generation = handle.generation, "Artifact bundle replaced");
        Ok(handle)
    }

    /// Load a bundle from disk and swap it in. On failure the current
    /// bundle stays active.
    pub fn load_and_replace(&self, dir: &Path) -> Result<ModelHandle> {
        let bundle = ArtifactBundle::load(dir)?;
        self.replace(bundle)
    }
}
