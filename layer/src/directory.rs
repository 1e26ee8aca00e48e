//! Coordinator that keeps track of every live layer.

use std::{
    collections::BTreeSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use fog_core::{LayerId, LayerObserver};

/// Set of live layers maintained through lifecycle notifications.
#[derive(Debug, Default)]
pub struct LayerDirectory {
    layers: Mutex<BTreeSet<LayerId>>,
}

impl LayerDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers of the live layers in ascending order.
    #[must_use]
    pub fn layers(&self) -> Vec<LayerId> {
        self.lock().iter().copied().collect()
    }

    /// Reports whether the layer is currently live.
    #[must_use]
    pub fn contains(&self, layer: LayerId) -> bool {
        self.lock().contains(&layer)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<LayerId>> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LayerObserver for LayerDirectory {
    fn on_layer_added(&self, layer: LayerId) {
        let inserted = self.lock().insert(layer);
        assert!(inserted, "layer {layer:?} was initialized twice");
    }

    fn on_layer_removed(&self, layer: LayerId) {
        let removed = self.lock().remove(&layer);
        assert!(removed, "layer {layer:?} was torn down twice");
    }
}
