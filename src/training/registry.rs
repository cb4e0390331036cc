// In-memory model registry: publish serialized models by name, retrieve by iteration.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::core::{Result, SpaceError};

#[derive(Default)]
struct RegistryInner {
    /// Published payloads per model name; the index is the iteration.
    models: HashMap<String, Vec<Vec<u8>>>,
}

/// Thread-safe store of published model payloads.
#[derive(Default)]
pub struct ModelRegistry {
    inner: RwLock<RegistryInner>,
}

impl ModelRegistry {
    pub fn new() -> Self { Self::default() }

    /// Store a new iteration of `name`, returning its iteration number (0-based).
    pub fn publish_model(&self, name: &str, model: Vec<u8>) -> Result<u64> {
        let mut g = self.inner.write().map_err(|_| SpaceError::Registry("registry poisoned".into()))?;
        let iterations = g.models.entry(name.to_string()).or_default();
        iterations.push(model);
        let iteration = (iterations.len() - 1) as u64;
        debug!(name, iteration, "model published");
        Ok(iteration)
    }

    /// Fetch iteration `iteration` of `name`; a negative iteration selects the latest.
    /// Returns the resolved iteration together with the payload.
    pub fn retrieve_model(&self, name: &str, iteration: i64) -> Result<(u64, Vec<u8>)> {
        let g = self.inner.read().map_err(|_| SpaceError::Registry("registry poisoned".into()))?;
        let not_found = || SpaceError::ModelNotFound { name: name.to_string(), iteration };
        let iterations = g.models.get(name).ok_or_else(not_found)?;
        let index = if iteration < 0 {
            iterations.len().checked_sub(1).ok_or_else(not_found)?
        } else {
            iteration as usize
        };
        let payload = iterations.get(index).ok_or_else(not_found)?;
        Ok((index as u64, payload.clone()))
    }

    pub fn latest_iteration(&self, name: &str) -> Option<u64> {
        let g = self.inner.read().ok()?;
        g.models.get(name).and_then(|its| its.len().checked_sub(1)).map(|i| i as u64)
    }

    /// Names of all published models, sorted.
    pub fn model_names(&self) -> Vec<String> {
        let Ok(g) = self.inner.read() else { return Vec::new() };
        let mut names: Vec<String> = g.models.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn publish_and_retrieve_iterations() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.publish_model("m", vec![1]).unwrap(), 0);
        assert_eq!(registry.publish_model("m", vec![2]).unwrap(), 1);
        assert_eq!(registry.retrieve_model("m", 0).unwrap(), (0, vec![1]));
        assert_eq!(registry.retrieve_model("m", -1).unwrap(), (1, vec![2]));
        assert_eq!(registry.latest_iteration("m"), Some(1));
        assert_eq!(registry.model_names(), vec!["m".to_string()]);
    }

    #[test]
    fn unknown_model_or_iteration_is_not_found() {
        let registry = ModelRegistry::new();
        assert!(matches!(
            registry.retrieve_model("missing", -1),
            Err(SpaceError::ModelNotFound { .. })
        ));
        registry.publish_model("m", vec![]).unwrap();
        assert!(matches!(
            registry.retrieve_model("m", 5),
            Err(SpaceError::ModelNotFound { iteration: 5, .. })
        ));
        assert_eq!(registry.latest_iteration("missing"), None);
    }

    #[test]
    fn concurrent_publishers_get_distinct_iterations() {
        let registry = Arc::new(ModelRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let r = Arc::clone(&registry);
                std::thread::spawn(move || r.publish_model("shared", vec![i]).unwrap())
            })
            .collect();
        let mut iterations: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        iterations.sort();
        assert_eq!(iterations, vec![0, 1, 2, 3]);
    }
}
