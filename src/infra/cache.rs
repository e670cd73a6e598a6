//! Persistent distance cache keyed by unordered location pairs.
//!
//! Entries never expire; they live until the caller clears them.

use tracing::{debug, warn};

use crate::util::persistence::{KeyValueStore, StoreError};

const KEY_PREFIX: &str = "distance:";

/// Store key for a location pair. Both directions map to the same key.
///
/// The pair is encoded as a JSON array so separators inside location text stay distinct.
pub fn pair_key(origin: &str, destination: &str) -> String {
    let (a, b) = (origin.trim(), destination.trim());
    let pair = if a <= b { [a, b] } else { [b, a] };
    let encoded = serde_json::to_string(&pair).unwrap_or_else(|_| format!("{pair:?}"));
    format!("{KEY_PREFIX}{encoded}")
}

#[derive(Debug, Clone)]
pub struct DistanceCache<S> {
    store: S,
}

impl<S: KeyValueStore> DistanceCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Cached distance in kilometers, if any.
    ///
    /// Unreadable or malformed entries count as a miss.
    pub fn get(&self, origin: &str, destination: &str) -> Option<f64> {
        let key = pair_key(origin, destination);
        match self.store.get(&key) {
            Ok(Some(raw)) => match raw.trim().parse::<f64>() {
                Ok(km) if km.is_finite() && km >= 0.0 => Some(km),
                _ => {
                    warn!(%key, value = %raw, "ignoring malformed cached distance");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(%key, error = %e, "failed to read distance cache");
                None
            }
        }
    }

    /// Store a distance; it answers lookups in both directions afterwards.
    pub fn put(&self, origin: &str, destination: &str, km: f64) -> Result<(), StoreError> {
        let key = pair_key(origin, destination);
        self.store.set(&key, &km.to_string())?;
        debug!(%key, km, "cached distance");
        Ok(())
    }

    pub fn remove(&self, origin: &str, destination: &str) -> Result<(), StoreError> {
        self.store.remove(&pair_key(origin, destination))
    }
}
