//! Distance resolution: cache first, then at most one external lookup.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::cache::DistanceCache;
use crate::util::persistence::KeyValueStore;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
}

/// What the external lookup reports for a pair of locations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RouteLookup {
    NoRoute,
    Meters(f64),
}

/// External collaborator that measures driving distance.
#[allow(async_fn_in_trait)]
pub trait DistanceLookup {
    async fn lookup(&self, origin: &str, destination: &str) -> Result<RouteLookup, LookupError>;
}

impl<T: DistanceLookup + ?Sized> DistanceLookup for &T {
    async fn lookup(&self, origin: &str, destination: &str) -> Result<RouteLookup, LookupError> {
        (**self).lookup(origin, destination).await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceSource {
    /// Served from the distance cache.
    Cached,
    /// Fetched from the external lookup during this call.
    Fresh,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedDistance {
    pub km: f64,
    pub source: DistanceSource,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DistanceOutcome {
    Found(ResolvedDistance),
    NoRouteFound,
}

impl DistanceOutcome {
    pub fn km(&self) -> Option<f64> {
        match self {
            Self::Found(resolved) => Some(resolved.km),
            Self::NoRouteFound => None,
        }
    }
}

pub struct DistanceResolver<L, S> {
    lookup: L,
    cache: DistanceCache<S>,
}

impl<L: DistanceLookup, S: KeyValueStore> DistanceResolver<L, S> {
    pub fn new(lookup: L, cache: DistanceCache<S>) -> Self {
        Self { lookup, cache }
    }

    pub fn cache(&self) -> &DistanceCache<S> {
        &self.cache
    }

    /// Resolve the distance between two locations in kilometers.
    ///
    /// Never retries: a failed lookup is returned as is and the cache is left untouched.
    pub async fn resolve(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<DistanceOutcome, LookupError> {
        if let Some(km) = self.cache.get(origin, destination) {
            debug!(origin, destination, km, "distance cache hit");
            return Ok(DistanceOutcome::Found(ResolvedDistance {
                km,
                source: DistanceSource::Cached,
            }));
        }

        info!(origin, destination, "looking up distance");
        let meters = match self.lookup.lookup(origin, destination).await? {
            RouteLookup::NoRoute => {
                info!(origin, destination, "no drivable route");
                return Ok(DistanceOutcome::NoRouteFound);
            }
            RouteLookup::Meters(meters) => meters,
        };
        if !meters.is_finite() || meters < 0.0 {
            return Err(LookupError::Api(format!("invalid distance: {meters} m")));
        }

        let km = meters / 1000.0;
        if let Err(e) = self.cache.put(origin, destination, km) {
            warn!(origin, destination, error = %e, "failed to cache distance");
        }

        Ok(DistanceOutcome::Found(ResolvedDistance {
            km,
            source: DistanceSource::Fresh,
        }))
    }
}
