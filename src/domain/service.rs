//! Quote creation: validate the request, resolve distance, price it.

use serde::Serialize;
use thiserror::Error;
use time::Date;
use tracing::{info, warn};

use super::entities::{iso_date, EquipmentType, LocationSelection, Quote, QuoteRequest};
use super::ledger::{QuoteLedger, SharedLedger};
use super::rate::{compute_rate, estimate_days, RateError};
use crate::infra::distance::{DistanceLookup, DistanceOutcome, DistanceResolver, LookupError};
use crate::util::persistence::{KeyValueStore, StoreError};

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("weight must be greater than zero (got {0})")]
    InvalidWeight(f64),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} does not match the selected location; select it again")]
    UnconfirmedLocation(&'static str),
    #[error("no drivable route from {origin} to {destination}")]
    RouteUnavailable { origin: String, destination: String },
    #[error("distance lookup failed: {0}")]
    LookupFailure(#[from] LookupError),
    #[error("failed to persist: {0}")]
    PersistenceFailure(#[from] StoreError),
}

impl From<RateError> for QuoteError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::NonPositiveWeight(weight) => QuoteError::InvalidWeight(weight),
            other => QuoteError::InvalidInput(other.to_string()),
        }
    }
}

impl QuoteError {
    /// Whether the error was raised before any external call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::InvalidWeight(_)
                | Self::InvalidInput(_)
                | Self::UnconfirmedLocation(_)
        )
    }
}

/// Wire response for a quote request.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuoteResponse {
    Created { quote: Quote },
    Failed { error: String },
}

impl From<Result<Quote, QuoteError>> for QuoteResponse {
    fn from(result: Result<Quote, QuoteError>) -> Self {
        match result {
            Ok(quote) => QuoteResponse::Created { quote },
            Err(err) => QuoteResponse::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// A request that passed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedRequest {
    pub origin: String,
    pub destination: String,
    pub equipment: EquipmentType,
    pub weight: f64,
    pub pickup_date: Date,
    pub cache_distance: Option<f64>,
}

/// Check a request without touching the network.
pub fn validate_request(
    request: &QuoteRequest,
    selection: Option<&LocationSelection>,
) -> Result<ValidatedRequest, QuoteError> {
    let origin = required_text(&request.origin, "origin")?;
    let destination = required_text(&request.destination, "destination")?;
    let equipment = required_text(&request.equipment_type, "equipmentType")?;
    let weight = request.weight.ok_or(QuoteError::MissingField("weight"))?;
    let pickup = required_text(&request.pickup_date, "pickupDate")?;

    if !weight.is_finite() || weight <= 0.0 {
        return Err(QuoteError::InvalidWeight(weight));
    }
    let equipment: EquipmentType = equipment.parse()?;
    let pickup_date = iso_date::parse(pickup)
        .map_err(|e| QuoteError::InvalidInput(format!("pickupDate {pickup:?}: {e}")))?;
    if let Some(km) = request.cache_distance {
        if !km.is_finite() || km < 0.0 {
            return Err(QuoteError::InvalidInput(format!("cacheDistance {km}")));
        }
    }

    if let Some(selection) = selection {
        if selection.origin.as_deref() != Some(origin) {
            return Err(QuoteError::UnconfirmedLocation("origin"));
        }
        if selection.destination.as_deref() != Some(destination) {
            return Err(QuoteError::UnconfirmedLocation("destination"));
        }
    }

    Ok(ValidatedRequest {
        origin: origin.to_string(),
        destination: destination.to_string(),
        equipment,
        weight,
        pickup_date,
        cache_distance: request.cache_distance,
    })
}

fn required_text<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, QuoteError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(QuoteError::MissingField(field))
}

/// Price a validated request over a known distance.
pub fn assemble_quote(request: ValidatedRequest, distance_km: f64) -> Result<Quote, RateError> {
    let rate = compute_rate(distance_km, request.weight, request.equipment)?;
    Ok(Quote {
        origin: request.origin,
        destination: request.destination,
        equipment_type: request.equipment,
        weight: request.weight,
        pickup_date: request.pickup_date,
        distance: distance_km,
        days: estimate_days(distance_km),
        base_rate: rate.base_rate,
        equipment_charge: rate.equipment_charge,
        fuel_surcharge: rate.fuel_surcharge,
        weight_factor: rate.weight_factor,
        total: rate.total,
    })
}

pub struct QuoteService<L, S> {
    resolver: DistanceResolver<L, S>,
}

impl<L: DistanceLookup, S: KeyValueStore> QuoteService<L, S> {
    pub fn new(resolver: DistanceResolver<L, S>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &DistanceResolver<L, S> {
        &self.resolver
    }

    /// Build a quote. Nothing is written to the ledger.
    ///
    /// A `cacheDistance` on the request is used as is and skips distance resolution.
    pub async fn create_quote(
        &self,
        request: &QuoteRequest,
        selection: Option<&LocationSelection>,
    ) -> Result<Quote, QuoteError> {
        let request = validate_request(request, selection)?;

        let distance_km = match request.cache_distance {
            Some(km) => km,
            None => match self
                .resolver
                .resolve(&request.origin, &request.destination)
                .await?
            {
                DistanceOutcome::Found(resolved) => resolved.km,
                DistanceOutcome::NoRouteFound => {
                    warn!(origin = %request.origin, destination = %request.destination, "route unavailable");
                    return Err(QuoteError::RouteUnavailable {
                        origin: request.origin,
                        destination: request.destination,
                    });
                }
            },
        };

        let quote = assemble_quote(request, distance_km)?;
        info!(
            origin = %quote.origin,
            destination = %quote.destination,
            equipment = %quote.equipment_type,
            distance_km = quote.distance,
            total = quote.total,
            "created quote"
        );
        Ok(quote)
    }

    /// Create a quote and record it in `ledger`.
    pub async fn create_and_record<T: KeyValueStore>(
        &self,
        ledger: &mut QuoteLedger<T>,
        request: &QuoteRequest,
        selection: Option<&LocationSelection>,
    ) -> Result<Quote, QuoteError> {
        let quote = self.create_quote(request, selection).await?;
        ledger.insert(quote.clone())?;
        Ok(quote)
    }

    /// Like [`Self::create_and_record`] for a ledger shared between tasks.
    ///
    /// The lock is taken only after the distance is resolved, so concurrent callers wait on
    /// each other for the insert alone.
    pub async fn create_and_record_shared<T: KeyValueStore>(
        &self,
        ledger: &SharedLedger<T>,
        request: &QuoteRequest,
        selection: Option<&LocationSelection>,
    ) -> Result<Quote, QuoteError> {
        let quote = self.create_quote(request, selection).await?;
        ledger.lock().await.insert(quote.clone())?;
        Ok(quote)
    }
}
