//! Freight rate calculation.
//!
//! Amounts stay unrounded `f64` so the breakdown always sums to the total; rounding to
//! cents happens only when a quote is displayed.

use thiserror::Error;

use super::entities::EquipmentType;

/// Price per kilometer before any surcharge.
pub const PER_KM_RATE: f64 = 1.616;
/// Weight (lb) at which the heavy fuel tier and the weight factor start.
pub const HEAVY_WEIGHT_LB: f64 = 10_000.0;
pub const LIGHT_FUEL_RATE: f64 = 0.237;
pub const HEAVY_FUEL_RATE: f64 = 0.557;
/// Charged per 100 lb above [`HEAVY_WEIGHT_LB`].
pub const WEIGHT_FACTOR_PER_100_LB: f64 = 0.10;
/// Assumed maximum distance covered per day of travel.
pub const MAX_DAILY_KM: f64 = 541.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("unknown equipment type: {0}")]
    UnknownEquipment(String),
    #[error("weight must be greater than zero (got {0})")]
    NonPositiveWeight(f64),
    #[error("distance must be a finite, non-negative number (got {0})")]
    InvalidDistance(f64),
}

/// Itemized price for one shipment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateBreakdown {
    pub base_rate: f64,
    pub equipment_charge: f64,
    pub fuel_surcharge: f64,
    pub weight_factor: f64,
    pub total: f64,
}

impl EquipmentType {
    /// Share of the base rate charged for the trailer type.
    pub fn multiplier(&self) -> f64 {
        match self {
            EquipmentType::DryVan => 0.0,
            EquipmentType::Reefer => 0.30,
            EquipmentType::Flatbed => 0.15,
        }
    }
}

pub fn fuel_surcharge_rate(weight_lb: f64) -> f64 {
    if weight_lb < HEAVY_WEIGHT_LB {
        LIGHT_FUEL_RATE
    } else {
        HEAVY_FUEL_RATE
    }
}

/// Compute the itemized rate for a shipment.
///
/// The fuel surcharge applies to base rate plus equipment charge, never to the weight
/// factor.
pub fn compute_rate(
    distance_km: f64,
    weight_lb: f64,
    equipment: EquipmentType,
) -> Result<RateBreakdown, RateError> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(RateError::InvalidDistance(distance_km));
    }
    if !weight_lb.is_finite() || weight_lb <= 0.0 {
        return Err(RateError::NonPositiveWeight(weight_lb));
    }

    let base_rate = PER_KM_RATE * distance_km;
    let equipment_charge = base_rate * equipment.multiplier();
    let fuel_surcharge = (base_rate + equipment_charge) * fuel_surcharge_rate(weight_lb);
    let weight_factor =
        (weight_lb - HEAVY_WEIGHT_LB).max(0.0) / 100.0 * WEIGHT_FACTOR_PER_100_LB;
    let total = base_rate + equipment_charge + fuel_surcharge + weight_factor;

    Ok(RateBreakdown {
        base_rate,
        equipment_charge,
        fuel_surcharge,
        weight_factor,
        total,
    })
}

/// Travel days for a distance; a zero-length trip still takes one day.
pub fn estimate_days(distance_km: f64) -> u32 {
    if distance_km <= 0.0 {
        return 1;
    }
    (distance_km / MAX_DAILY_KM).ceil().max(1.0) as u32
}
