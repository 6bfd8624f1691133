//! Fare pricing
//!
//! `fare = (BASE_FARE + RATE_PER_KM × distance_km) × class multiplier`,
//! rounded to currency minor units. Computed once when the ride is
//! created and never recalculated.

use crate::types::RideClass;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Flag-fall amount in currency units
pub const BASE_FARE: Decimal = dec!(25);

/// Per-kilometer rate in currency units
pub const RATE_PER_KM: Decimal = dec!(12);

/// Quote a fare for a trip of `distance_km` in the given class.
///
/// Errors when the distance is negative or cannot be represented as a
/// money amount (non-finite input).
pub fn quote(distance_km: f64, class: RideClass) -> crate::Result<Decimal> {
    let distance = Decimal::from_f64_retain(distance_km)
        .filter(|d| !d.is_sign_negative())
        .ok_or(crate::Error::InvalidDistance(distance_km))?;

    let fare = (BASE_FARE + RATE_PER_KM * distance) * class.multiplier();
    Ok(fare.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_fare_matches_formula() {
        // (25 + 12 * 3) * 1 = 61
        assert_eq!(quote(3.0, RideClass::Standard).unwrap(), dec!(61));
    }

    #[test]
    fn test_premium_fare_at_6_5_km() {
        // (25 + 12 * 6.5) * 1.5 = 154.5
        assert_eq!(quote(6.5, RideClass::Premium).unwrap(), dec!(154.50));
    }

    #[test]
    fn test_xl_doubles_the_standard_fare() {
        let standard = quote(4.2, RideClass::Standard).unwrap();
        let xl = quote(4.2, RideClass::Xl).unwrap();
        assert_eq!(xl, (standard * dec!(2)).round_dp(2));
    }

    #[test]
    fn test_rounding_to_minor_units() {
        // (25 + 12 * 1.234) * 1 = 39.808 -> 39.81
        assert_eq!(quote(1.234, RideClass::Standard).unwrap(), dec!(39.81));
    }

    #[test]
    fn test_zero_distance_charges_base_fare() {
        assert_eq!(quote(0.0, RideClass::Standard).unwrap(), dec!(25));
    }

    #[test]
    fn test_rejects_unrepresentable_distance() {
        assert!(quote(f64::NAN, RideClass::Standard).is_err());
        assert!(quote(f64::INFINITY, RideClass::Premium).is_err());
        assert!(quote(-1.0, RideClass::Standard).is_err());
    }
}
