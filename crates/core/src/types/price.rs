//! Product price using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(12,2)`, so a `Price` is always rounded to
//! cents and bounded by the column precision. On the wire a price is a JSON
//! number; both numbers and numeric strings are accepted on input.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit `NUMERIC(12,2)`.
    #[error("price must be less than {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// A non-negative product price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Number of decimal places kept.
    pub const SCALE: u32 = 2;

    /// Exclusive upper bound imposed by `NUMERIC(12,2)`.
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

    /// Create a price, rounding to cents.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for amounts below zero and
    /// `PriceError::TooLarge` for amounts that do not fit the column.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        let amount = amount.round_dp(Self::SCALE);
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount >= Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        // Normalises "-0.00" to "0.00".
        Ok(Self(amount.abs()))
    }

    /// The amount as a decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_new_rounds_to_cents() {
        let price = Price::new(Decimal::from_str("19.999").unwrap()).unwrap();
        assert_eq!(price.amount(), Decimal::from_str("20.00").unwrap());
    }

    #[test]
    fn test_negative_rejected() {
        assert_eq!(
            Price::new(Decimal::from_str("-0.01").unwrap()),
            Err(PriceError::Negative)
        );
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_column_bound() {
        assert_eq!(Price::MAX, Decimal::from_str("10000000000").unwrap());
        assert!(Price::new(Decimal::from_str("9999999999.99").unwrap()).is_ok());
        assert!(matches!(
            Price::new(Decimal::from_str("10000000000").unwrap()),
            Err(PriceError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_serializes_as_json_number() {
        let price = Price::new(Decimal::from(500)).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "500.0");
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let from_number: Price = serde_json::from_str("12.5").unwrap();
        let from_string: Price = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(from_number, from_string);
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }

    #[test]
    fn test_display_two_decimals() {
        let price = Price::new(Decimal::from(7)).unwrap();
        assert_eq!(price.to_string(), "7.00");
    }
}
