//! Type-safe price representation using decimal arithmetic.
//!
//! All catalog and order amounts are Indian rupees with two decimal places.
//! Amounts are kept in [`Decimal`] so that order totals are exact sums of the
//! line amounts, with no floating point drift.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Decimal places kept for currency amounts.
const CURRENCY_SCALE: u32 = 2;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price must be at least 0 (got {0})")]
    Negative(Decimal),
    /// The amount is above [`Price::MAX`].
    #[error("price must be at most {max} (got {0})", max = Price::MAX)]
    TooLarge(Decimal),
    /// A line total or sum went past [`Price::MAX`].
    #[error("amount is too large")]
    Overflow,
}

/// A non-negative rupee amount rounded to currency precision, no larger
/// than the `NUMERIC(12, 2)` columns it is stored in.
///
/// Serialized as a JSON number so the storefront client can do arithmetic on
/// it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// ₹9,999,999,999.99, the largest `NUMERIC(12, 2)` value.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, CURRENCY_SCALE));

    /// Create a price, rounding to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero.
    /// Returns `PriceError::TooLarge` if it rounds to more than [`Self::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount < Decimal::ZERO {
            return Err(PriceError::Negative(amount));
        }
        let rounded =
            amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        if rounded > Self::MAX.0 {
            return Err(PriceError::TooLarge(amount));
        }
        Ok(Self(rounded))
    }

    fn bounded(amount: Option<Decimal>) -> Result<Self, PriceError> {
        amount
            .filter(|a| *a <= Self::MAX.0)
            .map(Self)
            .ok_or(PriceError::Overflow)
    }

    /// Create a price from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: u32) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units at this price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the total exceeds [`Self::MAX`].
    pub fn times(self, quantity: u32) -> Result<Self, PriceError> {
        Self::bounded(self.0.checked_mul(Decimal::from(quantity)))
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum exceeds [`Self::MAX`].
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        Self::bounded(self.0.checked_add(other.0))
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

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

// SQLx support (with postgres feature): stored as NUMERIC(12, 2)
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
