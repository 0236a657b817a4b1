//! Core scalar types for the Spindle storage engine.
//!
//! Every identifier and value type uses a smart constructor so that validity
//! is established at construction time, following the "parse, don't validate"
//! principle. If an instance exists, it is valid; downstream code never
//! re-checks these invariants.

use crate::errors::StoreError;
use chrono::{DateTime, Months, NaiveDate, Utc};
use nutype::nutype;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a category row. Engine-assigned, starting at 1.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct CategoryId(u64);

/// Identifier of a product row. Engine-assigned, starting at 1.
///
/// Product ids are totally ordered; the order engine acquires row locks in
/// ascending product-id order, which is what makes multi-product orders
/// deadlock-free.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct ProductId(u64);

/// Identifier of a customer row. Engine-assigned, starting at 1.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct CustomerId(u64);

/// Identifier of an order row. Engine-assigned, starting at 1.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct OrderId(u64);

/// Identifier of an order line row. Engine-assigned, starting at 1.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct OrderLineId(u64);

/// Identifier of a sale-history fact, using UUIDv7 format.
///
/// Facts form an append-only ledger, so their ids carry a creation-time
/// component: UUIDv7 sorts in creation order.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct FactId(Uuid);

impl FactId {
    /// Creates a new `FactId` stamped with the current time.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for FactId {
    fn default() -> Self {
        Self::new()
    }
}

/// Category display name. Non-empty, at most 100 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct CategoryName(String);

/// Product display name. Non-empty, at most 100 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct ProductName(String);

/// A customer's first or last name. Non-empty, at most 100 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct PersonName(String);

/// Customer email address.
///
/// Lowercased at construction, so equality (and therefore the customer
/// store's uniqueness constraint) is case-insensitive.
#[nutype(
    sanitize(trim, lowercase),
    validate(
        not_empty,
        len_char_max = 255,
        regex = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct EmailAddress(String);

/// Opaque password hash carried on the customer record.
///
/// Hashing and verification are out of scope for the engine; the value is
/// stored and returned as-is. Deliberately no `Display` derive.
#[nutype(
    validate(not_empty),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Serialize, Deserialize, TryFrom)
)]
pub struct PasswordHash(String);

/// Order line quantity. Strictly positive, at most 1000 per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    /// Maximum quantity per order line.
    pub const MAX_PER_LINE: u32 = 1000;

    /// Creates a quantity, rejecting zero and values over [`Self::MAX_PER_LINE`].
    pub fn new(value: u32) -> Result<Self, StoreError> {
        if value == 0 {
            return Err(StoreError::Validation(
                "quantity must be greater than 0".to_string(),
            ));
        }
        if value > Self::MAX_PER_LINE {
            return Err(StoreError::Validation(format!(
                "quantity {value} exceeds maximum {}",
                Self::MAX_PER_LINE
            )));
        }
        Ok(Self(value))
    }

    /// Returns the underlying count.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current on-hand stock for a product. Zero is a valid level.
///
/// The type is unsigned, so a negative counter is unrepresentable; the
/// catalog store's `adjust_stock` is the only mutation path and rejects any
/// delta that would underflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct StockLevel(u32);

impl StockLevel {
    /// Creates a stock level.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the underlying count.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Whether this level is strictly below `threshold`.
    pub const fn is_below(self, threshold: u32) -> bool {
        self.0 < threshold
    }
}

impl std::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money amount backed by `Decimal` for exact arithmetic.
///
/// Non-negative, at most 2 decimal places. Strict positivity (prices, unit
/// prices, order totals) is enforced at the operation level, where a zero
/// amount is a validation error rather than a type error, because aggregate
/// revenue figures legitimately start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Maximum representable amount (100 million).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Creates money from a decimal amount.
    pub fn new(amount: Decimal) -> Result<Self, StoreError> {
        if amount.is_sign_negative() {
            return Err(StoreError::Validation(format!(
                "money amount cannot be negative: {amount}"
            )));
        }
        if amount.scale() > 2 {
            return Err(StoreError::Validation(format!(
                "money amount cannot have more than 2 decimal places: {amount}"
            )));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(StoreError::Validation(format!(
                "money amount {amount} exceeds maximum {}",
                Self::MAX_AMOUNT
            )));
        }
        Ok(Self(amount))
    }

    /// Creates money from a whole number of cents.
    pub fn from_cents(cents: u64) -> Result<Self, StoreError> {
        let Some(cents) = cents.to_i64() else {
            return Err(StoreError::Validation(format!(
                "cent amount {cents} out of range"
            )));
        };
        Self::new(Decimal::new(cents, 2))
    }

    /// Returns the underlying decimal amount.
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Converts to whole cents.
    pub fn to_cents(self) -> u64 {
        (self.0 * Decimal::from(100)).to_u64().unwrap_or(0)
    }

    /// Whether the amount is exactly zero.
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Adds two amounts, rejecting results outside the valid range.
    pub fn checked_add(self, other: Self) -> Result<Self, StoreError> {
        Self::new(self.0 + other.0)
    }

    /// Multiplies a unit amount by a line quantity.
    pub fn multiply_by_quantity(self, quantity: Quantity) -> Result<Self, StoreError> {
        Self::new(self.0 * Decimal::from(quantity.value()))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self(Decimal::new(0, 0))
    }
}

/// Calendar date an order was placed on.
///
/// A thin wrapper over `NaiveDate`; all analytic query windows (daily,
/// monthly, rolling prior-month) are expressed in terms of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderDate(NaiveDate);

impl OrderDate {
    /// Earliest representable date, usable as an open range bound.
    pub const MIN: Self = Self(NaiveDate::MIN);

    /// Latest representable date, usable as an open range bound.
    pub const MAX: Self = Self(NaiveDate::MAX);

    /// Creates an order date from a `NaiveDate`.
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Creates an order date from year/month/day, if the combination is a
    /// real calendar date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Returns the underlying date.
    pub const fn as_date(&self) -> &NaiveDate {
        &self.0
    }

    /// Returns the half-open `[start, end)` range covering a calendar month.
    pub fn month_of(year: i32, month: u32) -> Option<(Self, Self)> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = start.checked_add_months(Months::new(1))?;
        Some((Self(start), Self(end)))
    }

    /// The date `months` calendar months before this one, if representable.
    pub fn months_back(self, months: u32) -> Option<Self> {
        self.0.checked_sub_months(Months::new(months)).map(Self)
    }
}

impl From<NaiveDate> for OrderDate {
    fn from(date: NaiveDate) -> Self {
        Self::new(date)
    }
}

impl std::fmt::Display for OrderDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A wall-clock timestamp, used to stamp snapshot refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
