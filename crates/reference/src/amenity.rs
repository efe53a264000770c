use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clubmetrics_core::{AmenityId, DomainError, DomainResult};

/// Catalog entry for an amenity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenity {
    pub amenity_id: AmenityId,
    pub name: String,
    pub category: String,
    pub is_active: bool,
}

impl Amenity {
    pub fn new(amenity_id: AmenityId, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            amenity_id,
            name: name.into(),
            category: category.into(),
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Per-amenity cost and pricing model.
///
/// Invariants (checked on construction and deserialization):
/// - every amount is `>= 0`
/// - `in_dues_flag` ⇒ `member_cost_per_use == 0`
/// - `!in_dues_flag` ⇒ `member_cost_per_use > 0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCostModel", into = "RawCostModel")]
pub struct AmenityCostModel {
    initial_build_cost: Decimal,
    monthly_fixed_cost: Decimal,
    cost_per_use: Decimal,
    in_dues_flag: bool,
    member_cost_per_use: Decimal,
}

#[derive(Serialize, Deserialize)]
struct RawCostModel {
    initial_build_cost: Decimal,
    monthly_fixed_cost: Decimal,
    cost_per_use: Decimal,
    in_dues_flag: bool,
    member_cost_per_use: Decimal,
}

impl TryFrom<RawCostModel> for AmenityCostModel {
    type Error = DomainError;

    fn try_from(raw: RawCostModel) -> Result<Self, Self::Error> {
        AmenityCostModel::new(
            raw.initial_build_cost,
            raw.monthly_fixed_cost,
            raw.cost_per_use,
            raw.in_dues_flag,
            raw.member_cost_per_use,
        )
    }
}

impl From<AmenityCostModel> for RawCostModel {
    fn from(m: AmenityCostModel) -> Self {
        Self {
            initial_build_cost: m.initial_build_cost,
            monthly_fixed_cost: m.monthly_fixed_cost,
            cost_per_use: m.cost_per_use,
            in_dues_flag: m.in_dues_flag,
            member_cost_per_use: m.member_cost_per_use,
        }
    }
}

impl AmenityCostModel {
    pub fn new(
        initial_build_cost: Decimal,
        monthly_fixed_cost: Decimal,
        cost_per_use: Decimal,
        in_dues_flag: bool,
        member_cost_per_use: Decimal,
    ) -> DomainResult<Self> {
        for (field, value) in [
            ("initial_build_cost", initial_build_cost),
            ("monthly_fixed_cost", monthly_fixed_cost),
            ("cost_per_use", cost_per_use),
            ("member_cost_per_use", member_cost_per_use),
        ] {
            if value < Decimal::ZERO {
                return Err(DomainError::validation(format!("{field} must be >= 0 (got {value})")));
            }
        }

        if in_dues_flag && !member_cost_per_use.is_zero() {
            return Err(DomainError::validation(
                "member_cost_per_use must be zero when the amenity is included in dues",
            ));
        }
        if !in_dues_flag && member_cost_per_use.is_zero() {
            return Err(DomainError::validation(
                "member_cost_per_use must be positive when the amenity is charged per use",
            ));
        }

        Ok(Self {
            initial_build_cost,
            monthly_fixed_cost,
            cost_per_use,
            in_dues_flag,
            member_cost_per_use,
        })
    }

    /// Model applied to an amenity that has no cost-model row: zero cost, included
    /// in dues. Both "treat missing as zero cost" and "treat missing as included in
    /// dues" resolve to this single value.
    pub fn absent() -> Self {
        Self {
            initial_build_cost: Decimal::ZERO,
            monthly_fixed_cost: Decimal::ZERO,
            cost_per_use: Decimal::ZERO,
            in_dues_flag: true,
            member_cost_per_use: Decimal::ZERO,
        }
    }

    pub fn initial_build_cost(&self) -> Decimal {
        self.initial_build_cost
    }

    pub fn monthly_fixed_cost(&self) -> Decimal {
        self.monthly_fixed_cost
    }

    pub fn cost_per_use(&self) -> Decimal {
        self.cost_per_use
    }

    pub fn in_dues_flag(&self) -> bool {
        self.in_dues_flag
    }

    pub fn member_cost_per_use(&self) -> Decimal {
        self.member_cost_per_use
    }
}

/// Finance-recorded actuals for one amenity-month. Each field is independent: a
/// missing field falls back to the cost model estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredActual {
    #[serde(default)]
    pub operating_cost: Option<Decimal>,
    #[serde(default)]
    pub member_spend: Option<Decimal>,
}
