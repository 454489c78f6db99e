use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ImmoError;
use crate::types::{Money, Rate};
use crate::ImmoResult;

/// Upper bound on every duration field (holding, loan term, amortization).
pub const MAX_YEARS: u32 = 100;

// ---------------------------------------------------------------------------
// Lease types
// ---------------------------------------------------------------------------

/// Rental structure driving the revenue and vacancy model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeaseType {
    /// Short-stay, nightly-rate letting (occupancy and seasonality driven)
    #[serde(rename = "airbnb", alias = "nightly")]
    Nightly,
    /// Furnished fixed-term lease (1 year)
    #[serde(rename = "furnished_1yr")]
    Furnished,
    /// Unfurnished fixed-term lease (3 years)
    #[serde(rename = "unfurnished_3yr")]
    Unfurnished,
}

impl LeaseType {
    pub const ALL: [LeaseType; 3] = [LeaseType::Nightly, LeaseType::Furnished, LeaseType::Unfurnished];

    pub fn tag(self) -> &'static str {
        match self {
            LeaseType::Nightly => "airbnb",
            LeaseType::Furnished => "furnished_1yr",
            LeaseType::Unfurnished => "unfurnished_3yr",
        }
    }

    pub fn is_furnished(self) -> bool {
        !matches!(self, LeaseType::Unfurnished)
    }
}

impl fmt::Display for LeaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for LeaseType {
    type Err = ImmoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "airbnb" | "nightly" => Ok(LeaseType::Nightly),
            "furnished_1yr" | "furnished" => Ok(LeaseType::Furnished),
            "unfurnished_3yr" | "unfurnished" => Ok(LeaseType::Unfurnished),
            other => Err(ImmoError::invalid(
                "lease_type",
                format!("unknown lease type '{other}' (expected airbnb, furnished_1yr or unfurnished_3yr)"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Fiscal regimes
// ---------------------------------------------------------------------------

/// Tax-basis method applied to rental income.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalRegime {
    /// Flat-rate furnished (statutory abatement on revenue)
    #[serde(alias = "Micro-BIC")]
    MicroBic,
    /// Flat-rate unfurnished (statutory abatement on revenue)
    #[serde(alias = "Micro-Foncier")]
    MicroFoncier,
    /// Real-cost furnished: expenses and capped depreciation deductible
    #[default]
    #[serde(alias = "LMNP Réel", alias = "LMNP Reel")]
    LmnpReel,
    /// Real-cost unfurnished: expenses deductible, no fiscal depreciation
    #[serde(alias = "Revenu Foncier", alias = "Foncier Réel")]
    FoncierReel,
}

impl FiscalRegime {
    pub fn is_flat_rate(self) -> bool {
        matches!(self, FiscalRegime::MicroBic | FiscalRegime::MicroFoncier)
    }

    /// Whether accounting depreciation is booked in the P&L.
    pub fn books_depreciation(self) -> bool {
        !self.is_flat_rate()
    }

    /// Whether depreciation may reduce the fiscal base.
    pub fn deducts_depreciation(self) -> bool {
        matches!(self, FiscalRegime::LmnpReel)
    }

    pub fn is_furnished_regime(self) -> bool {
        matches!(self, FiscalRegime::MicroBic | FiscalRegime::LmnpReel)
    }

    /// Statutory abatement applied to realized revenue under a flat-rate regime.
    ///
    /// The rate follows the lease actually operated, whichever flat-rate
    /// regime was selected; a regime/lease mismatch is only warned about.
    pub fn flat_rate_abatement(self, lease: LeaseType) -> Option<Rate> {
        if !self.is_flat_rate() {
            return None;
        }
        Some(match lease {
            LeaseType::Nightly => dec!(0.71),
            LeaseType::Furnished => dec!(0.50),
            LeaseType::Unfurnished => dec!(0.30),
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            FiscalRegime::MicroBic => "Micro-BIC",
            FiscalRegime::MicroFoncier => "Micro-Foncier",
            FiscalRegime::LmnpReel => "LMNP Réel",
            FiscalRegime::FoncierReel => "Revenu Foncier Réel",
        }
    }
}

// ---------------------------------------------------------------------------
// Rental assumptions
// ---------------------------------------------------------------------------

/// Per-lease-type revenue assumptions. Missing sub-fields default to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RentalAssumption {
    /// Nightly rate (nightly variant)
    pub daily_rate: Money,
    /// Share of nights booked (nightly variant)
    pub occupancy_rate: Rate,
    /// Monthly rent per square metre (fixed-term variants)
    pub monthly_rent_sqm: Money,
    /// Annual vacancy rate (fixed-term variants)
    pub vacancy_rate: Rate,
    /// Annual rent growth
    pub rent_growth_rate: Rate,
    /// Twelve month-of-year revenue multipliers, January first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_seasonality: Option<Vec<Decimal>>,
}

impl RentalAssumption {
    /// Seasonality multiplier for a 1-based month of year; flat when unset.
    pub fn seasonality_factor(&self, month_of_year: usize) -> Decimal {
        self.monthly_seasonality
            .as_ref()
            .and_then(|factors| factors.get(month_of_year.saturating_sub(1)).copied())
            .unwrap_or(Decimal::ONE)
    }
}

fn default_rental_assumptions() -> BTreeMap<String, RentalAssumption> {
    let mut map = BTreeMap::new();
    map.insert(
        LeaseType::Nightly.tag().to_string(),
        RentalAssumption {
            occupancy_rate: dec!(0.70),
            rent_growth_rate: dec!(0.02),
            monthly_seasonality: Some(vec![
                dec!(0.8),
                dec!(0.8),
                dec!(0.9),
                dec!(1.0),
                dec!(1.1),
                dec!(1.2),
                dec!(1.3),
                dec!(1.2),
                dec!(1.0),
                dec!(0.9),
                dec!(0.8),
                dec!(0.8),
            ]),
            ..Default::default()
        },
    );
    map.insert(
        LeaseType::Furnished.tag().to_string(),
        RentalAssumption {
            vacancy_rate: dec!(0.08),
            rent_growth_rate: dec!(0.015),
            ..Default::default()
        },
    );
    map.insert(
        LeaseType::Unfurnished.tag().to_string(),
        RentalAssumption {
            vacancy_rate: dec!(0.04),
            rent_growth_rate: dec!(0.015),
            ..Default::default()
        },
    );
    map
}

fn default_management_fees() -> BTreeMap<String, Rate> {
    let mut map = BTreeMap::new();
    map.insert(LeaseType::Nightly.tag().to_string(), dec!(0.20));
    map.insert(LeaseType::Furnished.tag().to_string(), dec!(0.07));
    map.insert(LeaseType::Unfurnished.tag().to_string(), dec!(0.07));
    map
}

// ---------------------------------------------------------------------------
// Raw parameters
// ---------------------------------------------------------------------------

/// User inputs for one simulation. Never mutated by the model; computed
/// figures live in [`DerivedParameters`](super::DerivedParameters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParameters {
    // --- Acquisition ---
    /// Purchase price including agency fees
    pub property_price: Money,
    /// Agency fee as a share of the net seller price
    pub agency_fees_percentage: Rate,
    /// Notary fees as a share of the purchase price
    pub notary_fees_percentage: Rate,
    pub property_size_sqm: Decimal,
    pub initial_renovation_costs: Money,
    pub furnishing_costs: Money,

    // --- Financing ---
    /// Share of total acquisition cost financed by the loan
    pub loan_percentage: Rate,
    /// Nominal annual rate
    pub loan_interest_rate: Rate,
    pub loan_duration_years: u32,
    /// Yearly borrower insurance rate on the initial principal
    pub loan_insurance_rate: Rate,

    // --- Rental income ---
    pub rental_assumptions: BTreeMap<String, RentalAssumption>,

    // --- Operating expenses ---
    pub property_tax_yearly: Money,
    pub condo_fees_monthly: Money,
    pub pno_insurance_yearly: Money,
    /// Maintenance as a share of realized revenue
    pub maintenance_percentage_rent: Rate,
    /// Management fees as a share of realized revenue, per lease type
    pub management_fees_percentage_rent: BTreeMap<String, Rate>,
    /// Platform and cleaning fees, nightly variant only
    pub platform_fees_percentage_rent: Rate,
    pub expenses_growth_rate: Rate,

    // --- Fiscal ---
    pub fiscal_regime: FiscalRegime,
    pub amortization_property_years: u32,
    pub amortization_furnishing_years: u32,
    pub amortization_renovation_years: u32,
    pub personal_income_tax_bracket: Rate,
    pub social_contributions_rate: Rate,

    // --- Exit ---
    pub holding_period_years: u32,
    pub property_value_growth_rate: Rate,
    pub exit_selling_fees_percentage: Rate,
    /// Annual discount rate used for NPV
    pub discount_rate: Rate,
}

impl Default for RawParameters {
    fn default() -> Self {
        RawParameters {
            property_price: Decimal::ZERO,
            agency_fees_percentage: Decimal::ZERO,
            notary_fees_percentage: dec!(0.08),
            property_size_sqm: Decimal::ONE,
            initial_renovation_costs: Decimal::ZERO,
            furnishing_costs: Decimal::ZERO,
            loan_percentage: Decimal::ONE,
            loan_interest_rate: dec!(0.04),
            loan_duration_years: 20,
            loan_insurance_rate: dec!(0.003),
            rental_assumptions: default_rental_assumptions(),
            property_tax_yearly: Decimal::ZERO,
            condo_fees_monthly: Decimal::ZERO,
            pno_insurance_yearly: Decimal::ZERO,
            maintenance_percentage_rent: dec!(0.05),
            management_fees_percentage_rent: default_management_fees(),
            platform_fees_percentage_rent: dec!(0.15),
            expenses_growth_rate: dec!(0.02),
            fiscal_regime: FiscalRegime::default(),
            amortization_property_years: 30,
            amortization_furnishing_years: 7,
            amortization_renovation_years: 7,
            personal_income_tax_bracket: dec!(0.30),
            social_contributions_rate: dec!(0.172),
            holding_period_years: 10,
            property_value_growth_rate: dec!(0.02),
            exit_selling_fees_percentage: dec!(0.05),
            discount_rate: dec!(0.05),
        }
    }
}

impl RawParameters {
    /// Parse a JSON parameters document.
    pub fn from_json(json: &str) -> ImmoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn holding_months(&self) -> u32 {
        self.holding_period_years.saturating_mul(12)
    }

    /// Rental assumptions for the selected lease type.
    pub fn lease_assumption(&self, lease: LeaseType) -> ImmoResult<&RentalAssumption> {
        self.rental_assumptions.get(lease.tag()).ok_or_else(|| {
            ImmoError::invalid(
                "rental_assumptions",
                format!("no rental assumptions for lease type '{lease}'"),
            )
        })
    }

    /// Management fee rate for a lease type; zero when not configured.
    pub fn management_fee_rate(&self, lease: LeaseType) -> Rate {
        self.management_fees_percentage_rent
            .get(lease.tag())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Reject configurations that cannot be simulated. Returns non-fatal
    /// warnings for combinations that run but are likely mistakes.
    pub fn validate(&self, lease: LeaseType) -> ImmoResult<Vec<String>> {
        let mut warnings = Vec::new();

        for key in self.rental_assumptions.keys() {
            key.parse::<LeaseType>().map_err(|_| {
                ImmoError::invalid(
                    format!("rental_assumptions.{key}"),
                    "unrecognized lease type key",
                )
            })?;
        }
        for key in self.management_fees_percentage_rent.keys() {
            key.parse::<LeaseType>().map_err(|_| {
                ImmoError::invalid(
                    format!("management_fees_percentage_rent.{key}"),
                    "unrecognized lease type key",
                )
            })?;
        }

        validate_non_negative("property_price", self.property_price)?;
        validate_non_negative("agency_fees_percentage", self.agency_fees_percentage)?;
        validate_non_negative("notary_fees_percentage", self.notary_fees_percentage)?;
        validate_non_negative("initial_renovation_costs", self.initial_renovation_costs)?;
        validate_non_negative("furnishing_costs", self.furnishing_costs)?;
        if self.property_size_sqm <= Decimal::ZERO {
            return Err(ImmoError::invalid(
                "property_size_sqm",
                format!("Size must be positive, got {}", self.property_size_sqm),
            ));
        }

        validate_fraction("loan_percentage", self.loan_percentage)?;
        validate_non_negative("loan_interest_rate", self.loan_interest_rate)?;
        validate_non_negative("loan_insurance_rate", self.loan_insurance_rate)?;

        validate_non_negative("property_tax_yearly", self.property_tax_yearly)?;
        validate_non_negative("condo_fees_monthly", self.condo_fees_monthly)?;
        validate_non_negative("pno_insurance_yearly", self.pno_insurance_yearly)?;
        validate_non_negative("maintenance_percentage_rent", self.maintenance_percentage_rent)?;
        validate_non_negative("platform_fees_percentage_rent", self.platform_fees_percentage_rent)?;
        for (key, rate) in &self.management_fees_percentage_rent {
            validate_non_negative(&format!("management_fees_percentage_rent.{key}"), *rate)?;
        }
        validate_growth("expenses_growth_rate", self.expenses_growth_rate)?;

        validate_fraction("personal_income_tax_bracket", self.personal_income_tax_bracket)?;
        validate_fraction("social_contributions_rate", self.social_contributions_rate)?;

        if self.holding_period_years == 0 {
            return Err(ImmoError::invalid(
                "holding_period_years",
                "Holding period must be at least one year",
            ));
        }
        validate_years("holding_period_years", self.holding_period_years)?;
        validate_years("loan_duration_years", self.loan_duration_years)?;
        validate_years("amortization_property_years", self.amortization_property_years)?;
        validate_years("amortization_furnishing_years", self.amortization_furnishing_years)?;
        validate_years("amortization_renovation_years", self.amortization_renovation_years)?;
        validate_growth("property_value_growth_rate", self.property_value_growth_rate)?;
        validate_fraction("exit_selling_fees_percentage", self.exit_selling_fees_percentage)?;
        validate_growth("discount_rate", self.discount_rate)?;

        for (key, assumption) in &self.rental_assumptions {
            validate_assumption(key, assumption)?;
        }
        self.lease_assumption(lease)?;

        if lease.is_furnished() != self.fiscal_regime.is_furnished_regime() {
            warnings.push(format!(
                "Fiscal regime {} is normally not available for lease type '{}'",
                self.fiscal_regime.label(),
                lease
            ));
        }
        if lease == LeaseType::Unfurnished && self.furnishing_costs > Decimal::ZERO {
            warnings.push(format!(
                "Furnishing costs of {} budgeted for an unfurnished lease",
                self.furnishing_costs
            ));
        }
        if self.loan_duration_years > self.holding_period_years && self.loan_percentage > Decimal::ZERO {
            warnings.push(format!(
                "Loan term ({} years) exceeds holding period ({} years); the balance is repaid from exit proceeds",
                self.loan_duration_years, self.holding_period_years
            ));
        }

        Ok(warnings)
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_assumption(key: &str, assumption: &RentalAssumption) -> ImmoResult<()> {
    validate_non_negative(&format!("rental_assumptions.{key}.daily_rate"), assumption.daily_rate)?;
    validate_fraction(&format!("rental_assumptions.{key}.occupancy_rate"), assumption.occupancy_rate)?;
    validate_non_negative(
        &format!("rental_assumptions.{key}.monthly_rent_sqm"),
        assumption.monthly_rent_sqm,
    )?;
    validate_fraction(&format!("rental_assumptions.{key}.vacancy_rate"), assumption.vacancy_rate)?;
    validate_growth(
        &format!("rental_assumptions.{key}.rent_growth_rate"),
        assumption.rent_growth_rate,
    )?;

    if let Some(factors) = &assumption.monthly_seasonality {
        if factors.len() != 12 {
            return Err(ImmoError::invalid(
                format!("rental_assumptions.{key}.monthly_seasonality"),
                format!("Expected 12 monthly factors, got {}", factors.len()),
            ));
        }
        for factor in factors {
            validate_non_negative(&format!("rental_assumptions.{key}.monthly_seasonality"), *factor)?;
        }
    }
    Ok(())
}

fn validate_non_negative(field: &str, value: Decimal) -> ImmoResult<()> {
    if value < Decimal::ZERO {
        return Err(ImmoError::invalid(
            field,
            format!("Value must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

fn validate_fraction(field: &str, value: Rate) -> ImmoResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ImmoError::invalid(
            field,
            format!("Rate must be between 0 and 1, got {value}"),
        ));
    }
    Ok(())
}

fn validate_years(field: &str, years: u32) -> ImmoResult<()> {
    if years > MAX_YEARS {
        return Err(ImmoError::invalid(
            field,
            format!("At most {MAX_YEARS} years supported, got {years}"),
        ));
    }
    Ok(())
}

fn validate_growth(field: &str, value: Rate) -> ImmoResult<()> {
    if value <= dec!(-1) {
        return Err(ImmoError::invalid(
            field,
            format!("Growth rate must be greater than -100%, got {value}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
