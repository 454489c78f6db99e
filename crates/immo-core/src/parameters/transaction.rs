use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ImmoError;
use crate::loan::monthly_payment;
use crate::parameters::RawParameters;
use crate::types::Money;
use crate::ImmoResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Share of the net seller price attributed to land, which is not depreciable.
pub const LAND_VALUE_SHARE: Decimal = dec!(0.15);

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Acquisition, financing and amortization-basis figures computed once per
/// simulation from [`RawParameters`]. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    /// Purchase price net of agency fees
    pub net_seller_price: Money,
    pub agency_fees: Money,
    pub notary_fees: Money,
    /// Price + notary fees + renovation + furnishing
    pub total_acquisition_cost: Money,
    pub loan_amount: Money,
    pub initial_equity: Money,
    /// Level monthly payment (principal + interest), excluding insurance
    pub monthly_payment: Money,
    pub yearly_insurance_cost: Money,
    pub land_value: Money,
    /// Depreciable share of the net seller price
    pub amortizable_property_value: Money,
    pub yearly_property_amortization: Money,
    pub yearly_furnishing_amortization: Money,
    pub yearly_renovation_amortization: Money,
    pub loan_term_months: u32,
    pub holding_period_months: u32,
}

impl DerivedParameters {
    /// Balance-sheet carrying cost of the property line (price + notary fees).
    pub fn property_cost(&self) -> Money {
        self.net_seller_price + self.agency_fees + self.notary_fees
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the transaction calculator. The input is only read; the caller keeps
/// both records side by side for the rest of the run.
pub fn calculate_transaction(raw: &RawParameters) -> ImmoResult<DerivedParameters> {
    let price = raw.property_price;

    let net_seller_price = price / (Decimal::ONE + raw.agency_fees_percentage);
    let agency_fees = price - net_seller_price;
    let notary_fees = price * raw.notary_fees_percentage;

    let total_acquisition_cost =
        price + notary_fees + raw.initial_renovation_costs + raw.furnishing_costs;

    let loan_amount = total_acquisition_cost * raw.loan_percentage;
    let initial_equity = total_acquisition_cost - loan_amount;
    let loan_term_months = raw.loan_duration_years.checked_mul(12).ok_or_else(|| {
        ImmoError::invalid("loan_duration_years", "Loan term in months overflowed")
    })?;

    let monthly_payment = monthly_payment(loan_amount, raw.loan_interest_rate, loan_term_months)?;
    let yearly_insurance_cost = loan_amount * raw.loan_insurance_rate;

    let land_value = net_seller_price * LAND_VALUE_SHARE;
    let amortizable_property_value = net_seller_price - land_value;

    Ok(DerivedParameters {
        net_seller_price,
        agency_fees,
        notary_fees,
        total_acquisition_cost,
        loan_amount,
        initial_equity,
        monthly_payment,
        yearly_insurance_cost,
        land_value,
        amortizable_property_value,
        yearly_property_amortization: straight_line(
            amortizable_property_value,
            raw.amortization_property_years,
        ),
        yearly_furnishing_amortization: straight_line(
            raw.furnishing_costs,
            raw.amortization_furnishing_years,
        ),
        yearly_renovation_amortization: straight_line(
            raw.initial_renovation_costs,
            raw.amortization_renovation_years,
        ),
        loan_term_months,
        holding_period_months: raw.holding_months(),
    })
}

fn straight_line(basis: Money, years: u32) -> Money {
    if years == 0 || basis.is_zero() {
        Decimal::ZERO
    } else {
        basis / Decimal::from(years)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
