use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ImmoError;
use crate::parameters::RawParameters;
use crate::types::{Money, Rate};
use crate::ImmoResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Holding period after which the sale is fully exempt.
pub const FULL_EXEMPTION_YEARS: u32 = 25;

/// Flat allowance for acquisition costs added to the purchase price.
const ACQUISITION_COST_ALLOWANCE: Rate = dec!(0.075);
/// Flat works allowance, only when held more than 5 years.
const WORKS_ALLOWANCE: Rate = dec!(0.15);
const WORKS_ALLOWANCE_MIN_YEARS: u32 = 5;

/// Flat income-tax rate on real-estate capital gains.
const CAPITAL_GAINS_INCOME_TAX_RATE: Rate = dec!(0.19);

const INCOME_TAX_ABATEMENT_PER_YEAR: Rate = dec!(0.06);
const SOCIAL_ABATEMENT_PER_YEAR: Rate = dec!(0.0165);
const SOCIAL_ABATEMENT_YEAR_22: Rate = dec!(0.016);
const SOCIAL_ABATEMENT_AFTER_22: Rate = dec!(0.09);

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalGainsTax {
    pub years_held: u32,
    pub purchase_price: Money,
    pub adjusted_purchase_price: Money,
    pub gross_capital_gain: Money,
    pub income_tax_abatement: Rate,
    pub social_contributions_abatement: Rate,
    pub income_tax_base: Money,
    pub social_contributions_base: Money,
    pub income_tax: Money,
    pub social_contributions: Money,
    pub total_tax: Money,
    /// Held long enough for full exemption
    pub exempt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitProceeds {
    pub exit_property_value: Money,
    pub selling_costs: Money,
    pub net_selling_price: Money,
    pub remaining_loan_balance: Money,
    pub capital_gains: CapitalGainsTax,
    /// Net selling price - remaining loan - capital-gains tax
    pub net_exit_proceeds: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Sale at the end of the holding period.
pub fn exit_proceeds(raw: &RawParameters, remaining_loan_balance: Money) -> ImmoResult<ExitProceeds> {
    let years = raw.holding_period_years;
    let appreciation = (Decimal::ONE + raw.property_value_growth_rate)
        .checked_powu(u64::from(years))
        .ok_or_else(|| {
            ImmoError::invalid(
                "property_value_growth_rate",
                "Exit value overflowed over the holding period",
            )
        })?;

    let exit_property_value = raw.property_price.checked_mul(appreciation).ok_or_else(|| {
        ImmoError::invalid(
            "property_value_growth_rate",
            "Exit property value exceeds the representable range",
        )
    })?;
    let selling_costs = exit_property_value
        .checked_mul(raw.exit_selling_fees_percentage)
        .ok_or_else(|| {
            ImmoError::invalid(
                "exit_selling_fees_percentage",
                "Selling costs exceed the representable range",
            )
        })?;
    let net_selling_price = exit_property_value - selling_costs;

    let capital_gains = capital_gains_tax(
        raw.property_price,
        net_selling_price,
        years,
        raw.social_contributions_rate,
    );

    let net_exit_proceeds = net_selling_price - remaining_loan_balance - capital_gains.total_tax;

    Ok(ExitProceeds {
        exit_property_value,
        selling_costs,
        net_selling_price,
        remaining_loan_balance,
        capital_gains,
        net_exit_proceeds,
    })
}

/// Capital-gains tax on a resale of a private residence held as an
/// investment, with holding-period abatements on both components.
pub fn capital_gains_tax(
    purchase_price: Money,
    net_selling_price: Money,
    years_held: u32,
    social_contributions_rate: Rate,
) -> CapitalGainsTax {
    if years_held >= FULL_EXEMPTION_YEARS {
        return CapitalGainsTax {
            years_held,
            purchase_price,
            adjusted_purchase_price: purchase_price,
            gross_capital_gain: (net_selling_price - purchase_price).max(Decimal::ZERO),
            income_tax_abatement: Decimal::ONE,
            social_contributions_abatement: Decimal::ONE,
            income_tax_base: Decimal::ZERO,
            social_contributions_base: Decimal::ZERO,
            income_tax: Decimal::ZERO,
            social_contributions: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            exempt: true,
        };
    }

    let mut allowance = ACQUISITION_COST_ALLOWANCE;
    if years_held > WORKS_ALLOWANCE_MIN_YEARS {
        allowance += WORKS_ALLOWANCE;
    }
    let adjusted_purchase_price = purchase_price * (Decimal::ONE + allowance);
    let gross_capital_gain = (net_selling_price - adjusted_purchase_price).max(Decimal::ZERO);

    let income_tax_abatement = income_tax_abatement(years_held);
    let social_contributions_abatement = social_contributions_abatement(years_held);

    let income_tax_base = gross_capital_gain * (Decimal::ONE - income_tax_abatement);
    let social_contributions_base = gross_capital_gain * (Decimal::ONE - social_contributions_abatement);

    let income_tax = income_tax_base * CAPITAL_GAINS_INCOME_TAX_RATE;
    let social_contributions = social_contributions_base * social_contributions_rate;

    CapitalGainsTax {
        years_held,
        purchase_price,
        adjusted_purchase_price,
        gross_capital_gain,
        income_tax_abatement,
        social_contributions_abatement,
        income_tax_base,
        social_contributions_base,
        income_tax,
        social_contributions,
        total_tax: income_tax + social_contributions,
        exempt: false,
    }
}

/// 6% per year of holding from year 6 to 21, full exemption from year 22.
pub fn income_tax_abatement(years_held: u32) -> Rate {
    match years_held {
        0..=5 => Decimal::ZERO,
        6..=21 => Decimal::from(years_held - 5) * INCOME_TAX_ABATEMENT_PER_YEAR,
        _ => Decimal::ONE,
    }
}

/// 1.65% per year from year 6 to 21, 1.60% for year 22, then 9% per year.
/// Reaches full exemption at year 25.
pub fn social_contributions_abatement(years_held: u32) -> Rate {
    let through_year_21 = dec!(16) * SOCIAL_ABATEMENT_PER_YEAR;
    match years_held {
        0..=5 => Decimal::ZERO,
        6..=21 => Decimal::from(years_held - 5) * SOCIAL_ABATEMENT_PER_YEAR,
        22 => through_year_21 + SOCIAL_ABATEMENT_YEAR_22,
        23 | 24 => {
            through_year_21
                + SOCIAL_ABATEMENT_YEAR_22
                + Decimal::from(years_held - 22) * SOCIAL_ABATEMENT_AFTER_22
        }
        _ => Decimal::ONE,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abatement_schedules() {
        assert_eq!(income_tax_abatement(5), Decimal::ZERO);
        assert_eq!(income_tax_abatement(6), dec!(0.06));
        assert_eq!(income_tax_abatement(21), dec!(0.96));
        assert_eq!(income_tax_abatement(22), Decimal::ONE);

        assert_eq!(social_contributions_abatement(5), Decimal::ZERO);
        assert_eq!(social_contributions_abatement(10), dec!(0.0825));
        assert_eq!(social_contributions_abatement(21), dec!(0.264));
        assert_eq!(social_contributions_abatement(22), dec!(0.28));
        assert_eq!(social_contributions_abatement(23), dec!(0.37));
        assert_eq!(social_contributions_abatement(24), dec!(0.46));
        assert_eq!(social_contributions_abatement(30), Decimal::ONE);
    }

    #[test]
    fn test_short_hold_no_works_allowance() {
        let tax = capital_gains_tax(dec!(200000), dec!(250000), 4, dec!(0.172));
        assert_eq!(tax.adjusted_purchase_price, dec!(215000));
        assert_eq!(tax.gross_capital_gain, dec!(35000));
        assert_eq!(tax.income_tax, dec!(6650));
        assert_eq!(tax.social_contributions, dec!(6020));
        assert_eq!(tax.total_tax, dec!(12670));
        assert!(!tax.exempt);
    }

    #[test]
    fn test_ten_year_hold() {
        let tax = capital_gains_tax(dec!(200000), dec!(300000), 10, dec!(0.172));
        // 200000 * 1.225
        assert_eq!(tax.adjusted_purchase_price, dec!(245000));
        assert_eq!(tax.gross_capital_gain, dec!(55000));
        assert_eq!(tax.income_tax_base, dec!(55000) * dec!(0.70));
        assert_eq!(tax.social_contributions_base, dec!(55000) * dec!(0.9175));
    }

    #[test]
    fn test_loss_is_untaxed() {
        let tax = capital_gains_tax(dec!(200000), dec!(190000), 8, dec!(0.172));
        assert_eq!(tax.gross_capital_gain, Decimal::ZERO);
        assert_eq!(tax.total_tax, Decimal::ZERO);
    }

    #[test]
    fn test_full_exemption_at_25_years() {
        for years in [25, 26, 40] {
            let tax = capital_gains_tax(dec!(100000), dec!(900000), years, dec!(0.172));
            assert!(tax.exempt);
            assert_eq!(tax.total_tax, Decimal::ZERO);
            assert_eq!(tax.gross_capital_gain, dec!(800000));
        }
        let tax = capital_gains_tax(dec!(100000), dec!(900000), 24, dec!(0.172));
        assert!(!tax.exempt);
        assert!(tax.total_tax > Decimal::ZERO);
    }

    #[test]
    fn test_exit_proceeds() {
        let raw = RawParameters {
            property_price: dec!(200000),
            holding_period_years: 10,
            property_value_growth_rate: dec!(0.02),
            exit_selling_fees_percentage: dec!(0.05),
            ..Default::default()
        };
        let exit = exit_proceeds(&raw, dec!(120000)).unwrap();
        let expected_value = dec!(200000) * dec!(1.02).powu(10);
        assert_eq!(exit.exit_property_value, expected_value);
        assert_eq!(exit.selling_costs, expected_value * dec!(0.05));
        assert_eq!(
            exit.net_exit_proceeds,
            exit.net_selling_price - dec!(120000) - exit.capital_gains.total_tax
        );
    }

    #[test]
    fn test_exit_value_out_of_range_is_an_error() {
        // 10^24 fits, 200000 x 10^24 does not
        let raw = RawParameters {
            property_price: dec!(200000),
            holding_period_years: 24,
            property_value_growth_rate: dec!(9),
            ..Default::default()
        };
        let err = exit_proceeds(&raw, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, ImmoError::InvalidConfiguration { .. }));
    }
}
