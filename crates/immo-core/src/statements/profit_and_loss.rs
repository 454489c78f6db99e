use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ImmoError;
use crate::loan::LoanSchedule;
use crate::parameters::{DerivedParameters, FiscalRegime, LeaseType, RawParameters, RentalAssumption};
use crate::types::{calendar_position, MonthIndex, Money, Rate};
use crate::ImmoResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Calendar days per month (non-leap year), January first.
const DAYS_IN_MONTH: [Decimal; 12] = [
    dec!(31),
    dec!(28),
    dec!(31),
    dec!(30),
    dec!(31),
    dec!(30),
    dec!(31),
    dec!(31),
    dec!(30),
    dec!(31),
    dec!(30),
    dec!(31),
];

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One month of the profit & loss statement.
///
/// `depreciation` is the accounting charge and flows into `net_income` in
/// full. `allowable_depreciation` is the part admitted against the fiscal
/// base; the two differ whenever the charge exceeds the pre-depreciation
/// surplus or the regime admits none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLossRow {
    pub month: MonthIndex,
    pub year: u32,

    // Revenue
    pub gross_potential_revenue: Money,
    pub vacancy_loss: Money,
    pub revenue: Money,

    // Operating expenses
    pub property_tax: Money,
    pub condo_fees: Money,
    pub pno_insurance: Money,
    pub maintenance: Money,
    pub management_fees: Money,
    pub platform_fees: Money,
    pub total_operating_expenses: Money,
    pub net_operating_income: Money,

    // Financing
    pub loan_interest: Money,
    pub loan_insurance: Money,
    pub financing_expense: Money,

    // Depreciation
    pub depreciation_property: Money,
    pub depreciation_furnishing: Money,
    pub depreciation_renovation: Money,
    pub depreciation: Money,
    pub allowable_depreciation: Money,

    // Tax
    pub taxable_income: Money,
    pub income_tax: Money,
    pub social_contributions: Money,
    pub total_taxes: Money,

    pub net_income: Money,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Generate the monthly P&L over the holding period for one lease type.
pub fn generate_profit_and_loss(
    raw: &RawParameters,
    derived: &DerivedParameters,
    schedule: &LoanSchedule,
    lease: LeaseType,
) -> ImmoResult<Vec<ProfitAndLossRow>> {
    let assumption = raw.lease_assumption(lease)?;
    let regime = raw.fiscal_regime;
    let n_months = derived.holding_period_months;
    let n_years = raw.holding_period_years;

    let rent_growth = growth_factors(
        "rent_growth_rate",
        assumption.rent_growth_rate,
        n_years,
    )?;
    let expense_growth = growth_factors("expenses_growth_rate", raw.expenses_growth_rate, n_years)?;
    let management_rate = raw.management_fee_rate(lease);
    let platform_rate = if lease == LeaseType::Nightly {
        raw.platform_fees_percentage_rent
    } else {
        Decimal::ZERO
    };

    let mut rows = Vec::with_capacity(n_months as usize);

    for month in 1..=n_months {
        let (month_of_year, year) = calendar_position(month);
        let year_idx = (year - 1) as usize;

        // Revenue
        let (gross_potential_revenue, vacancy_loss, revenue) = monthly_revenue(
            raw,
            assumption,
            lease,
            month_of_year,
            rent_growth[year_idx],
        );

        // Operating expenses
        let inflation = expense_growth[year_idx];
        let property_tax = raw.property_tax_yearly / MONTHS_PER_YEAR * inflation;
        let pno_insurance = raw.pno_insurance_yearly / MONTHS_PER_YEAR * inflation;
        let condo_fees = raw.condo_fees_monthly * inflation;
        let maintenance = revenue * raw.maintenance_percentage_rent;
        let management_fees = revenue * management_rate;
        let platform_fees = revenue * platform_rate;

        let total_operating_expenses =
            property_tax + condo_fees + pno_insurance + maintenance + management_fees + platform_fees;
        let net_operating_income = revenue - total_operating_expenses;

        // Financing
        let loan_interest = schedule.interest(month);
        let loan_insurance = if month <= derived.loan_term_months {
            derived.yearly_insurance_cost / MONTHS_PER_YEAR
        } else {
            Decimal::ZERO
        };
        let financing_expense = loan_interest + loan_insurance;

        // Depreciation
        let (depreciation_property, depreciation_furnishing, depreciation_renovation) =
            if regime.books_depreciation() {
                (
                    monthly_depreciation(
                        derived.yearly_property_amortization,
                        year,
                        raw.amortization_property_years,
                    ),
                    monthly_depreciation(
                        derived.yearly_furnishing_amortization,
                        year,
                        raw.amortization_furnishing_years,
                    ),
                    monthly_depreciation(
                        derived.yearly_renovation_amortization,
                        year,
                        raw.amortization_renovation_years,
                    ),
                )
            } else {
                (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
            };
        let depreciation = depreciation_property + depreciation_furnishing + depreciation_renovation;

        // Tax
        let (taxable_income, allowable_depreciation) = fiscal_base(
            regime,
            lease,
            revenue,
            net_operating_income,
            financing_expense,
            depreciation,
        );
        let tax_base = taxable_income.max(Decimal::ZERO);
        let income_tax = tax_base * raw.personal_income_tax_bracket;
        let social_contributions = tax_base * raw.social_contributions_rate;
        let total_taxes = income_tax + social_contributions;

        let net_income = net_operating_income - financing_expense - depreciation - total_taxes;

        rows.push(ProfitAndLossRow {
            month,
            year,
            gross_potential_revenue,
            vacancy_loss,
            revenue,
            property_tax,
            condo_fees,
            pno_insurance,
            maintenance,
            management_fees,
            platform_fees,
            total_operating_expenses,
            net_operating_income,
            loan_interest,
            loan_insurance,
            financing_expense,
            depreciation_property,
            depreciation_furnishing,
            depreciation_renovation,
            depreciation,
            allowable_depreciation,
            taxable_income,
            income_tax,
            social_contributions,
            total_taxes,
            net_income,
        });
    }

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns (gross potential, vacancy loss, realized revenue).
fn monthly_revenue(
    raw: &RawParameters,
    assumption: &RentalAssumption,
    lease: LeaseType,
    month_of_year: usize,
    growth: Decimal,
) -> (Money, Money, Money) {
    match lease {
        LeaseType::Nightly => {
            let potential = assumption.daily_rate * growth * DAYS_IN_MONTH[month_of_year - 1];
            let realized = potential
                * assumption.occupancy_rate
                * assumption.seasonality_factor(month_of_year);
            // Vacancy is carried by the occupancy rate
            (potential, Decimal::ZERO, realized)
        }
        LeaseType::Furnished | LeaseType::Unfurnished => {
            let potential = assumption.monthly_rent_sqm * raw.property_size_sqm * growth;
            let vacancy = potential * assumption.vacancy_rate / MONTHS_PER_YEAR;
            (potential, vacancy, potential - vacancy)
        }
    }
}

/// Compounding factor (1 + g)^(year - 1) for each holding year.
fn growth_factors(field: &str, rate: Rate, years: u32) -> ImmoResult<Vec<Decimal>> {
    let base = Decimal::ONE + rate;
    (0..years)
        .map(|elapsed| {
            base.checked_powu(u64::from(elapsed)).ok_or_else(|| {
                ImmoError::invalid(field, format!("Growth factor overflowed in year {}", elapsed + 1))
            })
        })
        .collect()
}

/// Straight-line monthly charge while `year` is within the amortization period.
fn monthly_depreciation(yearly: Money, year: u32, period_years: u32) -> Money {
    if year <= period_years {
        yearly / MONTHS_PER_YEAR
    } else {
        Decimal::ZERO
    }
}

/// Returns (taxable income, allowable depreciation) for the regime.
fn fiscal_base(
    regime: FiscalRegime,
    lease: LeaseType,
    revenue: Money,
    net_operating_income: Money,
    financing_expense: Money,
    depreciation: Money,
) -> (Money, Money) {
    if let Some(abatement) = regime.flat_rate_abatement(lease) {
        return (revenue * (Decimal::ONE - abatement), Decimal::ZERO);
    }

    let pre_depreciation = net_operating_income - financing_expense;
    if regime.deducts_depreciation() {
        // Depreciation can bring the base to zero but never below it
        let allowable = depreciation.min(pre_depreciation.max(Decimal::ZERO));
        (pre_depreciation - allowable, allowable)
    } else {
        (pre_depreciation, Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::generate_schedule;
    use crate::parameters::calculate_transaction;
    use std::collections::BTreeMap;

    fn sample_input() -> RawParameters {
        let mut rental = BTreeMap::new();
        rental.insert(
            "airbnb".to_string(),
            RentalAssumption {
                daily_rate: dec!(80),
                occupancy_rate: dec!(0.7),
                rent_growth_rate: dec!(0.02),
                monthly_seasonality: Some(vec![dec!(0.8); 12]),
                ..Default::default()
            },
        );
        rental.insert(
            "furnished_1yr".to_string(),
            RentalAssumption {
                monthly_rent_sqm: dec!(25),
                vacancy_rate: dec!(0.08),
                rent_growth_rate: dec!(0.015),
                ..Default::default()
            },
        );
        rental.insert(
            "unfurnished_3yr".to_string(),
            RentalAssumption {
                monthly_rent_sqm: dec!(20),
                vacancy_rate: dec!(0.04),
                rent_growth_rate: dec!(0.015),
                ..Default::default()
            },
        );
        RawParameters {
            property_price: dec!(200000),
            property_size_sqm: dec!(50),
            loan_percentage: dec!(0.9),
            initial_renovation_costs: dec!(10000),
            furnishing_costs: dec!(5000),
            rental_assumptions: rental,
            property_tax_yearly: dec!(800),
            condo_fees_monthly: dec!(100),
            pno_insurance_yearly: dec!(150),
            fiscal_regime: FiscalRegime::LmnpReel,
            ..Default::default()
        }
    }

    fn run(raw: &RawParameters, lease: LeaseType) -> Vec<ProfitAndLossRow> {
        let derived = calculate_transaction(raw).unwrap();
        let schedule = generate_schedule(
            derived.loan_amount,
            raw.loan_interest_rate,
            derived.loan_term_months,
        )
        .unwrap();
        generate_profit_and_loss(raw, &derived, &schedule, lease).unwrap()
    }

    #[test]
    fn test_fixed_term_revenue() {
        let rows = run(&sample_input(), LeaseType::Furnished);
        assert_eq!(rows.len(), 120);
        let first = &rows[0];
        assert_eq!(first.gross_potential_revenue, dec!(1250));
        assert_eq!(first.vacancy_loss, dec!(1250) * dec!(0.08) / dec!(12));
        assert_eq!(first.revenue, first.gross_potential_revenue - first.vacancy_loss);
        // Year 2 rent grows by 1.5%
        assert_eq!(rows[12].gross_potential_revenue, dec!(1250) * dec!(1.015));
        assert_eq!(rows[12].year, 2);
    }

    #[test]
    fn test_nightly_revenue_uses_days_and_seasonality() {
        let rows = run(&sample_input(), LeaseType::Nightly);
        // January: 80 * 31 nights
        assert_eq!(rows[0].gross_potential_revenue, dec!(2480));
        assert_eq!(rows[0].revenue, dec!(2480) * dec!(0.7) * dec!(0.8));
        // February has 28 nights
        assert_eq!(rows[1].gross_potential_revenue, dec!(2240));
        assert_eq!(rows[0].vacancy_loss, Decimal::ZERO);
        assert!(rows[0].platform_fees > Decimal::ZERO);
    }

    #[test]
    fn test_platform_fees_only_for_nightly() {
        let rows = run(&sample_input(), LeaseType::Furnished);
        assert!(rows.iter().all(|r| r.platform_fees.is_zero()));
    }

    #[test]
    fn test_opex_tracks_revenue_and_inflation() {
        let rows = run(&sample_input(), LeaseType::Furnished);
        let first = &rows[0];
        assert_eq!(first.maintenance, first.revenue * dec!(0.05));
        assert_eq!(first.management_fees, first.revenue * dec!(0.07));
        assert_eq!(first.condo_fees, dec!(100));
        assert_eq!(rows[12].condo_fees, dec!(102));
        assert_eq!(first.property_tax, dec!(800) / dec!(12));
    }

    #[test]
    fn test_financing_expense_includes_insurance() {
        let rows = run(&sample_input(), LeaseType::Furnished);
        let first = &rows[0];
        assert_eq!(first.loan_interest, dec!(207900) * (dec!(0.04) / dec!(12)));
        assert_eq!(first.loan_insurance, dec!(623.7) / dec!(12));
        assert_eq!(first.financing_expense, first.loan_interest + first.loan_insurance);
    }

    #[test]
    fn test_insurance_stops_after_term() {
        let raw = RawParameters {
            loan_duration_years: 5,
            ..sample_input()
        };
        let rows = run(&raw, LeaseType::Furnished);
        assert!(rows[59].loan_insurance > Decimal::ZERO);
        assert_eq!(rows[60].loan_insurance, Decimal::ZERO);
        assert_eq!(rows[60].loan_interest, Decimal::ZERO);
    }

    #[test]
    fn test_allowable_depreciation_capped_at_surplus() {
        let rows = run(&sample_input(), LeaseType::Furnished);
        for r in &rows {
            let surplus = (r.net_operating_income - r.financing_expense).max(Decimal::ZERO);
            assert!(r.allowable_depreciation <= r.depreciation);
            assert!(r.allowable_depreciation <= surplus);
            assert_eq!(
                r.net_income,
                r.net_operating_income - r.financing_expense - r.depreciation - r.total_taxes
            );
        }
    }

    #[test]
    fn test_furnishing_depreciation_stops_after_period() {
        let rows = run(&sample_input(), LeaseType::Furnished);
        // 7-year period: months 1..=84 carry the charge
        assert!(rows[83].depreciation_furnishing > Decimal::ZERO);
        assert_eq!(rows[84].depreciation_furnishing, Decimal::ZERO);
        assert_eq!(rows[84].depreciation_renovation, Decimal::ZERO);
        assert!(rows[84].depreciation_property > Decimal::ZERO);
    }

    #[test]
    fn test_flat_rate_regime_books_no_depreciation() {
        let raw = RawParameters {
            fiscal_regime: FiscalRegime::MicroBic,
            ..sample_input()
        };
        let rows = run(&raw, LeaseType::Furnished);
        let first = &rows[0];
        assert_eq!(first.depreciation, Decimal::ZERO);
        assert_eq!(first.taxable_income, first.revenue * dec!(0.5));
        assert_eq!(first.income_tax, first.taxable_income * dec!(0.30));
        assert_eq!(first.social_contributions, first.taxable_income * dec!(0.172));
    }

    #[test]
    fn test_flat_rate_abatement_follows_operated_lease() {
        let raw = RawParameters {
            fiscal_regime: FiscalRegime::MicroFoncier,
            ..sample_input()
        };
        let nightly = &run(&raw, LeaseType::Nightly)[0];
        assert!(nightly.revenue > Decimal::ZERO);
        assert_eq!(nightly.taxable_income, nightly.revenue * dec!(0.29));

        let raw = RawParameters {
            fiscal_regime: FiscalRegime::MicroBic,
            ..sample_input()
        };
        let unfurnished = &run(&raw, LeaseType::Unfurnished)[0];
        assert!(unfurnished.revenue > Decimal::ZERO);
        assert_eq!(unfurnished.taxable_income, unfurnished.revenue * dec!(0.70));
    }

    #[test]
    fn test_foncier_reel_depreciates_without_fiscal_deduction() {
        let raw = RawParameters {
            fiscal_regime: FiscalRegime::FoncierReel,
            ..sample_input()
        };
        let rows = run(&raw, LeaseType::Unfurnished);
        let first = &rows[0];
        assert!(first.depreciation > Decimal::ZERO);
        assert_eq!(first.allowable_depreciation, Decimal::ZERO);
        assert_eq!(
            first.taxable_income,
            first.net_operating_income - first.financing_expense
        );
    }

    #[test]
    fn test_missing_management_fee_defaults_to_zero() {
        let mut raw = sample_input();
        raw.management_fees_percentage_rent.clear();
        let rows = run(&raw, LeaseType::Furnished);
        assert_eq!(rows[0].management_fees, Decimal::ZERO);
    }
}
