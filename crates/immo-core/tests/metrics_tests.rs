use immo_core::metrics::{analyze_investment, capital_gains_tax, compute_metrics};
use immo_core::model::{simulate, SimulationInput};
use immo_core::parameters::{LeaseType, RawParameters, RentalAssumption};
use immo_core::time_value::npv;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[cfg(feature = "sensitivity")]
use immo_core::metrics::{run_sensitivity_sweep, SweepConfig, SweepInput};

fn reference_parameters() -> RawParameters {
    let mut raw = RawParameters {
        property_price: dec!(200000),
        property_size_sqm: dec!(50),
        loan_percentage: dec!(0.9),
        initial_renovation_costs: dec!(10000),
        furnishing_costs: dec!(5000),
        property_tax_yearly: dec!(800),
        condo_fees_monthly: dec!(100),
        pno_insurance_yearly: dec!(150),
        ..Default::default()
    };
    raw.rental_assumptions.insert(
        "furnished_1yr".into(),
        RentalAssumption {
            monthly_rent_sqm: dec!(25),
            vacancy_rate: dec!(0.08),
            rent_growth_rate: dec!(0.015),
            ..Default::default()
        },
    );
    raw
}

// ===========================================================================
// Exit and capital-gains tax
// ===========================================================================

#[test]
fn test_capital_gains_tax_zero_from_25_years() {
    for years in 25..=40 {
        for gain in [dec!(0), dec!(1), dec!(50000), dec!(5000000)] {
            let tax = capital_gains_tax(dec!(100000), dec!(100000) + gain, years, dec!(0.172));
            assert_eq!(tax.total_tax, Decimal::ZERO);
            assert_eq!(tax.gross_capital_gain, gain);
        }
    }
}

#[test]
fn test_long_hold_simulation_is_exempt() {
    let raw = RawParameters {
        holding_period_years: 25,
        property_value_growth_rate: dec!(0.04),
        ..reference_parameters()
    };
    let (sim, _) = simulate(&raw, LeaseType::Furnished).unwrap();
    let (metrics, _) = compute_metrics(&raw, &sim).unwrap();
    assert!(metrics.exit.capital_gains.exempt);
    assert!(metrics.exit.capital_gains.gross_capital_gain > Decimal::ZERO);
    assert_eq!(metrics.exit.capital_gains.total_tax, Decimal::ZERO);
    // Loan fully repaid after 20 years
    assert!(metrics.exit.remaining_loan_balance.abs() < dec!(0.00001));
}

#[test]
fn test_remaining_loan_comes_from_final_balance_sheet() {
    let raw = reference_parameters();
    let (sim, _) = simulate(&raw, LeaseType::Furnished).unwrap();
    let (metrics, _) = compute_metrics(&raw, &sim).unwrap();
    let last_bs = sim.final_balance_sheet().unwrap();
    assert_eq!(metrics.exit.remaining_loan_balance, last_bs.loan_balance);
    assert_eq!(
        metrics.exit.net_exit_proceeds,
        metrics.exit.net_selling_price
            - last_bs.loan_balance
            - metrics.exit.capital_gains.total_tax
    );
}

// ===========================================================================
// Returns
// ===========================================================================

#[test]
fn test_equity_multiple_zero_without_equity() {
    let raw = RawParameters {
        loan_percentage: Decimal::ONE,
        ..reference_parameters()
    };
    let out = analyze_investment(&SimulationInput {
        parameters: raw,
        lease_type: LeaseType::Furnished,
    })
    .unwrap();
    assert_eq!(out.result.metrics.initial_equity, Decimal::ZERO);
    assert_eq!(out.result.metrics.equity_multiple, Decimal::ZERO);
}

#[test]
fn test_npv_discounts_monthly_flows() {
    let raw = RawParameters {
        discount_rate: Decimal::ZERO,
        ..reference_parameters()
    };
    let out = analyze_investment(&SimulationInput {
        parameters: raw,
        lease_type: LeaseType::Furnished,
    })
    .unwrap();
    let m = &out.result.metrics;
    // At a zero discount rate NPV is the plain sum of the equity flows
    let total: Decimal = m.monthly_cash_flows.iter().copied().sum();
    assert_eq!(m.npv, total);
    assert_eq!(npv(Decimal::ZERO, &m.monthly_cash_flows).unwrap(), total);
}

#[test]
fn test_irr_is_annual_and_solves_cash_flows() {
    let out = analyze_investment(&SimulationInput {
        parameters: reference_parameters(),
        lease_type: LeaseType::Furnished,
    })
    .unwrap();
    let m = &out.result.metrics;
    assert_eq!(m.annual_cash_flows.len(), 11);
    let rate = m.irr.unwrap();
    assert!(npv(rate, &m.annual_cash_flows).unwrap().abs() < dec!(0.001));
}

// ===========================================================================
// Sensitivity sweep
// ===========================================================================

#[cfg(feature = "sensitivity")]
#[test]
fn test_sweep_center_reproduces_base_case_exactly() {
    let parameters = reference_parameters();
    let single = analyze_investment(&SimulationInput {
        parameters: parameters.clone(),
        lease_type: LeaseType::Furnished,
    })
    .unwrap();

    let sweep = run_sensitivity_sweep(&SweepInput {
        parameters,
        lease_type: LeaseType::Furnished,
        config: SweepConfig::default(),
    })
    .unwrap()
    .result;

    assert_eq!(sweep.cells.len(), 5);
    assert_eq!(sweep.cells[0].len(), 5);
    let (row, col) = sweep.base_case_position;
    assert_eq!((row, col), (2, 2));
    assert_eq!(sweep.cells[row][col].irr, single.result.metrics.irr);
    assert_eq!(sweep.base_case_irr, single.result.metrics.irr);
}

#[cfg(feature = "sensitivity")]
#[test]
fn test_sweep_higher_rate_lowers_irr() {
    let sweep = run_sensitivity_sweep(&SweepInput {
        parameters: reference_parameters(),
        lease_type: LeaseType::Furnished,
        config: SweepConfig::default(),
    })
    .unwrap()
    .result;
    let irr = sweep.irr_matrix();
    let cheap = irr[2][0].unwrap();
    let dear = irr[2][4].unwrap();
    assert!(cheap > dear, "{cheap} vs {dear}");
}
