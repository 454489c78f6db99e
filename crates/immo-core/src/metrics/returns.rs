use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::ImmoError;
use crate::metrics::exit::{exit_proceeds, ExitProceeds};
use crate::model::{simulate, SimulationInput, SimulationResult};
use crate::parameters::RawParameters;
use crate::time_value::{irr, monthly_equivalent_rate, npv};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::ImmoResult;

/// Starting point for the annual IRR solve.
const IRR_GUESS: Rate = dec!(0.10);

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Exit and return metrics for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentMetrics {
    pub exit: ExitProceeds,
    pub initial_equity: Money,
    /// Annual equity IRR; `None` when the cash flows admit no solution
    pub irr: Option<Rate>,
    /// NPV of the monthly equity flows at the monthly-equivalent discount rate
    pub npv: Money,
    /// Year-1 net cash change / initial equity
    pub cash_on_cash: Rate,
    /// (Sum of net cash changes + net exit proceeds) / initial equity
    pub equity_multiple: Multiple,
    pub total_net_cash_flow: Money,
    /// [-equity, year 1, ..., year N + exit proceeds]
    pub annual_cash_flows: Vec<Money>,
    /// [-equity, month 1, ..., month N + exit proceeds]
    pub monthly_cash_flows: Vec<Money>,
}

/// Statements plus metrics, the full answer for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentAnalysis {
    pub simulation: SimulationResult,
    pub metrics: InvestmentMetrics,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate and evaluate one scenario.
pub fn analyze_investment(input: &SimulationInput) -> ImmoResult<ComputationOutput<InvestmentAnalysis>> {
    let start = Instant::now();

    let (simulation, mut warnings) = simulate(&input.parameters, input.lease_type)?;
    let (metrics, metric_warnings) = compute_metrics(&input.parameters, &simulation)?;
    warnings.extend(metric_warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Leveraged real-estate simulation: three statements, exit tax, IRR/NPV",
        &serde_json::json!({
            "lease_type": input.lease_type,
            "fiscal_regime": input.parameters.fiscal_regime,
            "holding_period_years": input.parameters.holding_period_years,
            "discount_rate": input.parameters.discount_rate.to_string(),
            "irr_cash_flows": "annual",
            "npv_cash_flows": "monthly",
        }),
        warnings,
        elapsed,
        InvestmentAnalysis {
            simulation,
            metrics,
        },
    ))
}

/// Derive exit proceeds and return metrics from a finished simulation.
///
/// An IRR without solution is reported as `None` with a warning; every other
/// failure is an error.
pub fn compute_metrics(
    raw: &RawParameters,
    simulation: &SimulationResult,
) -> ImmoResult<(InvestmentMetrics, Vec<String>)> {
    let mut warnings = Vec::new();

    let final_bs = simulation.final_balance_sheet().ok_or_else(|| {
        ImmoError::InsufficientData("Simulation produced no balance sheet".into())
    })?;
    let exit = exit_proceeds(raw, final_bs.loan_balance)?;
    let equity = simulation.derived.initial_equity;

    let yearly = simulation.yearly_net_cash_changes();
    let monthly = simulation.monthly_net_cash_changes();

    let annual_cash_flows = equity_flows(equity, &yearly, exit.net_exit_proceeds)?;
    let monthly_cash_flows = equity_flows(equity, &monthly, exit.net_exit_proceeds)?;

    let irr = match irr(&annual_cash_flows, IRR_GUESS) {
        Ok(rate) => Some(rate),
        Err(e @ (ImmoError::MetricsUnavailable { .. } | ImmoError::ConvergenceFailure { .. })) => {
            let msg = format!("IRR undefined: {e}");
            warn!("{msg}");
            warnings.push(msg);
            None
        }
        Err(e) => return Err(e),
    };

    let monthly_rate = monthly_equivalent_rate(raw.discount_rate)?;
    let npv = npv(monthly_rate, &monthly_cash_flows)?;

    let total_net_cash_flow: Money = monthly.iter().copied().sum();
    let year_one = yearly.first().copied().unwrap_or(Decimal::ZERO);

    let (cash_on_cash, equity_multiple) = if equity > Decimal::ZERO {
        let total_return = total_net_cash_flow
            .checked_add(exit.net_exit_proceeds)
            .and_then(|total| total.checked_div(equity))
            .ok_or_else(|| out_of_range("equity_multiple"))?;
        (year_one / equity, total_return)
    } else {
        warnings.push("No equity invested: cash-on-cash and equity multiple reported as 0".into());
        (Decimal::ZERO, Decimal::ZERO)
    };

    debug!(
        irr = ?irr,
        npv = %npv,
        equity_multiple = %equity_multiple,
        "investment metrics computed"
    );

    Ok((
        InvestmentMetrics {
            exit,
            initial_equity: equity,
            irr,
            npv,
            cash_on_cash,
            equity_multiple,
            total_net_cash_flow,
            annual_cash_flows,
            monthly_cash_flows,
        },
        warnings,
    ))
}

/// [-equity, flows..., with exit proceeds added to the last period].
fn equity_flows(equity: Money, periods: &[Money], exit_proceeds: Money) -> ImmoResult<Vec<Money>> {
    let mut flows = Vec::with_capacity(periods.len() + 1);
    flows.push(-equity);
    if periods.is_empty() {
        flows.push(exit_proceeds);
        return Ok(flows);
    }
    flows.extend_from_slice(periods);
    if let Some(last) = flows.last_mut() {
        *last = last
            .checked_add(exit_proceeds)
            .ok_or_else(|| out_of_range("net_exit_proceeds"))?;
    }
    Ok(flows)
}

fn out_of_range(metric: &str) -> ImmoError {
    ImmoError::MetricsUnavailable {
        metric: metric.into(),
        reason: "value exceeds the representable range".into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{LeaseType, RentalAssumption};

    fn sample_input() -> SimulationInput {
        let mut parameters = RawParameters {
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
        parameters.rental_assumptions.insert(
            "furnished_1yr".into(),
            RentalAssumption {
                monthly_rent_sqm: dec!(25),
                vacancy_rate: dec!(0.08),
                rent_growth_rate: dec!(0.015),
                ..Default::default()
            },
        );
        SimulationInput {
            parameters,
            lease_type: LeaseType::Furnished,
        }
    }

    #[test]
    fn test_cash_flow_arrays() {
        let out = analyze_investment(&sample_input()).unwrap();
        let m = &out.result.metrics;
        assert_eq!(m.annual_cash_flows.len(), 11);
        assert_eq!(m.monthly_cash_flows.len(), 121);
        assert_eq!(m.annual_cash_flows[0], -m.initial_equity);
        let last_year = *out.result.simulation.yearly_net_cash_changes().last().unwrap();
        assert_eq!(m.annual_cash_flows[10], last_year + m.exit.net_exit_proceeds);
    }

    #[test]
    fn test_irr_zeroes_npv_of_annual_flows() {
        let out = analyze_investment(&sample_input()).unwrap();
        let m = &out.result.metrics;
        let rate = m.irr.expect("profitable scenario has an IRR");
        let residual = npv(rate, &m.annual_cash_flows).unwrap();
        assert!(residual.abs() < dec!(0.001), "residual {residual}");
    }

    #[test]
    fn test_cash_on_cash_and_multiple() {
        let out = analyze_investment(&sample_input()).unwrap();
        let m = &out.result.metrics;
        let year_one = out.result.simulation.yearly_net_cash_changes()[0];
        assert_eq!(m.cash_on_cash, year_one / m.initial_equity);
        assert_eq!(
            m.equity_multiple,
            (m.total_net_cash_flow + m.exit.net_exit_proceeds) / m.initial_equity
        );
    }

    #[test]
    fn test_full_financing_reports_zero_ratios() {
        let mut input = sample_input();
        input.parameters.loan_percentage = Decimal::ONE;
        let out = analyze_investment(&input).unwrap();
        let m = &out.result.metrics;
        assert_eq!(m.initial_equity, Decimal::ZERO);
        assert_eq!(m.equity_multiple, Decimal::ZERO);
        assert_eq!(m.cash_on_cash, Decimal::ZERO);
        assert!(out.warnings.iter().any(|w| w.contains("No equity")));
    }

    #[test]
    fn test_unavailable_irr_is_none_with_warning() {
        // No rent at all: every flow after the equity outlay is negative
        let mut input = sample_input();
        if let Some(a) = input.parameters.rental_assumptions.get_mut("furnished_1yr") {
            a.monthly_rent_sqm = Decimal::ZERO;
        }
        input.parameters.property_value_growth_rate = dec!(-0.5);
        let out = analyze_investment(&input).unwrap();
        assert!(out.result.metrics.irr.is_none());
        assert!(out.warnings.iter().any(|w| w.starts_with("IRR undefined")));
    }

    #[test]
    fn test_equity_flows_helper() {
        let flows = equity_flows(dec!(100), &[dec!(10), dec!(20)], dec!(150)).unwrap();
        assert_eq!(flows, vec![dec!(-100), dec!(10), dec!(170)]);
        let flows = equity_flows(dec!(100), &[], dec!(150)).unwrap();
        assert_eq!(flows, vec![dec!(-100), dec!(150)]);
        assert!(equity_flows(dec!(100), &[Decimal::MAX], dec!(1)).is_err());
    }

    #[test]
    fn test_extreme_discount_rate_is_an_error_not_a_panic() {
        let mut input = sample_input();
        input.parameters.discount_rate = dec!(-0.99);
        input.parameters.holding_period_years = 20;
        assert!(input.parameters.validate(input.lease_type).is_ok());
        let err = analyze_investment(&input).unwrap_err();
        assert!(matches!(err, ImmoError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_extreme_growth_is_an_error_not_a_panic() {
        let mut input = sample_input();
        input.parameters.property_value_growth_rate = dec!(9);
        input.parameters.holding_period_years = 24;
        let err = analyze_investment(&input).unwrap_err();
        assert!(matches!(err, ImmoError::InvalidConfiguration { .. }));
    }
}
