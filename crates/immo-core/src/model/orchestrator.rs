use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::error::ImmoError;
use crate::loan::{generate_schedule, LoanSchedule};
use crate::model::SeedCashSeries;
use crate::parameters::{calculate_transaction, DerivedParameters, FiscalRegime, LeaseType, RawParameters};
use crate::statements::{
    generate_balance_sheet, generate_cash_flow, generate_profit_and_loss, BalanceSheetRow,
    CashFlowRow, ProfitAndLossRow, BALANCE_TOLERANCE,
};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::ImmoResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Parameters plus the lease-type selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub parameters: RawParameters,
    pub lease_type: LeaseType,
}

/// Complete monthly statement set for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub lease_type: LeaseType,
    pub fiscal_regime: FiscalRegime,
    pub derived: DerivedParameters,
    pub loan_schedule: LoanSchedule,
    /// Months 1..=N
    pub profit_and_loss: Vec<ProfitAndLossRow>,
    /// Months 1..=N
    pub cash_flow: Vec<CashFlowRow>,
    /// Months 0..=N
    pub balance_sheet: Vec<BalanceSheetRow>,
}

impl SimulationResult {
    pub fn final_balance_sheet(&self) -> Option<&BalanceSheetRow> {
        self.balance_sheet.last()
    }

    /// Net change in cash for each month, in order.
    pub fn monthly_net_cash_changes(&self) -> Vec<Money> {
        self.cash_flow.iter().map(|r| r.net_change_in_cash).collect()
    }

    /// Net change in cash summed per holding year.
    pub fn yearly_net_cash_changes(&self) -> Vec<Money> {
        self.cash_flow
            .chunks(12)
            .map(|year| year.iter().map(|r| r.net_change_in_cash).sum())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full simulation and wrap it in the computation envelope.
pub fn run_simulation(input: &SimulationInput) -> ImmoResult<ComputationOutput<SimulationResult>> {
    let start = Instant::now();
    let (result, warnings) = simulate(&input.parameters, input.lease_type)?;
    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Monthly three-statement simulation with two-pass cash resolution",
        &serde_json::json!({
            "lease_type": input.lease_type,
            "fiscal_regime": input.parameters.fiscal_regime,
            "holding_period_years": input.parameters.holding_period_years,
            "loan_percentage": input.parameters.loan_percentage.to_string(),
            "loan_interest_rate": input.parameters.loan_interest_rate.to_string(),
            "balance_tolerance": BALANCE_TOLERANCE.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Sequence every generator for one run. Returns the statements and any
/// non-fatal warnings.
///
/// Fails before generating anything on an invalid configuration, and after
/// generation if any month of the final balance sheet is out of balance.
pub fn simulate(raw: &RawParameters, lease: LeaseType) -> ImmoResult<(SimulationResult, Vec<String>)> {
    let mut warnings = raw.validate(lease)?;
    for w in &warnings {
        warn!(lease = %lease, "{w}");
    }

    // Transaction calculator
    let derived = calculate_transaction(raw)?;
    debug!(
        total_acquisition_cost = %derived.total_acquisition_cost,
        loan_amount = %derived.loan_amount,
        monthly_payment = %derived.monthly_payment,
        "transaction calculated"
    );

    // Loan amortization
    let loan_schedule = generate_schedule(
        derived.loan_amount,
        raw.loan_interest_rate,
        derived.loan_term_months,
    )?;
    debug!(months = loan_schedule.len(), "loan schedule generated");

    // Profit & loss
    let profit_and_loss = generate_profit_and_loss(raw, &derived, &loan_schedule, lease)?;
    debug!(months = profit_and_loss.len(), "profit and loss generated");

    // Pass 1: seed the beginning-cash chain
    let seed = SeedCashSeries::build(&profit_and_loss, &loan_schedule);

    // Cash flow statement from the seeded beginning balances
    let cash_flow = generate_cash_flow(&derived, &profit_and_loss, &loan_schedule, &seed);
    if let Some(drift) = max_seed_drift(&seed, &cash_flow) {
        if drift >= BALANCE_TOLERANCE {
            let msg = format!("Cash flow ending cash deviates from the seed series by up to {drift}");
            warn!("{msg}");
            warnings.push(msg);
        }
    }

    // Pass 2: final balance sheet from authoritative ending cash
    let balance_sheet =
        generate_balance_sheet(raw, &derived, &profit_and_loss, &cash_flow, &loan_schedule);
    verify_balance(&balance_sheet)?;
    debug!(months = balance_sheet.len(), "balance sheet verified");

    Ok((
        SimulationResult {
            lease_type: lease,
            fiscal_regime: raw.fiscal_regime,
            derived,
            loan_schedule,
            profit_and_loss,
            cash_flow,
            balance_sheet,
        },
        warnings,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn verify_balance(balance_sheet: &[BalanceSheetRow]) -> ImmoResult<()> {
    match balance_sheet.iter().find(|row| !row.is_balanced()) {
        Some(row) => {
            error!(
                month = row.month,
                imbalance = %row.balance_check,
                "balance sheet does not balance"
            );
            Err(ImmoError::InternalInconsistency {
                month: row.month,
                imbalance: row.balance_check,
            })
        }
        None => Ok(()),
    }
}

fn max_seed_drift(seed: &SeedCashSeries, cash_flow: &[CashFlowRow]) -> Option<Decimal> {
    cash_flow
        .iter()
        .filter_map(|row| seed.ending_cash(row.month).map(|s| (row.ending_cash - s).abs()))
        .max()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
