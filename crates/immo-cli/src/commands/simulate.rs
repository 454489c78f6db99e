use clap::{Args, ValueEnum};
use serde_json::{json, Value};

use immo_core::metrics::{analyze_investment, InvestmentAnalysis};
use immo_core::model::SimulationInput;
use immo_core::parameters::{LeaseType, RawParameters};

use crate::input;

/// Arguments for a full simulation run
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a JSON or YAML parameters file (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Lease type: airbnb, furnished_1yr, unfurnished_3yr
    #[arg(long, default_value = "furnished_1yr")]
    pub lease_type: LeaseType,

    /// Print only the headline figures
    #[arg(long, conflicts_with = "statement")]
    pub summary: bool,

    /// Print a single monthly statement instead of the whole run
    #[arg(long, value_enum)]
    pub statement: Option<Statement>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Statement {
    Pnl,
    CashFlow,
    BalanceSheet,
    Loan,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let parameters: RawParameters = input::read_document(args.input.as_deref(), "simulate")?;
    let output = analyze_investment(&SimulationInput {
        parameters,
        lease_type: args.lease_type,
    })?;

    let result = if args.summary {
        summary(&output.result)
    } else if let Some(statement) = args.statement {
        statement_rows(&output.result, statement)?
    } else {
        return Ok(serde_json::to_value(output)?);
    };

    let mut envelope = serde_json::to_value(&output)?;
    envelope["result"] = result;
    Ok(envelope)
}

fn summary(analysis: &InvestmentAnalysis) -> Value {
    let derived = &analysis.simulation.derived;
    let metrics = &analysis.metrics;
    json!({
        "lease_type": analysis.simulation.lease_type,
        "fiscal_regime": analysis.simulation.fiscal_regime,
        "irr": metrics.irr,
        "npv": metrics.npv,
        "cash_on_cash": metrics.cash_on_cash,
        "equity_multiple": metrics.equity_multiple,
        "net_exit_proceeds": metrics.exit.net_exit_proceeds,
        "total_acquisition_cost": derived.total_acquisition_cost,
        "loan_amount": derived.loan_amount,
        "initial_equity": derived.initial_equity,
        "monthly_payment": derived.monthly_payment,
        "capital_gains_tax": metrics.exit.capital_gains.total_tax,
        "remaining_loan_balance": metrics.exit.remaining_loan_balance,
    })
}

fn statement_rows(
    analysis: &InvestmentAnalysis,
    statement: Statement,
) -> Result<Value, serde_json::Error> {
    let sim = &analysis.simulation;
    match statement {
        Statement::Pnl => serde_json::to_value(&sim.profit_and_loss),
        Statement::CashFlow => serde_json::to_value(&sim.cash_flow),
        Statement::BalanceSheet => serde_json::to_value(&sim.balance_sheet),
        Statement::Loan => serde_json::to_value(&sim.loan_schedule),
    }
}
