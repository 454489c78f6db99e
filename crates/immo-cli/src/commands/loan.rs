use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use immo_core::loan::{self, LoanInput, PaymentSensitivityInput};
use immo_core::parameters::{calculate_transaction, RawParameters};
use immo_core::sweep::SweepAxis;

use crate::input;

const MONTHS_PER_YEAR: u32 = 12;

/// Arguments for a loan amortization schedule
#[derive(Args)]
pub struct LoanScheduleArgs {
    /// Parameters file to derive the loan from (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Nominal annual interest rate (0.04 = 4%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in years
    #[arg(long)]
    pub years: Option<u32>,
}

/// Arguments for the payment sensitivity grid
#[derive(Args)]
pub struct LoanSensitivityArgs {
    /// Loan principal
    #[arg(long)]
    pub amount: Decimal,

    /// Base annual interest rate
    #[arg(long)]
    pub rate: Decimal,

    /// Half-width of the rate axis
    #[arg(long, default_value = "0.01")]
    pub rate_range: Decimal,

    /// Rate step
    #[arg(long, default_value = "0.0025")]
    pub rate_step: Decimal,

    /// Base term in years
    #[arg(long, default_value_t = 20)]
    pub years: u32,

    /// Half-width of the term axis, in years
    #[arg(long, default_value_t = 5)]
    pub years_range: u32,

    /// Term step, in years
    #[arg(long, default_value_t = 5)]
    pub years_step: u32,
}

pub fn run_loan_schedule(args: LoanScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan_input = if let Some(ref path) = args.input {
        let raw: RawParameters = input::file::read_document(path)?;
        let derived = calculate_transaction(&raw)?;
        LoanInput {
            loan_amount: derived.loan_amount,
            annual_rate: raw.loan_interest_rate,
            term_months: derived.loan_term_months,
        }
    } else {
        LoanInput {
            loan_amount: args.amount.ok_or("--amount required (or --input)")?,
            annual_rate: args.rate.ok_or("--rate required (or --input)")?,
            term_months: args.years.ok_or("--years required (or --input)")? * MONTHS_PER_YEAR,
        }
    };

    let result = loan::amortize(&loan_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_loan_sensitivity(args: LoanSensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = PaymentSensitivityInput {
        loan_amount: args.amount,
        rate: SweepAxis::new(args.rate, args.rate_range, args.rate_step),
        term_months: SweepAxis::new(
            Decimal::from(args.years * MONTHS_PER_YEAR),
            Decimal::from(args.years_range * MONTHS_PER_YEAR),
            Decimal::from(args.years_step * MONTHS_PER_YEAR),
        ),
    };

    let output = loan::payment_sensitivity(&input)?;

    // One row per term, keyed by rate, so table/csv output reads as a grid
    let sens = &output.result;
    let rows: Vec<Value> = sens
        .terms_months
        .iter()
        .zip(&sens.payments)
        .map(|(term, payments)| {
            let mut row = serde_json::Map::new();
            row.insert("term_months".into(), Value::from(*term));
            for (rate, payment) in sens.rates.iter().zip(payments) {
                row.insert(format!("rate_{rate}"), Value::String(payment.round_dp(2).to_string()));
            }
            Value::Object(row)
        })
        .collect();

    let mut envelope = serde_json::to_value(&output)?;
    envelope["result"] = Value::Array(rows);
    Ok(envelope)
}
