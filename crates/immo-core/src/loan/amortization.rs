use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ImmoError;
use crate::sweep::SweepAxis;
use crate::time_value::pmt;
use crate::types::{with_metadata, ComputationOutput, MonthIndex, Money, Rate};
use crate::ImmoResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Loan terms for a standalone amortization query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub loan_amount: Money,
    /// Nominal annual rate
    pub annual_rate: Rate,
    pub term_months: u32,
}

/// One month of the amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanScheduleEntry {
    pub month: MonthIndex,
    pub beginning_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub ending_balance: Money,
}

/// Ordered monthly schedule. Month `m` lives at index `m - 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanSchedule {
    pub entries: Vec<LoanScheduleEntry>,
}

impl LoanSchedule {
    pub fn entry(&self, month: MonthIndex) -> Option<&LoanScheduleEntry> {
        if month == 0 {
            return None;
        }
        self.entries.get(month as usize - 1)
    }

    /// Interest charged in `month`; zero once the loan is repaid.
    pub fn interest(&self, month: MonthIndex) -> Money {
        self.entry(month).map_or(Decimal::ZERO, |e| e.interest)
    }

    /// Principal repaid in `month`; zero once the loan is repaid.
    pub fn principal(&self, month: MonthIndex) -> Money {
        self.entry(month).map_or(Decimal::ZERO, |e| e.principal)
    }

    pub fn total_interest(&self) -> Money {
        self.entries.iter().map(|e| e.interest).sum()
    }

    pub fn total_principal(&self) -> Money {
        self.entries.iter().map(|e| e.principal).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Schedule plus headline figures, as returned by [`amortize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanScheduleOutput {
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_principal: Money,
    /// Month in which the balance reaches zero, if within the schedule
    pub payoff_month: Option<MonthIndex>,
    pub schedule: LoanSchedule,
}

/// Rate x term grid for the payment sensitivity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSensitivityInput {
    pub loan_amount: Money,
    /// Annual rate axis
    pub rate: SweepAxis,
    /// Term axis, in months
    pub term_months: SweepAxis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSensitivityOutput {
    pub rates: Vec<Rate>,
    pub terms_months: Vec<u32>,
    /// payments[i][j] = payment at terms_months[i], rates[j]
    pub payments: Vec<Vec<Money>>,
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// Level monthly payment for a fully amortizing loan.
///
/// Zero when there is nothing to amortize (no principal or a zero rate). A
/// positive principal and rate over a zero-month term has no finite payment.
pub fn monthly_payment(loan_amount: Money, annual_rate: Rate, term_months: u32) -> ImmoResult<Money> {
    if loan_amount <= Decimal::ZERO || annual_rate <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    if term_months == 0 {
        return Err(ImmoError::invalid(
            "loan_duration_years",
            "A positive loan at a positive rate needs a term of at least one month",
        ));
    }

    let payment = pmt(annual_rate / MONTHS_PER_YEAR, term_months, loan_amount, Decimal::ZERO)
        .map_err(|e| ImmoError::invalid("loan_interest_rate", format!("Payment not computable: {e}")))?;
    Ok(-payment)
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Build the monthly amortization schedule.
///
/// The final contractual month repays whatever balance remains, and the
/// schedule stops as soon as the balance reaches zero.
pub fn generate_schedule(loan_amount: Money, annual_rate: Rate, term_months: u32) -> ImmoResult<LoanSchedule> {
    let payment = monthly_payment(loan_amount, annual_rate, term_months)?;
    if payment.is_zero() {
        return Ok(LoanSchedule::default());
    }

    let monthly_rate = annual_rate / MONTHS_PER_YEAR;
    let mut entries = Vec::with_capacity(term_months as usize);
    let mut balance = loan_amount;

    for month in 1..=term_months {
        let beginning_balance = balance;
        let interest = beginning_balance * monthly_rate;

        let mut principal = (payment - interest).max(Decimal::ZERO);
        if month == term_months || principal > beginning_balance {
            principal = beginning_balance;
        }
        let ending_balance = (beginning_balance - principal).max(Decimal::ZERO);

        entries.push(LoanScheduleEntry {
            month,
            beginning_balance,
            payment: interest + principal,
            interest,
            principal,
            ending_balance,
        });

        balance = ending_balance;
        if balance.is_zero() {
            break;
        }
    }

    Ok(LoanSchedule { entries })
}

/// Standalone amortization query wrapped in the computation envelope.
pub fn amortize(input: &LoanInput) -> ImmoResult<ComputationOutput<LoanScheduleOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    if input.loan_amount < Decimal::ZERO {
        return Err(ImmoError::invalid("loan_amount", "Loan amount must be non-negative"));
    }
    if input.annual_rate < Decimal::ZERO {
        return Err(ImmoError::invalid("annual_rate", "Rate must be non-negative"));
    }

    let monthly_payment = monthly_payment(input.loan_amount, input.annual_rate, input.term_months)?;
    let schedule = generate_schedule(input.loan_amount, input.annual_rate, input.term_months)?;
    if schedule.is_empty() && input.loan_amount > Decimal::ZERO {
        warnings.push("Zero interest rate: no amortizing schedule is produced".into());
    }

    let payoff_month = schedule
        .entries
        .last()
        .filter(|e| e.ending_balance.is_zero())
        .map(|e| e.month);

    let output = LoanScheduleOutput {
        monthly_payment,
        total_interest: schedule.total_interest(),
        total_principal: schedule.total_principal(),
        payoff_month,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment loan amortization (monthly)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Payment sensitivity
// ---------------------------------------------------------------------------

/// Monthly payment over a rate x term grid. Rows are terms, columns rates.
/// Non-positive terms are dropped from the grid.
pub fn payment_sensitivity(
    input: &PaymentSensitivityInput,
) -> ImmoResult<ComputationOutput<PaymentSensitivityOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let rates: Vec<Rate> = input
        .rate
        .values("rate")?
        .into_iter()
        .filter(|r| {
            let keep = *r >= Decimal::ZERO;
            if !keep {
                warnings.push(format!("Dropped negative rate {r} from the grid"));
            }
            keep
        })
        .collect();

    let terms_months: Vec<u32> = input
        .term_months
        .values("term_months")?
        .into_iter()
        .filter_map(|t| t.round().to_u32().filter(|m| *m > 0))
        .collect();

    if rates.is_empty() || terms_months.is_empty() {
        return Err(ImmoError::InsufficientData(
            "Payment sensitivity grid has no valid rate or term values".into(),
        ));
    }

    let payments = terms_months
        .iter()
        .map(|term| {
            rates
                .iter()
                .map(|rate| monthly_payment(input.loan_amount, *rate, *term))
                .collect::<ImmoResult<Vec<Money>>>()
        })
        .collect::<ImmoResult<Vec<Vec<Money>>>>()?;

    let output = PaymentSensitivityOutput {
        rates,
        terms_months,
        payments,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly payment sensitivity (rate x term)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
