use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::loan::LoanSchedule;
use crate::model::SeedCashSeries;
use crate::parameters::DerivedParameters;
use crate::statements::ProfitAndLossRow;
use crate::types::{MonthIndex, Money};

/// One month of the cash flow statement (indirect method).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    pub month: MonthIndex,
    pub year: u32,

    // Operating
    pub net_income: Money,
    pub depreciation_addback: Money,
    pub operating_cash_flow: Money,

    // Investing
    pub acquisition: Money,
    pub investing_cash_flow: Money,

    // Financing
    pub loan_proceeds: Money,
    pub equity_injection: Money,
    pub principal_repayment: Money,
    pub financing_cash_flow: Money,

    pub net_change_in_cash: Money,
    pub beginning_cash: Money,
    pub ending_cash: Money,
}

/// Generate the monthly cash flow statement.
///
/// Acquisition, loan drawdown and equity injection are month-1 events; the
/// opening cash position is zero. Beginning cash for each month is read from
/// `seed`.
pub fn generate_cash_flow(
    derived: &DerivedParameters,
    pnl: &[ProfitAndLossRow],
    schedule: &LoanSchedule,
    seed: &SeedCashSeries,
) -> Vec<CashFlowRow> {
    pnl.iter()
        .map(|row| {
            let month = row.month;
            let opening = month == 1;

            let operating_cash_flow = row.net_income + row.depreciation;

            let acquisition = if opening {
                -derived.total_acquisition_cost
            } else {
                Decimal::ZERO
            };

            let (loan_proceeds, equity_injection) = if opening {
                (derived.loan_amount, derived.initial_equity)
            } else {
                (Decimal::ZERO, Decimal::ZERO)
            };
            let principal_repayment = schedule.principal(month);
            let financing_cash_flow = loan_proceeds + equity_injection - principal_repayment;

            let net_change_in_cash = operating_cash_flow + acquisition + financing_cash_flow;
            let beginning_cash = seed.beginning_cash(month);

            CashFlowRow {
                month,
                year: row.year,
                net_income: row.net_income,
                depreciation_addback: row.depreciation,
                operating_cash_flow,
                acquisition,
                investing_cash_flow: acquisition,
                loan_proceeds,
                equity_injection,
                principal_repayment,
                financing_cash_flow,
                net_change_in_cash,
                beginning_cash,
                ending_cash: beginning_cash + net_change_in_cash,
            }
        })
        .collect()
}
