use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::loan::LoanSchedule;
use crate::parameters::{DerivedParameters, RawParameters};
use crate::statements::{CashFlowRow, ProfitAndLossRow};
use crate::types::{MonthIndex, Money};

/// Absolute tolerance on `balance_check`.
pub const BALANCE_TOLERANCE: Decimal = dec!(0.00001);

/// Month-end balance sheet. Month 0 is the state immediately after
/// acquisition, before any operating month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetRow {
    pub month: MonthIndex,
    pub year: u32,

    // Fixed assets at gross cost
    pub property_cost: Money,
    pub furnishing_cost: Money,
    pub renovation_cost: Money,
    pub accumulated_depreciation_property: Money,
    pub accumulated_depreciation_furnishing: Money,
    pub accumulated_depreciation_renovation: Money,
    pub accumulated_depreciation: Money,
    pub total_fixed_assets: Money,

    pub cash: Money,
    pub total_assets: Money,

    pub loan_balance: Money,
    pub total_liabilities: Money,

    pub initial_equity: Money,
    pub retained_earnings: Money,
    pub total_equity: Money,

    pub total_liabilities_and_equity: Money,
    /// total_assets - total_liabilities_and_equity
    pub balance_check: Money,
}

impl BalanceSheetRow {
    pub fn is_balanced(&self) -> bool {
        self.balance_check.abs() < BALANCE_TOLERANCE
    }
}

/// Running state carried from one month to the next.
struct Carry {
    acc_property: Money,
    acc_furnishing: Money,
    acc_renovation: Money,
    loan_balance: Money,
    retained_earnings: Money,
}

/// Generate balance sheets for months 0..=N. Cash for month `m` is the cash
/// flow statement's ending cash for that month.
pub fn generate_balance_sheet(
    raw: &RawParameters,
    derived: &DerivedParameters,
    pnl: &[ProfitAndLossRow],
    cash_flow: &[CashFlowRow],
    schedule: &LoanSchedule,
) -> Vec<BalanceSheetRow> {
    let property_cost = derived.property_cost();
    let furnishing_cost = raw.furnishing_costs;
    let renovation_cost = raw.initial_renovation_costs;

    let mut rows = Vec::with_capacity(pnl.len() + 1);
    let mut carry = Carry {
        acc_property: Decimal::ZERO,
        acc_furnishing: Decimal::ZERO,
        acc_renovation: Decimal::ZERO,
        loan_balance: derived.loan_amount,
        retained_earnings: Decimal::ZERO,
    };

    let build = |month: MonthIndex, year: u32, cash: Money, c: &Carry| {
        let accumulated_depreciation = c.acc_property + c.acc_furnishing + c.acc_renovation;
        let total_fixed_assets =
            property_cost + furnishing_cost + renovation_cost - accumulated_depreciation;
        let total_assets = total_fixed_assets + cash;
        let total_liabilities = c.loan_balance;
        let total_equity = derived.initial_equity + c.retained_earnings;
        let total_liabilities_and_equity = total_liabilities + total_equity;

        BalanceSheetRow {
            month,
            year,
            property_cost,
            furnishing_cost,
            renovation_cost,
            accumulated_depreciation_property: c.acc_property,
            accumulated_depreciation_furnishing: c.acc_furnishing,
            accumulated_depreciation_renovation: c.acc_renovation,
            accumulated_depreciation,
            total_fixed_assets,
            cash,
            total_assets,
            loan_balance: c.loan_balance,
            total_liabilities,
            initial_equity: derived.initial_equity,
            retained_earnings: c.retained_earnings,
            total_equity,
            total_liabilities_and_equity,
            balance_check: total_assets - total_liabilities_and_equity,
        }
    };

    rows.push(build(0, 0, Decimal::ZERO, &carry));

    for (row, cf) in pnl.iter().zip(cash_flow) {
        // Net book value never goes negative
        carry.acc_property = (carry.acc_property + row.depreciation_property).min(property_cost);
        carry.acc_furnishing =
            (carry.acc_furnishing + row.depreciation_furnishing).min(furnishing_cost);
        carry.acc_renovation =
            (carry.acc_renovation + row.depreciation_renovation).min(renovation_cost);
        carry.loan_balance -= schedule.principal(row.month);
        carry.retained_earnings += row.net_income;

        rows.push(build(row.month, row.year, cf.ending_cash, &carry));
    }

    rows
}
