use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::loan::LoanSchedule;
use crate::statements::ProfitAndLossRow;
use crate::types::{MonthIndex, Money};

/// Provisional end-of-month cash balances used only to seed the cash flow
/// statement's beginning-cash lookups.
///
/// Built from a simplified recurrence (previous cash + net income +
/// depreciation - principal repaid) before any cash flow statement exists.
/// It is never published as a balance sheet: the final balance sheet takes
/// its cash line from the cash flow statement's ending balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedCashSeries {
    /// `balances[m]` is the provisional cash at the end of month `m`;
    /// index 0 is the pre-operating state and is always zero.
    balances: Vec<Money>,
}

impl SeedCashSeries {
    pub fn build(pnl: &[ProfitAndLossRow], schedule: &LoanSchedule) -> Self {
        let mut balances = Vec::with_capacity(pnl.len() + 1);
        let mut cash = Decimal::ZERO;
        balances.push(cash);

        for row in pnl {
            cash += row.net_income + row.depreciation - schedule.principal(row.month);
            balances.push(cash);
        }

        SeedCashSeries { balances }
    }

    /// Cash on hand at the start of `month` (the previous month's close).
    pub fn beginning_cash(&self, month: MonthIndex) -> Money {
        month
            .checked_sub(1)
            .and_then(|prev| self.balances.get(prev as usize))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn ending_cash(&self, month: MonthIndex) -> Option<Money> {
        self.balances.get(month as usize).copied()
    }

    /// Number of operating months covered.
    pub fn months(&self) -> usize {
        self.balances.len().saturating_sub(1)
    }
}
