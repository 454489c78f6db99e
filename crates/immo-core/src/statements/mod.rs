pub mod balance_sheet;
pub mod cash_flow;
pub mod profit_and_loss;

pub use balance_sheet::{generate_balance_sheet, BalanceSheetRow, BALANCE_TOLERANCE};
pub use cash_flow::{generate_cash_flow, CashFlowRow};
pub use profit_and_loss::{generate_profit_and_loss, ProfitAndLossRow};
