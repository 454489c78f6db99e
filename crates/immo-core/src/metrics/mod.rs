pub mod exit;
pub mod returns;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

pub use exit::{capital_gains_tax, exit_proceeds, CapitalGainsTax, ExitProceeds};
pub use returns::{analyze_investment, compute_metrics, InvestmentAnalysis, InvestmentMetrics};

#[cfg(feature = "sensitivity")]
pub use sensitivity::{run_sensitivity_sweep, SweepCell, SweepConfig, SweepInput, SweepOutput};
