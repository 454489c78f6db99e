pub mod loan;
pub mod simulate;
pub mod sweep;
