pub mod raw;
pub mod transaction;

pub use raw::{FiscalRegime, LeaseType, RawParameters, RentalAssumption};
pub use transaction::{calculate_transaction, DerivedParameters, LAND_VALUE_SHARE};
