pub mod amortization;

pub use amortization::{
    amortize, generate_schedule, monthly_payment, payment_sensitivity, LoanInput, LoanSchedule,
    LoanScheduleEntry, LoanScheduleOutput, PaymentSensitivityInput, PaymentSensitivityOutput,
};
