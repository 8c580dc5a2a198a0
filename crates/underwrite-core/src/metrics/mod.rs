pub mod amortization;
pub mod returns;

pub use amortization::{
    annual_amortization, balance_at_month, build_amortization_schedule, interest_by_year,
    monthly_payment, AmortizationMonth, AmortizationYear,
};
pub use returns::{cash_on_cash, dscr, equity_multiple, irr, yield_on_cost};
