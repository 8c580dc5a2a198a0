pub mod derive;
pub mod inputs;

pub use derive::{derive, derive_assumptions, DerivedAssumptions, OperatingExpenses};
pub use inputs::{validate_deal, DealBuilder, DealInputs, ExpenseOverrides, FinancingTerms};
