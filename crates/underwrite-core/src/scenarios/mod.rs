pub mod sensitivity;

pub use sensitivity::{
    exit_cap_sensitivity, interest_rate_sensitivity, noi_growth_sensitivity,
    purchase_price_sensitivity, rent_growth_sensitivity, run_all_sensitivities, run_sensitivity,
    SensitivityDriver, SensitivityRow, SensitivitySuite, SensitivityTable,
};
