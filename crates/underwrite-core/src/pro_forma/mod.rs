pub mod engine;
pub mod growth;
pub mod reversion;
pub mod sources_uses;
pub mod tax;

pub use engine::{build_pro_forma, DealMetrics, ProFormaResult, ProFormaRow, PROJECTION_YEARS};
pub use growth::{growth_rate_for_year, GrowthPath};
pub use reversion::Reversion;
pub use sources_uses::SourcesUses;
pub use tax::{Depreciation, SaleTax};
