pub mod recommend;
pub mod scenarios;
pub mod simulation;
pub mod underwriting;

use underwrite_core::deal::{validate_deal, DealInputs};

use crate::input;

/// Load a deal from `--input` or piped stdin and reject inputs the engine
/// cannot meaningfully underwrite.
pub(crate) fn load_deal(
    path: Option<&str>,
    command: &str,
) -> Result<DealInputs, Box<dyn std::error::Error>> {
    let deal: DealInputs = if let Some(path) = path {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err(format!("--input <deal.json|deal.yaml> or stdin required for {command}").into());
    };
    validate_deal(&deal)?;
    tracing::debug!(
        property_type = %deal.property_type,
        purchase_price = %deal.purchase_price,
        units = deal.total_units,
        "deal loaded"
    );
    Ok(deal)
}
