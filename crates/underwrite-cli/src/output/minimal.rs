use serde_json::Value;

use super::{cell, result_of};

/// Headline answer for each command, first match wins.
const HEADLINE_PATHS: &[&[&str]] = &[
    // recommend
    &["label"],
    // monte-carlo
    &["summary"],
    // analyze
    &["metrics", "levered_irr"],
    // derive
    &["going_in_cap_rate"],
];

/// Print just the key answer from the output.
///
/// Sensitivity tables print one `input,irr` line per row.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    for path in HEADLINE_PATHS {
        if let Some(found) = lookup(result, path).filter(|v| !v.is_null()) {
            if path[0] == "label" {
                let score = lookup(result, &["score"]).map(cell).unwrap_or_default();
                println!("{} ({})", cell(found), score);
            } else {
                println!("{}", cell(found));
            }
            return;
        }
    }

    if let Some(Value::Array(rows)) = result.get("rows") {
        for row in rows {
            let input = row.get("input_value").map(cell).unwrap_or_default();
            let irr = row.get("irr").map(cell).unwrap_or_default();
            println!("{},{}", input, irr);
        }
        return;
    }

    if let Value::Object(map) = result {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(result));
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(*key))
}
