use serde_json::{Map, Value};
use std::io;

use super::{cell, result_of};

/// Record lists that carry the main answer of a command, by priority.
const PRIMARY_SERIES: [&str; 4] = ["rows", "pro_forma", "signals", "probabilities"];

/// Write output as CSV to stdout.
///
/// Results with a record series (sensitivity rows, pro forma years,
/// recommendation signals) are written one record per line. Anything else is
/// flattened to `field,value` pairs with dotted keys.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let result = result_of(value);

    let series = PRIMARY_SERIES
        .iter()
        .find_map(|key| match result.get(*key) {
            Some(Value::Array(arr)) if !arr.is_empty() => Some(arr),
            _ => None,
        });

    match (series, result) {
        (Some(records), _) => write_records(&mut wtr, records),
        (None, Value::Array(arr)) => write_records(&mut wtr, arr),
        (None, Value::Object(map)) => {
            let _ = wtr.write_record(["field", "value"]);
            let mut pairs = Vec::new();
            flatten("", map, &mut pairs);
            for (key, val) in pairs {
                let _ = wtr.write_record([key.as_str(), val.as_str()]);
            }
        }
        (None, other) => {
            let _ = wtr.write_record([&cell(other)]);
        }
    }

    let _ = wtr.flush();
}

fn flatten(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => flatten(&name, inner, out),
            _ => out.push((name, cell(val))),
        }
    }
}

fn write_records(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&cell(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(cell).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}
