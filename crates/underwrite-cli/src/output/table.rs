use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::cell;

/// Row tables longer than this are summarized instead of printed.
const MAX_TABLE_ROWS: usize = 40;

/// Format output as tables: scalar fields first, then one titled table for
/// each nested object or list of records in the result.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_envelope(result, map),
            None => print_section(None, value),
        },
        Value::Array(arr) => print_records(None, arr),
        _ => println!("{}", value),
    }
}

fn print_envelope(result: &Value, envelope: &Map<String, Value>) {
    print_section(None, result);

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_section(title: Option<&str>, value: &Value) {
    let Value::Object(map) = value else {
        println!("{}", cell(value));
        return;
    };

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut scalars = 0usize;
    let mut nested: Vec<(&str, &Value)> = Vec::new();
    for (key, val) in map {
        if is_record_list(val) || val.is_object() {
            nested.push((key.as_str(), val));
        } else {
            builder.push_record([key.as_str(), &cell(val)]);
            scalars += 1;
        }
    }

    if let Some(title) = title {
        println!("\n{}", title);
    }
    if scalars > 0 {
        println!("{}", Table::from(builder));
    }

    for (key, val) in nested {
        match val {
            Value::Array(arr) => print_records(Some(key), arr),
            _ => print_section(Some(key), val),
        }
    }
}

fn is_record_list(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.first().map_or(false, Value::is_object))
}

fn print_records(title: Option<&str>, arr: &[Value]) {
    if let Some(title) = title {
        println!("\n{}", title);
    }
    if arr.is_empty() {
        println!("(empty)");
        return;
    }
    if arr.len() > MAX_TABLE_ROWS {
        println!("({} rows; use --output json or csv for the full series)", arr.len());
        return;
    }

    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", cell(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}
