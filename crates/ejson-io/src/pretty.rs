//! Indented JSON with short arrays kept on one line.
//!
//! Coordinates, complex numbers and phase lists are small arrays; writing each
//! entry on its own line makes e-JSON files several times longer than needed.

use serde_json::Value;

const INDENT_WIDTH: usize = 4;
const MAX_ITEMS: usize = 10;
const MAX_WIDTH: usize = 80;

/// Render `value` with four-space indentation. Arrays of at most ten scalars
/// (or nested arrays of scalars) whose inner width fits in 80 columns are
/// written on one line, and empty objects as `{}`.
pub fn to_string_compact_pretty(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

fn write_value(out: &mut String, value: &Value, level: usize) {
    match value {
        Value::Array(items) => {
            if let Some(line) = single_line(items) {
                out.push_str(&line);
                return;
            }
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                indent(out, level + 1);
                write_value(out, item, level + 1);
            }
            out.push('\n');
            indent(out, level);
            out.push(']');
        }
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Object(map) => {
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                indent(out, level + 1);
                out.push_str(&Value::String(key.clone()).to_string());
                out.push_str(": ");
                write_value(out, item, level + 1);
            }
            out.push('\n');
            indent(out, level);
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn single_line(items: &[Value]) -> Option<String> {
    if items.len() > MAX_ITEMS {
        return None;
    }
    let parts = items.iter().map(inline).collect::<Option<Vec<_>>>()?;
    let line = format!("[{}]", parts.join(", "));
    (line.chars().count() - 2 <= MAX_WIDTH).then_some(line)
}

fn inline(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => single_line(items),
        Value::Object(map) if map.is_empty() => Some("{}".to_string()),
        Value::Object(_) => None,
        scalar => Some(scalar.to_string()),
    }
}

fn indent(out: &mut String, level: usize) {
    out.extend(std::iter::repeat(' ').take(level * INDENT_WIDTH));
}
