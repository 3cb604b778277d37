//! Python literal rendering for generated source.

use serde_json::Value as JsonValue;

/// Double-quoted string literal.
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Triple-quoted literal that keeps newlines readable.
pub fn triple_quoted(s: &str) -> String {
    let mut body = s.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"");
    if body.ends_with('"') {
        body.pop();
        body.push_str("\\\"");
    }
    format!("\"\"\"{body}\"\"\"")
}

pub fn bool_literal(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Float literal that always carries a decimal point.
pub fn float_literal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub fn string_list(items: &[String]) -> String {
    let parts: Vec<String> = items.iter().map(|s| string_literal(s)).collect();
    format!("[{}]", parts.join(", "))
}

/// Single-line Python rendering of a JSON value.
pub fn literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "None".to_string(),
        JsonValue::Bool(b) => bool_literal(*b).to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => string_literal(s),
        JsonValue::Array(items) => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", parts.join(", "))
        }
        JsonValue::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", string_literal(k), literal(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

/// Multi-line rendering; nested containers are indented four spaces per level.
pub fn pretty_literal(value: &JsonValue) -> String {
    let mut out = String::new();
    write_pretty(value, 0, &mut out);
    out
}

fn write_pretty(value: &JsonValue, level: usize, out: &mut String) {
    let pad = "    ".repeat(level + 1);
    let close = "    ".repeat(level);
    match value {
        JsonValue::Array(items) if !items.is_empty() => {
            out.push_str("[\n");
            for item in items {
                out.push_str(&pad);
                write_pretty(item, level + 1, out);
                out.push_str(",\n");
            }
            out.push_str(&close);
            out.push(']');
        }
        JsonValue::Object(map) if !map.is_empty() => {
            out.push_str("{\n");
            for (key, item) in map {
                out.push_str(&pad);
                out.push_str(&string_literal(key));
                out.push_str(": ");
                write_pretty(item, level + 1, out);
                out.push_str(",\n");
            }
            out.push_str(&close);
            out.push('}');
        }
        other => out.push_str(&literal(other)),
    }
}
