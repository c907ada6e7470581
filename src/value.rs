use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A fully evaluated document: plain data with no references left.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Array(Vec<Value>),
    Table(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
        }
    }

    /// Looks up a table entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Table(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Looks up an array item.
    pub fn index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }
}

/// Whether `s` can be written bare, as a table key or after `.` in a reference.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Renders `s` as a string literal the lexer reads back unchanged.
pub fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

// Always with a decimal point and never with an exponent, which the lexer has
// no syntax for. NaN and the infinities print as the division producing them.
fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(f, "(0.0 / 0.0)")
    } else if n.is_infinite() {
        let sign = if n < 0.0 { "-" } else { "" };
        write!(f, "({}1.0 / 0.0)", sign)
    } else if n.fract() == 0.0 {
        write!(f, "{:.1}", n)
    } else {
        write!(f, "{}", n)
    }
}

// Inline edible syntax, so a printed value can be read back as a document.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", quote(s)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write_float(f, *n),
            Value::Array(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Table(entries) => {
                write!(f, "{{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    if is_identifier(key) {
                        write!(f, "{}: {}", key, value)?;
                    } else {
                        write!(f, "{}: {}", quote(key), value)?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut inner = BTreeMap::new();
        inner.insert("x".to_string(), Value::Float(2.0));
        inner.insert("two words".to_string(), Value::Bool(false));

        let mut entries = BTreeMap::new();
        entries.insert("name".to_string(), Value::Str("a \"b\"\n".to_string()));
        entries.insert(
            "items".to_string(),
            Value::Array(vec![Value::Int(1), Value::Table(inner)]),
        );
        Value::Table(entries)
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            r#"{items: [1, {"two words": false, x: 2.0}], name: "a \"b\"\n"}"#
        );
        assert_eq!(Value::Array(vec![]).to_string(), "[]");
        assert_eq!(Value::Float(-0.5).to_string(), "-0.5");
    }

    #[test]
    fn test_display_reads_back() {
        let printed = sample().to_string();
        let reparsed = crate::evaluate_str(&printed).expect("Printed value should evaluate");
        assert_eq!(reparsed, sample());
    }

    #[test]
    fn test_display_floats_read_back() {
        for n in [1e20, 1.5e-7, 0.1, -0.0, f64::INFINITY, f64::NEG_INFINITY] {
            let printed = Value::Float(n).to_string();
            assert!(!printed.contains('e'), "Printed: {}", printed);
            let document = format!("x: {}", printed);
            let reparsed = crate::evaluate_str(&document).expect("Printed float should evaluate");
            assert_eq!(reparsed.get("x"), Some(&Value::Float(n)), "Printed: {}", printed);
        }

        let printed = Value::Float(f64::NAN).to_string();
        assert_eq!(printed, "(0.0 / 0.0)");
        match crate::evaluate_str(&format!("x: {}", printed)) {
            Ok(value) => assert!(matches!(value.get("x"), Some(Value::Float(n)) if n.is_nan())),
            Err(errors) => panic!("Expected NaN, got {:?}", errors),
        }
    }

    #[test]
    fn test_json_non_finite_floats_are_null() {
        // JSON has no NaN or infinity
        let value = Value::Array(vec![Value::Float(f64::NAN), Value::Float(f64::INFINITY)]);
        let json = serde_json::to_string(&value).expect("Should serialize");
        assert_eq!(json, "[null,null]");
    }

    #[test]
    fn test_json() {
        let json = serde_json::to_string(&sample()).expect("Should serialize");
        assert_eq!(
            json,
            r#"{"items":[1,{"two words":false,"x":2.0}],"name":"a \"b\"\n"}"#
        );
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("snake_case9"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("two words"));
    }

    #[test]
    fn test_accessors() {
        let value = sample();
        assert_eq!(value.type_name(), "table");
        let second = value.get("items").and_then(|items| items.index(1));
        assert_eq!(second.and_then(|t| t.get("x")), Some(&Value::Float(2.0)));
        assert_eq!(value.get("missing"), None);
        assert_eq!(value.index(0), None);
    }
}
