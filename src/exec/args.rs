//! Argument bag -> CLI argument vector.

use serde_json::{Map, Value};

use crate::schema::naming::to_flag;

/// Translate canonical-name arguments into long flags, in bag order.
///
/// `null` and `false` are skipped, `true` emits the bare flag, strings are
/// passed verbatim and any other value is stringified (numbers in decimal,
/// arrays / objects as compact JSON).
pub fn format_options_for_cli(options: &Map<String, Value>) -> Vec<String> {
    let mut args = Vec::with_capacity(options.len() * 2);
    for (key, value) in options {
        match value {
            Value::Null | Value::Bool(false) => continue,
            Value::Bool(true) => args.push(to_flag(key)),
            Value::String(s) => {
                args.push(to_flag(key));
                args.push(s.clone());
            }
            other => {
                args.push(to_flag(key));
                args.push(other.to_string());
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_absent_and_false_values() {
        let bag = json!({"pluginName": "Foo", "jobQueue": true, "selectedEntity": null});
        assert_eq!(
            format_options_for_cli(bag.as_object().unwrap()),
            ["--plugin-name", "Foo", "--job-queue"]
        );

        let bag = json!({"run": false, "revert": true});
        assert_eq!(format_options_for_cli(bag.as_object().unwrap()), ["--revert"]);
    }

    #[test]
    fn stringifies_non_string_values() {
        let bag = json!({"count": 3, "tags": ["a", "b"]});
        assert_eq!(
            format_options_for_cli(bag.as_object().unwrap()),
            ["--count", "3", "--tags", r#"["a","b"]"#]
        );
    }

    #[test]
    fn keeps_insertion_order() {
        let bag = json!({"zeta": "1", "alpha": "2", "outputDir": "migrations"});
        assert_eq!(
            format_options_for_cli(bag.as_object().unwrap()),
            ["--zeta", "1", "--alpha", "2", "--output-dir", "migrations"]
        );
    }
}
