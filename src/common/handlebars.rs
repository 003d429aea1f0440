use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde_json::Value;
use tracing::info;

use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn create_path_if_not_exists(path: &Path) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid path: no parent directory for '{}'", path.display()))?;
    if !parent.as_os_str().is_empty() && !parent.exists() {
        info!("Creating path: {:?}", parent);
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_string_to_file(path: &Path, content: &str) -> anyhow::Result<()> {
    create_path_if_not_exists(path)?;
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Replace ASCII punctuation and whitespace with `_`
pub fn python_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_punctuation() || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Escape `"` so the value can sit inside a double-quoted string literal
pub fn string_delimiter_safe(value: &str) -> String {
    value.replace('"', "\\\"")
}

/// Turn a typed parameter (`{"value": .., "base_type": ..}`) into a Python literal
pub fn param_val_to_python_var(param: &Value) -> String {
    let base_type = param
        .get("base_type")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match param.get("value") {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) if base_type == "String" => format!("\"{}\"", s),
        Some(other) if base_type == "String" => format!("\"{}\"", other),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Handlebars registry used for pipeline source generation.
///
/// Escaping is disabled (the output is Python, not HTML) and strict mode
/// turns references to missing variables into render errors.
pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(no_escape);
    handlebars.set_strict_mode(true);

    handlebars_helper!(python_safe_helper: |s: String| python_safe(&s));
    handlebars.register_helper("python_safe", Box::new(python_safe_helper));

    handlebars_helper!(string_delimiter_safe_helper: |s: String| string_delimiter_safe(&s));
    handlebars.register_helper(
        "string_delimiter_safe",
        Box::new(string_delimiter_safe_helper),
    );

    handlebars_helper!(param_val_helper: |p: Value| param_val_to_python_var(&p));
    handlebars.register_helper("param_val_to_python_var", Box::new(param_val_helper));

    handlebars
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_python_safe() {
        assert_eq!(python_safe("train-model v2.1"), "train_model_v2_1");
        assert_eq!(python_safe("already_safe_1"), "already_safe_1");
        assert_eq!(python_safe("a\tb\nc"), "a_b_c");
    }

    #[test]
    fn test_string_delimiter_safe() {
        assert_eq!(string_delimiter_safe(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(string_delimiter_safe("plain"), "plain");
    }

    #[test]
    fn test_param_val_to_python_var() {
        assert_eq!(
            param_val_to_python_var(&json!({"value": null, "base_type": "String"})),
            "None"
        );
        assert_eq!(
            param_val_to_python_var(&json!({"value": "iris", "base_type": "String"})),
            "\"iris\""
        );
        assert_eq!(
            param_val_to_python_var(&json!({"value": 0.01, "base_type": "Float"})),
            "0.01"
        );
        assert_eq!(
            param_val_to_python_var(&json!({"value": "10", "base_type": "Integer"})),
            "10"
        );
        assert_eq!(
            param_val_to_python_var(&json!({"value": true, "base_type": "Bool"})),
            "True"
        );
        assert_eq!(param_val_to_python_var(&json!({"base_type": "Integer"})), "None");
    }

    #[test]
    fn test_helpers_registered_without_escaping() {
        let handlebars = get_handlebars();
        let rendered = handlebars
            .render_template(
                r#"{{python_safe name}} = "{{string_delimiter_safe label}}" <{{raw}}>"#,
                &json!({"name": "my-step", "label": "a \"b\"", "raw": "x < y & z"}),
            )
            .unwrap();
        assert_eq!(rendered, r#"my_step = "a \"b\"" <x < y & z>"#);
    }

    #[test]
    fn test_only_source_helpers_registered() {
        let handlebars = get_handlebars();
        let rendered = handlebars
            .render_template(
                "{{param_val_to_python_var lr}}",
                &json!({"lr": {"value": 0.1, "base_type": "Float"}}),
            )
            .unwrap();
        assert_eq!(rendered, "0.1");

        for template in ["{{exists name}}", "{{is_empty items}}"] {
            let result =
                handlebars.render_template(template, &json!({"name": "a", "items": []}));
            assert!(result.is_err(), "{} should not resolve", template);
        }
    }

    #[test]
    fn test_strict_mode_rejects_missing_variables() {
        let handlebars = get_handlebars();
        let result = handlebars.render_template("{{missing}}", &json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_string_to_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.py");
        write_string_to_file(&path, "print('ok')").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print('ok')");
    }
}
