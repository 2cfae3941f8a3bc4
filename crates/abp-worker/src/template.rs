//! Email body rendering.
//!
//! Queued emails carry a template key and a JSON variables object; the
//! renderer turns them into a plain-text body at send time, so a template
//! change never requires touching already-queued rows.

use serde_json::Value;

pub const UPLOAD_PROCESSED_TEMPLATE: &str = "beneficiary_upload_processed";

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template_key: &str, variables: &Value) -> anyhow::Result<String>;
}

/// Built-in plain-text templates with `{{variable}}` substitution.
#[derive(Default)]
pub struct PlainTextRenderer;

const UPLOAD_PROCESSED_BODY: &str = "\
Hello,

Your beneficiary upload has been processed.

Accepted rows: {{accepted_count}}
Rejected rows: {{rejected_count}}
Generated request file: {{file_name}}

This is an automated notification.
";

/// Replace every `{{key}}` placeholder with the matching variable. Unknown
/// placeholders are left in place so a bad send is visible rather than
/// silently truncated.
fn substitute(template: &str, variables: &Value) -> String {
    let mut body = template.to_string();
    if let Some(map) = variables.as_object() {
        for (key, value) in map {
            let placeholder = format!("{{{{{}}}}}", key);
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            body = body.replace(&placeholder, &rendered);
        }
    }
    body
}

impl TemplateRenderer for PlainTextRenderer {
    fn render(&self, template_key: &str, variables: &Value) -> anyhow::Result<String> {
        match template_key {
            UPLOAD_PROCESSED_TEMPLATE => Ok(substitute(UPLOAD_PROCESSED_BODY, variables)),
            other => anyhow::bail!("Unknown email template: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_processed_template_substitutes_variables() {
        let body = PlainTextRenderer
            .render(
                UPLOAD_PROCESSED_TEMPLATE,
                &json!({
                    "accepted_count": 3,
                    "rejected_count": 1,
                    "file_name": "ABP_RequestFile_1_abc.xlsx",
                }),
            )
            .unwrap();
        assert!(body.contains("Accepted rows: 3"));
        assert!(body.contains("Rejected rows: 1"));
        assert!(body.contains("ABP_RequestFile_1_abc.xlsx"));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn missing_variable_leaves_placeholder_visible() {
        let body = PlainTextRenderer
            .render(UPLOAD_PROCESSED_TEMPLATE, &json!({ "accepted_count": 3 }))
            .unwrap();
        assert!(body.contains("{{file_name}}"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        assert!(PlainTextRenderer.render("no_such_template", &json!({})).is_err());
    }
}
