use anyhow::Result;
use msgraph_lite::config::Config;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use super::output::{print_json, print_output};
use super::{session, AuthArgs, OutputFormat};

#[derive(Debug, Serialize, Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub async fn execute(auth: &AuthArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let api = session::open(auth, None, config).await?;
    let profile = api.get_user_info().await?;

    if format == OutputFormat::Json {
        print_json(&profile);
        return Ok(());
    }

    // Scalars only; nested objects and nulls are noise in a table
    let mut rows: Vec<FieldRow> = profile
        .into_iter()
        .filter_map(|(field, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(items) if !items.is_empty() => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => return None,
            };
            (!field.starts_with("@odata")).then_some(FieldRow { field, value })
        })
        .collect();
    rows.sort_by(|a, b| a.field.cmp(&b.field));

    print_output(&rows, format);
    Ok(())
}
