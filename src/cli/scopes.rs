use anyhow::Result;
use msgraph_lite::api::scopes::PERMISSION_USER_READ;
use msgraph_lite::api::Scope;
use serde::Serialize;
use tabled::Tabled;

use super::output::print_output;
use super::OutputFormat;

#[derive(Debug, Serialize, Tabled)]
struct ScopeRow {
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Permission")]
    permission: String,
}

pub fn execute(format: OutputFormat) -> Result<()> {
    let mut rows = vec![ScopeRow {
        scope: "(always)".to_string(),
        permission: PERMISSION_USER_READ.to_string(),
    }];
    rows.extend(Scope::ALL.into_iter().map(|scope| ScopeRow {
        scope: scope.name().to_string(),
        permission: scope.permission().to_string(),
    }));

    print_output(&rows, format);
    Ok(())
}
