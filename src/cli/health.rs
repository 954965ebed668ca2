use std::path::Path;
use std::time::Instant;

use crate::entities::names::NameMap;
use crate::error::MedLookupError;
use crate::sources::openfda::OpenFdaClient;

const OPENFDA_CHECK: &str = "openFDA drug labels";
const NAME_MAP_CHECK: &str = "Name map";

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

impl HealthRow {
    fn ok(api: &str, detail: impl Into<String>) -> Self {
        Self {
            api: api.to_string(),
            status: "ok".into(),
            latency: detail.into(),
        }
    }

    fn error(api: &str, detail: impl Into<String>) -> Self {
        Self {
            api: api.to_string(),
            status: "error".into(),
            latency: detail.into(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    fn from_rows(rows: Vec<HealthRow>) -> Self {
        let healthy = rows.iter().filter(|r| r.status == "ok").count();
        Self {
            healthy,
            total: rows.len(),
            rows,
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# medlookup Health Check\n\n");
        out.push_str("| Check | Status | Detail |\n");
        out.push_str("|-------|--------|--------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} checks healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

fn failure_reason(err: &MedLookupError) -> &'static str {
    let http = match err {
        MedLookupError::Http(err) => Some(err),
        MedLookupError::HttpMiddleware(reqwest_middleware::Error::Reqwest(err)) => Some(err),
        _ => None,
    };
    match http {
        Some(err) if err.is_timeout() => "timeout",
        Some(err) if err.is_connect() => "connect",
        _ => "error",
    }
}

async fn check_openfda(client: &OpenFdaClient) -> HealthRow {
    let start = Instant::now();
    match client.ping().await {
        Ok(status) if status.is_success() => {
            HealthRow::ok(OPENFDA_CHECK, format!("{}ms", start.elapsed().as_millis()))
        }
        Ok(status) => HealthRow::error(
            OPENFDA_CHECK,
            format!(
                "{}ms (HTTP {})",
                start.elapsed().as_millis(),
                status.as_u16()
            ),
        ),
        Err(err) => HealthRow::error(OPENFDA_CHECK, failure_reason(&err)),
    }
}

fn check_name_map(explicit: Option<&Path>, include_builtin: bool) -> HealthRow {
    match NameMap::resolve(explicit, include_builtin) {
        Ok(names) if names.is_empty() => HealthRow::ok(NAME_MAP_CHECK, "no names mapped"),
        Ok(names) => HealthRow::ok(NAME_MAP_CHECK, format!("{} names", names.len())),
        Err(err) => HealthRow::error(NAME_MAP_CHECK, err.to_string()),
    }
}

/// Checks openFDA reachability and that the configured name map loads.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be created.
pub async fn check(
    names: Option<&Path>,
    include_builtin: bool,
) -> Result<HealthReport, MedLookupError> {
    let client = OpenFdaClient::new()?;
    Ok(HealthReport::from_rows(vec![
        check_openfda(&client).await,
        check_name_map(names, include_builtin),
    ]))
}
