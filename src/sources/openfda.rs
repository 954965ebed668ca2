use std::borrow::Cow;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::MedLookupError;
use crate::sources::ResponseBody;
use crate::utils::serde::StringOrVec;

const OPENFDA_BASE: &str = "https://api.fda.gov";
pub(crate) const OPENFDA_API: &str = "openfda";
const OPENFDA_BASE_ENV: &str = "MEDLOOKUP_OPENFDA_BASE";
const OPENFDA_API_KEY_ENV: &str = "OPENFDA_API_KEY";
const LABEL_PATH: &str = "drug/label.json";
const LABEL_RESULT_LIMIT: &str = "1";
const MAX_QUERY_LEN: usize = 1024;

pub struct OpenFdaClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Option<String>,
}

impl OpenFdaClient {
    pub fn new() -> Result<Self, MedLookupError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(OPENFDA_BASE, OPENFDA_BASE_ENV),
            api_key: std::env::var(OPENFDA_API_KEY_ENV)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(
        base: String,
        api_key: Option<String>,
    ) -> Result<Self, MedLookupError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            api_key: api_key
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn escape_query_value(value: &str) -> String {
        crate::utils::query::escape_phrase(value)
    }

    fn label_request(&self, params: &[(&str, &str)]) -> reqwest_middleware::RequestBuilder {
        let req = self.client.get(self.endpoint(LABEL_PATH)).query(params);
        match self.api_key.as_deref() {
            Some(key) => req.query(&[("api_key", key)]),
            None => req,
        }
    }

    /// Requests one unfiltered label record and returns the HTTP status.
    pub(crate) async fn ping(&self) -> Result<StatusCode, MedLookupError> {
        let resp = self
            .label_request(&[("limit", LABEL_RESULT_LIMIT)])
            .send()
            .await?;
        Ok(resp.status())
    }

    /// Runs one label search and returns the decoded envelope.
    ///
    /// A non-2xx status is "no match" (`Ok(None)`); openFDA answers 404 when a
    /// filter matches nothing. Transport and JSON failures are errors.
    pub async fn label_search(&self, query: &str) -> Result<Option<LabelResponse>, MedLookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MedLookupError::InvalidArgument(
                "Query is required. Example: medlookup search panadol".into(),
            ));
        }
        if query.len() > MAX_QUERY_LEN {
            return Err(MedLookupError::InvalidArgument("Query is too long.".into()));
        }

        let req = self.label_request(&[("search", query), ("limit", LABEL_RESULT_LIMIT)]);
        let body = ResponseBody::read(req.send().await?, OPENFDA_API).await?;
        if body.status == StatusCode::NOT_FOUND {
            debug!(query, "openFDA returned no matches");
            return Ok(None);
        }
        if !body.status.is_success() {
            warn!(
                query,
                status = body.status.as_u16(),
                "openFDA label search failed; treating as no match: {}",
                body.excerpt()
            );
            return Ok(None);
        }

        body.json(OPENFDA_API).map(Some)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelResponse {
    #[serde(default)]
    pub meta: Option<OpenFdaMeta>,
    #[serde(default)]
    pub results: Vec<LabelRecord>,
}

impl LabelResponse {
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn first(&self) -> Option<&LabelRecord> {
        self.results.first()
    }

    /// Total hit count reported by openFDA, when present.
    pub fn total(&self) -> Option<usize> {
        self.meta.as_ref()?.results.as_ref().map(|r| r.total)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenFdaMeta {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub results: Option<OpenFdaMetaResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenFdaMetaResults {
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelRecord {
    #[serde(default)]
    pub set_id: Option<String>,
    #[serde(default)]
    pub effective_time: Option<String>,
    #[serde(default)]
    pub openfda: LabelOpenFda,
    #[serde(default)]
    pub purpose: StringOrVec,
    #[serde(default)]
    pub indications_and_usage: StringOrVec,
    #[serde(default)]
    pub active_ingredient: StringOrVec,
    #[serde(default)]
    pub dosage_and_administration: StringOrVec,
    #[serde(default)]
    pub information_for_patients: StringOrVec,
    #[serde(default)]
    pub patient_medication_information: StringOrVec,
    #[serde(default)]
    pub storage_and_handling: StringOrVec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelOpenFda {
    #[serde(default)]
    pub brand_name: StringOrVec,
    #[serde(default)]
    pub generic_name: StringOrVec,
    #[serde(default)]
    pub manufacturer_name: StringOrVec,
    #[serde(default)]
    pub substance_name: StringOrVec,
}
