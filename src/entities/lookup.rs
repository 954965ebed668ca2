use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::entities::names::{NameMap, NameSubstitution};
use crate::error::MedLookupError;
use crate::sources::openfda::{LabelResponse, OpenFdaClient};
use crate::transform;
use crate::transform::label::MedicineCard;

const EMPTY_NAME_MESSAGE: &str = "Please enter a medicine name.";
const MAX_NAME_LEN: usize = 256;

/// Anything that can answer an openFDA-style label search.
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// `Ok(None)` means "no match"; errors abort the whole lookup.
    async fn search_labels(&self, query: &str) -> Result<Option<LabelResponse>, MedLookupError>;
}

#[async_trait]
impl LabelSource for OpenFdaClient {
    async fn search_labels(&self, query: &str) -> Result<Option<LabelResponse>, MedLookupError> {
        self.label_search(query).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    BrandName,
    GenericName,
    SubstanceName,
    FreeText,
}

impl QueryStrategy {
    /// Priority order in which strategies are tried.
    pub const ORDERED: [QueryStrategy; 4] = [
        QueryStrategy::BrandName,
        QueryStrategy::GenericName,
        QueryStrategy::SubstanceName,
        QueryStrategy::FreeText,
    ];

    fn field(self) -> Option<&'static str> {
        match self {
            QueryStrategy::BrandName => Some("openfda.brand_name"),
            QueryStrategy::GenericName => Some("openfda.generic_name"),
            QueryStrategy::SubstanceName => Some("openfda.substance_name"),
            QueryStrategy::FreeText => None,
        }
    }

    pub fn build(self, term: &str) -> String {
        let escaped = OpenFdaClient::escape_query_value(term.trim());
        match self.field() {
            Some(field) => format!("{field}:\"{escaped}\""),
            None => format!("\"{escaped}\""),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QueryStrategy::BrandName => "brand name",
            QueryStrategy::GenericName => "generic name",
            QueryStrategy::SubstanceName => "substance name",
            QueryStrategy::FreeText => "free text",
        }
    }
}

/// All fallback queries for `term`, in the order they are issued.
pub fn fallback_queries(term: &str) -> Vec<(QueryStrategy, String)> {
    QueryStrategy::ORDERED
        .iter()
        .map(|s| (*s, s.build(term)))
        .collect()
}

#[derive(Debug, Clone)]
pub struct FallbackMatch {
    pub strategy: QueryStrategy,
    pub response: LabelResponse,
}

/// First-success-wins evaluation of an ordered list of query constructors.
pub struct FallbackRunner<'a, S: LabelSource + ?Sized> {
    source: &'a S,
    strategies: &'a [QueryStrategy],
}

impl<'a, S: LabelSource + ?Sized> FallbackRunner<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            strategies: &QueryStrategy::ORDERED,
        }
    }

    #[cfg(test)]
    fn with_strategies(source: &'a S, strategies: &'a [QueryStrategy]) -> Self {
        Self { source, strategies }
    }

    /// Issues queries one at a time and stops at the first non-empty result.
    pub async fn run(&self, term: &str) -> Result<Option<FallbackMatch>, MedLookupError> {
        for strategy in self.strategies {
            let query = strategy.build(term);
            debug!(strategy = strategy.label(), %query, "Trying label query");

            match self.source.search_labels(&query).await? {
                Some(response) if response.has_results() => {
                    debug!(strategy = strategy.label(), "Label query matched");
                    return Ok(Some(FallbackMatch {
                        strategy: *strategy,
                        response,
                    }));
                }
                _ => {}
            }
        }
        debug!(term, "All label queries exhausted");
        Ok(None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupOutcome {
    pub input: String,
    pub search_term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitution: Option<NameSubstitution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<QueryStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<MedicineCard>,
}

impl LookupOutcome {
    /// The "US equivalent" notice, shown only when a substituted name matched.
    pub fn suggestion(&self) -> Option<String> {
        let sub = self.substitution.as_ref()?;
        self.card.as_ref()?;
        Some(format!(
            "Showing results for \"{}\" (US equivalent of \"{}\")",
            sub.mapped, sub.original
        ))
    }
}

pub(crate) fn validate_name(raw: &str) -> Result<&str, MedLookupError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(MedLookupError::InvalidArgument(EMPTY_NAME_MESSAGE.into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(MedLookupError::InvalidArgument(
            "Medicine name is too long.".into(),
        ));
    }
    Ok(name)
}

/// Normalizes a medicine name and runs the label fallback queries for it.
#[derive(Clone)]
pub struct MedicineLookup {
    names: Arc<NameMap>,
    source: Arc<dyn LabelSource>,
}

impl MedicineLookup {
    pub fn new(names: NameMap, source: Arc<dyn LabelSource>) -> Self {
        Self {
            names: Arc::new(names),
            source,
        }
    }

    /// Uses the live openFDA client.
    pub fn with_openfda(names: NameMap) -> Result<Self, MedLookupError> {
        Ok(Self::new(names, Arc::new(OpenFdaClient::new()?)))
    }

    pub fn names(&self) -> &NameMap {
        &self.names
    }

    pub async fn lookup(&self, raw: &str) -> Result<LookupOutcome, MedLookupError> {
        let input = validate_name(raw)?;
        let search_term = self.names.normalize(input);
        let substitution = self.names.substitute(input);
        if let Some(sub) = substitution.as_ref() {
            debug!(original = %sub.original, mapped = %sub.mapped, "Normalized medicine name");
        }

        let matched = FallbackRunner::new(self.source.as_ref())
            .run(&search_term)
            .await?;

        let (matched_by, total_matches, data_last_updated, card) = match matched {
            Some(m) => {
                let card = m.response.first().map(transform::label::from_label);
                let updated = m
                    .response
                    .meta
                    .as_ref()
                    .and_then(|meta| meta.last_updated.clone());
                (Some(m.strategy), m.response.total(), updated, card)
            }
            None => (None, None, None, None),
        };

        Ok(LookupOutcome {
            input: input.to_string(),
            search_term,
            substitution,
            matched_by,
            total_matches,
            data_last_updated,
            card,
        })
    }
}
