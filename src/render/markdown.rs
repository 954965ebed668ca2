use std::sync::OnceLock;

use minijinja::{Environment, context};

use crate::entities::lookup::{LookupOutcome, QueryStrategy};
use crate::entities::names::{NameMap, NameSubstitution};
use crate::error::MedLookupError;
use crate::render::toggle::{CardView, ToggleState};

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

/// How a truncated section advertises its toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleHint {
    /// One-shot CLI output: point at `--expand`.
    Cli,
    /// Interactive session: point at `:more` / `:less`.
    Interactive,
}

#[derive(serde::Serialize)]
struct SectionContext<'a> {
    title: &'static str,
    text: &'a str,
    hint: Option<String>,
}

#[derive(serde::Serialize)]
struct NameRow<'a> {
    name: &'a str,
    mapped: &'a str,
}

#[derive(serde::Serialize)]
struct QueryRow<'a> {
    strategy: &'static str,
    query: &'a str,
}

fn section_hint(id: &str, state: Option<ToggleState>, hint: ToggleHint) -> Option<String> {
    let state = state?;
    match (hint, state) {
        (ToggleHint::Interactive, ToggleState::Collapsed) => {
            Some(format!("[{}] :more {id}", state.label()))
        }
        (ToggleHint::Interactive, ToggleState::Expanded) => {
            Some(format!("[{}] :less {id}", state.label()))
        }
        (ToggleHint::Cli, ToggleState::Collapsed) => {
            Some(format!("[{}] rerun with --expand", state.label()))
        }
        (ToggleHint::Cli, ToggleState::Expanded) => None,
    }
}

fn env() -> Result<&'static Environment<'static>, MedLookupError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template(
        "lookup.md.j2",
        include_str!("../../templates/lookup.md.j2"),
    )?;
    env.add_template("names.md.j2", include_str!("../../templates/names.md.j2"))?;
    env.add_template(
        "queries.md.j2",
        include_str!("../../templates/queries.md.j2"),
    )?;

    Ok(ENV.get_or_init(|| env))
}

fn append_evidence_urls(mut body: String, urls: Vec<(&str, String)>) -> String {
    let links = urls
        .into_iter()
        .filter(|(_, url)| !url.trim().is_empty())
        .map(|(label, url)| format!("[{label}]({url})"))
        .collect::<Vec<_>>();
    if links.is_empty() {
        return body;
    }
    if !body.ends_with('\n') {
        body.push('\n');
    }
    body.push('\n');
    body.push_str(&links.join(" | "));
    body.push('\n');
    body
}

fn card_evidence_urls(view: &CardView) -> Vec<(&'static str, String)> {
    view.card()
        .dailymed_url
        .iter()
        .map(|url| ("DailyMed", url.clone()))
        .collect()
}

/// Renders the suggestion line and card, or the no-results message.
pub fn lookup_markdown(
    outcome: &LookupOutcome,
    view: Option<&CardView>,
    hint: ToggleHint,
) -> Result<String, MedLookupError> {
    let tmpl = env()?.get_template("lookup.md.j2")?;
    let rows = view.map(CardView::rows).unwrap_or_default();
    let sections: Vec<SectionContext<'_>> = rows
        .iter()
        .map(|row| SectionContext {
            title: row.title,
            text: row.text,
            hint: section_hint(row.id, row.state, hint),
        })
        .collect();

    let body = tmpl.render(context! {
        suggestion => outcome.suggestion(),
        card => view.map(CardView::card),
        sections => sections,
        matched_by => outcome.matched_by.map(QueryStrategy::label),
        search_term => &outcome.search_term,
    })?;

    Ok(match view {
        Some(view) => append_evidence_urls(body, card_evidence_urls(view)),
        None => body,
    })
}

pub fn names_markdown(names: &NameMap) -> Result<String, MedLookupError> {
    let tmpl = env()?.get_template("names.md.j2")?;
    let entries: Vec<NameRow<'_>> = names
        .iter()
        .map(|(name, mapped)| NameRow { name, mapped })
        .collect();
    Ok(tmpl.render(context! { entries => entries })?)
}

pub fn queries_markdown(
    search_term: &str,
    substitution: Option<&NameSubstitution>,
    queries: &[(QueryStrategy, String)],
) -> Result<String, MedLookupError> {
    let tmpl = env()?.get_template("queries.md.j2")?;
    let rows: Vec<QueryRow<'_>> = queries
        .iter()
        .map(|(strategy, query)| QueryRow {
            strategy: strategy.label(),
            query,
        })
        .collect();
    Ok(tmpl.render(context! {
        search_term => search_term,
        substitution => substitution,
        rows => rows,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::lookup::fallback_queries;
    use crate::transform::label::{MedicineCard, SectionId, from_label};

    fn long_card() -> MedicineCard {
        let record = serde_json::from_value(serde_json::json!({
            "set_id": "5f1c",
            "effective_time": "20240105",
            "openfda": {
                "brand_name": ["Tylenol"],
                "generic_name": ["ACETAMINOPHEN"],
                "manufacturer_name": ["Kenvue Brands LLC"]
            },
            "purpose": ["Pain reliever/fever reducer"],
            "active_ingredient": ["Acetaminophen 500 mg"],
            "dosage_and_administration": ["d".repeat(400)]
        }))
        .unwrap();
        from_label(&record)
    }

    fn outcome(card: Option<MedicineCard>, substitution: Option<NameSubstitution>) -> LookupOutcome {
        LookupOutcome {
            input: "panadol".into(),
            search_term: "acetaminophen".into(),
            substitution,
            matched_by: card.as_ref().map(|_| QueryStrategy::BrandName),
            total_matches: None,
            data_last_updated: None,
            card,
        }
    }

    #[test]
    fn renders_no_results_without_card() {
        let out = outcome(None, None);
        let md = lookup_markdown(&out, None, ToggleHint::Cli).unwrap();
        assert!(md.contains("No results found. Try another name or brand."));
        assert!(!md.contains("Manufacturer"));
        assert!(!md.contains("Showing results for"));
    }

    #[test]
    fn renders_card_fields_sections_and_note() {
        let card = long_card();
        let view = CardView::new(card.clone());
        let out = outcome(Some(card), None);
        let md = lookup_markdown(&out, Some(&view), ToggleHint::Cli).unwrap();

        assert!(md.contains("# Tylenol"));
        assert!(md.contains("**Generic Name:** ACETAMINOPHEN"));
        assert!(md.contains("**Manufacturer:** Kenvue Brands LLC"));
        assert!(md.contains("**Active Ingredients:** Acetaminophen 500 mg"));
        assert!(md.contains("## Purpose / Indications"));
        assert!(md.contains("## How to Use"));
        assert!(md.contains("## Dosage & Administration"));
        assert!(md.contains("## Storage"));
        assert!(md.contains("Not available"));
        assert!(md.contains("[Show more] rerun with --expand"));
        assert!(md.contains("Always consult a healthcare provider before taking medicine."));
        assert!(md.contains("Label effective: 2024-01-05"));
        assert!(md.contains("Matched by brand name query"));
        assert!(md.contains("[DailyMed](https://dailymed.nlm.nih.gov/dailymed/lookup.cfm?setid=5f1c)"));
    }

    #[test]
    fn generic_name_line_is_omitted_when_same_as_name() {
        let record = serde_json::from_value(serde_json::json!({
            "openfda": {"generic_name": ["IBUPROFEN"]}
        }))
        .unwrap();
        let card = from_label(&record);
        let view = CardView::new(card.clone());
        let md = lookup_markdown(&outcome(Some(card), None), Some(&view), ToggleHint::Cli).unwrap();
        assert!(md.contains("# IBUPROFEN"));
        assert!(!md.contains("Generic Name"));
        assert!(!md.contains("Active Ingredients"));
        assert!(md.contains("**Manufacturer:** Unknown"));
    }

    #[test]
    fn interactive_hint_tracks_toggle_state() {
        let card = long_card();
        let mut view = CardView::new(card.clone());
        let out = outcome(Some(card), None);

        let md = lookup_markdown(&out, Some(&view), ToggleHint::Interactive).unwrap();
        assert!(md.contains("[Show more] :more dosage"));

        view.toggle(SectionId::Dosage).unwrap();
        let md = lookup_markdown(&out, Some(&view), ToggleHint::Interactive).unwrap();
        assert!(md.contains("[Show less] :less dosage"));
        assert!(md.contains(&"d".repeat(400)));
    }

    #[test]
    fn suggestion_references_both_names() {
        let card = long_card();
        let view = CardView::new(card.clone());
        let out = outcome(
            Some(card),
            Some(NameSubstitution {
                original: "panadol".into(),
                mapped: "acetaminophen".into(),
            }),
        );
        let md = lookup_markdown(&out, Some(&view), ToggleHint::Cli).unwrap();
        assert!(md.contains(
            "Showing results for \"acetaminophen\" (US equivalent of \"panadol\")"
        ));
    }

    #[test]
    fn names_markdown_lists_entries() {
        let md = names_markdown(&NameMap::builtin()).unwrap();
        assert!(md.contains("| panadol | acetaminophen |"));
        assert!(md.contains("| brufen | ibuprofen |"));
        assert!(md.contains("7 names mapped."));

        let empty = names_markdown(&NameMap::empty()).unwrap();
        assert!(empty.contains("No names mapped."));
    }

    #[test]
    fn queries_markdown_lists_all_four_queries() {
        let queries = fallback_queries("ibuprofen");
        let sub = NameSubstitution {
            original: "brufen".into(),
            mapped: "ibuprofen".into(),
        };
        let md = queries_markdown("ibuprofen", Some(&sub), &queries).unwrap();
        assert!(md.contains("| 1 | brand name | `openfda.brand_name:\"ibuprofen\"` |"));
        assert!(md.contains("| 4 | free text | `\"ibuprofen\"` |"));
        assert!(md.contains("\"brufen\" is searched as \"ibuprofen\""));
    }
}
