use serde::Serialize;

use crate::error::MedLookupError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, MedLookupError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::to_pretty;
    use crate::entities::lookup::{LookupOutcome, QueryStrategy};
    use crate::entities::names::NameSubstitution;
    use crate::transform::label::from_label;

    #[test]
    fn json_render_lookup_outcome() {
        let record = serde_json::from_value(serde_json::json!({
            "openfda": {"brand_name": ["Brufen"], "generic_name": ["IBUPROFEN"]},
            "purpose": ["Pain reliever"]
        }))
        .unwrap();
        let outcome = LookupOutcome {
            input: "brufen".into(),
            search_term: "ibuprofen".into(),
            substitution: Some(NameSubstitution {
                original: "brufen".into(),
                mapped: "ibuprofen".into(),
            }),
            matched_by: Some(QueryStrategy::GenericName),
            total_matches: Some(1),
            data_last_updated: None,
            card: Some(from_label(&record)),
        };

        let json = to_pretty(&outcome).expect("outcome json");
        assert!(json.contains('\n'));
        assert!(json.contains("\"search_term\": \"ibuprofen\""));
        assert!(json.contains("\"matched_by\": \"generic_name\""));
        assert!(json.contains("\"needs_toggle\": false"));
        assert!(json.contains("\"id\": \"purpose\""));
        assert!(!json.contains("data_last_updated"));
    }

    #[test]
    fn json_render_outcome_without_card_omits_card() {
        let outcome = LookupOutcome {
            input: "zzzz".into(),
            search_term: "zzzz".into(),
            substitution: None,
            matched_by: None,
            total_matches: None,
            data_last_updated: None,
            card: None,
        };
        let json = to_pretty(&outcome).expect("outcome json");
        assert!(!json.contains("\"card\""));
        assert!(json.contains("\"input\": \"zzzz\""));
    }
}
