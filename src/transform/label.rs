use serde::Serialize;

use crate::sources::openfda::LabelRecord;
use crate::utils::serde::StringOrVec;

pub(crate) const DEFAULT_TRUNCATE_CHARS: usize = 300;
pub(crate) const STORAGE_TRUNCATE_CHARS: usize = 200;

const NOT_AVAILABLE: &str = "Not available";
const UNKNOWN_MEDICINE: &str = "Unknown Medicine";
const UNKNOWN_MANUFACTURER: &str = "Unknown";
const ELLIPSIS: &str = "...";
const DAILYMED_SETID_URL: &str = "https://dailymed.nlm.nih.gov/dailymed/lookup.cfm?setid=";

/// Abbreviated and full renderings of one label text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayField {
    pub short: String,
    pub full: String,
    pub needs_toggle: bool,
}

/// Truncates `text` to `max_chars` characters.
pub(crate) fn truncate(text: &str, max_chars: usize) -> DisplayField {
    if text.is_empty() {
        return DisplayField {
            short: NOT_AVAILABLE.to_string(),
            full: String::new(),
            needs_toggle: false,
        };
    }

    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return DisplayField {
            short: text.to_string(),
            full: text.to_string(),
            needs_toggle: false,
        };
    };

    let mut short = String::with_capacity(cut + ELLIPSIS.len());
    short.push_str(&text[..cut]);
    short.push_str(ELLIPSIS);
    DisplayField {
        short,
        full: text.to_string(),
        needs_toggle: true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Purpose,
    Use,
    Dosage,
    Storage,
}

impl SectionId {
    pub const ALL: [SectionId; 4] = [
        SectionId::Purpose,
        SectionId::Use,
        SectionId::Dosage,
        SectionId::Storage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionId::Purpose => "purpose",
            SectionId::Use => "use",
            SectionId::Dosage => "dosage",
            SectionId::Storage => "storage",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SectionId::Purpose => "Purpose / Indications",
            SectionId::Use => "How to Use",
            SectionId::Dosage => "Dosage & Administration",
            SectionId::Storage => "Storage",
        }
    }

    fn truncate_chars(self) -> usize {
        match self {
            SectionId::Storage => STORAGE_TRUNCATE_CHARS,
            _ => DEFAULT_TRUNCATE_CHARS,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "purpose" | "indications" => Some(SectionId::Purpose),
            "use" | "usage" | "how-to-use" => Some(SectionId::Use),
            "dosage" | "dose" => Some(SectionId::Dosage),
            "storage" => Some(SectionId::Storage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSection {
    pub id: SectionId,
    pub title: &'static str,
    #[serde(flatten)]
    pub text: DisplayField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedicineCard {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    pub manufacturer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_ingredients: Option<String>,
    pub sections: Vec<CardSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dailymed_url: Option<String>,
}

impl MedicineCard {
    pub fn section(&self, id: SectionId) -> Option<&CardSection> {
        self.sections.iter().find(|s| s.id == id)
    }
}

fn first_of<'a>(candidates: &[&'a StringOrVec]) -> Option<&'a str> {
    candidates.iter().find_map(|v| v.first_nonempty())
}

/// Like [`first_of`], but returns the label text untrimmed.
fn first_text_of<'a>(candidates: &[&'a StringOrVec]) -> Option<&'a str> {
    candidates
        .iter()
        .find_map(|v| v.first().filter(|text| !text.trim().is_empty()))
}

fn section(id: SectionId, raw: Option<&str>) -> CardSection {
    CardSection {
        id,
        title: id.title(),
        text: truncate(raw.unwrap_or_default(), id.truncate_chars()),
    }
}

fn joined_nonempty(values: &StringOrVec) -> Option<String> {
    let joined = values
        .iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

/// Builds the display card for a label record.
///
/// Substance names stand in for active ingredients when the label omits them.
pub(crate) fn from_label(record: &LabelRecord) -> MedicineCard {
    let openfda = &record.openfda;

    let name = first_of(&[&openfda.brand_name, &openfda.generic_name])
        .unwrap_or(UNKNOWN_MEDICINE)
        .to_string();
    let generic_name = openfda
        .generic_name
        .first_nonempty()
        .filter(|g| *g != name)
        .map(str::to_string);
    let manufacturer = openfda
        .manufacturer_name
        .first_nonempty()
        .unwrap_or(UNKNOWN_MANUFACTURER)
        .to_string();

    let active_ingredients = joined_nonempty(&record.active_ingredient)
        .or_else(|| joined_nonempty(&openfda.substance_name));

    let sections = vec![
        section(
            SectionId::Purpose,
            first_text_of(&[&record.purpose, &record.indications_and_usage]),
        ),
        section(
            SectionId::Use,
            first_text_of(&[
                &record.information_for_patients,
                &record.patient_medication_information,
            ]),
        ),
        section(
            SectionId::Dosage,
            first_text_of(&[&record.dosage_and_administration]),
        ),
        section(SectionId::Storage, first_text_of(&[&record.storage_and_handling])),
    ];

    let effective_date = record
        .effective_time
        .as_deref()
        .and_then(crate::utils::date::format_yyyymmdd);
    let dailymed_url = record
        .set_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|id| format!("{DAILYMED_SETID_URL}{id}"));

    MedicineCard {
        name,
        generic_name,
        manufacturer,
        active_ingredients,
        sections,
        effective_date,
        dailymed_url,
    }
}
