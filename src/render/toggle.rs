use std::collections::HashMap;

use serde::Serialize;

use crate::error::MedLookupError;
use crate::transform::label::{MedicineCard, SectionId};

pub(crate) const SHOW_MORE: &str = "Show more";
pub(crate) const SHOW_LESS: &str = "Show less";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleState {
    #[default]
    Collapsed,
    Expanded,
}

impl ToggleState {
    pub fn flipped(self) -> Self {
        match self {
            ToggleState::Collapsed => ToggleState::Expanded,
            ToggleState::Expanded => ToggleState::Collapsed,
        }
    }

    /// Label of the control that flips this state.
    pub fn label(self) -> &'static str {
        match self {
            ToggleState::Collapsed => SHOW_MORE,
            ToggleState::Expanded => SHOW_LESS,
        }
    }
}

/// One section as it is currently displayed.
#[derive(Debug, Clone, Serialize)]
pub struct SectionRow<'a> {
    pub id: &'static str,
    pub title: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ToggleState>,
}

/// A rendered card plus the show-more/show-less state of its truncated sections.
#[derive(Debug, Clone)]
pub struct CardView {
    card: MedicineCard,
    states: HashMap<SectionId, ToggleState>,
}

impl CardView {
    pub fn new(card: MedicineCard) -> Self {
        let states = card
            .sections
            .iter()
            .filter(|s| s.text.needs_toggle)
            .map(|s| (s.id, ToggleState::default()))
            .collect();
        Self { card, states }
    }

    pub fn card(&self) -> &MedicineCard {
        &self.card
    }

    /// `None` when the section has no toggle.
    pub fn state(&self, id: SectionId) -> Option<ToggleState> {
        self.states.get(&id).copied()
    }

    pub fn displayed_text(&self, id: SectionId) -> Option<&str> {
        let section = self.card.section(id)?;
        Some(match self.state(id) {
            Some(ToggleState::Expanded) => section.text.full.as_str(),
            _ => section.text.short.as_str(),
        })
    }

    pub fn toggle(&mut self, id: SectionId) -> Result<ToggleState, MedLookupError> {
        let current = self.require_toggle(id)?;
        self.set(id, current.flipped())
    }

    pub fn set(&mut self, id: SectionId, state: ToggleState) -> Result<ToggleState, MedLookupError> {
        self.require_toggle(id)?;
        self.states.insert(id, state);
        Ok(state)
    }

    pub fn expand_all(&mut self) {
        for state in self.states.values_mut() {
            *state = ToggleState::Expanded;
        }
    }

    pub fn rows(&self) -> Vec<SectionRow<'_>> {
        self.card
            .sections
            .iter()
            .map(|s| SectionRow {
                id: s.id.as_str(),
                title: s.title,
                text: self.displayed_text(s.id).unwrap_or_default(),
                state: self.state(s.id),
            })
            .collect()
    }

    fn require_toggle(&self, id: SectionId) -> Result<ToggleState, MedLookupError> {
        self.state(id).ok_or_else(|| {
            MedLookupError::InvalidArgument(format!(
                "Section '{}' is shown in full and has no toggle.",
                id.as_str()
            ))
        })
    }
}
