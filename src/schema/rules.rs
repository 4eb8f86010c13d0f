//! Conditional-requirement rule table
//!
//! A rule names a discriminator field and maps each of its values to the
//! field that becomes required when the discriminator holds that value.
//! Adding a new source of ligands is a new entry in `cases`, not new code.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One conditional-requirement group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRule {
    /// Group identifier reported in validation errors
    pub id: String,
    /// Field whose value selects the required member
    pub discriminator: String,
    /// Discriminator value -> field that must be non-empty
    pub cases: IndexMap<String, String>,
}

impl ConditionalRule {
    /// Field required when the discriminator holds `value`
    pub fn required_for(&self, value: &str) -> Option<&str> {
        self.cases.get(value).map(String::as_str)
    }

    /// All fields governed by this rule, without duplicates
    pub fn members(&self) -> impl Iterator<Item = &str> {
        let members: IndexSet<&str> = self.cases.values().map(String::as_str).collect();
        members.into_iter()
    }
}
