use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PICTOGRAPH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\x{1F300}-\x{1F9FF}]|[\x{2300}-\x{23FF}]|[\x{2702}-\x{27B0}]|[\x{1F600}-\x{1F64F}]|[\x{1F680}-\x{1F6FF}]|[\x{2600}-\x{26FF}]|\x{FE0F}",
    )
    .unwrap()
});

/// Predefined prompt the user can send without typing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickOption {
    /// Button caption
    pub label: String,
    /// Text actually sent to the backend
    pub query: String,
}

impl QuickOption {
    pub fn new(label: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            query: query.into(),
        }
    }

    /// Caption with emoji removed, suitable for dropping into the input box
    pub fn plain_label(&self) -> String {
        PICTOGRAPH_RE.replace_all(&self.label, "").trim().to_string()
    }
}

pub fn default_quick_options() -> Vec<QuickOption> {
    vec![
        QuickOption::new(
            "Kde najdu nejlepší střelce? 🏒",
            "Kde najdu nejlepší střelce v extralize?",
        ),
        QuickOption::new(
            "Co se skrývá pod zkratkou TOI..? ⏱️",
            "Co znamená zkratka TOI v hokeji?",
        ),
        QuickOption::new(
            "Jak filtrovat hráče v tabulce? 🔍",
            "Jak mohu filtrovat hráče v tabulce podle různých kritérií?",
        ),
    ]
}
