use serde::{Deserialize, Serialize};

/// One row of a checklist. Nesting is implied by `indent`: an item's parent
/// is the nearest preceding item with a strictly lower indent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub indent: u32,
    #[serde(default)]
    pub completed: bool,
}

impl ChecklistItem {
    pub fn new(id: impl Into<String>, indent: u32) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
            indent,
            completed: false,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}
