use serde::{Deserialize, Serialize};

/// What a matching rule does with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Permit,
    Deny,
}

impl Action {
    pub fn is_permit(self) -> bool {
        matches!(self, Action::Permit)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Permit => f.write_str("permit"),
            Action::Deny => f.write_str("deny"),
        }
    }
}
