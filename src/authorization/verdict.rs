use serde::Serialize;

use crate::policy::action::Action;
use crate::protocol::AvPair;

pub const MSG_NOT_AUTHORIZED: &str = "not authorized";
pub const MSG_DECODE_FAILED: &str = "unable to decode AuthorRequest packet";
pub const MSG_INTERNAL_ERROR: &str = "internal authorization error";

/// Why a request was denied. Only `Unclaimed` is reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// An explicit deny rule matched.
    Rule,
    /// The matcher ran to completion without a match.
    NoMatchingRule,
    /// No strategy accepted the request shape.
    Unclaimed,
}

/// Final outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Verdict {
    Permit { attributes: Vec<AvPair> },
    Deny { reason: DenyReason },
    Error { message: String },
}

impl Verdict {
    pub fn error(message: impl Into<String>) -> Self {
        Verdict::Error {
            message: message.into(),
        }
    }

    pub fn no_match() -> Self {
        Verdict::Deny {
            reason: DenyReason::NoMatchingRule,
        }
    }

    pub(crate) fn from_action(action: Action, attributes: &[AvPair]) -> Self {
        match action {
            Action::Permit => Verdict::Permit {
                attributes: attributes.to_vec(),
            },
            Action::Deny => Verdict::Deny {
                reason: DenyReason::Rule,
            },
        }
    }

    pub fn is_permit(&self) -> bool {
        matches!(self, Verdict::Permit { .. })
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Verdict::Deny { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error { .. })
    }

    pub fn attributes(&self) -> &[AvPair] {
        match self {
            Verdict::Permit { attributes } => attributes,
            _ => &[],
        }
    }

    /// Message for the client, if any.
    pub fn server_msg(&self) -> Option<&str> {
        match self {
            Verdict::Deny {
                reason: DenyReason::Unclaimed,
            } => Some(MSG_NOT_AUTHORIZED),
            Verdict::Error { message } => Some(message),
            _ => None,
        }
    }
}
