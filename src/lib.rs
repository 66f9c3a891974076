//! TACACS+ authorization decision engine.
//!
//! Flattens a user's group-derived rules into an effective policy, runs the
//! request through an ordered strategy cascade (command matcher, then session
//! matcher) and returns a default-deny verdict for the reply encoder.
//!
//! An [`EffectivePolicy`](policy::reduce::EffectivePolicy) exposes its rules
//! but can only be built by [`reduce`](policy::reduce::reduce); see
//! `tests/ui/effective_policy_sealed.rs`.

pub mod authorization;
pub mod error;
pub mod policy;
pub mod protocol;
pub mod store;

pub use authorization::{Authorizer, MatcherGeneration, UserAuthorizer};
pub use authorization::verdict::{DenyReason, Verdict};
pub use error::TacauthzError;
pub use policy::Config;
pub use protocol::{AuthorReply, AuthorizationRequest};
pub use store::ConfigStore;
