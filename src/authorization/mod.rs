pub mod command;
pub mod observer;
pub mod session;
pub mod verdict;

use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::TacauthzError;
use crate::policy::Config;
use crate::policy::model::User;
use crate::policy::reduce::{EffectivePolicy, reduce};
use crate::protocol::{AuthorReply, AuthorizationRequest};
use command::{FirstMatch, MostSpecific};
use observer::{Observer, StrategyKind};
use session::SessionMatcher;
use verdict::{DenyReason, MSG_DECODE_FAILED, MSG_INTERNAL_ERROR, Verdict};

/// Which command matcher a deployment runs. Exactly one is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherGeneration {
    /// First matching rule in list order wins.
    #[default]
    V1,
    /// Most specific matching rule wins; honours service-scoped rules.
    V2,
}

impl FromStr for MatcherGeneration {
    type Err = TacauthzError;

    fn from_str(s: &str) -> Result<Self, TacauthzError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(MatcherGeneration::V1),
            "v2" => Ok(MatcherGeneration::V2),
            other => Err(TacauthzError::PolicyValidation(format!(
                "unknown command matcher '{other}', expected v1 or v2"
            ))),
        }
    }
}

/// One authorization strategy in the cascade.
///
/// `applicable` is a pure capability check on the request shape; the cascade
/// calls `evaluate` only on the first strategy that claims the request.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn applicable(&self, request: &AuthorizationRequest) -> bool;

    fn evaluate(&self, policy: &EffectivePolicy, request: &AuthorizationRequest) -> Verdict;
}

/// Holds the ordered strategy cascade: the configured command matcher, then
/// the session matcher. Shared across requests; carries no per-request state.
pub struct Authorizer {
    strategies: Vec<Box<dyn Strategy>>,
    observer: Arc<dyn Observer>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<StrategyKind> = self.strategies.iter().map(|s| s.kind()).collect();
        f.debug_struct("Authorizer")
            .field("strategies", &kinds)
            .finish()
    }
}

impl Authorizer {
    pub fn new(generation: MatcherGeneration, observer: Arc<dyn Observer>) -> Self {
        let command: Box<dyn Strategy> = match generation {
            MatcherGeneration::V1 => Box::new(FirstMatch::new(Arc::clone(&observer))),
            MatcherGeneration::V2 => Box::new(MostSpecific::new(Arc::clone(&observer))),
        };
        let session: Box<dyn Strategy> = Box::new(SessionMatcher::new(Arc::clone(&observer)));
        Self {
            strategies: vec![command, session],
            observer,
        }
    }

    pub fn strategies(&self) -> &[Box<dyn Strategy>] {
        &self.strategies
    }

    /// Reduce `user` against `config` into a request-scoped authorizer.
    ///
    /// A panic during reduction, observer callbacks included, comes back as
    /// the error verdict to send instead.
    pub fn for_user(&self, config: &Config, user: &User) -> Result<UserAuthorizer<'_>, Verdict> {
        let policy = self.guarded(&user.name, || reduce(config, user, &*self.observer))?;
        Ok(UserAuthorizer {
            authorizer: self,
            policy,
        })
    }

    pub fn evaluate(
        &self,
        config: &Config,
        user: &User,
        request: &AuthorizationRequest,
    ) -> Verdict {
        match self.for_user(config, user) {
            Ok(scoped) => scoped.evaluate(request),
            Err(verdict) => verdict,
        }
    }

    /// Run `f`, turning a panic into `Verdict::Error`.
    fn guarded<T>(&self, user: &str, f: impl FnOnce() -> T) -> Result<T, Verdict> {
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            // The observer may be what panicked in the first place.
            let reported =
                panic::catch_unwind(AssertUnwindSafe(|| self.observer.internal_error(user, &detail)));
            if reported.is_err() {
                error!(user, %detail, "authorization fault could not be reported to the observer");
            }
            Verdict::error(MSG_INTERNAL_ERROR)
        })
    }
}

/// An authorizer bound to one user's effective policy.
pub struct UserAuthorizer<'a> {
    authorizer: &'a Authorizer,
    policy: EffectivePolicy,
}

impl UserAuthorizer<'_> {
    pub fn policy(&self) -> &EffectivePolicy {
        &self.policy
    }

    /// Run the cascade. Exactly one strategy, or none, decides. A panic
    /// anywhere in selection, evaluation or observation yields an error
    /// verdict instead of unwinding further.
    pub fn evaluate(&self, request: &AuthorizationRequest) -> Verdict {
        self.authorizer
            .guarded(&self.policy.user, || self.cascade(request))
            .unwrap_or_else(|verdict| verdict)
    }

    fn cascade(&self, request: &AuthorizationRequest) -> Verdict {
        let observer = &self.authorizer.observer;
        let user = self.policy.user.as_str();

        let Some(strategy) = self
            .authorizer
            .strategies
            .iter()
            .find(|s| s.applicable(request))
        else {
            observer.unclaimed(user);
            return Verdict::Deny {
                reason: DenyReason::Unclaimed,
            };
        };

        observer.strategy_selected(user, strategy.kind());
        let verdict = strategy.evaluate(&self.policy, request);
        debug!(user, strategy = %strategy.kind(), ?verdict, "authorization decided");
        verdict
    }

    /// Decode a raw authorization body, evaluate it and build the reply.
    /// A body that fails to decode never reaches a strategy.
    #[tracing::instrument(skip_all, fields(user = %self.policy.user, request_id = %Uuid::now_v7()))]
    pub fn handle(&self, body: &[u8]) -> AuthorReply {
        let verdict = match AuthorizationRequest::decode(body) {
            Ok(request) => self.evaluate(&request),
            Err(e) => self
                .authorizer
                .guarded(&self.policy.user, || {
                    self.authorizer.observer.decode_failed(&e);
                    Verdict::error(MSG_DECODE_FAILED)
                })
                .unwrap_or_else(|verdict| verdict),
        };
        AuthorReply::from(&verdict)
    }
}
