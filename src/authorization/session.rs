use std::sync::Arc;

use super::Strategy;
use super::observer::{Observer, StrategyKind};
use super::verdict::Verdict;
use crate::policy::reduce::EffectivePolicy;
use crate::protocol::AuthorizationRequest;

/// Service-level authorization for requests that carry no command, e.g. a
/// shell or ppp session start. First matching service rule wins.
pub struct SessionMatcher {
    observer: Arc<dyn Observer>,
}

impl SessionMatcher {
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self { observer }
    }
}

impl Strategy for SessionMatcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Session
    }

    fn applicable(&self, request: &AuthorizationRequest) -> bool {
        request.command().is_none() && !request.service.is_empty()
    }

    fn evaluate(&self, policy: &EffectivePolicy, request: &AuthorizationRequest) -> Verdict {
        let Some(rule) = policy
            .services
            .iter()
            .find(|rule| rule.matches(&request.service, &request.attributes))
        else {
            return Verdict::no_match();
        };

        self.observer
            .rule_matched(&policy.user, self.kind(), rule.name(), rule.action());
        Verdict::from_action(rule.action(), rule.set_values())
    }
}
