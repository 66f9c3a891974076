use std::sync::Arc;

use super::Strategy;
use super::observer::{Observer, StrategyKind};
use super::verdict::Verdict;
use crate::policy::model::CommandRule;
use crate::policy::reduce::EffectivePolicy;
use crate::protocol::AuthorizationRequest;

/// Legacy command matcher: the first rule in list order that matches wins.
pub struct FirstMatch {
    observer: Arc<dyn Observer>,
}

impl FirstMatch {
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self { observer }
    }
}

impl Strategy for FirstMatch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CommandV1
    }

    fn applicable(&self, request: &AuthorizationRequest) -> bool {
        request.command().is_some()
    }

    fn evaluate(&self, policy: &EffectivePolicy, request: &AuthorizationRequest) -> Verdict {
        let Some(command) = request.command() else {
            return Verdict::no_match();
        };
        let rule = policy
            .commands
            .iter()
            .find(|rule| rule.matches(command, &request.args));
        decide(&*self.observer, self.kind(), policy, rule)
    }
}

/// Refined command matcher: among matching rules the most specific pattern
/// wins, ties fall back to list order. Rules scoped to a service only apply
/// to requests for that service.
pub struct MostSpecific {
    observer: Arc<dyn Observer>,
}

impl MostSpecific {
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self { observer }
    }
}

impl Strategy for MostSpecific {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CommandV2
    }

    fn applicable(&self, request: &AuthorizationRequest) -> bool {
        request.command().is_some()
    }

    fn evaluate(&self, policy: &EffectivePolicy, request: &AuthorizationRequest) -> Verdict {
        let Some(command) = request.command() else {
            return Verdict::no_match();
        };
        let rule = policy
            .commands
            .iter()
            .filter(|rule| rule.service().is_none_or(|s| s == request.service))
            .filter(|rule| rule.matches(command, &request.args))
            .fold(None, |best: Option<&CommandRule>, rule| match best {
                // `>=` keeps the earlier rule on a tie
                Some(b) if b.pattern().specificity() >= rule.pattern().specificity() => Some(b),
                _ => Some(rule),
            });
        decide(&*self.observer, self.kind(), policy, rule)
    }
}

fn decide(
    observer: &dyn Observer,
    kind: StrategyKind,
    policy: &EffectivePolicy,
    rule: Option<&CommandRule>,
) -> Verdict {
    match rule {
        Some(rule) => {
            observer.rule_matched(&policy.user, kind, rule.pattern().as_str(), rule.action());
            Verdict::from_action(rule.action(), &[])
        }
        None => Verdict::no_match(),
    }
}
