use tracing::{debug, error, warn};

use crate::policy::action::Action;
use crate::protocol::DecodeError;

/// The strategy that claimed a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    CommandV1,
    CommandV2,
    Session,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::CommandV1 => f.write_str("command-v1"),
            StrategyKind::CommandV2 => f.write_str("command-v2"),
            StrategyKind::Session => f.write_str("session"),
        }
    }
}

/// Observation sink for operational events.
///
/// Injected into the authorizer and every matcher. None of these events
/// change a verdict; they exist so operators can diagnose misconfiguration.
pub trait Observer: Send + Sync {
    fn decode_failed(&self, error: &DecodeError);
    fn strategy_selected(&self, user: &str, strategy: StrategyKind);
    fn unclaimed(&self, user: &str);
    fn missing_group(&self, user: &str, group: &str);
    fn rule_matched(&self, user: &str, strategy: StrategyKind, rule: &str, action: Action);
    fn internal_error(&self, user: &str, detail: &str);
}

/// Discards every event.
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn decode_failed(&self, _error: &DecodeError) {}
    fn strategy_selected(&self, _user: &str, _strategy: StrategyKind) {}
    fn unclaimed(&self, _user: &str) {}
    fn missing_group(&self, _user: &str, _group: &str) {}
    fn rule_matched(&self, _user: &str, _strategy: StrategyKind, _rule: &str, _action: Action) {}
    fn internal_error(&self, _user: &str, _detail: &str) {}
}

/// Emits each event as a `tracing` record.
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn decode_failed(&self, error: &DecodeError) {
        warn!(%error, "unable to decode authorization request");
    }

    fn strategy_selected(&self, user: &str, strategy: StrategyKind) {
        debug!(user, %strategy, "authorization strategy selected");
    }

    fn unclaimed(&self, user: &str) {
        debug!(user, "no authorization strategy claimed the request");
    }

    fn missing_group(&self, user: &str, group: &str) {
        warn!(user, group, "user references a group absent from the configuration");
    }

    fn rule_matched(&self, user: &str, strategy: StrategyKind, rule: &str, action: Action) {
        debug!(user, %strategy, rule, %action, "rule matched");
    }

    fn internal_error(&self, user: &str, detail: &str) {
        error!(user, detail, "authorization strategy failed");
    }
}

pub mod testing {
    //! Recording observer for asserting which events fire.

    use std::sync::Mutex;

    use super::{Observer, StrategyKind};
    use crate::policy::action::Action;
    use crate::protocol::DecodeError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        DecodeFailed(DecodeError),
        StrategySelected {
            user: String,
            strategy: StrategyKind,
        },
        Unclaimed {
            user: String,
        },
        MissingGroup {
            user: String,
            group: String,
        },
        RuleMatched {
            user: String,
            strategy: StrategyKind,
            rule: String,
            action: Action,
        },
        InternalError {
            user: String,
        },
    }

    #[derive(Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        fn push(&self, event: Event) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }

    impl Observer for RecordingObserver {
        fn decode_failed(&self, error: &DecodeError) {
            self.push(Event::DecodeFailed(error.clone()));
        }

        fn strategy_selected(&self, user: &str, strategy: StrategyKind) {
            self.push(Event::StrategySelected {
                user: user.to_owned(),
                strategy,
            });
        }

        fn unclaimed(&self, user: &str) {
            self.push(Event::Unclaimed {
                user: user.to_owned(),
            });
        }

        fn missing_group(&self, user: &str, group: &str) {
            self.push(Event::MissingGroup {
                user: user.to_owned(),
                group: group.to_owned(),
            });
        }

        fn rule_matched(&self, user: &str, strategy: StrategyKind, rule: &str, action: Action) {
            self.push(Event::RuleMatched {
                user: user.to_owned(),
                strategy,
                rule: rule.to_owned(),
                action,
            });
        }

        fn internal_error(&self, user: &str, _detail: &str) {
            self.push(Event::InternalError {
                user: user.to_owned(),
            });
        }
    }
}
