use regex::{Regex, RegexBuilder};

use super::action::Action;
use super::pattern::CommandPattern;
use crate::error::TacauthzError;
use crate::protocol::AvPair;

pub(super) fn compile_regex(context: &str, pattern: &str) -> Result<Regex, TacauthzError> {
    RegexBuilder::new(pattern)
        .size_limit(1 << 20)
        .nest_limit(50)
        .build()
        .map_err(|e| TacauthzError::PolicyValidation(format!("{context}: {e}")))
}

/// Governs whether a command invocation (name + arguments) may run.
#[derive(Debug, Clone)]
pub struct CommandRule {
    pattern: CommandPattern,
    action: Action,
    args: Vec<Regex>,
    service: Option<String>,
}

impl CommandRule {
    pub fn new(pattern: &str, action: Action) -> Result<Self, TacauthzError> {
        Ok(Self {
            pattern: CommandPattern::parse(pattern)?,
            action,
            args: Vec::new(),
            service: None,
        })
    }

    /// Positional argument regexes; pattern `i` is matched against argument `i`.
    pub fn with_args<S: AsRef<str>>(mut self, args: &[S]) -> Result<Self, TacauthzError> {
        self.args = args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                compile_regex(
                    &format!("command '{}', argument {i}", self.pattern.as_str()),
                    a.as_ref(),
                )
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Restrict the rule to one service. Only the specificity matcher honours it.
    pub fn scoped_to(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn pattern(&self) -> &CommandPattern {
        &self.pattern
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Pattern words and every positional argument regex match.
    pub fn matches(&self, command: &str, args: &[String]) -> bool {
        self.pattern.matches(command, args)
            && self
                .args
                .iter()
                .enumerate()
                .all(|(i, re)| args.get(i).is_some_and(|arg| re.is_match(arg)))
    }
}

/// Governs whether a session-level service may be granted.
#[derive(Debug, Clone)]
pub struct ServiceRule {
    name: String,
    action: Action,
    predicates: Vec<(String, Regex)>,
    set: Vec<AvPair>,
}

impl ServiceRule {
    pub fn new(name: impl Into<String>, action: Action) -> Result<Self, TacauthzError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TacauthzError::PolicyValidation(
                "service name must not be empty".to_owned(),
            ));
        }
        Ok(Self {
            name,
            action,
            predicates: Vec::new(),
            set: Vec::new(),
        })
    }

    /// Require the request attribute `attribute` to be present and match `pattern`.
    pub fn with_match(mut self, attribute: &str, pattern: &str) -> Result<Self, TacauthzError> {
        let re = compile_regex(
            &format!("service '{}', attribute '{attribute}'", self.name),
            pattern,
        )?;
        self.predicates.push((attribute.to_owned(), re));
        Ok(self)
    }

    /// Attribute echoed back to the client when the rule permits.
    pub fn with_set(mut self, attribute: &str, value: &str) -> Self {
        self.set.push(AvPair::mandatory(attribute, value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn set_values(&self) -> &[AvPair] {
        &self.set
    }

    pub fn matches(&self, service: &str, attributes: &[AvPair]) -> bool {
        self.name == service
            && self.predicates.iter().all(|(attr, re)| {
                attributes
                    .iter()
                    .find(|av| av.name == *attr)
                    .is_some_and(|av| re.is_match(&av.value))
            })
    }
}

/// Named, read-only bundle of rules shared by many users.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub(crate) name: String,
    pub(crate) services: Vec<ServiceRule>,
    pub(crate) commands: Vec<CommandRule>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_service(mut self, rule: ServiceRule) -> Self {
        self.services.push(rule);
        self
    }

    pub fn with_command(mut self, rule: CommandRule) -> Self {
        self.commands.push(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An authenticated principal: direct rules plus ordered group memberships.
#[derive(Debug, Clone, Default)]
pub struct User {
    pub(crate) name: String,
    pub(crate) groups: Vec<String>,
    pub(crate) services: Vec<ServiceRule>,
    pub(crate) commands: Vec<CommandRule>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_service(mut self, rule: ServiceRule) -> Self {
        self.services.push(rule);
        self
    }

    pub fn with_command(mut self, rule: CommandRule) -> Self {
        self.commands.push(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_owned()).collect()
    }

    #[test]
    fn command_rule_checks_positional_args() {
        let rule = CommandRule::new("reload", Action::Deny)
            .unwrap()
            .with_args(&["^in$", "^[0-9]+$"])
            .unwrap();
        assert!(rule.matches("reload", &args(&["in", "5"])));
        assert!(!rule.matches("reload", &args(&["in", "soon"])));
        assert!(!rule.matches("reload", &args(&["in"])));
    }

    #[test]
    fn command_rule_without_args_matches_any() {
        let rule = CommandRule::new("show", Action::Permit).unwrap();
        assert!(rule.matches("show", &[]));
        assert!(rule.matches("show", &args(&["version"])));
    }

    #[test]
    fn invalid_arg_regex_rejected() {
        let err = CommandRule::new("show", Action::Permit)
            .unwrap()
            .with_args(&["[invalid"])
            .unwrap_err();
        assert!(matches!(err, TacauthzError::PolicyValidation(_)));
    }

    #[test]
    fn service_rule_predicates() {
        let rule = ServiceRule::new("ppp", Action::Permit)
            .unwrap()
            .with_match("protocol", "^ip$")
            .unwrap();
        assert!(rule.matches("ppp", &[AvPair::mandatory("protocol", "ip")]));
        assert!(!rule.matches("ppp", &[AvPair::mandatory("protocol", "ipx")]));
        // predicate present, attribute absent
        assert!(!rule.matches("ppp", &[]));
        assert!(!rule.matches("shell", &[AvPair::mandatory("protocol", "ip")]));
    }

    #[test]
    fn service_rule_without_predicates_ignores_attributes() {
        let rule = ServiceRule::new("shell", Action::Permit).unwrap();
        assert!(rule.matches("shell", &[]));
        assert!(rule.matches("shell", &[AvPair::optional("priv-lvl", "1")]));
    }

    #[test]
    fn empty_service_name_rejected() {
        assert!(matches!(
            ServiceRule::new("", Action::Permit),
            Err(TacauthzError::PolicyValidation(_))
        ));
    }
}
