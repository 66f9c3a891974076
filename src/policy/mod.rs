pub mod action;
pub mod model;
pub mod pattern;
pub mod reduce;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::authorization::MatcherGeneration;
use crate::error::TacauthzError;
use action::Action;
use model::{CommandRule, Group, ServiceRule, User};

const MAX_POLICY_FILE_SIZE: u64 = 256 * 1024; // 256 KiB

// --- TOML deserialization structs (private, map 1:1 to TOML schema) ---

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    #[serde(default)]
    authorizer: AuthorizerSection,
    #[serde(default)]
    groups: HashMap<String, RulesConfig>,
    #[serde(default)]
    users: HashMap<String, UserConfig>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AuthorizerSection {
    #[serde(default)]
    command_matcher: MatcherGeneration,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesConfig {
    #[serde(default)]
    services: Vec<ServiceConfig>,
    #[serde(default)]
    commands: Vec<CommandConfig>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UserConfig {
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    services: Vec<ServiceConfig>,
    #[serde(default)]
    commands: Vec<CommandConfig>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceConfig {
    name: String,
    action: Action,
    #[serde(default, rename = "match")]
    predicates: BTreeMap<String, String>,
    #[serde(default)]
    set: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandConfig {
    pattern: String,
    action: Action,
    #[serde(default)]
    args: Vec<String>,
    service: Option<String>,
}

// --- Compiled configuration snapshot ---

/// One immutable configuration epoch: every user and group, regexes compiled.
#[derive(Debug, Clone, Default)]
pub struct Config {
    matcher: MatcherGeneration,
    users: HashMap<String, User>,
    groups: HashMap<String, Group>,
}

impl FromStr for Config {
    type Err = TacauthzError;

    /// Parse and compile a configuration from a TOML string.
    fn from_str(content: &str) -> Result<Self, TacauthzError> {
        let file: PolicyFile =
            toml::from_str(content).map_err(|e| TacauthzError::PolicyLoad(e.to_string()))?;

        let groups = file
            .groups
            .into_iter()
            .map(|(name, rules)| {
                let (services, commands) = compile_rules(&name, rules)?;
                Ok((
                    name.clone(),
                    Group {
                        name,
                        services,
                        commands,
                    },
                ))
            })
            .collect::<Result<HashMap<_, _>, TacauthzError>>()?;

        let users = file
            .users
            .into_iter()
            .map(|(name, config)| {
                let rules = RulesConfig {
                    services: config.services,
                    commands: config.commands,
                };
                let (services, commands) = compile_rules(&name, rules)?;
                Ok((
                    name.clone(),
                    User {
                        name,
                        groups: config.groups,
                        services,
                        commands,
                    },
                ))
            })
            .collect::<Result<HashMap<_, _>, TacauthzError>>()?;

        Ok(Self {
            matcher: file.authorizer.command_matcher,
            users,
            groups,
        })
    }
}

impl Config {
    pub fn new(matcher: MatcherGeneration) -> Self {
        Self {
            matcher,
            ..Default::default()
        }
    }

    /// Load a configuration from a TOML file. Checks file size before reading.
    pub fn load(path: &Path) -> Result<Self, TacauthzError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            TacauthzError::PolicyLoad(format!("cannot read {}: {e}", path.display()))
        })?;

        if metadata.len() > MAX_POLICY_FILE_SIZE {
            return Err(TacauthzError::PolicyLoad(format!(
                "policy file exceeds {MAX_POLICY_FILE_SIZE} byte limit"
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TacauthzError::PolicyLoad(format!("cannot read {}: {e}", path.display()))
        })?;

        content.parse()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.name.clone(), user);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.insert(group.name.clone(), group);
        self
    }

    pub fn matcher(&self) -> MatcherGeneration {
        self.matcher
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }
}

fn compile_rules(
    owner: &str,
    rules: RulesConfig,
) -> Result<(Vec<ServiceRule>, Vec<CommandRule>), TacauthzError> {
    let services = rules
        .services
        .into_iter()
        .map(|svc| {
            let mut rule =
                ServiceRule::new(svc.name, svc.action).map_err(|e| in_owner(owner, e))?;
            for (attr, pattern) in &svc.predicates {
                rule = rule
                    .with_match(attr, pattern)
                    .map_err(|e| in_owner(owner, e))?;
            }
            for (attr, value) in &svc.set {
                rule = rule.with_set(attr, value);
            }
            Ok(rule)
        })
        .collect::<Result<Vec<_>, TacauthzError>>()?;

    let commands = rules
        .commands
        .into_iter()
        .map(|cmd| {
            let mut rule = CommandRule::new(&cmd.pattern, cmd.action)
                .and_then(|rule| rule.with_args(cmd.args.as_slice()))
                .map_err(|e| in_owner(owner, e))?;
            if let Some(service) = cmd.service {
                rule = rule.scoped_to(service);
            }
            Ok(rule)
        })
        .collect::<Result<Vec<_>, TacauthzError>>()?;

    Ok((services, commands))
}

fn in_owner(owner: &str, err: TacauthzError) -> TacauthzError {
    match err {
        TacauthzError::PolicyValidation(msg) => {
            TacauthzError::PolicyValidation(format!("'{owner}': {msg}"))
        }
        other => other,
    }
}
