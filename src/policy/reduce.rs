use super::Config;
use super::model::{CommandRule, ServiceRule, User};
use crate::authorization::observer::Observer;

/// Flattened, ordered rule set for one user: direct rules first, then each
/// group's rules in membership order.
///
/// The data fields are readable anywhere, but construction is sealed: `Seal`
/// is private to this file, so a struct literal outside it cannot be written
/// and `reduce()` is the only way to obtain one. Every policy a matcher sees
/// went through reduction. Holds its own copies of the rules; dropping it
/// never touches the snapshot.
#[derive(Debug, Clone)]
pub struct EffectivePolicy {
    pub user: String,
    pub services: Vec<ServiceRule>,
    pub commands: Vec<CommandRule>,
    _seal: Seal,
}

#[derive(Debug, Clone)]
struct Seal;

/// Collapse a user's group memberships into one effective policy.
///
/// Groups are resolved by name against `config`. An unknown group is reported
/// to `observer` and contributes nothing; reduction itself never fails.
pub fn reduce(config: &Config, user: &User, observer: &dyn Observer) -> EffectivePolicy {
    let mut services = user.services.clone();
    let mut commands = user.commands.clone();

    for name in &user.groups {
        match config.group(name) {
            Some(group) => {
                services.extend(group.services.iter().cloned());
                commands.extend(group.commands.iter().cloned());
            }
            None => observer.missing_group(&user.name, name),
        }
    }

    EffectivePolicy {
        user: user.name.clone(),
        services,
        commands,
        _seal: Seal,
    }
}
