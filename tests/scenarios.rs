use std::str::FromStr;
use std::sync::Arc;

use tacauthz::authorization::observer::NoopObserver;
use tacauthz::authorization::observer::testing::{Event, RecordingObserver};
use tacauthz::protocol::{AuthorStatus, AvPair};
use tacauthz::{AuthorizationRequest, Authorizer, Config, DenyReason, MatcherGeneration, Verdict};

const NETOPS_POLICY: &str = r#"
[groups.netops]
commands = [
    { pattern = "show", action = "permit" },
    { pattern = "reload", action = "deny" },
]

[users.alice]
groups = ["netops"]
"#;

const SHOW_POLICY: &str = r#"
[users.alice]
commands = [
    { pattern = "show *", action = "permit" },
    { pattern = "show running-config", action = "deny" },
]
"#;

const OVERRIDE_POLICY: &str = r#"
[groups.readonly]
commands = [
    { pattern = "configure terminal", action = "deny" },
]
services = [
    { name = "shell", action = "permit", set = { "priv-lvl" = "1" } },
]

[users.dave]
groups = ["readonly"]
commands = [
    { pattern = "configure terminal", action = "permit" },
]
services = [
    { name = "shell", action = "permit", set = { "priv-lvl" = "15" } },
]
"#;

fn evaluate(
    policy: &str,
    generation: MatcherGeneration,
    user: &str,
    request: &AuthorizationRequest,
) -> Verdict {
    let config = Config::from_str(policy).expect("policy should parse");
    let authorizer = Authorizer::new(generation, Arc::new(NoopObserver));
    let user = config.user(user).expect("user should exist");
    authorizer.evaluate(&config, user, request)
}

fn command(user: &str, command: &str, args: &[&str]) -> AuthorizationRequest {
    AuthorizationRequest::new(user, "shell").with_command(command, args)
}

#[test]
fn group_rules_end_to_end() {
    for generation in [MatcherGeneration::V1, MatcherGeneration::V2] {
        let run = |cmd: &str, args: &[&str]| {
            evaluate(NETOPS_POLICY, generation, "alice", &command("alice", cmd, args))
        };

        assert!(run("show", &["version"]).is_permit(), "{generation:?}: show version");
        assert_eq!(
            run("reload", &[]),
            Verdict::Deny {
                reason: DenyReason::Rule
            },
            "{generation:?}: reload"
        );
        assert_eq!(run("configure", &[]), Verdict::no_match(), "{generation:?}: configure");
    }
}

#[test]
fn first_match_precedence() {
    let request = command("alice", "show", &["running-config"]);
    let verdict = evaluate(SHOW_POLICY, MatcherGeneration::V1, "alice", &request);
    assert!(verdict.is_permit());
}

#[test]
fn specificity_precedence() {
    let run = |args: &[&str]| {
        evaluate(SHOW_POLICY, MatcherGeneration::V2, "alice", &command("alice", "show", args))
    };
    assert!(run(&["running-config"]).is_deny());
    assert!(run(&["interfaces"]).is_permit());
}

#[test]
fn user_rules_override_group_rules() {
    for generation in [MatcherGeneration::V1, MatcherGeneration::V2] {
        let request = command("dave", "configure", &["terminal"]);
        let verdict = evaluate(OVERRIDE_POLICY, generation, "dave", &request);
        assert!(verdict.is_permit(), "{generation:?}");
    }

    let request = AuthorizationRequest::new("dave", "shell");
    let session = evaluate(OVERRIDE_POLICY, MatcherGeneration::V1, "dave", &request);
    assert_eq!(session.attributes(), [AvPair::mandatory("priv-lvl", "15")]);
}

#[test]
fn default_deny_without_rules() {
    let policy = "[users.eve]\n";
    let requests = [
        command("eve", "show", &["version"]),
        AuthorizationRequest::new("eve", "shell"),
        AuthorizationRequest::new("eve", "ppp").with_attribute(AvPair::mandatory("protocol", "ip")),
    ];
    for generation in [MatcherGeneration::V1, MatcherGeneration::V2] {
        for request in &requests {
            let verdict = evaluate(policy, generation, "eve", request);
            assert_eq!(verdict, Verdict::no_match(), "{generation:?}: {request:?}");
        }
    }
}

#[test]
fn malformed_body_never_reaches_a_matcher() {
    let permissive = r#"
[users.root]
commands = [{ pattern = "*", action = "permit" }]
"#;
    // a bare wildcard is not a valid command name
    assert!(Config::from_str(permissive).is_err());

    let config = Config::from_str(
        r#"
[users.root]
commands = [{ pattern = "show", action = "permit" }]
services = [{ name = "shell", action = "permit" }]
"#,
    )
    .unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let authorizer = Authorizer::new(MatcherGeneration::V2, observer.clone());
    let scoped = authorizer.for_user(&config, config.user("root").unwrap()).unwrap();

    let mut body = command("root", "show", &["version"]).encode().unwrap();
    body.truncate(body.len() - 1);
    let reply = scoped.handle(&body);

    assert_eq!(reply.status, AuthorStatus::Error);
    assert_eq!(reply.server_msg, "unable to decode AuthorRequest packet");
    assert!(matches!(observer.events().as_slice(), [Event::DecodeFailed(_)]));
}

#[test]
fn missing_group_still_defaults_to_deny() {
    let config = Config::from_str(
        r#"
[users.frank]
groups = ["deleted-team"]
"#,
    )
    .unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let authorizer = Authorizer::new(MatcherGeneration::V1, observer.clone());
    let user = config.user("frank").unwrap();

    let verdict = authorizer.evaluate(&config, user, &command("frank", "show", &[]));
    assert_eq!(verdict, Verdict::no_match());
    assert_eq!(
        observer.events()[0],
        Event::MissingGroup {
            user: "frank".to_owned(),
            group: "deleted-team".to_owned(),
        }
    );
}

#[test]
fn session_reply_on_the_wire() {
    let config = Config::from_str(OVERRIDE_POLICY).unwrap();
    let authorizer = Authorizer::new(config.matcher(), Arc::new(NoopObserver));
    let scoped = authorizer.for_user(&config, config.user("dave").unwrap()).unwrap();

    let body = AuthorizationRequest::new("dave", "shell").encode().unwrap();
    let reply = scoped.handle(&body);
    assert_eq!(reply.status, AuthorStatus::PassAdd);

    let bytes = reply.encode().unwrap();
    assert_eq!(bytes[0], 0x01);
    assert_eq!(bytes[1], 1);
    assert!(bytes.ends_with(b"priv-lvl=15"));
}
