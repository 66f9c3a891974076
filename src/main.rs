use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use tacauthz::authorization::observer::TracingObserver;
use tacauthz::protocol::AvPair;
use tacauthz::{AuthorizationRequest, Authorizer, ConfigStore, MatcherGeneration};

const DEFAULT_CONFIG: &str = "tacauthz.toml";
const USAGE: &str = "usage: <user> <service|-> [attr=value ...] [command [args ...]]";

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TACAUTHZ_CONFIG").ok())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let matcher_override = std::env::var("TACAUTHZ_COMMAND_MATCHER")
        .ok()
        .map(|s| s.parse::<MatcherGeneration>())
        .transpose()?;

    let store = ConfigStore::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    let mut authorizer = build_authorizer(&store, matcher_override);

    let editor_config = rustyline::Config::builder().auto_add_history(true).build();
    let mut editor = DefaultEditor::with_config(editor_config)?;
    println!("{USAGE}\n:reload re-reads {}, :quit exits", path.display());

    loop {
        let line = match editor.readline("tacauthz> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            ":quit" | ":q" => break,
            ":reload" => match store.reload(&path) {
                Ok(()) => {
                    authorizer = build_authorizer(&store, matcher_override);
                    println!("reloaded");
                }
                Err(e) => eprintln!("reload failed: {e}"),
            },
            _ => match evaluate_line(&store, &authorizer, line) {
                Ok(output) => println!("{output}"),
                Err(e) => eprintln!("{e:#}"),
            },
        }
    }
    Ok(())
}

fn build_authorizer(store: &ConfigStore, matcher_override: Option<MatcherGeneration>) -> Authorizer {
    let generation = matcher_override.unwrap_or_else(|| store.snapshot().matcher());
    Authorizer::new(generation, Arc::new(TracingObserver))
}

fn evaluate_line(store: &ConfigStore, authorizer: &Authorizer, line: &str) -> Result<String> {
    let mut words = line.split_whitespace().peekable();
    let user_name = words.next().context(USAGE)?;
    let service = match words.next().context(USAGE)? {
        "-" => "",
        s => s,
    };

    let mut request = AuthorizationRequest::new(user_name, service);
    while let Some(word) = words.next_if(|w| w.contains('=')) {
        request = request.with_attribute(AvPair::parse(word)?);
    }
    if let Some(command) = words.next() {
        let args: Vec<&str> = words.collect();
        request = request.with_command(command, args.as_slice());
    }

    let config = store.snapshot();
    let user = config
        .user(user_name)
        .with_context(|| format!("unknown user '{user_name}'"))?;
    let verdict = authorizer.evaluate(&config, user, &request);
    Ok(serde_json::to_string(&verdict)?)
}
