use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::error::TacauthzError;
use crate::policy::Config;

/// Current configuration epoch. Reload swaps the whole snapshot; readers
/// holding an older `Arc<Config>` keep a consistent view until they drop it.
pub struct ConfigStore {
    tx: watch::Sender<Arc<Config>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self { tx }
    }

    pub fn load(path: &Path) -> Result<Self, TacauthzError> {
        Ok(Self::new(Config::load(path)?))
    }

    pub fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&*self.tx.borrow())
    }

    pub fn replace(&self, config: Config) {
        self.tx.send_replace(Arc::new(config));
    }

    /// Load `path` and install it. On error the current snapshot stays.
    pub fn reload(&self, path: &Path) -> Result<(), TacauthzError> {
        let config = Config::load(path)?;
        self.replace(config);
        info!(path = %path.display(), "configuration reloaded");
        Ok(())
    }

    /// Receiver notified on every reload.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Config>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::MatcherGeneration;

    #[test]
    fn replace_swaps_snapshot() {
        let store = ConfigStore::new(Config::new(MatcherGeneration::V1));
        let before = store.snapshot();
        store.replace(Config::new(MatcherGeneration::V2));

        assert_eq!(before.matcher(), MatcherGeneration::V1);
        assert_eq!(store.snapshot().matcher(), MatcherGeneration::V2);
    }

    #[test]
    fn failed_reload_keeps_current_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[users.alice\n").unwrap();

        let store = ConfigStore::new(Config::new(MatcherGeneration::V2));
        assert!(store.reload(&path).is_err());
        assert_eq!(store.snapshot().matcher(), MatcherGeneration::V2);
    }

    #[tokio::test]
    async fn subscribers_see_reload() {
        let store = ConfigStore::new(Config::new(MatcherGeneration::V1));
        let mut rx = store.subscribe();
        store.replace(Config::new(MatcherGeneration::V2));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().matcher(), MatcherGeneration::V2);
    }
}
