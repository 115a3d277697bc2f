//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Reloads the configuration from disk and pushes it to the server.
///
/// Shared by the file watcher and the SIGHUP handler.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ReloadHandle {
    /// Load the config file and send it on. A broken file is logged and the
    /// running configuration stays in place.
    pub fn reload(&self) -> bool {
        match load_config(&self.path) {
            Ok(new_config) => {
                tracing::info!(
                    path = %self.path.display(),
                    routes = new_config.routes.len(),
                    "Configuration reloaded from disk"
                );
                self.update_tx.send(new_config).is_ok()
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to reload config. Keeping current configuration."
                );
                crate::observability::metrics::record_reload("rejected");
                false
            }
        }
    }
}

/// A watcher that monitors the configuration and route files for changes.
pub struct ConfigWatcher {
    handle: ReloadHandle,
    watched: Vec<PathBuf>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher for `config_path` and, if set, the route file.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(
        config_path: &Path,
        routes_file: Option<&Path>,
    ) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let mut watched = vec![config_path.to_path_buf()];
        watched.extend(routes_file.map(Path::to_path_buf));

        (
            Self {
                handle: ReloadHandle {
                    path: config_path.to_path_buf(),
                    update_tx,
                },
                watched,
            },
            update_rx,
        )
    }

    /// Handle for triggering a reload outside the watcher (e.g. SIGHUP).
    pub fn handle(&self) -> ReloadHandle {
        self.handle.clone()
    }

    /// Start watching in a background thread.
    ///
    /// Parent directories are watched so that editors replacing the file by
    /// rename are still noticed. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let handle = self.handle.clone();
        let targets: Vec<PathBuf> = self.watched.iter().map(|p| normalize(p)).collect();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event.paths.iter().any(|p| targets.contains(&normalize(p)));
                    if relevant {
                        tracing::info!(paths = ?event.paths, "Config file change detected, reloading...");
                        handle.reload();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let mut dirs: Vec<PathBuf> = Vec::new();
        for path in &self.watched {
            let dir = watch_dir(path);
            if !dirs.contains(&dir) {
                watcher.watch(&dir, RecursiveMode::NonRecursive)?;
                dirs.push(dir);
            }
        }

        tracing::info!(paths = ?self.watched, "Config watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_dir_falls_back_to_cwd() {
        assert_eq!(watch_dir(Path::new("gateway.toml")), PathBuf::from("."));
        assert_eq!(
            watch_dir(Path::new("/etc/gateway/gateway.toml")),
            PathBuf::from("/etc/gateway")
        );
    }

    #[test]
    fn reload_with_broken_file_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "this is [not toml").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path, None);
        assert!(!watcher.handle().reload());
        assert!(rx.try_recv().is_err());
    }
}
