//! `ConfigWatcher` — mtime-polling hot reload for rule files
//!
//! A background thread polls the rule file's modification time. On
//! change it reparses the file, applies the update to the trap, and
//! invokes the configured callback with the new instruction count.
//! Load failures are logged and the watcher keeps polling; only the
//! watcher thread ever calls `update`, which satisfies the engine's
//! single-updater contract.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::config::RuleSet;
use crate::trap::Trap;

// Responsiveness of the stop flag, independent of the poll interval.
const STOP_CHECK: Duration = Duration::from_millis(20);

/// Handle to a running rule-file watcher. Stops on drop.
#[derive(Debug)]
pub struct ConfigWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Start watching `path`, checking every `interval`.
    ///
    /// The file is loaded immediately on the first poll, then again
    /// whenever its modification time changes. After each successful
    /// update, `on_configured` receives the new instruction count.
    pub fn spawn(
        trap: Arc<Trap>,
        path: impl Into<PathBuf>,
        interval: Duration,
        on_configured: impl Fn(usize) + Send + 'static,
    ) -> Self {
        let path = path.into();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("snare-config-watcher".into())
            .spawn(move || {
                let mut last_seen: Option<SystemTime> = None;
                while !stop_flag.load(Ordering::Relaxed) {
                    match std::fs::metadata(&path).and_then(|m| m.modified()) {
                        Ok(mtime) if last_seen != Some(mtime) => {
                            last_seen = Some(mtime);
                            match Self::load(&trap, &path) {
                                Ok(count) => {
                                    debug!(path = %path.display(), forks = count, "rules reloaded");
                                    on_configured(count);
                                }
                                Err(e) => {
                                    warn!(path = %path.display(), error = %e, "rule reload failed");
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "rule file not readable");
                        }
                    }
                    Self::sleep(&stop_flag, interval);
                }
            })
            .expect("spawn watcher thread");
        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn load(trap: &Trap, path: &PathBuf) -> Result<usize, Box<dyn std::error::Error>> {
        let source = std::fs::read_to_string(path)?;
        let rules = RuleSet::from_text(&source)?;
        Ok(trap.update(&rules)?)
    }

    // Sleeps for `interval` total, waking often enough to stop promptly.
    fn sleep(stop: &AtomicBool, interval: Duration) {
        let mut remaining = interval;
        while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
            let step = remaining.min(STOP_CHECK);
            std::thread::sleep(step);
            remaining -= step;
        }
    }

    /// Stop the watcher and wait for its thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Trap {
    /// Watch a rule file and hot-reload this trap on change.
    ///
    /// Convenience over [`ConfigWatcher::spawn`].
    pub fn watch_config(
        self: &Arc<Self>,
        path: impl Into<PathBuf>,
        interval: Duration,
        on_configured: impl Fn(usize) + Send + 'static,
    ) -> ConfigWatcher {
        ConfigWatcher::spawn(Arc::clone(self), path, interval, on_configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_dict::{ClassDict, ClassSpec, TypeRef};
    use crate::value::ValueKind;
    use std::io::Write;
    use std::sync::mpsc;

    fn trap() -> Arc<Trap> {
        let mut dict = ClassDict::new();
        dict.register(
            ClassSpec::new("test.Person").with_field("age", TypeRef::Kind(ValueKind::Int)),
        )
        .unwrap();
        Arc::new(Trap::new(
            TypeRef::Class("test.Person".into()),
            Arc::new(dict),
        ))
    }

    #[test]
    fn test_initial_load_and_reload_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.conf");
        std::fs::write(&path, "Adult = @age:>18\n").unwrap();

        let trap = trap();
        let (tx, rx) = mpsc::channel();
        let mut watcher = ConfigWatcher::spawn(
            Arc::clone(&trap),
            &path,
            Duration::from_millis(10),
            move |count| {
                let _ = tx.send(count);
            },
        );

        // First poll loads the file as-is.
        let count = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(count, 1);
        assert_eq!(trap.count(), 1);

        // Rewrite with a different mtime; the watcher picks it up.
        std::thread::sleep(Duration::from_millis(50));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Adult = @age:>18").unwrap();
        writeln!(file, "Minor = @age:<18").unwrap();
        drop(file);

        let count = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(count, 2);
        assert_eq!(trap.count(), 2);

        watcher.stop();
    }

    #[test]
    fn test_bad_file_keeps_watcher_alive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.conf");
        std::fs::write(&path, "this is not a rule\n").unwrap();

        let trap = trap();
        let (tx, rx) = mpsc::channel();
        let _watcher = ConfigWatcher::spawn(
            Arc::clone(&trap),
            &path,
            Duration::from_millis(10),
            move |count| {
                let _ = tx.send(count);
            },
        );

        // The broken file never configures anything.
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(trap.count(), 0);

        // Fixing the file recovers without restarting the watcher.
        std::thread::sleep(Duration::from_millis(50));
        std::fs::write(&path, "Adult = @age:>18\n").unwrap();
        let count = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(count, 1);
    }
}
