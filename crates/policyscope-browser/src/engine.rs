use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::actions::PageHandle;
use crate::chromium::ChromiumLauncher;
use crate::error::{BrowserError, Result};
use crate::process::{BrowserLauncher, BrowserProcess, LaunchOptions};

/// Observable lifecycle state of the shared browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserState {
    /// Never started, or stopped on purpose.
    Stopped,
    /// A live process is serving pages.
    Running,
    /// The last launch failed or the process died.
    Failed {
        /// Human readable cause
        reason: String,
    },
}

enum Slot {
    Stopped,
    Running(Arc<dyn BrowserProcess>),
    Failed(String),
}

/// Session manager for the single browser process shared by all scans.
///
/// Launch failures are recorded and reported through [`BrowserEngine::state`]
/// instead of tearing the engine down; callers can retry with
/// [`BrowserEngine::ensure_started`].
pub struct BrowserEngine {
    launcher: Arc<dyn BrowserLauncher>,
    options: LaunchOptions,
    slot: RwLock<Slot>,
    launch_lock: Mutex<()>,
}

impl BrowserEngine {
    /// Create an engine backed by a local Chromium.
    #[must_use]
    pub fn new(options: LaunchOptions) -> Self {
        Self::with_launcher(Arc::new(ChromiumLauncher), options)
    }

    /// Create an engine with a custom launcher.
    #[must_use]
    pub fn with_launcher(launcher: Arc<dyn BrowserLauncher>, options: LaunchOptions) -> Self {
        Self {
            launcher,
            options,
            slot: RwLock::new(Slot::Stopped),
            launch_lock: Mutex::new(()),
        }
    }

    /// Launch the browser process.
    ///
    /// A no-op when a live process already exists. Concurrent calls are
    /// serialized so at most one process is ever launched.
    pub async fn start(&self) -> Result<()> {
        let _guard = self.launch_lock.lock().await;

        if let Slot::Running(process) = &*self.slot.read().await {
            if process.is_alive() {
                return Ok(());
            }
        }

        tracing::info!("Starting browser");
        match self.launcher.launch(&self.options).await {
            Ok(process) => {
                *self.slot.write().await = Slot::Running(process);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Browser launch failed: {}", e);
                *self.slot.write().await = Slot::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Alias of [`BrowserEngine::start`] used on recovery paths.
    pub async fn ensure_started(&self) -> Result<()> {
        self.start().await
    }

    /// Close the browser process if one is running.
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.launch_lock.lock().await;
        let previous = std::mem::replace(&mut *self.slot.write().await, Slot::Stopped);

        if let Slot::Running(process) = previous {
            tracing::info!("Stopping browser");
            process.close().await?;
        }
        Ok(())
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> BrowserState {
        match &*self.slot.read().await {
            Slot::Stopped => BrowserState::Stopped,
            Slot::Running(process) if process.is_alive() => BrowserState::Running,
            Slot::Running(_) => BrowserState::Failed {
                reason: "browser process exited".to_string(),
            },
            Slot::Failed(reason) => BrowserState::Failed {
                reason: reason.clone(),
            },
        }
    }

    /// Whether a live process is available.
    pub async fn is_available(&self) -> bool {
        self.state().await == BrowserState::Running
    }

    /// Open an isolated page context.
    ///
    /// Fails with [`BrowserError::Unavailable`] when no live process exists.
    pub async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        let process = match &*self.slot.read().await {
            Slot::Running(process) if process.is_alive() => Arc::clone(process),
            Slot::Running(_) => {
                return Err(BrowserError::Unavailable(
                    "browser process exited".to_string(),
                ))
            }
            Slot::Stopped => {
                return Err(BrowserError::Unavailable(
                    "browser not started".to_string(),
                ))
            }
            Slot::Failed(reason) => return Err(BrowserError::Unavailable(reason.clone())),
        };

        match process.new_page().await {
            Err(e) if !process.is_alive() => Err(BrowserError::Unavailable(e.to_string())),
            other => other,
        }
    }

    /// Open a page, relaunching the browser once if it is unavailable.
    pub async fn acquire_page(&self) -> Result<Box<dyn PageHandle>> {
        match self.new_page().await {
            Err(e) if e.is_unavailable() => {
                tracing::warn!("Browser unavailable ({}); attempting restart", e);
                self.ensure_started().await?;
                self.new_page().await
            }
            other => other,
        }
    }
}
