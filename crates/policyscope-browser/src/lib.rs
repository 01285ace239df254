//! Browser automation for policyscope.
//!
//! Owns the single long-lived headless browser process shared by every scan,
//! hands out isolated page contexts, and recovers from the process dying.
//!
//! The automation layer itself sits behind the [`BrowserLauncher`],
//! [`BrowserProcess`] and [`PageHandle`] traits; [`ChromiumLauncher`] is the
//! chromiumoxide implementation used in production.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod actions;
pub mod chromium;
pub mod engine;
#[allow(missing_docs)]
pub mod error;
pub mod process;

pub use actions::{PageHandle, WaitUntil};
pub use chromium::ChromiumLauncher;
pub use engine::{BrowserEngine, BrowserState};
pub use error::{BrowserError, Result};
pub use process::{BrowserLauncher, BrowserProcess, LaunchOptions};
