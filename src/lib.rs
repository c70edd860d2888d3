//! Release engineering tasks for desktop applications.
//!
//! * [`installer`]: WiX fragments for a directory tree, with per-directory
//!   GUID sidecars so component GUIDs survive rebuilds.
//! * [`changelog`]: release notes, Debian changelog entries, HTML notes and
//!   version stamping driven by a markdown changelog.

pub mod changelog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod installer;
pub mod xml;

use tracing_subscriber::EnvFilter;

pub use config::TasksConfig;
pub use diagnostics::Diagnostics;
pub use error::{Result, TaskError};

/// Install a `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `verbose`. Does nothing if a subscriber
/// is already set.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
