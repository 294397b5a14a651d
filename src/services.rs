use std::{io, path::Path};

use tracing::debug;

/// Hands paths and URLs to whatever the desktop has registered for them.
pub trait Launcher: Send {
    fn open_path(&self, path: &Path) -> io::Result<()>;
    fn open_url(&self, url: &str) -> io::Result<()>;
}

/// Uses the platform default handlers. Paths are opened detached so the
/// caller never waits on the spawned application.
#[derive(Default)]
pub struct NativeLauncher;

impl Launcher for NativeLauncher {
    fn open_path(&self, path: &Path) -> io::Result<()> {
        debug!(event = "launcher.open_path", path = %path.display());
        open::that_detached(path)
    }

    fn open_url(&self, url: &str) -> io::Result<()> {
        debug!(event = "launcher.open_url", url);
        webbrowser::open(url)
    }
}
