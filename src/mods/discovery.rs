//! Mod package discovery
//!
//! Scans the mods root for candidate packages. No ordering guarantee: load
//! order is the resolver's job.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::mods::package::ModPackage;

/// Scanner over the mods root directory.
pub struct ModDiscovery {
    root: PathBuf,
}

impl ModDiscovery {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// List candidate packages under the root.
    ///
    /// Creates the root when missing and returns an empty list; files that
    /// are not recognized packages are silently skipped.
    pub fn discover(&self) -> std::io::Result<Vec<ModPackage>> {
        if !self.root.exists() {
            debug!(root = %self.root.display(), "mods directory missing, creating");
            fs::create_dir_all(&self.root)?;
            return Ok(Vec::new());
        }

        let mut packages = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            match ModPackage::classify(&path) {
                Some(package) => packages.push(package),
                None => debug!(path = %path.display(), "skipping unrecognized entry"),
            }
        }

        info!(root = %self.root.display(), count = packages.len(), "discovered mod packages");
        Ok(packages)
    }
}
