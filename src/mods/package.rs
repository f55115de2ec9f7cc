//! Mod package layout
//!
//! A package is either a directory or an archive (`.zip` / `.cmod`). The
//! manifest sits at the package root; archives additionally get a namespaced
//! fallback location under `META-INF/catan/`. Native libraries live at the
//! package root or under `lib/`; assets under `assets/<mod id>/`.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::mods::error::MetadataParseError;

/// Manifest file name at the package root.
pub const MANIFEST_NAME: &str = "catan.mod.json5";

/// Fallback manifest location inside archives.
pub const ARCHIVE_MANIFEST_FALLBACK: &str = "META-INF/catan/catan.mod.json5";

/// File extensions recognized as archive-form packages.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cmod"];

/// How the package stores its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Directory,
    Archive,
}

/// A candidate mod package on disk.
#[derive(Debug, Clone)]
pub struct ModPackage {
    path: PathBuf,
    kind: PackageKind,
}

impl ModPackage {
    /// Classify a filesystem entry as a package, or `None` for anything that
    /// is neither a directory nor a recognized archive.
    pub fn classify(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(Self {
                path: path.to_path_buf(),
                kind: PackageKind::Directory,
            });
        }
        if path.is_file() {
            let ext = path.extension().and_then(|e| e.to_str())?;
            if ARCHIVE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
            {
                return Some(Self {
                    path: path.to_path_buf(),
                    kind: PackageKind::Archive,
                });
            }
        }
        None
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// Read the manifest text, distinguishing directory- and archive-layout
    /// lookup in the failure.
    pub fn read_manifest(&self) -> Result<String, MetadataParseError> {
        match self.kind {
            PackageKind::Directory => {
                let manifest_path = self.path.join(MANIFEST_NAME);
                if !manifest_path.exists() {
                    return Err(MetadataParseError::MissingDirManifest {
                        path: self.display_path(),
                    });
                }
                fs::read_to_string(&manifest_path).map_err(|source| MetadataParseError::Io {
                    path: self.display_path(),
                    source,
                })
            }
            PackageKind::Archive => {
                let mut archive = self.open_archive().map_err(|message| {
                    MetadataParseError::Archive {
                        path: self.display_path(),
                        message,
                    }
                })?;
                // Root first, then the namespaced fallback.
                for name in [MANIFEST_NAME, ARCHIVE_MANIFEST_FALLBACK] {
                    match archive.by_name(name) {
                        Ok(mut entry) => {
                            let mut text = String::new();
                            entry.read_to_string(&mut text).map_err(|source| {
                                MetadataParseError::Io {
                                    path: self.display_path(),
                                    source,
                                }
                            })?;
                            return Ok(text);
                        }
                        Err(ZipError::FileNotFound) => continue,
                        Err(e) => {
                            return Err(MetadataParseError::Archive {
                                path: self.display_path(),
                                message: e.to_string(),
                            })
                        }
                    }
                }
                Err(MetadataParseError::MissingArchiveManifest {
                    path: self.display_path(),
                })
            }
        }
    }

    fn open_archive(&self) -> Result<ZipArchive<fs::File>, String> {
        let file = fs::File::open(&self.path).map_err(|e| e.to_string())?;
        ZipArchive::new(file).map_err(|e| e.to_string())
    }

    /// Native libraries bundled in a directory package (package root and
    /// `lib/`).
    pub fn native_libraries(&self) -> std::io::Result<Vec<PathBuf>> {
        debug_assert_eq!(self.kind, PackageKind::Directory);
        let mut found = Vec::new();
        for dir in [self.path.clone(), self.path.join("lib")] {
            if !dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_file() && is_native_library(&path) {
                    found.push(path);
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// Extract native libraries from an archive package into `dest`,
    /// returning the extracted paths.
    pub fn extract_native_libraries(&self, dest: &Path) -> Result<Vec<PathBuf>, String> {
        debug_assert_eq!(self.kind, PackageKind::Archive);
        let mut archive = self.open_archive()?;
        let mut extracted = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| e.to_string())?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let in_scope = !name.contains('/') || name.starts_with("lib/");
            if !in_scope || !is_native_library(Path::new(&name)) {
                continue;
            }
            let file_name = Path::new(&name)
                .file_name()
                .ok_or_else(|| format!("archive entry `{}` has no file name", name))?;
            let target = dest.join(file_name);
            let mut out = fs::File::create(&target).map_err(|e| e.to_string())?;
            std::io::copy(&mut entry, &mut out).map_err(|e| e.to_string())?;
            debug!(entry = %name, target = %target.display(), "extracted native library");
            extracted.push(target);
        }
        extracted.sort();
        Ok(extracted)
    }

    /// List asset paths under `assets/<mod id>/`, relative to that root and
    /// `/`-separated regardless of platform.
    pub fn asset_entries(&self, mod_id: &str) -> anyhow::Result<Vec<String>> {
        match self.kind {
            PackageKind::Directory => {
                let root = self.path.join("assets").join(mod_id);
                let mut out = Vec::new();
                if root.is_dir() {
                    collect_files(&root, &root, &mut out)
                        .with_context(|| format!("scanning assets in {}", root.display()))?;
                }
                out.sort();
                Ok(out)
            }
            PackageKind::Archive => {
                let mut archive = self
                    .open_archive()
                    .map_err(|message| anyhow::anyhow!("{}: {}", self.display_path(), message))?;
                let prefix = format!("assets/{}/", mod_id);
                let mut out = Vec::new();
                for index in 0..archive.len() {
                    let entry = archive
                        .by_index(index)
                        .map_err(|e| anyhow::anyhow!("{}: {}", self.display_path(), e))?;
                    if entry.is_dir() {
                        continue;
                    }
                    if let Some(relative) = entry.name().strip_prefix(&prefix) {
                        if !relative.is_empty() {
                            out.push(relative.to_string());
                        }
                    }
                }
                out.sort();
                Ok(out)
            }
        }
    }
}

/// Native dynamic-library extensions, per platform convention.
fn is_native_library(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("so") | Some("dylib") | Some("dll")
    )
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if path.is_file() {
            let relative = path
                .strip_prefix(root)
                .expect("walked path is under its root");
            let joined = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(joined);
        }
    }
    Ok(())
}
