//! The mod loading pipeline
//!
//! Runs the stages in a fixed sequence: discover, read metadata, deduplicate
//! by id, resolve a load order, instantiate, then the four activation phases.
//! Per-mod failures remove the mod (and, during activation, its
//! hard-dependent closure); only dependency resolution aborts the run,
//! because no safe load order exists at all.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ModLoaderConfig;
use crate::mods::api::HostServices;
use crate::mods::discovery::ModDiscovery;
use crate::mods::error::ModError;
use crate::mods::instance::{InstanceCreator, LoadedMod};
use crate::mods::isolation::{EntrypointRegistry, IsolationContextFactory, ModConstructor};
use crate::mods::manifest::version::compare_versions;
use crate::mods::manifest::{read_metadata, DiscoveredMod};
use crate::mods::phases::{run_phase, Phase};
use crate::mods::resolve::DependencyResolver;

const PHASES: [Phase; 4] = [Phase::Registry, Phase::Asset, Phase::Listener, Phase::Init];

/// One-shot mod loading run over a mods directory.
pub struct ModPipeline {
    mods_dir: PathBuf,
    shared_entrypoints: EntrypointRegistry,
}

impl ModPipeline {
    pub fn new<P: AsRef<Path>>(mods_dir: P) -> Self {
        Self {
            mods_dir: mods_dir.as_ref().to_path_buf(),
            shared_entrypoints: EntrypointRegistry::new(),
        }
    }

    pub fn from_config(config: &ModLoaderConfig) -> Self {
        Self::new(&config.mods_dir)
    }

    /// Register a host-provided entrypoint constructor, visible to every
    /// mod's isolation context. Host entrypoints live under the reserved
    /// `catan:` namespace, which mod libraries cannot shadow.
    pub fn register_host_entrypoint(&mut self, name: &str, constructor: ModConstructor) {
        self.shared_entrypoints.register(name, constructor);
    }

    /// Run the whole pipeline. Returns the mods that survived every stage,
    /// in load order.
    pub fn load_all(&self, host: &mut HostServices) -> Result<Vec<LoadedMod>, ModError> {
        let packages = ModDiscovery::new(&self.mods_dir).discover()?;

        // Per-package metadata failures drop the package, not the run.
        let mut discovered: Vec<DiscoveredMod> = Vec::with_capacity(packages.len());
        for package in packages {
            match read_metadata(&package) {
                Ok(metadata) => discovered.push(DiscoveredMod { package, metadata }),
                Err(err) => warn!("skipping package: {}", err),
            }
        }

        let deduplicated = deduplicate(discovered);
        let ordered = DependencyResolver::resolve(&deduplicated)?;

        let factory = IsolationContextFactory::new(Arc::new(self.shared_entrypoints.clone()));
        let (mut live, failed) = InstanceCreator::new(factory).instantiate_all(&ordered);
        remove_failed(&mut live, failed, host);

        for phase in PHASES {
            let failed = run_phase(phase, &mut live, host);
            remove_failed(&mut live, failed, host);
        }

        info!(
            count = live.len(),
            mods = ?live.iter().map(LoadedMod::id).collect::<Vec<_>>(),
            "mod loading complete"
        );
        Ok(live)
    }
}

/// Collapse same-id packages to one survivor.
///
/// The strictly higher version wins; on a tie, or when either version fails
/// to parse, the first-discovered package is kept. Order is otherwise
/// preserved (first occurrence's position).
fn deduplicate(discovered: Vec<DiscoveredMod>) -> Vec<DiscoveredMod> {
    let mut kept: Vec<DiscoveredMod> = Vec::with_capacity(discovered.len());
    for candidate in discovered {
        let Some(existing) = kept
            .iter_mut()
            .find(|m| m.metadata.id == candidate.metadata.id)
        else {
            kept.push(candidate);
            continue;
        };
        match compare_versions(&candidate.metadata.version, &existing.metadata.version) {
            Some(std::cmp::Ordering::Greater) => {
                warn!(
                    id = %candidate.metadata.id,
                    kept = %candidate.metadata.version,
                    dropped = %existing.metadata.version,
                    "duplicate mod id, keeping the higher version"
                );
                *existing = candidate;
            }
            _ => warn!(
                id = %candidate.metadata.id,
                kept = %existing.metadata.version,
                dropped = %candidate.metadata.version,
                "duplicate mod id, keeping the first-discovered package"
            ),
        }
    }
    kept
}

/// Remove failed mods plus their hard-dependent closure among the live set.
///
/// Retracts any listeners a removed mod had wired; registered content and
/// ingested assets stay, matching the no-rollback containment contract.
fn remove_failed(live: &mut Vec<LoadedMod>, failed: BTreeSet<String>, host: &mut HostServices) {
    if failed.is_empty() {
        return;
    }

    let mut removed = failed;
    loop {
        let cascade: Vec<String> = live
            .iter()
            .filter(|m| !removed.contains(m.id()))
            .filter(|m| {
                m.metadata
                    .dependencies
                    .iter()
                    .any(|d| !d.optional && removed.contains(&d.mod_id))
            })
            .map(|m| m.id().to_string())
            .collect();
        if cascade.is_empty() {
            break;
        }
        for id in cascade {
            warn!(id = %id, "removing mod: a required dependency failed");
            removed.insert(id);
        }
    }

    for id in &removed {
        host.events.retract(id);
    }
    live.retain(|m| !removed.contains(m.id()));
}
