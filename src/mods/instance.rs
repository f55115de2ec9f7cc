//! Entry-point instantiation
//!
//! Walks the resolved order, builds each mod's isolation context, and
//! constructs its declared entry-point. Failures are per-mod: the failing
//! id lands in the failed set, later mods that require it are skipped, and
//! the pass keeps going.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::mods::error::InstantiationError;
use crate::mods::isolation::{IsolationContext, IsolationContextFactory};
use crate::mods::manifest::{DiscoveredMod, ModMetadata};
use crate::mods::package::ModPackage;
use crate::mods::traits::GameMod;

/// A fully instantiated mod.
///
/// Field order is load-bearing: `instance` drops before `isolation`, since
/// the instance's code lives in the library the context keeps loaded. The
/// pipeline exclusively owns the context for the lifetime of the run.
pub struct LoadedMod {
    pub package: ModPackage,
    pub metadata: ModMetadata,
    pub instance: Box<dyn GameMod>,
    pub isolation: IsolationContext,
}

impl LoadedMod {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

impl std::fmt::Debug for LoadedMod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedMod")
            .field("id", &self.metadata.id)
            .field("version", &self.metadata.version)
            .field("path", &self.package.path())
            .finish()
    }
}

/// Instantiates the resolved mods in order.
pub struct InstanceCreator {
    factory: IsolationContextFactory,
}

impl InstanceCreator {
    pub fn new(factory: IsolationContextFactory) -> Self {
        Self { factory }
    }

    /// Instantiate every mod in resolved order.
    ///
    /// Returns the live list plus the set of failed ids (including mods
    /// skipped because a required dependency failed earlier in the pass).
    pub fn instantiate_all(
        &self,
        ordered: &[DiscoveredMod],
    ) -> (Vec<LoadedMod>, BTreeSet<String>) {
        let mut live = Vec::with_capacity(ordered.len());
        let mut failed: BTreeSet<String> = BTreeSet::new();

        for module in ordered {
            let id = module.metadata.id.as_str();

            // Skip-propagation: the order guarantees dependencies were
            // attempted before their dependents.
            if let Some(dependency) = module
                .metadata
                .dependencies
                .iter()
                .find(|d| !d.optional && failed.contains(&d.mod_id))
            {
                let err = InstantiationError::DependencyFailed {
                    id: id.to_string(),
                    dependency: dependency.mod_id.clone(),
                };
                warn!("{}", err);
                failed.insert(id.to_string());
                continue;
            }

            match self.instantiate(module) {
                Ok(loaded) => {
                    debug!(id, version = %module.metadata.version, "instantiated mod");
                    live.push(loaded);
                }
                Err(err) => {
                    warn!("{}", err);
                    failed.insert(id.to_string());
                }
            }
        }

        (live, failed)
    }

    fn instantiate(&self, module: &DiscoveredMod) -> Result<LoadedMod, InstantiationError> {
        let id = module.metadata.id.as_str();
        let isolation = self.factory.create(id, &module.package)?;

        let constructor = isolation
            .resolve_entrypoint(&module.metadata.entrypoint)
            .ok_or_else(|| InstantiationError::EntrypointNotFound {
                id: id.to_string(),
                entrypoint: module.metadata.entrypoint.clone(),
            })?;

        let instance = catch_unwind(AssertUnwindSafe(constructor)).map_err(|payload| {
            InstantiationError::ConstructorPanic {
                id: id.to_string(),
                message: panic_message(&payload),
            }
        })?;

        Ok(LoadedMod {
            package: module.package.clone(),
            metadata: module.metadata.clone(),
            instance,
            isolation,
        })
    }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
