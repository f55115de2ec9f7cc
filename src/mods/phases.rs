//! Multi-phase activation
//!
//! Every surviving mod runs a phase to completion before any mod starts the
//! next one, so an initializing mod can rely on every other mod's content
//! already being registered. A hook that returns an error or panics fails
//! only its own mod; the pipeline removes the failed closure between phases.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::anyhow;
use tracing::{debug, warn};

use crate::mods::api::{AssetEntry, HostServices};
use crate::mods::error::PhaseError;
use crate::mods::instance::{panic_message, LoadedMod};
use crate::mods::traits::HostContext;

/// Activation phases, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Registry,
    Asset,
    Listener,
    Init,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Registry => "content registration",
            Phase::Asset => "asset ingestion",
            Phase::Listener => "listener wiring",
            Phase::Init => "initialization",
        })
    }
}

/// Run one phase across every loaded mod, in load order.
///
/// Returns the ids that failed the phase. Panics unwind into the runner and
/// count as failures; state the hook mutated before failing is not rolled
/// back.
pub fn run_phase(
    phase: Phase,
    mods: &mut [LoadedMod],
    host: &mut HostServices,
) -> BTreeSet<String> {
    let mut failed = BTreeSet::new();

    for module in mods.iter_mut() {
        let id = module.metadata.id.clone();
        let outcome = match phase {
            Phase::Asset => ingest_assets(module, host),
            _ => run_hook(phase, module, host),
        };
        match outcome {
            Ok(()) => debug!(id = %id, %phase, "phase complete"),
            Err(source) => {
                let err = PhaseError {
                    mod_id: id.clone(),
                    phase,
                    source,
                };
                warn!("{}", err);
                failed.insert(id);
            }
        }
    }

    failed
}

fn run_hook(
    phase: Phase,
    module: &mut LoadedMod,
    host: &mut HostServices,
) -> anyhow::Result<()> {
    let mut ctx = HostContext {
        mod_id: &module.metadata.id,
        registry: host.registry.as_mut(),
        assets: host.assets.as_mut(),
        events: host.events.as_mut(),
    };
    let instance = module.instance.as_mut();
    let result = catch_unwind(AssertUnwindSafe(|| match phase {
        Phase::Registry => instance.register_content(&mut ctx),
        Phase::Listener => instance.register_listeners(&mut ctx),
        Phase::Init => instance.init(&mut ctx),
        Phase::Asset => Ok(()),
    }));
    match result {
        Ok(outcome) => outcome,
        Err(payload) => Err(anyhow!("panicked: {}", panic_message(&payload))),
    }
}

/// The asset phase is host-driven: walk the package's asset tree and feed
/// each file to the sink under its derived namespaced identifier.
fn ingest_assets(module: &LoadedMod, host: &mut HostServices) -> anyhow::Result<()> {
    let id = &module.metadata.id;
    for relative in module.package.asset_entries(id)? {
        host.assets
            .accept(AssetEntry::from_relative_path(id, &relative))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::api::{ContentEntry, NamespacedId};
    use crate::mods::isolation::{EntrypointRegistry, IsolationContextFactory};
    use crate::mods::manifest::{LoadPriority, ModMetadata};
    use crate::mods::package::ModPackage;
    use crate::mods::traits::GameMod;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct RegisteringMod;
    impl GameMod for RegisteringMod {
        fn register_content(&mut self, ctx: &mut HostContext<'_>) -> anyhow::Result<()> {
            ctx.registry.register(
                NamespacedId::new(ctx.mod_id, "forest_tile"),
                ContentEntry {
                    kind: "tile".to_string(),
                    data: json!({"yield": "wood"}),
                },
            )
        }
    }

    struct FailingMod;
    impl GameMod for FailingMod {
        fn register_content(&mut self, _ctx: &mut HostContext<'_>) -> anyhow::Result<()> {
            anyhow::bail!("refused to register")
        }
    }

    struct PanickingMod;
    impl GameMod for PanickingMod {
        fn init(&mut self, _ctx: &mut HostContext<'_>) -> anyhow::Result<()> {
            panic!("init went sideways")
        }
    }

    fn loaded(dir: &TempDir, id: &str, instance: Box<dyn GameMod>) -> LoadedMod {
        let path = dir.path().join(id);
        std::fs::create_dir_all(&path).unwrap();
        let package = ModPackage::classify(&path).unwrap();
        let factory = IsolationContextFactory::new(Arc::new(EntrypointRegistry::new()));
        LoadedMod {
            isolation: factory.create(id, &package).unwrap(),
            package,
            metadata: ModMetadata {
                id: id.to_string(),
                name: id.to_string(),
                version: "1.0.0".to_string(),
                entrypoint: format!("{id}:mod"),
                description: String::new(),
                dependencies: Vec::new(),
                load_priority: LoadPriority::Normal,
            },
            instance,
        }
    }

    #[test]
    fn registry_phase_reaches_the_host_registry() {
        let dir = TempDir::new().unwrap();
        let mut mods = vec![loaded(&dir, "base", Box::new(RegisteringMod))];
        let mut host = HostServices::in_memory();

        let failed = run_phase(Phase::Registry, &mut mods, &mut host);
        assert!(failed.is_empty());
        assert_eq!(host.registry.count(), 1);
    }

    #[test]
    fn hook_error_fails_only_that_mod() {
        let dir = TempDir::new().unwrap();
        let mut mods = vec![
            loaded(&dir, "bad", Box::new(FailingMod)),
            loaded(&dir, "good", Box::new(RegisteringMod)),
        ];
        let mut host = HostServices::in_memory();

        let failed = run_phase(Phase::Registry, &mut mods, &mut host);
        assert_eq!(failed.iter().collect::<Vec<_>>(), vec!["bad"]);
        assert_eq!(host.registry.count(), 1);
    }

    #[test]
    fn panicking_hook_is_contained() {
        let dir = TempDir::new().unwrap();
        let mut mods = vec![
            loaded(&dir, "bomb", Box::new(PanickingMod)),
            loaded(&dir, "calm", Box::new(RegisteringMod)),
        ];
        let mut host = HostServices::in_memory();

        let failed = run_phase(Phase::Init, &mut mods, &mut host);
        assert_eq!(failed.iter().collect::<Vec<_>>(), vec!["bomb"]);
    }

    #[test]
    fn asset_phase_ingests_the_package_tree() {
        let dir = TempDir::new().unwrap();
        let module = loaded(&dir, "base", Box::new(RegisteringMod));
        let asset_dir = dir.path().join("base/assets/base/textures/high");
        std::fs::create_dir_all(&asset_dir).unwrap();
        std::fs::write(asset_dir.join("tile.png"), b"png").unwrap();

        let mut mods = vec![module];
        let mut host = HostServices::in_memory();
        let failed = run_phase(Phase::Asset, &mut mods, &mut host);
        assert!(failed.is_empty());
        assert_eq!(host.assets.count(), 1);
    }

    #[test]
    fn phase_names_read_well_in_errors() {
        let err = PhaseError {
            mod_id: "base".to_string(),
            phase: Phase::Listener,
            source: anyhow!("no such event"),
        };
        assert_eq!(
            err.to_string(),
            "mod `base` failed during listener wiring: no such event"
        );
    }
}
