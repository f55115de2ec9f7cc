//! catan-mods - Mod loading runtime for a Catan-style strategy game
//!
//! Turns a directory of third-party mod packages into live, initialized
//! extensions of the game. The runtime discovers packages, parses their
//! relaxed-JSON manifests, resolves declared dependencies into a safe load
//! order, constructs each mod behind its own code-loading boundary, and
//! drives the multi-phase activation sequence with per-mod failure
//! containment.
//!
//! ## Design Principles
//!
//! 1. **One bad mod never sinks the run**: metadata, instantiation, and
//!    phase failures remove only the mod (and its hard dependents)
//! 2. **Dependencies before dependents**: load order is a topological sort;
//!    declared priority only breaks ties between independent mods
//! 3. **Explicit host access**: mods reach the game exclusively through the
//!    context object handed to their lifecycle hooks
//! 4. **Shared contracts, isolated code**: host types are linked once; each
//!    mod's own code loads behind a private boundary

// Memory allocator optimization using mimalloc (faster than default allocator)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod mods;
pub mod utils;

pub use config::{LoggingConfig, ModLoaderConfig};
pub use mods::{
    GameMod, HostContext, HostServices, LoadedMod, ModError, ModPipeline, MOD_ABI_VERSION,
};
