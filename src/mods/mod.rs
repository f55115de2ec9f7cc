//! Mod runtime for catan-mods
//!
//! Turns a directory of third-party mod packages into live, initialized
//! extensions of the game:
//!
//! - **Discovery**: scan the mods directory for package directories and
//!   archives
//! - **Manifests**: parse each package's `catan.mod.json5` into immutable
//!   metadata
//! - **Resolution**: validate dependency edges and produce a priority-aware
//!   topological load order
//! - **Isolation**: load each mod's native code behind its own boundary;
//!   host contracts are shared, never duplicated
//! - **Activation**: drive content registration, asset ingestion, listener
//!   wiring, and initialization phases with per-mod failure containment

pub mod api;
pub mod discovery;
pub mod error;
pub mod instance;
pub mod isolation;
pub mod manifest;
pub mod package;
pub mod phases;
pub mod pipeline;
pub mod resolve;
pub mod traits;

pub use api::{
    AssetEntry, AssetSink, ContentEntry, ContentRegistry, DetailLevel, HostServices, ListenerSink,
    NamespacedId,
};
pub use error::{
    DependencyError, InstantiationError, MetadataParseError, ModError, PhaseError,
};
pub use instance::LoadedMod;
pub use isolation::{EntrypointRegistry, ModConstructor, MOD_ABI_VERSION};
pub use manifest::{DiscoveredMod, LoadPriority, ModDependency, ModMetadata};
pub use pipeline::ModPipeline;
pub use traits::{GameMod, HostContext};
