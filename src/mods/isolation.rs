//! Per-mod isolation contexts
//!
//! Each mod's native library is loaded into its own `libloading::Library`
//! (default `RTLD_LOCAL` visibility), so two mods can define same-named
//! internal symbols without collision. Host contracts are never duplicated:
//! mods link against the host crate's types by reference, and the reserved
//! `catan:` entrypoint namespace always resolves from the shared host
//! registry, never from a mod-bundled shadow copy.

use std::collections::HashMap;
use std::sync::Arc;

use libloading::Library;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::mods::error::InstantiationError;
use crate::mods::package::{ModPackage, PackageKind};
use crate::mods::traits::GameMod;

/// ABI version stamped by `catan_mod_entry`. Bumped whenever the entry
/// protocol or the `GameMod` contract changes shape.
pub const MOD_ABI_VERSION: u32 = 1;

/// Entry symbol every native mod library exports.
pub const ENTRY_SYMBOL: &[u8] = b"catan_mod_entry";

/// Entrypoint namespace reserved for host-provided constructors.
pub const HOST_NAMESPACE: &str = "catan";

/// Zero-argument constructor for a mod's entry-point instance.
pub type ModConstructor = fn() -> Box<dyn GameMod>;

/// Signature of [`ENTRY_SYMBOL`]: register constructors, return the ABI
/// version the library was built against.
pub type ModEntryFn = unsafe extern "C" fn(registry: *mut EntrypointRegistry) -> u32;

/// Map from declared entrypoint identifier to its constructor.
#[derive(Default, Clone)]
pub struct EntrypointRegistry {
    entries: HashMap<String, ModConstructor>,
}

impl EntrypointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor; the first registration of a name wins.
    pub fn register(&mut self, name: &str, constructor: ModConstructor) {
        if self.entries.contains_key(name) {
            warn!(name, "duplicate entrypoint registration ignored");
            return;
        }
        self.entries.insert(name.to_string(), constructor);
    }

    pub fn resolve(&self, name: &str) -> Option<ModConstructor> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries claiming the reserved host namespace.
    fn strip_reserved(&mut self, mod_id: &str) {
        let reserved_prefix = format!("{}:", HOST_NAMESPACE);
        self.entries.retain(|name, _| {
            let allowed = !name.starts_with(&reserved_prefix);
            if !allowed {
                warn!(
                    mod_id,
                    entrypoint = %name,
                    "mod attempted to shadow a host entrypoint; dropped"
                );
            }
            allowed
        });
    }
}

/// One mod's code-loading boundary.
///
/// Field order is load-bearing: `own` holds function pointers into
/// `library`, and `library` must be unloaded before `_scratch` deletes an
/// extracted file on platforms that lock mapped libraries.
pub struct IsolationContext {
    own: EntrypointRegistry,
    shared: Arc<EntrypointRegistry>,
    library: Option<Library>,
    _scratch: Option<TempDir>,
}

impl IsolationContext {
    /// Resolve an entrypoint: the mod's own registrations first, then the
    /// shared host registry.
    pub fn resolve_entrypoint(&self, name: &str) -> Option<ModConstructor> {
        self.own.resolve(name).or_else(|| self.shared.resolve(name))
    }

    pub fn has_library(&self) -> bool {
        self.library.is_some()
    }
}

impl std::fmt::Debug for IsolationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolationContext")
            .field("own_entrypoints", &self.own.len())
            .field("shared_entrypoints", &self.shared.len())
            .field("has_library", &self.library.is_some())
            .finish()
    }
}

/// Builds one isolation context per package.
pub struct IsolationContextFactory {
    shared: Arc<EntrypointRegistry>,
}

impl IsolationContextFactory {
    pub fn new(shared: Arc<EntrypointRegistry>) -> Self {
        Self { shared }
    }

    /// Create the context for `package`, loading its native library when it
    /// bundles one. A package without native code gets a context backed only
    /// by the shared host registry.
    pub fn create(
        &self,
        mod_id: &str,
        package: &ModPackage,
    ) -> Result<IsolationContext, InstantiationError> {
        let (libraries, scratch) = self.locate_libraries(mod_id, package)?;

        let Some(library_path) = libraries.first() else {
            debug!(mod_id, "package bundles no native library");
            return Ok(IsolationContext {
                own: EntrypointRegistry::new(),
                shared: Arc::clone(&self.shared),
                library: None,
                _scratch: scratch,
            });
        };
        if libraries.len() > 1 {
            warn!(
                mod_id,
                count = libraries.len(),
                loading = %library_path.display(),
                "package bundles multiple native libraries; loading the first"
            );
        }

        let library = unsafe { Library::new(library_path) }.map_err(|e| {
            InstantiationError::LibraryLoad {
                id: mod_id.to_string(),
                path: library_path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        let entry: libloading::Symbol<'_, ModEntryFn> = unsafe { library.get(ENTRY_SYMBOL) }
            .map_err(|_| InstantiationError::MissingEntrySymbol {
                id: mod_id.to_string(),
            })?;

        let mut own = EntrypointRegistry::new();
        let abi = unsafe { entry(&mut own as *mut EntrypointRegistry) };
        if abi != MOD_ABI_VERSION {
            return Err(InstantiationError::AbiMismatch {
                id: mod_id.to_string(),
                expected: MOD_ABI_VERSION,
                found: abi,
            });
        }
        own.strip_reserved(mod_id);
        debug!(mod_id, entrypoints = own.len(), "loaded native mod library");

        drop(entry);
        Ok(IsolationContext {
            own,
            shared: Arc::clone(&self.shared),
            library: Some(library),
            _scratch: scratch,
        })
    }

    fn locate_libraries(
        &self,
        mod_id: &str,
        package: &ModPackage,
    ) -> Result<(Vec<std::path::PathBuf>, Option<TempDir>), InstantiationError> {
        match package.kind() {
            PackageKind::Directory => {
                let libraries =
                    package
                        .native_libraries()
                        .map_err(|e| InstantiationError::Context {
                            id: mod_id.to_string(),
                            message: e.to_string(),
                        })?;
                Ok((libraries, None))
            }
            PackageKind::Archive => {
                let scratch = TempDir::new().map_err(|e| InstantiationError::Context {
                    id: mod_id.to_string(),
                    message: e.to_string(),
                })?;
                let libraries = package
                    .extract_native_libraries(scratch.path())
                    .map_err(|message| InstantiationError::Context {
                        id: mod_id.to_string(),
                        message,
                    })?;
                Ok((libraries, Some(scratch)))
            }
        }
    }
}

/// Declare the entry symbol for a native mod library.
///
/// ```ignore
/// catan_mods::declare_mod_entry! {
///     "seafarers:mod" => SeafarersMod::boxed,
/// }
/// ```
#[macro_export]
macro_rules! declare_mod_entry {
    ($($name:expr => $constructor:expr),+ $(,)?) => {
        #[no_mangle]
        pub unsafe extern "C" fn catan_mod_entry(
            registry: *mut $crate::mods::isolation::EntrypointRegistry,
        ) -> u32 {
            let registry = &mut *registry;
            $(registry.register($name, $constructor);)+
            $crate::mods::isolation::MOD_ABI_VERSION
        }
    };
}
