//! Host-side collaborator interfaces
//!
//! The registry, asset, and event collaborators live outside this subsystem;
//! the runtime only speaks to them through these traits. `HostServices`
//! bundles the three sinks into the explicit context object that is threaded
//! through every pipeline stage and into each mod's lifecycle hooks; there
//! are no global facades.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;

/// Identifier namespaced to the mod (or host) that owns it, e.g.
/// `base:brick_tile`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamespacedId {
    pub namespace: String,
    pub name: String,
}

impl NamespacedId {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Parse `namespace:name`; a bare name falls back to `default_namespace`.
    pub fn parse(raw: &str, default_namespace: &str) -> Self {
        match raw.split_once(':') {
            Some((ns, name)) if !ns.is_empty() => Self::new(ns, name),
            _ => Self::new(default_namespace, raw),
        }
    }
}

impl fmt::Display for NamespacedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// A piece of registrable game content (tile type, piece, rule card, ...).
#[derive(Debug, Clone)]
pub struct ContentEntry {
    pub kind: String,
    pub data: Value,
}

/// Sink for content registrations, keyed by namespaced identifier.
pub trait ContentRegistry {
    fn register(&mut self, id: NamespacedId, entry: ContentEntry) -> anyhow::Result<()>;
    fn count(&self) -> usize;
}

/// Detail level for asset variants, taken from the directory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DetailLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl DetailLevel {
    /// Recognize a detail-level directory name; anything else is `None`.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// One discovered resource under a mod's `assets/<id>/` tree.
#[derive(Debug, Clone)]
pub struct AssetEntry {
    pub mod_id: String,
    pub category: String,
    pub detail: DetailLevel,
    /// Path relative to `assets/<mod id>/`.
    pub path: String,
}

impl AssetEntry {
    /// Build an entry from a path relative to the mod's asset root.
    ///
    /// Layout is `<category>/[<detail>/]<file...>`; a file sitting directly at
    /// the root lands in the `misc` category at the default detail level.
    pub fn from_relative_path(mod_id: &str, relative: &str) -> Self {
        let mut components = relative.split('/');
        let first = components.next().unwrap_or_default();
        let second = components.next();
        let (category, detail) = match second {
            // `first` is a category directory only if something lives below it.
            Some(second) => {
                let detail = if components.next().is_some() {
                    DetailLevel::from_dir_name(second).unwrap_or_default()
                } else {
                    DetailLevel::default()
                };
                (first.to_string(), detail)
            }
            None => ("misc".to_string(), DetailLevel::default()),
        };
        Self {
            mod_id: mod_id.to_string(),
            category,
            detail,
            path: relative.to_string(),
        }
    }
}

/// Sink for discovered assets, grouped by category and detail level.
pub trait AssetSink {
    fn accept(&mut self, entry: AssetEntry) -> anyhow::Result<()>;
    fn count(&self) -> usize;
}

/// Event listener callback registered by a mod.
pub type ListenerFn = Box<dyn FnMut(&Value)>;

/// Sink the runtime hands mod listeners to; dispatch itself lives elsewhere.
pub trait ListenerSink {
    fn subscribe(&mut self, mod_id: &str, event: NamespacedId, listener: ListenerFn);
    /// Drop every listener a mod registered. Called when containment removes
    /// a mod after its listeners were already wired.
    fn retract(&mut self, mod_id: &str);
    fn count(&self) -> usize;
}

/// The three collaborator sinks bundled for one pipeline run.
pub struct HostServices {
    pub registry: Box<dyn ContentRegistry>,
    pub assets: Box<dyn AssetSink>,
    pub events: Box<dyn ListenerSink>,
}

impl HostServices {
    /// In-memory collaborators, enough for tools and tests.
    pub fn in_memory() -> Self {
        Self {
            registry: Box::new(MemoryRegistry::default()),
            assets: Box::new(MemoryAssetSink::default()),
            events: Box::new(MemoryEventBus::default()),
        }
    }
}

/// In-memory content registry. Rejects duplicate identifiers.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: BTreeMap<String, ContentEntry>,
}

impl MemoryRegistry {
    pub fn get(&self, id: &NamespacedId) -> Option<&ContentEntry> {
        self.entries.get(&id.to_string())
    }
}

impl ContentRegistry for MemoryRegistry {
    fn register(&mut self, id: NamespacedId, entry: ContentEntry) -> anyhow::Result<()> {
        let key = id.to_string();
        if self.entries.contains_key(&key) {
            anyhow::bail!("content id `{}` is already registered", key);
        }
        debug!(id = %key, kind = %entry.kind, "registered content");
        self.entries.insert(key, entry);
        Ok(())
    }

    fn count(&self) -> usize {
        self.entries.len()
    }
}

/// In-memory asset sink.
#[derive(Default)]
pub struct MemoryAssetSink {
    entries: Vec<AssetEntry>,
}

impl MemoryAssetSink {
    pub fn entries(&self) -> &[AssetEntry] {
        &self.entries
    }

    pub fn for_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a AssetEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }
}

impl AssetSink for MemoryAssetSink {
    fn accept(&mut self, entry: AssetEntry) -> anyhow::Result<()> {
        debug!(mod_id = %entry.mod_id, category = %entry.category, path = %entry.path, "ingested asset");
        self.entries.push(entry);
        Ok(())
    }

    fn count(&self) -> usize {
        self.entries.len()
    }
}

/// In-memory listener store keyed by event id.
#[derive(Default)]
pub struct MemoryEventBus {
    listeners: Vec<(String, NamespacedId, ListenerFn)>,
}

impl MemoryEventBus {
    /// Synchronously invoke every listener subscribed to `event`.
    pub fn emit(&mut self, event: &NamespacedId, payload: &Value) {
        for (_, subscribed, listener) in &mut self.listeners {
            if subscribed == event {
                listener(payload);
            }
        }
    }
}

impl ListenerSink for MemoryEventBus {
    fn subscribe(&mut self, mod_id: &str, event: NamespacedId, listener: ListenerFn) {
        debug!(mod_id, event = %event, "wired listener");
        self.listeners.push((mod_id.to_string(), event, listener));
    }

    fn retract(&mut self, mod_id: &str) {
        self.listeners.retain(|(owner, _, _)| owner != mod_id);
    }

    fn count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn namespaced_id_parsing() {
        let id = NamespacedId::parse("base:brick_tile", "fallback");
        assert_eq!(id.namespace, "base");
        assert_eq!(id.name, "brick_tile");

        let id = NamespacedId::parse("bare", "fallback");
        assert_eq!(id.namespace, "fallback");
        assert_eq!(id.to_string(), "fallback:bare");
    }

    #[test]
    fn registry_rejects_duplicates() {
        let mut registry = MemoryRegistry::default();
        let entry = ContentEntry {
            kind: "tile".to_string(),
            data: json!({}),
        };
        registry
            .register(NamespacedId::new("base", "brick"), entry.clone())
            .unwrap();
        assert!(registry
            .register(NamespacedId::new("base", "brick"), entry)
            .is_err());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn asset_entry_grouping() {
        let entry = AssetEntry::from_relative_path("base", "textures/high/road.png");
        assert_eq!(entry.category, "textures");
        assert_eq!(entry.detail, DetailLevel::High);

        let entry = AssetEntry::from_relative_path("base", "audio/dice.ogg");
        assert_eq!(entry.category, "audio");
        assert_eq!(entry.detail, DetailLevel::Medium);

        let entry = AssetEntry::from_relative_path("base", "readme.txt");
        assert_eq!(entry.category, "misc");
    }

    #[test]
    fn event_bus_emit_and_retract() {
        let mut bus = MemoryEventBus::default();
        let hits = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = hits.clone();
        bus.subscribe(
            "base",
            NamespacedId::new("catan", "turn_started"),
            Box::new(move |_| counter.set(counter.get() + 1)),
        );

        bus.emit(&NamespacedId::new("catan", "turn_started"), &json!({}));
        assert_eq!(hits.get(), 1);

        bus.retract("base");
        bus.emit(&NamespacedId::new("catan", "turn_started"), &json!({}));
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.count(), 0);
    }
}
