//! The extension contract every mod entry point satisfies
//!
//! A mod's constructor returns `Box<dyn GameMod>`; the runtime drives the
//! lifecycle hooks one phase at a time, in resolved load order. Hooks are
//! optional (the defaults do nothing) and report failure through
//! `anyhow::Result` so a mod can surface any error type it likes.

use crate::mods::api::{AssetSink, ContentRegistry, ListenerSink};

/// Per-call view of the host handed to a mod's lifecycle hooks.
///
/// `mod_id` identifies the mod being driven; sinks are shared across all
/// mods in the run.
pub struct HostContext<'a> {
    pub mod_id: &'a str,
    pub registry: &'a mut dyn ContentRegistry,
    pub assets: &'a mut dyn AssetSink,
    pub events: &'a mut dyn ListenerSink,
}

/// Lifecycle hooks for an installed mod.
pub trait GameMod {
    /// Content registration phase: contribute tiles, pieces, cards.
    fn register_content(&mut self, ctx: &mut HostContext<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Listener wiring phase: subscribe to game events.
    fn register_listeners(&mut self, ctx: &mut HostContext<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Initialization phase: last hook before the game starts.
    fn init(&mut self, ctx: &mut HostContext<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }
}
