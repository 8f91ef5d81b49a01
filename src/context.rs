//! Wiring: the one place a caller assembles configuration, storage, and
//! the clock before driving any component. No component or model owns
//! global mutable state; every C1–C10 entry point takes a `&Context<S>`
//! (or just the narrower repository trait it actually needs).

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::AsrConfig;
use crate::repository::RepositoryFactory;

/// Bundles the config snapshot, the repository factory, and the clock
/// that every component call reads through.
pub struct Context<S: RepositoryFactory> {
    pub cfg: Arc<AsrConfig>,
    pub store: S,
    pub clock: Arc<dyn Clock>,
}

impl<S: RepositoryFactory> Context<S> {
    pub fn new(cfg: AsrConfig, store: S, clock: Arc<dyn Clock>) -> Self {
        Self { cfg: Arc::new(cfg), store, clock }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::repository::memory::MemoryRepositoryFactory;

    #[test]
    fn context_wires_config_store_and_clock() {
        let ctx = Context::new(AsrConfig::default(), MemoryRepositoryFactory::new(), Arc::new(SystemClock));
        assert_eq!(ctx.cfg.max_workers, 4);
    }
}
