//! # Stratum Core
//!
//! Undo/redo for [`stratum_layer`] layers. See [`undo`] for the engine.

pub mod undo;

pub use stratum_layer as layer;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn init() {
    log::info!("Stratum Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
