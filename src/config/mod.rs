// src/config/mod.rs
pub mod settings;
pub mod sources;

pub use settings::CacheSettings;
pub use sources::{default_seed, load_sources_default, load_sources_from};
