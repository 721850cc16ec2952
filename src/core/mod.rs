pub mod aggregator;
pub mod engine;
pub mod error;
pub mod modules;
pub mod registry;
pub mod signal;
pub mod slot;

pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, EngineResult};
