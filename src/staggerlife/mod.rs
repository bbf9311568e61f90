//! Stagger-step engine internals and public API.

mod arena;
mod engine;
mod kernel;
mod lifecycle;
pub mod pacing;
pub mod quiescence;
pub mod rules;
mod sync;
pub mod table;
pub mod tile;
pub mod tilemap;

pub use engine::{
    LifeConfig, LifeEngine, StepOutcome, StopSignal, TileCounts, TileView, Viewport,
};
pub use rules::RuleTable;
pub use sync::{Command, PitStop, Simulation};
pub use tile::{Lifecycle, Phase};
