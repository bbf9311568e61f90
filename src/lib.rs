//! Sparse, tiled Life-like cellular automaton with stagger-stepped tiles.
//!
//! The universe is split into 16x16 tiles that alternate between two tilings
//! offset by one cell, so a generation never shifts bits across words.
//! Quiet tiles hibernate, empty ones retire to a morgue, and a generation can
//! be undone once.

pub mod error;
pub mod staggerlife;

pub use error::LifeError;
pub use staggerlife::{
    Command, LifeConfig, LifeEngine, Lifecycle, Phase, PitStop, RuleTable, Simulation,
    StepOutcome, StopSignal, TileCounts, TileView, Viewport,
};
