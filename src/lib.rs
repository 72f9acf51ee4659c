pub mod allocator;
pub mod error;
pub mod events;
pub mod first_fit;
pub mod genetic;
pub mod guillotine;
pub mod ids;
pub mod pieces;
pub mod planner;
pub mod render;
pub mod settings;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{PlanError, Result};
pub use planner::{EfficiencyReport, Planner, efficiency_report};
