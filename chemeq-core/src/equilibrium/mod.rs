//! The equilibrium problem: specification, conditions and solver.

mod conditions;
mod solver;
mod specs;

pub use conditions::EquilibriumConditions;
pub use solver::{equilibrate, EquilibriumResult, EquilibriumSolver};
pub use specs::{ConstraintEquation, EquilibriumSpecs};
