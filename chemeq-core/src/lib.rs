#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

//! Core data structures and solvers for multiphase chemical equilibrium
//! calculations.
//!
//! The crate is organized around a small number of building blocks:
//! * [Species] and [SpeciesDatabase] - static species data with pluggable
//!   standard thermodynamic property models,
//! * [Phase] and the [ActivityModel] contract - groups of species sharing
//!   one activity/fugacity model,
//! * [ChemicalSystem] - the immutable assembly of phases defining the index
//!   space of a calculation,
//! * [ChemicalState] - temperature, pressure and species amounts,
//! * [EquilibriumSpecs], [EquilibriumConditions] and [EquilibriumSolver] -
//!   the constrained Gibbs energy minimization,
//! * [ChemicalProps] and [AqueousProps] - derived read-only property views.

/// Print messages with level `Verbosity::Iter` or higher.
#[macro_export]
macro_rules! log_iter {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= Verbosity::Iter {
            println!($($arg)*);
        }
    }
}

/// Print messages with level `Verbosity::Result` or higher.
#[macro_export]
macro_rules! log_result {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= Verbosity::Result {
            println!($($arg)*);
        }
    }
}

mod element;
mod equilibrium;
mod errors;
mod phase;
mod properties;
mod species;
mod state;
mod system;
pub mod thermo;

pub use element::{Element, ElementDatabase};
pub use equilibrium::{
    equilibrate, ConstraintEquation, EquilibriumConditions, EquilibriumResult, EquilibriumSolver,
    EquilibriumSpecs,
};
pub use errors::{ChemeqError, ChemeqResult};
pub use phase::{chain, ActivityInput, ActivityModel, ActivityModelChain, Phase, PhaseActivity, PhaseKind};
pub use properties::{AqueousProps, ChemicalProps, Molality};
pub use species::{Species, SpeciesDatabase, SpeciesRecord};
pub use state::ChemicalState;
pub use system::ChemicalSystem;
pub use thermo::{
    ConstantGibbsEnergy, InterpolatedGibbsEnergy, ReferenceThermoModel, StandardThermoModel,
    StandardThermoModelDual, ThermoRecord,
};

/// Molar gas constant in J/(mol K), used throughout the reduced
/// (dimensionless) formulation of the solver.
pub const RGAS: f64 = 8.31446261815324;

/// Reference temperature of the standard thermodynamic models (K).
pub const T_REF: f64 = 298.15;

/// Reference pressure of the standard thermodynamic models (Pa).
pub const P_REF: f64 = 1.0e5;

/// Level of detail in the iteration output.
#[derive(Copy, Clone, PartialOrd, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Do not print output.
    #[default]
    None,
    /// Print information about the success or failure of the iteration.
    Result,
    /// Print a detailed output for every iteration.
    Iter,
}

/// Options for the equilibrium solver.
///
/// If the values are [None], solver specific default
/// values are used.
#[derive(Copy, Clone, Default)]
pub struct SolverOptions {
    /// Maximum number of iterations.
    pub max_iter: Option<usize>,
    /// Tolerance.
    pub tol: Option<f64>,
    /// Iteration output indicated by the [Verbosity] enum.
    pub verbosity: Verbosity,
}

impl From<(Option<usize>, Option<f64>, Option<Verbosity>)> for SolverOptions {
    fn from(options: (Option<usize>, Option<f64>, Option<Verbosity>)) -> Self {
        Self {
            max_iter: options.0,
            tol: options.1,
            verbosity: options.2.unwrap_or(Verbosity::None),
        }
    }
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = Some(tol);
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn unwrap_or(self, max_iter: usize, tol: f64) -> (usize, f64, Verbosity) {
        (
            self.max_iter.unwrap_or(max_iter),
            self.tol.unwrap_or(tol),
            self.verbosity,
        )
    }
}
