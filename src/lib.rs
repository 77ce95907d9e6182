#![warn(clippy::all)]

//! `chemeq` - a framework for multiphase chemical equilibrium calculations.
//!
//! The crate computes chemical equilibrium states of systems composed of
//! aqueous, gaseous, mineral and ion exchange phases by constrained Gibbs
//! energy minimization. The machinery (species, phases, systems, states,
//! the equilibrium solver and derived property views) lives in
//! [`chemeq-core`](chemeq_core) and is re-exported here together with
//! concrete activity models and a small built-in species database.
//!
//! ```
//! use chemeq::*;
//! use quantity::{BAR, KELVIN, KILOGRAM, MOL};
//! use std::sync::Arc;
//!
//! # fn main() -> ChemeqResult<()> {
//! let db = db::builtin()?;
//! let solution = aqueous_phase(&db, &["H2O", "H+", "OH-", "Na+", "Cl-"])?;
//! let system = Arc::new(ChemicalSystem::new(vec![solution])?);
//!
//! let mut state = ChemicalState::new(&system);
//! state.set_temperature(298.15 * KELVIN)?;
//! state.set_pressure(1.0 * BAR)?;
//! state.set_species_mass("H2O", 1.0 * KILOGRAM)?;
//! state.set_species_amount("Na+", 0.5 * MOL)?;
//! state.set_species_amount("Cl-", 0.5 * MOL)?;
//!
//! let result = equilibrate(&mut state)?;
//! assert!(result.succeeded);
//!
//! let aprops = AqueousProps::new(&state)?;
//! println!("pH = {:.2}", aprops.ph()?);
//! # Ok(())
//! # }
//! ```

pub use chemeq_core::*;

mod aqueous;
mod condensed;
pub mod db;
mod exchange;
mod gaseous;
mod phases;

pub use aqueous::{Davies, IdealAqueous};
pub use condensed::{IdealSolution, UnitActivity};
pub use exchange::GainesThomasIdeal;
pub use gaseous::IdealGasActivity;
pub use phases::{
    aqueous_phase, gaseous_phase, ion_exchange_phase, mineral_phase, mineral_phases,
};
