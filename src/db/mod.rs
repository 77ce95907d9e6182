//! A small built-in species database for aqueous carbonate and brine
//! systems.
//!
//! The records carry CODATA-consistent standard Gibbs energies and
//! entropies; the equilibrium constants they imply (e.g. log K = -14.0 for
//! water autoionization, -6.35 for CO2 hydration, +1.58 for halite
//! dissolution) match the common geochemical databases at 25 °C. External
//! databases are loaded through [SpeciesDatabase::from_json]; parsing of
//! specific database file formats is out of scope of this crate.

use chemeq_core::{ChemeqResult, SpeciesDatabase};

/// The built-in species records: water and its ions, the carbonate system,
/// Na/K/Ca/Mg/Cl ions, CO2 and water vapor, halite and calcite, and
/// NaX/KX/CaX2/MgX2 ion exchange species.
pub fn builtin() -> ChemeqResult<SpeciesDatabase> {
    SpeciesDatabase::from_json(include_str!("species.json"))
}
