//! Convenience constructors for the common phase configurations.

use crate::aqueous::{Davies, IdealAqueous};
use crate::condensed::UnitActivity;
use crate::exchange::GainesThomasIdeal;
use crate::gaseous::IdealGasActivity;
use chemeq_core::{chain, ChemeqResult, Phase, PhaseKind, SpeciesDatabase};
use std::sync::Arc;

/// An aqueous phase with the given species, using the ideal molality base
/// model chained with the Davies correction.
pub fn aqueous_phase(db: &SpeciesDatabase, names: &[&str]) -> ChemeqResult<Phase> {
    Ok(
        Phase::new("AqueousPhase", PhaseKind::Aqueous, db.get_all(names)?)?.with_activity_model(
            chain(vec![Arc::new(IdealAqueous), Arc::new(Davies::new())]),
        ),
    )
}

/// A gaseous phase with ideal gas fugacities.
pub fn gaseous_phase(db: &SpeciesDatabase, names: &[&str]) -> ChemeqResult<Phase> {
    Ok(
        Phase::new("GaseousPhase", PhaseKind::Gaseous, db.get_all(names)?)?
            .with_activity_model(Arc::new(IdealGasActivity)),
    )
}

/// A pure mineral phase, named after its single species.
pub fn mineral_phase(db: &SpeciesDatabase, name: &str) -> ChemeqResult<Phase> {
    Ok(
        Phase::new(name, PhaseKind::Mineral, vec![db.get(name)?.clone()])?
            .with_activity_model(Arc::new(UnitActivity)),
    )
}

/// One pure mineral phase per name.
pub fn mineral_phases(db: &SpeciesDatabase, names: &[&str]) -> ChemeqResult<Vec<Phase>> {
    names.iter().map(|name| mineral_phase(db, name)).collect()
}

/// An ion exchange phase with ideal Gaines-Thomas activities.
pub fn ion_exchange_phase(db: &SpeciesDatabase, names: &[&str]) -> ChemeqResult<Phase> {
    Ok(
        Phase::new("IonExchangePhase", PhaseKind::IonExchange, db.get_all(names)?)?
            .with_activity_model(Arc::new(GainesThomasIdeal)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemeq_core::ChemicalSystem;

    #[test]
    fn assembled_system() {
        let db = crate::db::builtin().unwrap();
        let solution = aqueous_phase(
            &db,
            &["H2O", "H+", "OH-", "CO2", "HCO3-", "CO3-2", "Na+", "Cl-"],
        )
        .unwrap();
        let gas = gaseous_phase(&db, &["CO2(g)", "H2O(g)"]).unwrap();
        let minerals = mineral_phases(&db, &["Halite", "Calcite"]).unwrap();

        let mut phases = vec![solution, gas];
        phases.extend(minerals);
        let system = ChemicalSystem::new(phases).unwrap();
        assert_eq!(system.species_count(), 12);
        assert_eq!(system.phases().len(), 4);
        // CO2 appears in both the solution and the gas phase under
        // different names; the shared formula maps to the same elements
        assert!(system.element_index("C").is_ok());
    }

    #[test]
    fn unknown_species_is_reported() {
        let db = crate::db::builtin().unwrap();
        assert!(aqueous_phase(&db, &["H2O", "Xe+"]).is_err());
    }
}
