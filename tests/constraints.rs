//! Generalized equilibrium problems: custom constraint equations, unknown
//! temperature and pressure, and failure signaling.

use approx::assert_relative_eq;
use chemeq::*;
use quantity::{BAR, JOULE, KELVIN, KILOGRAM, METER, MOL};
use std::sync::Arc;

fn carbonate_gas_system() -> Arc<ChemicalSystem> {
    let db = db::builtin().unwrap();
    let solution = aqueous_phase(
        &db,
        &["H2O", "H+", "OH-", "CO2", "HCO3-", "CO3-2", "Na+", "Cl-"],
    )
    .unwrap();
    let gas = gaseous_phase(&db, &["CO2(g)", "H2O(g)"]).unwrap();
    Arc::new(ChemicalSystem::new(vec![solution, gas]).unwrap())
}

fn initial_state(system: &Arc<ChemicalSystem>) -> ChemicalState {
    let mut state = ChemicalState::new(system);
    state.set_species_mass("H2O", 1.0 * KILOGRAM).unwrap();
    state.set_species_amount("CO2(g)", 1.0 * MOL).unwrap();
    state.set_species_amount("Na+", 0.5 * MOL).unwrap();
    state.set_species_amount("Cl-", 0.5 * MOL).unwrap();
    state
}

/// The volume/internal-energy round trip: equilibrate at a known (T, p),
/// then recover that state from a cold start by imposing its volume and
/// internal energy with temperature and pressure unknown.
#[test]
fn volume_internal_energy_constraints() {
    let system = carbonate_gas_system();

    // reference solve at fixed conditions
    let mut reference = initial_state(&system);
    reference.set_temperature(330.0 * KELVIN).unwrap();
    reference.set_pressure(10.0 * BAR).unwrap();
    assert!(equilibrate(&mut reference).unwrap().succeeded);

    let props = ChemicalProps::new(&reference).unwrap();
    let m3 = METER * METER * METER;
    let v_ref = (props.volume() / m3).into_value();
    let u_ref = (props.internal_energy() / JOULE).into_value();

    // same composition, temperature and pressure left unknown and closed
    // by volume and internal energy constraints
    let mut specs = EquilibriumSpecs::new(&system);
    let iv = specs.add_input("V").unwrap();
    let iu = specs.add_input("U").unwrap();
    specs.add_constraint(ConstraintEquation::new("VolumeConstraint", move |props, w| {
        let m3 = METER * METER * METER;
        ((props.volume() / m3).into_value() - w[iv]) / w[iv]
    }));
    specs.add_constraint(ConstraintEquation::new(
        "InternalEnergyConstraint",
        move |props, w| ((props.internal_energy() / JOULE).into_value() - w[iu]) / w[iu].abs(),
    ));
    let solver = EquilibriumSolver::with_specs(specs).unwrap();

    let mut conditions = EquilibriumConditions::new(solver.specs());
    conditions.set("V", v_ref).unwrap();
    conditions.set("U", u_ref).unwrap();
    conditions.set_lower_bound_pressure(0.1 * BAR);

    let mut state = initial_state(&system);
    // finite difference constraint Jacobians limit the attainable residual
    let options = SolverOptions::new().max_iter(400).tol(1e-7);
    let result = solver.solve_with(&mut state, &conditions, options).unwrap();
    assert!(result.succeeded);

    assert_relative_eq!(
        (state.temperature() / KELVIN).into_value(),
        330.0,
        max_relative = 1e-3
    );
    assert_relative_eq!(
        (state.pressure() / BAR).into_value(),
        10.0,
        max_relative = 1e-3
    );
    for (a, b) in state.amounts().iter().zip(reference.amounts().iter()) {
        assert!(
            (a - b).abs() <= 1e-4 * (1.0 + b.abs()),
            "amounts differ: {a} vs {b}"
        );
    }
}

#[test]
fn constraint_residuals_vanish_at_solution() {
    let system = carbonate_gas_system();

    let mut specs = EquilibriumSpecs::new(&system);
    specs.temperature();
    let iv = specs.add_input("V").unwrap();
    let equation = move |props: &ChemicalProps, w: &[f64]| {
        let m3 = METER * METER * METER;
        ((props.volume() / m3).into_value() - w[iv]) / w[iv]
    };
    specs.add_constraint(ConstraintEquation::new("VolumeConstraint", equation));
    let solver = EquilibriumSolver::with_specs(specs).unwrap();

    let mut conditions = EquilibriumConditions::new(solver.specs());
    conditions.temperature(298.15 * KELVIN).unwrap();
    conditions.set("V", 2.5e-3).unwrap(); // pressure adjusts the gas volume

    let mut state = initial_state(&system);
    let options = SolverOptions::new().tol(1e-9);
    let result = solver.solve_with(&mut state, &conditions, options).unwrap();
    assert!(result.succeeded);

    let props = ChemicalProps::new(&state).unwrap();
    let m3 = METER * METER * METER;
    let inputs = [298.15, 2.5e-3];
    let residual = {
        let v = (props.volume() / m3).into_value();
        (v - inputs[1]) / inputs[1]
    };
    assert!(residual.abs() < 1e-8, "residual = {residual}");
}

#[test]
fn fixed_ph_pins_hydron_activity() {
    let system = carbonate_gas_system();

    let mut specs = EquilibriumSpecs::fixed_temperature_pressure(&system);
    specs.ph().unwrap();
    let solver = EquilibriumSolver::with_specs(specs).unwrap();

    let mut conditions = EquilibriumConditions::new(solver.specs());
    conditions.temperature(298.15 * KELVIN).unwrap();
    conditions.pressure(1.0 * BAR).unwrap();
    conditions.ph(4.0).unwrap();

    let mut state = initial_state(&system);
    let result = solver
        .solve_with(&mut state, &conditions, SolverOptions::default())
        .unwrap();
    assert!(result.succeeded);

    let aprops = AqueousProps::new(&state).unwrap();
    assert_relative_eq!(aprops.ph().unwrap(), 4.0, epsilon = 1e-6);
}

#[test]
fn contradictory_pressure_bounds_are_infeasible() {
    let system = carbonate_gas_system();
    let db = db::builtin().unwrap();

    let mut specs = EquilibriumSpecs::fixed_temperature_pressure(&system);
    specs.fugacity(db.get("CO2(g)").unwrap()).unwrap();
    let solver = EquilibriumSolver::with_specs(specs).unwrap();

    let mut conditions = EquilibriumConditions::new(solver.specs());
    conditions.temperature(298.15 * KELVIN).unwrap();
    conditions.pressure(1.0 * BAR).unwrap();
    conditions.fugacity("CO2(g)", 0.1 * BAR).unwrap();
    conditions.set_lower_bound_pressure(10.0 * BAR);
    conditions.set_upper_bound_pressure(1.0 * BAR);

    let mut state = initial_state(&system);
    let result = solver.solve_with(&mut state, &conditions, SolverOptions::default());
    assert!(matches!(result, Err(ChemeqError::Infeasible(_))));
}

#[test]
fn unreachable_constraint_reports_failure() {
    let system = carbonate_gas_system();

    // ask the (essentially incompressible) liquid-dominated system for a
    // thousandfold volume reduction while capping the pressure: no state
    // within the bounds can satisfy the constraint
    let mut specs = EquilibriumSpecs::new(&system);
    specs.temperature();
    let iv = specs.add_input("V").unwrap();
    specs.add_constraint(ConstraintEquation::new("VolumeConstraint", move |props, w| {
        let m3 = METER * METER * METER;
        ((props.volume() / m3).into_value() - w[iv]) / w[iv]
    }));
    let solver = EquilibriumSolver::with_specs(specs).unwrap();

    let mut conditions = EquilibriumConditions::new(solver.specs());
    conditions.temperature(298.15 * KELVIN).unwrap();
    conditions.set("V", 1.0e-6).unwrap();
    conditions.set_upper_bound_pressure(10.0 * BAR);

    let mut state = initial_state(&system);
    let options = SolverOptions::new().max_iter(60);
    let result = solver.solve_with(&mut state, &conditions, options).unwrap();
    assert!(!result.succeeded);
    assert!(result.residual > 1e-6);
}

#[test]
fn mismatched_conditions_are_rejected() {
    let system = carbonate_gas_system();
    let solver = EquilibriumSolver::new(&system);

    let mut other_specs = EquilibriumSpecs::fixed_temperature_pressure(&system);
    other_specs.add_input("V").unwrap();
    let conditions = EquilibriumConditions::new(&other_specs);

    let mut state = initial_state(&system);
    assert!(solver
        .solve_with(&mut state, &conditions, SolverOptions::default())
        .is_err());
}

#[test]
fn unbalanced_specs_are_rejected() {
    let system = carbonate_gas_system();
    // pressure unknown, but no constraint to pin it down
    let mut specs = EquilibriumSpecs::new(&system);
    specs.temperature();
    assert!(EquilibriumSolver::with_specs(specs).is_err());
}
