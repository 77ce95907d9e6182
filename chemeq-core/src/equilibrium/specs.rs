use crate::errors::{ChemeqError, ChemeqResult};
use crate::properties::ChemicalProps;
use crate::species::Species;
use crate::system::ChemicalSystem;
use crate::{P_REF, RGAS};
use indexmap::IndexSet;
use itertools::Itertools;
use ndarray::Array1;
use std::fmt;
use std::sync::Arc;

/// A user supplied constraint equation.
///
/// The equation is identified by a tag and evaluated as a residual over the
/// derived properties of the current iterate and the numeric input vector
/// declared in the [EquilibriumSpecs]. The residual must vanish at the
/// solution.
pub struct ConstraintEquation {
    id: String,
    f: Box<dyn Fn(&ChemicalProps, &[f64]) -> f64 + Send + Sync>,
}

impl ConstraintEquation {
    pub fn new(
        id: &str,
        f: impl Fn(&ChemicalProps, &[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.to_string(),
            f: Box::new(f),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn residual(&self, props: &ChemicalProps, inputs: &[f64]) -> f64 {
        (self.f)(props, inputs)
    }
}

impl fmt::Debug for ConstraintEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstraintEquation({})", self.id)
    }
}

/// An unknown control variable of the equilibrium problem.
pub(crate) enum Control {
    Temperature,
    Pressure,
    /// Amount of a titrant species added to (or removed from) the system;
    /// the column is its formula resolved in the balance space.
    Titrant { name: String, column: Array1<f64> },
}

impl Control {
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Temperature => "T",
            Self::Pressure => "P",
            Self::Titrant { name, .. } => name,
        }
    }
}

/// What a chemical potential constraint pins the potential to.
pub(crate) enum PotentialTarget {
    /// $\mu=G^0(T,p)+RT\ln(f/p^0)$ with the fugacity `f` read from the
    /// input vector (Pa).
    Fugacity { input: usize },
    /// $\mu=G^0(T,p)-RT\ln(10)\\,\text{pH}$ with the pH read from the input
    /// vector.
    Ph { input: usize },
    /// The chemical potential itself, read from the input vector (J/mol).
    Value { input: usize },
}

/// A constraint row of the equilibrium problem.
pub(crate) enum SpecConstraint {
    /// Residual over (properties, inputs).
    Equation(ConstraintEquation),
    /// Constrains the chemical potential of a (possibly virtual) species,
    /// expressed in the dual variables of the balance equations.
    Potential {
        species: Species,
        column: Array1<f64>,
        target: PotentialTarget,
    },
}

impl SpecConstraint {
    pub(crate) fn id(&self) -> String {
        match self {
            Self::Equation(eq) => eq.id().to_string(),
            Self::Potential { species, target, .. } => match target {
                PotentialTarget::Fugacity { .. } => format!("fugacity[{}]", species.name()),
                PotentialTarget::Ph { .. } => "pH".to_string(),
                PotentialTarget::Value { .. } => format!("u[{}]", species.name()),
            },
        }
    }

    /// The target chemical potential in J/mol for potential constraints.
    pub(crate) fn target_potential(
        &self,
        temperature: f64,
        pressure: f64,
        inputs: &[f64],
    ) -> f64 {
        match self {
            Self::Equation(_) => unreachable!("not a potential constraint"),
            Self::Potential { species, target, .. } => {
                let g0 = species.standard_gibbs_energy(temperature, pressure);
                match target {
                    PotentialTarget::Fugacity { input } => {
                        g0 + RGAS * temperature * (inputs[*input] / P_REF).ln()
                    }
                    PotentialTarget::Ph { input } => {
                        g0 - RGAS * temperature * std::f64::consts::LN_10 * inputs[*input]
                    }
                    PotentialTarget::Value { input } => inputs[*input],
                }
            }
        }
    }
}

/// Declaration of the structure of an equilibrium problem: which variables
/// are known inputs, which are unknown controls, and which constraint
/// equations close the problem.
///
/// Temperature and pressure are unknowns unless declared as inputs with
/// [EquilibriumSpecs::temperature] and [EquilibriumSpecs::pressure]; every
/// titrant adds one unknown. The number of unknown controls must equal the
/// number of constraint equations, which is validated when a solver is
/// built from the specs. Specs are immutable once consumed by a solver and
/// can be shared between solvers and conditions.
pub struct EquilibriumSpecs {
    system: Arc<ChemicalSystem>,
    inputs: IndexSet<String>,
    temperature_known: bool,
    pressure_known: bool,
    titrants: Vec<(String, Array1<f64>)>,
    constraints: Vec<SpecConstraint>,
}

impl EquilibriumSpecs {
    /// Specs with nothing declared: temperature and pressure are unknown
    /// and no constraints are registered.
    pub fn new(system: &Arc<ChemicalSystem>) -> Self {
        Self {
            system: system.clone(),
            inputs: IndexSet::new(),
            temperature_known: false,
            pressure_known: false,
            titrants: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Specs for the plain Gibbs energy minimization at fixed temperature
    /// and pressure.
    pub fn fixed_temperature_pressure(system: &Arc<ChemicalSystem>) -> Self {
        let mut specs = Self::new(system);
        specs.temperature();
        specs.pressure();
        specs
    }

    pub fn system(&self) -> &Arc<ChemicalSystem> {
        &self.system
    }

    /// Declare temperature as a known input named `"T"` (K).
    pub fn temperature(&mut self) -> usize {
        self.temperature_known = true;
        self.inputs.insert_full("T".to_string()).0
    }

    /// Declare pressure as a known input named `"P"` (Pa).
    pub fn pressure(&mut self) -> usize {
        self.pressure_known = true;
        self.inputs.insert_full("P".to_string()).0
    }

    /// Declare a named scalar input available to constraint equations.
    pub fn add_input(&mut self, name: &str) -> ChemeqResult<usize> {
        let (index, inserted) = self.inputs.insert_full(name.to_string());
        if !inserted {
            return Err(ChemeqError::Error(format!(
                "input `{name}` is declared more than once"
            )));
        }
        Ok(index)
    }

    /// Register a user constraint equation. Every constraint consumes one
    /// unknown control.
    pub fn add_constraint(&mut self, equation: ConstraintEquation) {
        self.constraints.push(SpecConstraint::Equation(equation));
    }

    /// Make the system open to a titrant species: its amount becomes an
    /// unknown control. The species does not have to be part of the
    /// system, but its formula must resolve in the elements of the system.
    pub fn open_to(&mut self, species: &Species) -> ChemeqResult<()> {
        let column = self.system.formula_column(species)?;
        self.titrants.push((species.name().to_string(), column));
        Ok(())
    }

    /// Constrain the fugacity of a gaseous species. Declares the input
    /// `f[name]` (Pa), opens the system to the species and registers the
    /// corresponding chemical potential constraint. The species itself
    /// does not need to be present in the system.
    pub fn fugacity(&mut self, species: &Species) -> ChemeqResult<usize> {
        let input = self.add_input(&format!("f[{}]", species.name()))?;
        let column = self.system.formula_column(species)?;
        self.titrants
            .push((species.name().to_string(), column.clone()));
        self.constraints.push(SpecConstraint::Potential {
            species: species.clone(),
            column,
            target: PotentialTarget::Fugacity { input },
        });
        Ok(input)
    }

    /// Constrain the pH. Declares the input `pH`, opens the system to H+
    /// and registers the corresponding chemical potential constraint.
    /// Requires an H+ species in the system.
    pub fn ph(&mut self) -> ChemeqResult<usize> {
        let hydron = self
            .system
            .species()
            .iter()
            .find(|s| {
                s.charge() == 1.0 && s.formula().len() == 1 && s.element_coefficient("H") == 1.0
            })
            .cloned()
            .ok_or_else(|| {
                ChemeqError::Error("the system contains no H+ species".to_string())
            })?;
        let input = self.add_input("pH")?;
        let column = self.system.formula_column(&hydron)?;
        self.titrants
            .push((hydron.name().to_string(), column.clone()));
        self.constraints.push(SpecConstraint::Potential {
            species: hydron,
            column,
            target: PotentialTarget::Ph { input },
        });
        Ok(input)
    }

    /// Constrain the chemical potential of a species to the input
    /// `u[name]` (J/mol), opening the system to it.
    pub fn chemical_potential(&mut self, species: &Species) -> ChemeqResult<usize> {
        let input = self.add_input(&format!("u[{}]", species.name()))?;
        let column = self.system.formula_column(species)?;
        self.titrants
            .push((species.name().to_string(), column.clone()));
        self.constraints.push(SpecConstraint::Potential {
            species: species.clone(),
            column,
            target: PotentialTarget::Value { input },
        });
        Ok(input)
    }

    /// The declared input names, in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|s| s.as_str())
    }

    pub fn input_index(&self, name: &str) -> ChemeqResult<usize> {
        self.inputs
            .get_index_of(name)
            .ok_or_else(|| ChemeqError::Error(format!("input `{name}` is not declared")))
    }

    pub(crate) fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub(crate) fn temperature_known(&self) -> bool {
        self.temperature_known
    }

    pub(crate) fn pressure_known(&self) -> bool {
        self.pressure_known
    }

    /// The unknown controls in solver order: temperature, pressure, then
    /// the titrants in registration order.
    pub(crate) fn controls(&self) -> Vec<Control> {
        let mut controls = Vec::new();
        if !self.temperature_known {
            controls.push(Control::Temperature);
        }
        if !self.pressure_known {
            controls.push(Control::Pressure);
        }
        for (name, column) in &self.titrants {
            controls.push(Control::Titrant {
                name: name.clone(),
                column: column.clone(),
            });
        }
        controls
    }

    pub(crate) fn constraints(&self) -> &[SpecConstraint] {
        &self.constraints
    }

    /// Check that the problem is square: one constraint equation per
    /// unknown control.
    pub fn validate(&self) -> ChemeqResult<()> {
        let controls = self.controls();
        if controls.len() != self.constraints.len() {
            return Err(ChemeqError::UndeterminedProblem(format!(
                "{} unknown control(s) [{}] but {} constraint equation(s) [{}]",
                controls.len(),
                controls.iter().map(|c| c.name()).join(", "),
                self.constraints.len(),
                self.constraints.iter().map(|c| c.id()).join(", ")
            )));
        }
        Ok(())
    }
}
