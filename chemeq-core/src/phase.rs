use crate::errors::{ChemeqError, ChemeqResult};
use crate::species::Species;
use crate::thermo::standard_props;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Aggregation kind of a phase.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Aqueous,
    Gaseous,
    Liquid,
    SolidSolution,
    Mineral,
    IonExchange,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Aqueous => "aqueous",
            Self::Gaseous => "gaseous",
            Self::Liquid => "liquid",
            Self::SolidSolution => "solid solution",
            Self::Mineral => "mineral",
            Self::IonExchange => "ion exchange",
        };
        write!(f, "{name}")
    }
}

/// Amounts below this total are treated as a vanished phase when computing
/// mole fractions.
const VANISHED_PHASE: f64 = 1e-130;

/// Input to an activity model evaluation: temperature, pressure and the
/// phase-local composition.
pub struct ActivityInput<'a> {
    /// Temperature in K.
    pub temperature: f64,
    /// Pressure in Pa.
    pub pressure: f64,
    /// Species amounts in mol, ordered as in the phase.
    pub amounts: ArrayView1<'a, f64>,
    /// The species of the phase.
    pub species: &'a [Species],
    pub kind: PhaseKind,
}

impl ActivityInput<'_> {
    /// Total amount of the phase in mol.
    pub fn total(&self) -> f64 {
        self.amounts.sum()
    }

    /// Mole fractions, well-posed in the limit of a vanished phase where
    /// they degenerate to the uniform composition.
    pub fn mole_fractions(&self) -> Array1<f64> {
        let total = self.total();
        if total < VANISHED_PHASE {
            Array1::from_elem(self.amounts.len(), 1.0 / self.amounts.len() as f64)
        } else {
            self.amounts.mapv(|n| n / total)
        }
    }
}

/// Result of an activity model evaluation.
///
/// Activities are defined such that the chemical potential of species `i`
/// is $\mu_i = G^0_i + RT\ln a_i$ for every phase kind. For gases this
/// means $\ln a_i=\ln\varphi_i+\ln y_i+\ln(p/p^0)$ with the fugacity
/// referenced to $p^0=1\\,\text{bar}$.
#[derive(Clone, Debug)]
pub struct PhaseActivity {
    /// Natural logarithm of the activity coefficients.
    pub ln_activity_coefficients: Array1<f64>,
    /// Natural logarithm of the activities.
    pub ln_activities: Array1<f64>,
    /// Natural logarithm of the fugacity coefficients (gaseous phases).
    pub ln_fugacity_coefficients: Option<Array1<f64>>,
    /// Molar volume of the phase in m³/mol. [None] delegates to the
    /// standard molar volumes of the species.
    pub molar_volume: Option<f64>,
}

impl PhaseActivity {
    /// An ideal result with zero activity coefficients.
    pub fn ideal(ln_activities: Array1<f64>) -> Self {
        let n = ln_activities.len();
        Self {
            ln_activity_coefficients: Array1::zeros(n),
            ln_activities,
            ln_fugacity_coefficients: None,
            molar_volume: None,
        }
    }
}

/// An activity/fugacity model of one phase.
///
/// Implementations must be pure functions of the input; they are invoked in
/// every iteration of the equilibrium solver.
pub trait ActivityModel: Send + Sync + fmt::Display {
    fn evaluate(&self, input: &ActivityInput) -> PhaseActivity;
}

/// An ordered chain of activity models.
///
/// The first model provides the base activities; every further model is a
/// correction whose activity coefficients (and fugacity coefficients, if
/// present) are accumulated on top.
pub struct ActivityModelChain(Vec<Arc<dyn ActivityModel>>);

impl ActivityModel for ActivityModelChain {
    fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
        let mut result = self.0[0].evaluate(input);
        for model in &self.0[1..] {
            let correction = model.evaluate(input);
            result.ln_activity_coefficients += &correction.ln_activity_coefficients;
            result.ln_activities += &correction.ln_activity_coefficients;
            if let Some(phi) = correction.ln_fugacity_coefficients {
                result.ln_fugacity_coefficients = match result.ln_fugacity_coefficients {
                    Some(base) => Some(base + &phi),
                    None => Some(phi),
                };
            }
            if correction.molar_volume.is_some() {
                result.molar_volume = correction.molar_volume;
            }
        }
        result
    }
}

impl fmt::Display for ActivityModelChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain(")?;
        for (i, model) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{model}")?;
        }
        write!(f, ")")
    }
}

/// Compose several activity models into one, applied in sequence.
pub fn chain(models: Vec<Arc<dyn ActivityModel>>) -> Arc<dyn ActivityModel> {
    Arc::new(ActivityModelChain(models))
}

/// A group of species sharing one activity model.
///
/// The order of the species is stable and defines the index basis for all
/// composition vectors of the phase.
pub struct Phase {
    name: String,
    kind: PhaseKind,
    species: Vec<Species>,
    model: Option<Arc<dyn ActivityModel>>,
}

impl Phase {
    pub fn new(name: &str, kind: PhaseKind, species: Vec<Species>) -> ChemeqResult<Self> {
        if species.is_empty() {
            return Err(ChemeqError::EmptyPhase(name.to_string()));
        }
        for (i, s) in species.iter().enumerate() {
            if species[..i].iter().any(|other| other.name() == s.name()) {
                return Err(ChemeqError::DuplicateSpecies(
                    s.name().to_string(),
                    name.to_string(),
                ));
            }
        }
        Ok(Self {
            name: name.to_string(),
            kind,
            species,
            model: None,
        })
    }

    pub fn with_activity_model(mut self, model: Arc<dyn ActivityModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn set_activity_model(&mut self, model: Arc<dyn ActivityModel>) {
        self.model = Some(model);
    }

    pub fn has_activity_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Index of the water solvent within an aqueous phase.
    pub fn solvent_index(&self) -> Option<usize> {
        if self.kind != PhaseKind::Aqueous {
            return None;
        }
        self.species.iter().position(|s| s.is_water())
    }

    /// Evaluate the activity model of the phase.
    ///
    /// The molar volume is always resolved: if the model does not provide
    /// one, it is assembled from the standard molar volumes of the species
    /// at the current composition.
    pub fn evaluate<'a>(
        &'a self,
        temperature: f64,
        pressure: f64,
        amounts: ArrayView1<'a, f64>,
    ) -> ChemeqResult<PhaseActivity> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ChemeqError::MissingActivityModel(self.name.clone()))?;
        let input = ActivityInput {
            temperature,
            pressure,
            amounts,
            species: &self.species,
            kind: self.kind,
        };
        let mut result = model.evaluate(&input);
        if result.molar_volume.is_none() {
            let x = input.mole_fractions();
            let v = self
                .species
                .iter()
                .zip(x.iter())
                .map(|(s, xi)| {
                    xi * standard_props(s.thermo().as_ref(), temperature, pressure).molar_volume
                })
                .sum();
            result.molar_volume = Some(v);
        }
        Ok(result)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} species)", self.name, self.kind, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermo::ConstantGibbsEnergy;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    fn test_species(name: &str) -> Species {
        Species::new(
            name,
            &[("H", 1.0)],
            0.0,
            Arc::new(ConstantGibbsEnergy::new(0.0)),
        )
    }

    /// Ideal solution on the mole fraction scale.
    struct IdealTestModel;

    impl ActivityModel for IdealTestModel {
        fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
            PhaseActivity::ideal(input.mole_fractions().mapv(f64::ln))
        }
    }

    impl fmt::Display for IdealTestModel {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "IdealTestModel")
        }
    }

    /// Constant activity coefficient correction.
    struct ConstantGamma(f64);

    impl ActivityModel for ConstantGamma {
        fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
            let mut result = PhaseActivity::ideal(Array1::zeros(input.amounts.len()));
            result.ln_activity_coefficients.fill(self.0);
            result
        }
    }

    impl fmt::Display for ConstantGamma {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ConstantGamma({})", self.0)
        }
    }

    #[test]
    fn duplicate_species_in_phase() {
        let result = Phase::new(
            "solution",
            PhaseKind::Aqueous,
            vec![test_species("A"), test_species("A")],
        );
        assert!(result.is_err());
    }

    #[test]
    fn chained_corrections() {
        let phase = Phase::new(
            "solution",
            PhaseKind::Liquid,
            vec![test_species("A"), test_species("B")],
        )
        .unwrap()
        .with_activity_model(chain(vec![
            Arc::new(IdealTestModel),
            Arc::new(ConstantGamma(0.25)),
        ]));

        let amounts = arr1(&[1.0, 3.0]);
        let result = phase.evaluate(298.15, 1.0e5, amounts.view()).unwrap();
        assert_relative_eq!(result.ln_activity_coefficients[0], 0.25);
        assert_relative_eq!(result.ln_activities[0], 0.25f64 + 0.25f64.ln());
        assert_relative_eq!(result.ln_activities[1], 0.25f64 + 0.75f64.ln());
    }

    #[test]
    fn vanished_phase_is_well_posed() {
        let phase = Phase::new(
            "solution",
            PhaseKind::Liquid,
            vec![test_species("A"), test_species("B")],
        )
        .unwrap()
        .with_activity_model(Arc::new(IdealTestModel));

        let amounts = arr1(&[0.0, 0.0]);
        let result = phase.evaluate(298.15, 1.0e5, amounts.view()).unwrap();
        assert!(result.ln_activities.iter().all(|a| a.is_finite()));
        assert_relative_eq!(result.ln_activities[0], 0.5f64.ln());
    }
}
