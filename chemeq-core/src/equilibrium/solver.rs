use super::conditions::EquilibriumConditions;
use super::specs::{Control, EquilibriumSpecs, SpecConstraint};
use crate::errors::{ChemeqError, ChemeqResult};
use crate::properties::ChemicalProps;
use crate::state::ChemicalState;
use crate::system::ChemicalSystem;
use crate::{SolverOptions, Verbosity, RGAS};
use ndarray::{s, Array1, Array2};
use num_dual::linalg::LU;
use std::fmt;
use std::sync::Arc;

const MAX_ITER_EQ: usize = 200;
const TOL_EQ: f64 = 1e-10;

/// Barrier reduction factor per iteration.
const SIGMA: f64 = 0.1;
/// Fraction-to-boundary rule for the primal and dual step lengths.
const TAU: f64 = 0.995;
/// Initial lower bound on species amounts: the interior point iteration
/// requires a strictly positive starting composition.
const AMOUNT_FLOOR: f64 = 1e-12;
/// Relative step used in finite difference Jacobians.
const FD_STEP: f64 = 1e-6;
/// Maximum number of step halvings in the backtracking line search.
const LINE_SEARCH_STEPS: usize = 5;
/// Tikhonov regularization ladder applied when the KKT matrix is singular.
const REGULARIZATION: [f64; 4] = [1e-12, 1e-10, 1e-7, 1e-4];

/// Convergence report of an equilibrium calculation.
///
/// A `false` success flag marks the state written by the solver as
/// unconverged diagnostics; its amounts must not be trusted.
#[derive(Clone, Copy, Debug)]
pub struct EquilibriumResult {
    /// Whether the iteration satisfied all optimality conditions.
    pub succeeded: bool,
    /// Number of Newton iterations performed.
    pub iterations: usize,
    /// Final maximum norm over the optimality residuals.
    pub residual: f64,
}

impl fmt::Display for EquilibriumResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EquilibriumResult(succeeded={}, iterations={}, residual={:.3e})",
            self.succeeded, self.iterations, self.residual
        )
    }
}

/// Equilibrate a state at its current temperature and pressure.
///
/// Convenience wrapper around an [EquilibriumSolver] with the default
/// fixed-(T,p) specs.
pub fn equilibrate(state: &mut ChemicalState) -> ChemeqResult<EquilibriumResult> {
    let system = state.system().clone();
    EquilibriumSolver::new(&system).solve(state)
}

/// The optimality residuals of one primal-dual iterate.
struct Residuals {
    /// Reduced chemical potentials $\mu_i/RT$.
    u_hat: Array1<f64>,
    /// Dual feasibility $\hat u-A^Ty-z$.
    r_dual: Array1<f64>,
    /// Primal feasibility $An-b$.
    r_primal: Array1<f64>,
    /// Constraint equation residuals.
    r_con: Array1<f64>,
    /// Mean complementarity gap $n^Tz/N$.
    gap: f64,
    /// Maximum norm over all scaled residuals.
    norm: f64,
}

fn evaluate_residuals(
    system: &Arc<ChemicalSystem>,
    a: &Array2<f64>,
    b0: &Array1<f64>,
    controls: &[Control],
    constraints: &[SpecConstraint],
    inputs: &[f64],
    needs_props: bool,
    t: f64,
    p: f64,
    n: &Array1<f64>,
    q: &Array1<f64>,
    y: &Array1<f64>,
    z: &Array1<f64>,
) -> ChemeqResult<Residuals> {
    let rt = RGAS * t;
    let eval = system.evaluate(t, p, n.view())?;
    let u_hat = eval.chemical_potentials.mapv(|ui| ui / rt);
    let r_dual = &u_hat - &a.t().dot(y) - z;

    let mut b = b0.clone();
    for (k, control) in controls.iter().enumerate() {
        if let Control::Titrant { column, .. } = control {
            b = b + column * q[k];
        }
    }
    let r_primal = a.dot(n) - &b;

    let props = if needs_props {
        Some(ChemicalProps::from_parts(system, t, p, n.clone())?)
    } else {
        None
    };
    let r_con = Array1::from_shape_fn(constraints.len(), |j| match &constraints[j] {
        SpecConstraint::Equation(eq) => eq.residual(props.as_ref().unwrap(), inputs),
        SpecConstraint::Potential { column, .. } => {
            column.dot(y) - constraints[j].target_potential(t, p, inputs) / rt
        }
    });

    let ns = n.len();
    let gap = n.dot(z) / ns as f64;
    // balance residuals are scaled row-wise so that trace elements converge
    // as tightly as the abundant ones
    let r_primal_scaled =
        Array1::from_shape_fn(b.len(), |i| r_primal[i] / (1.0 + b[i].abs()));
    let norm = inf_norm(r_dual.view())
        .max(inf_norm(r_primal_scaled.view()))
        .max(inf_norm(r_con.view()))
        .max(gap);

    Ok(Residuals {
        u_hat,
        r_dual,
        r_primal,
        r_con,
        gap,
        norm,
    })
}

/// Apply a damped, bound-projected step to the control variables.
fn step_controls(
    controls: &[Control],
    dq: &Array1<f64>,
    alpha: f64,
    t: f64,
    p: f64,
    q: &Array1<f64>,
    t_bounds: (Option<f64>, Option<f64>),
    p_bounds: (Option<f64>, Option<f64>),
) -> (f64, f64, Array1<f64>) {
    let mut t_new = t;
    let mut p_new = p;
    let mut q_new = q.clone();
    for (k, control) in controls.iter().enumerate() {
        match control {
            Control::Temperature => {
                t_new = t + (alpha * dq[k]).clamp(-0.2 * t, 0.2 * t);
                if let Some(lb) = t_bounds.0 {
                    t_new = t_new.max(lb);
                }
                if let Some(ub) = t_bounds.1 {
                    t_new = t_new.min(ub);
                }
            }
            Control::Pressure => {
                p_new = p + (alpha * dq[k]).clamp(-0.5 * p, 0.5 * p);
                if let Some(lb) = p_bounds.0 {
                    p_new = p_new.max(lb);
                }
                if let Some(ub) = p_bounds.1 {
                    p_new = p_new.min(ub);
                }
            }
            Control::Titrant { .. } => q_new[k] = q[k] + alpha * dq[k],
        }
    }
    (t_new, p_new, q_new)
}

/// The equilibrium solver: computes the species amounts of minimum Gibbs
/// energy subject to element/charge balance, non-negativity and the
/// constraints declared in the [EquilibriumSpecs].
///
/// The solver is a primal-dual interior point Newton iteration on the
/// first order optimality conditions, with the non-negativity bounds
/// handled by a logarithmic barrier. The stoichiometric structure and the
/// constraint closures are fixed by the specs; the numeric targets come
/// from an [EquilibriumConditions] object, so one solver can be re-used
/// over a parameter sweep.
///
/// The initial guess is always taken from the given state; warm starting
/// a calculation from the converged state of a neighboring sweep point is
/// the intended usage pattern.
pub struct EquilibriumSolver {
    specs: EquilibriumSpecs,
}

impl EquilibriumSolver {
    /// A solver for the plain Gibbs energy minimization at fixed
    /// temperature and pressure.
    pub fn new(system: &Arc<ChemicalSystem>) -> Self {
        Self {
            specs: EquilibriumSpecs::fixed_temperature_pressure(system),
        }
    }

    /// A solver for a generalized problem. Fails if the specs declare a
    /// different number of unknown controls than constraint equations.
    pub fn with_specs(specs: EquilibriumSpecs) -> ChemeqResult<Self> {
        specs.validate()?;
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &EquilibriumSpecs {
        &self.specs
    }

    pub fn system(&self) -> &Arc<ChemicalSystem> {
        self.specs.system()
    }

    /// Solve with default conditions (temperature and pressure from the
    /// state) and default options.
    pub fn solve(&self, state: &mut ChemicalState) -> ChemeqResult<EquilibriumResult> {
        let conditions = EquilibriumConditions::new(&self.specs);
        self.solve_with(state, &conditions, SolverOptions::default())
    }

    /// Solve the equilibrium problem for the given conditions, overwriting
    /// the state with the converged solution (or, on failure, with the
    /// unconverged iterate alongside `succeeded == false`).
    pub fn solve_with(
        &self,
        state: &mut ChemicalState,
        conditions: &EquilibriumConditions,
        options: SolverOptions,
    ) -> ChemeqResult<EquilibriumResult> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_EQ, TOL_EQ);
        let system = self.specs.system();
        conditions.matches(&self.specs)?;
        conditions.validate_bounds()?;
        let inputs = conditions.input_vector(state)?;

        let ns = system.species_count();
        let nb = system.balance_count();
        let controls = self.specs.controls();
        let nc = controls.len();
        let constraints = self.specs.constraints();
        let needs_props = constraints
            .iter()
            .any(|c| matches!(c, SpecConstraint::Equation(_)));

        // temperature and pressure: known inputs or iterated controls
        let mut t = if self.specs.temperature_known() {
            inputs[self.specs.input_index("T")?]
        } else {
            state.temperature_si()
        };
        let mut p = if self.specs.pressure_known() {
            inputs[self.specs.input_index("P")?]
        } else {
            state.pressure_si()
        };
        if t <= 0.0 || p <= 0.0 {
            return Err(ChemeqError::InvalidInput(
                "EquilibriumSolver".into(),
                "temperature or pressure".into(),
                t.min(p),
            ));
        }
        let t_bounds = conditions.temperature_bounds();
        let p_bounds = conditions.pressure_bounds();

        // the balance right-hand side is fixed by the composition of the
        // given state; titrant amounts shift it during the iteration
        let b0 = system.element_amounts(state.amounts());

        let a = system.formula_matrix();

        // primal-dual starting point, warm started from the multipliers of
        // a previously converged state where available
        let mut n = state.amounts().mapv(|ni| ni.max(AMOUNT_FLOOR));
        let mut q = Array1::<f64>::zeros(nc);
        let rt = RGAS * t;
        let mut z = if state.species_multipliers().iter().any(|&zi| zi > 0.0) {
            state
                .species_multipliers()
                .mapv(|zi| (zi / rt).clamp(1e-12, 1e8))
        } else {
            Array1::from_elem(ns, 1.0)
        };
        let mut y = if state.element_multipliers().iter().any(|&yi| yi != 0.0) {
            state.element_multipliers().mapv(|yi| yi / rt)
        } else {
            let eval = system.evaluate(t, p, n.view())?;
            let u_hat = eval.chemical_potentials.mapv(|ui| ui / rt);
            least_squares_multipliers(a, &u_hat)
        };

        log_iter!(
            verbosity,
            " iter |    residual    |    barrier     |    T/K   |    p/Pa"
        );
        log_iter!(verbosity, "{:-<62}", "");

        let mut iterations = 0;
        let mut residual = f64::INFINITY;
        let mut succeeded = false;

        for _ in 0..max_iter {
            iterations += 1;
            let rt = RGAS * t;
            let res = evaluate_residuals(
                system,
                a,
                &b0,
                &controls,
                constraints,
                &inputs,
                needs_props,
                t,
                p,
                &n,
                &q,
                &y,
                &z,
            )?;
            residual = res.norm;
            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:14.8e} | {:8.3} | {:.4e}",
                iterations - 1,
                residual,
                res.gap,
                t,
                p
            );
            if !residual.is_finite() {
                break;
            }
            if residual < tol {
                succeeded = true;
                break;
            }

            let mu = SIGMA * res.gap;

            // assemble the KKT system for the Newton direction
            // unknowns: [dn | dq | dy], rows: [dual | balance | constraints]
            let dim = ns + nc + nb;
            let mut kkt = Array2::<f64>::zeros((dim, dim));
            let mut rhs = Array1::<f64>::zeros(dim);

            // dual block: ideal mixing Hessian with lagged activity
            // coefficients, plus the barrier diagonal from eliminating dz
            for ph in 0..system.phases().len() {
                let range = system.phase_range(ph);
                let total: f64 = n.slice(s![range.clone()]).sum();
                for i in range.clone() {
                    for j in range.clone() {
                        kkt[(i, j)] -= 1.0 / total;
                    }
                    kkt[(i, i)] += (1.0 + z[i]) / n[i];
                }
            }
            for i in 0..ns {
                for row in 0..nb {
                    kkt[(i, ns + nc + row)] = -a[(row, i)];
                }
                rhs[i] = -res.r_dual[i] + (mu - n[i] * z[i]) / n[i];
            }

            // temperature/pressure columns of the dual block
            for (k, control) in controls.iter().enumerate() {
                let column = match control {
                    Control::Temperature => {
                        let h = t * FD_STEP;
                        let pert = system.evaluate(t + h, p, n.view())?;
                        Some(
                            (pert.chemical_potentials.mapv(|ui| ui / (RGAS * (t + h)))
                                - &res.u_hat)
                                / h,
                        )
                    }
                    Control::Pressure => {
                        let h = p * FD_STEP;
                        let pert = system.evaluate(t, p + h, n.view())?;
                        Some((pert.chemical_potentials.mapv(|ui| ui / rt) - &res.u_hat) / h)
                    }
                    Control::Titrant { .. } => None,
                };
                if let Some(column) = column {
                    for i in 0..ns {
                        kkt[(i, ns + k)] = column[i];
                    }
                }
            }

            // balance block
            for row in 0..nb {
                for j in 0..ns {
                    kkt[(ns + row, j)] = a[(row, j)];
                }
                for (k, control) in controls.iter().enumerate() {
                    if let Control::Titrant { column, .. } = control {
                        kkt[(ns + row, ns + k)] = -column[row];
                    }
                }
                rhs[ns + row] = -res.r_primal[row];
            }

            // constraint block
            for (j, constraint) in constraints.iter().enumerate() {
                let row = ns + nb + j;
                match constraint {
                    SpecConstraint::Equation(eq) => {
                        let g0 = res.r_con[j];
                        for i in 0..ns {
                            let h = FD_STEP * n[i].max(1e-6);
                            let mut n_pert = n.clone();
                            n_pert[i] += h;
                            let pert = ChemicalProps::from_parts(system, t, p, n_pert)?;
                            kkt[(row, i)] = (eq.residual(&pert, &inputs) - g0) / h;
                        }
                        for (k, control) in controls.iter().enumerate() {
                            match control {
                                Control::Temperature => {
                                    let h = t * FD_STEP;
                                    let pert =
                                        ChemicalProps::from_parts(system, t + h, p, n.clone())?;
                                    kkt[(row, ns + k)] = (eq.residual(&pert, &inputs) - g0) / h;
                                }
                                Control::Pressure => {
                                    let h = p * FD_STEP;
                                    let pert =
                                        ChemicalProps::from_parts(system, t, p + h, n.clone())?;
                                    kkt[(row, ns + k)] = (eq.residual(&pert, &inputs) - g0) / h;
                                }
                                Control::Titrant { .. } => {}
                            }
                        }
                    }
                    SpecConstraint::Potential { column, .. } => {
                        for (row_y, coeff) in column.iter().enumerate() {
                            kkt[(row, ns + nc + row_y)] = *coeff;
                        }
                        for (k, control) in controls.iter().enumerate() {
                            match control {
                                Control::Temperature => {
                                    let h = t * FD_STEP;
                                    let target = constraint.target_potential(t, p, &inputs) / rt;
                                    let target_h = constraint.target_potential(t + h, p, &inputs)
                                        / (RGAS * (t + h));
                                    kkt[(row, ns + k)] = -(target_h - target) / h;
                                }
                                Control::Pressure => {
                                    let h = p * FD_STEP;
                                    let target = constraint.target_potential(t, p, &inputs) / rt;
                                    let target_h =
                                        constraint.target_potential(t, p + h, &inputs) / rt;
                                    kkt[(row, ns + k)] = -(target_h - target) / h;
                                }
                                Control::Titrant { .. } => {}
                            }
                        }
                    }
                }
                rhs[row] = -res.r_con[j];
            }

            // solve the Newton system, falling back to growing Tikhonov
            // regularization when the saddle point matrix is singular
            let mut delta = None;
            for reg in REGULARIZATION {
                let mut m = kkt.clone();
                for i in 0..dim {
                    if i < ns + nc {
                        m[(i, i)] += reg;
                    } else {
                        m[(i, i)] -= reg;
                    }
                }
                if let Ok(lu) = LU::new(m) {
                    let d = lu.solve(&rhs);
                    if d.iter().all(|x| x.is_finite()) {
                        delta = Some(d);
                        break;
                    }
                }
            }
            let Some(delta) = delta else {
                log_result!(
                    verbosity,
                    "Equilibrium: singular KKT system after regularization\n"
                );
                break;
            };

            let dn = delta.slice(s![0..ns]).to_owned();
            let dq = delta.slice(s![ns..ns + nc]).to_owned();
            let dy = delta.slice(s![ns + nc..]).to_owned();
            let dz = Array1::from_shape_fn(ns, |i| (mu - n[i] * z[i]) / n[i] - z[i] / n[i] * dn[i]);

            let mut alpha_p = fraction_to_boundary(n.view(), dn.view());
            let mut alpha_d = fraction_to_boundary(z.view(), dz.view());

            // backtracking line search: the Newton direction is built with
            // lagged activity coefficients, so full steps can overshoot in
            // strongly non-ideal solutions
            for backtrack in 0..LINE_SEARCH_STEPS {
                let n_trial = &n + &(&dn * alpha_p);
                let z_trial = &z + &(&dz * alpha_d);
                let y_trial = &y + &(&dy * alpha_d);
                let (t_trial, p_trial, q_trial) =
                    step_controls(&controls, &dq, alpha_p, t, p, &q, t_bounds, p_bounds);
                let trial = evaluate_residuals(
                    system,
                    a,
                    &b0,
                    &controls,
                    constraints,
                    &inputs,
                    needs_props,
                    t_trial,
                    p_trial,
                    &n_trial,
                    &q_trial,
                    &y_trial,
                    &z_trial,
                )?;
                if trial.norm <= residual * 1.05 || backtrack == LINE_SEARCH_STEPS - 1 {
                    n = n_trial;
                    z = z_trial;
                    y = y_trial;
                    t = t_trial;
                    p = p_trial;
                    q = q_trial;
                    break;
                }
                alpha_p *= 0.5;
                alpha_d *= 0.5;
            }
        }

        if succeeded {
            log_result!(
                verbosity,
                "Equilibrium: calculation converged in {} step(s)\n",
                iterations
            );
        } else {
            log_result!(
                verbosity,
                "Equilibrium: no convergence within {} step(s), residual {:.3e}\n",
                iterations,
                residual
            );
        }

        let rt = RGAS * t;
        state.assign_solution(t, p, n, y.mapv(|yi| yi * rt), z.mapv(|zi| zi * rt));
        Ok(EquilibriumResult {
            succeeded,
            iterations,
            residual,
        })
    }
}

fn inf_norm(x: ndarray::ArrayView1<f64>) -> f64 {
    x.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
}

/// Largest step length keeping `x + alpha dx` strictly positive.
fn fraction_to_boundary(x: ndarray::ArrayView1<f64>, dx: ndarray::ArrayView1<f64>) -> f64 {
    let mut alpha = 1.0f64;
    for (xi, di) in x.iter().zip(dx.iter()) {
        if *di < 0.0 {
            alpha = alpha.min(-TAU * xi / di);
        }
    }
    alpha
}

/// Initial balance multipliers from the least squares fit of the dual
/// feasibility equations, regularized against rank deficient balance rows.
fn least_squares_multipliers(a: &Array2<f64>, u_hat: &Array1<f64>) -> Array1<f64> {
    let nb = a.nrows();
    let mut ata = a.dot(&a.t());
    for i in 0..nb {
        ata[(i, i)] += 1e-10;
    }
    match LU::new(ata) {
        Ok(lu) => lu.solve(&a.dot(u_hat)),
        Err(_) => Array1::zeros(nb),
    }
}
