//! Equation system and Newton iteration.
//!
//! The system keeps two bodies: the source equations and parameters the
//! caller registered, and the working set the solver iterates over. On each
//! rebuild the working set is reduced by parameter substitution, a symbolic
//! Jacobian is derived once, and `solve` runs Newton steps on top of a
//! normal-equation least-squares solve, so under- and over-determined
//! systems both get a sensible step.

use ndarray::{Array1, Array2};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::Error;
use crate::expr::Expr;
use crate::linalg;
use crate::param::Param;
use crate::vector::ExprVector;

/// Outcome of one `solve` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveResult {
    /// Every non-drag equation is within tolerance.
    Okay,
    /// Newton ran out of steps; parameters were reverted unless the caller
    /// disabled that.
    DidntConverge,
    /// Reserved for equations that reduce to tautologies under substitution.
    Redundant,
    /// Reserved for multi-phase solving.
    Postpone,
}

/// A set of zero-target equations over shared parameters.
pub struct EquationSystem {
    /// Newton iteration budget per `solve` call.
    pub max_steps: usize,
    /// Number of leading iterations during which drag equations are honored.
    pub drag_steps: usize,
    /// Restore the pre-solve parameter values on non-convergence.
    pub revert_when_not_converged: bool,

    is_dirty: bool,
    dof_changed: bool,
    redundant: usize,

    source_equations: Vec<Expr>,
    parameters: Vec<Param>,

    equations: Vec<Expr>,
    current_params: Vec<Param>,
    subs: FxHashMap<Param, Param>,

    jacobian: Array2<Expr>,
    a: Array2<f64>,
    aat: Array2<f64>,
    b: Array1<f64>,
    x: Array1<f64>,
    z: Array1<f64>,
    old_param_values: Vec<f64>,
}

impl Default for EquationSystem {
    fn default() -> Self {
        EquationSystem {
            max_steps: 20,
            drag_steps: 3,
            revert_when_not_converged: true,
            is_dirty: true,
            dof_changed: false,
            redundant: 0,
            source_equations: Vec::new(),
            parameters: Vec::new(),
            equations: Vec::new(),
            current_params: Vec::new(),
            subs: FxHashMap::default(),
            jacobian: Array2::from_shape_fn((0, 0), |_| Expr::constant(0.0)),
            a: Array2::zeros((0, 0)),
            aat: Array2::zeros((0, 0)),
            b: Array1::zeros(0),
            x: Array1::zeros(0),
            z: Array1::zeros(0),
            old_param_values: Vec::new(),
        }
    }
}

impl EquationSystem {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------

    pub fn add_equation(&mut self, eq: Expr) {
        trace!("adding equation: {eq}");
        self.source_equations.push(eq);
        self.is_dirty = true;
    }

    /// Add the three component equations of a vector expression.
    pub fn add_equation_vector(&mut self, v: &ExprVector) {
        self.add_equation(v.x.clone());
        self.add_equation(v.y.clone());
        self.add_equation(v.z.clone());
    }

    pub fn add_equations<I: IntoIterator<Item = Expr>>(&mut self, eqs: I) {
        for eq in eqs {
            self.add_equation(eq);
        }
    }

    /// Remove a previously added equation, matched by node identity.
    pub fn remove_equation(&mut self, eq: &Expr) -> Result<(), Error> {
        let index = self
            .source_equations
            .iter()
            .position(|e| e.ptr_eq(eq))
            .ok_or(Error::UnknownEquation)?;
        self.source_equations.remove(index);
        self.is_dirty = true;
        Ok(())
    }

    /// Register a parameter as an unknown. Re-adding the same handle is a
    /// no-op.
    pub fn add_parameter(&mut self, p: Param) {
        if self.parameters.contains(&p) {
            return;
        }
        trace!("adding parameter: {p}");
        self.parameters.push(p);
        self.is_dirty = true;
    }

    pub fn add_parameters<I: IntoIterator<Item = Param>>(&mut self, params: I) {
        for p in params {
            self.add_parameter(p);
        }
    }

    pub fn remove_parameter(&mut self, p: &Param) -> Result<(), Error> {
        let index = self
            .parameters
            .iter()
            .position(|q| q == p)
            .ok_or_else(|| Error::UnknownParameter(p.name().to_owned()))?;
        self.parameters.remove(index);
        self.is_dirty = true;
        Ok(())
    }

    /// Drop all equations and parameters.
    pub fn clear(&mut self) {
        self.source_equations.clear();
        self.parameters.clear();
        self.equations.clear();
        self.current_params.clear();
        self.is_dirty = true;
        self.update_dirty();
    }

    // -------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------

    /// Equations as registered by the caller.
    pub fn source_equations(&self) -> &[Expr] {
        &self.source_equations
    }

    /// The working equations after the last rebuild.
    pub fn equations(&self) -> &[Expr] {
        &self.equations
    }

    pub fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    /// The working unknowns after the last rebuild.
    pub fn current_params(&self) -> &[Param] {
        &self.current_params
    }

    /// The eliminated-to-kept parameter map from the last rebuild.
    pub fn substitution_map(&self) -> &FxHashMap<Param, Param> {
        &self.subs
    }

    /// Equations that reduced to tautologies in the last rebuild.
    pub fn redundant_count(&self) -> usize {
        self.redundant
    }

    /// Whether the last `solve` changed the degrees of freedom.
    pub fn dof_changed(&self) -> bool {
        self.dof_changed
    }

    /// Whether any working equation is a drag. Rebuilds first, so a freshly
    /// added drag equation is seen.
    pub fn has_dragged(&mut self) -> bool {
        self.update_dirty();
        self.equations.iter().any(Expr::is_drag)
    }

    // -------------------------------------------------------------------
    // Rebuild
    // -------------------------------------------------------------------

    /// Rebuild the working set if anything changed: copy source equations
    /// and parameters, eliminate trivial equalities, derive the symbolic
    /// Jacobian and size the numeric buffers.
    pub fn update_dirty(&mut self) {
        if !self.is_dirty {
            return;
        }
        self.equations = self.source_equations.clone();
        self.current_params = self.parameters.clone();
        self.subs = self.solve_by_substitution();

        let rows = self.equations.len();
        let cols = self.current_params.len();
        let equations = &self.equations;
        let params = &self.current_params;
        self.jacobian =
            Array2::from_shape_fn((rows, cols), |(r, c)| equations[r].derivative(&params[c]));

        self.a = Array2::zeros((rows, cols));
        self.aat = Array2::zeros((rows, rows));
        self.b = Array1::zeros(rows);
        self.x = Array1::zeros(cols);
        self.z = Array1::zeros(rows);
        self.old_param_values = vec![0.0; self.parameters.len()];
        self.is_dirty = false;
        self.dof_changed = true;
    }

    /// Scan the working equations for substitution-form pairs `p_a - p_b`
    /// whose values already agree, eliminate one parameter per pair and
    /// rewrite the remaining equations in place. Pairs that collapse onto
    /// themselves after earlier rewrites are tautologies and are dropped.
    fn solve_by_substitution(&mut self) -> FxHashMap<Param, Param> {
        let mut subs: FxHashMap<Param, Param> = FxHashMap::default();
        self.redundant = 0;
        let mut i = 0;
        while i < self.equations.len() {
            let Some((pa, pb)) = self.equations[i].substitution_params() else {
                i += 1;
                continue;
            };
            if (pa.value() - pb.value()).abs() > linalg::EPSILON {
                i += 1;
                continue;
            }
            if pa == pb {
                trace!("dropping tautological equation: {}", self.equations[i]);
                self.redundant += 1;
                self.equations.remove(i);
                continue;
            }
            // eliminate the operand that is a working unknown, preferring
            // the second one
            let (keep, drop) = if self.current_params.contains(&pb) {
                (pa, pb)
            } else if self.current_params.contains(&pa) {
                (pb, pa)
            } else {
                i += 1;
                continue;
            };
            trace!("substituting {drop} -> {keep}");
            for target in subs.values_mut() {
                if *target == drop {
                    *target = keep.clone();
                }
            }
            subs.insert(drop.clone(), keep.clone());
            self.equations.remove(i);
            self.current_params.retain(|p| *p != drop);
            for eq in &self.equations {
                eq.substitute_param(&drop, &keep);
            }
        }
        subs
    }

    // -------------------------------------------------------------------
    // Newton iteration
    // -------------------------------------------------------------------

    fn eval_residual(&mut self, clear_drag: bool) {
        for (i, eq) in self.equations.iter().enumerate() {
            self.b[i] = if clear_drag && eq.is_drag() {
                0.0
            } else {
                eq.eval()
            };
        }
    }

    fn is_converged(&self, check_drag: bool) -> bool {
        for (i, eq) in self.equations.iter().enumerate() {
            if !check_drag && eq.is_drag() {
                continue;
            }
            if self.b[i].abs() < linalg::EPSILON {
                continue;
            }
            return false;
        }
        true
    }

    fn eval_jacobian(&mut self, clear_drag: bool) {
        let (rows, cols) = self.jacobian.dim();
        for r in 0..rows {
            if clear_drag && self.equations[r].is_drag() {
                for c in 0..cols {
                    self.a[[r, c]] = 0.0;
                }
                continue;
            }
            for c in 0..cols {
                self.a[[r, c]] = self.jacobian[[r, c]].eval();
            }
        }
    }

    fn store_params(&mut self) {
        for (i, p) in self.parameters.iter().enumerate() {
            self.old_param_values[i] = p.value();
        }
    }

    fn revert_params(&self) {
        for (i, p) in self.parameters.iter().enumerate() {
            p.set_value(self.old_param_values[i]);
        }
    }

    /// Write the value of each kept parameter back into the parameters that
    /// were substituted away.
    fn back_substitution(&self) {
        if self.subs.is_empty() {
            return;
        }
        for p in &self.parameters {
            if let Some(kept) = self.subs.get(p) {
                p.set_value(kept.value());
            }
        }
    }

    /// Run the Newton iteration. Drag equations contribute during the first
    /// `drag_steps` iterations and are zeroed out of residual and Jacobian
    /// afterwards, so hard constraints converge exactly.
    pub fn solve(&mut self) -> SolveResult {
        self.dof_changed = false;
        self.update_dirty();
        self.store_params();

        let mut steps = 0;
        loop {
            let drag_step = steps <= self.drag_steps;
            self.eval_residual(!drag_step);
            if self.is_converged(drag_step) {
                if steps > 0 {
                    self.dof_changed = true;
                    debug!(
                        "solved {} equations with {} unknowns in {} steps",
                        self.equations.len(),
                        self.current_params.len(),
                        steps
                    );
                }
                self.back_substitution();
                return SolveResult::Okay;
            }
            if steps >= self.max_steps {
                break;
            }
            self.eval_jacobian(!drag_step);
            linalg::least_squares(
                self.a.view(),
                self.b.view(),
                &mut self.aat,
                &mut self.z,
                &mut self.x,
            );
            for (i, p) in self.current_params.iter().enumerate() {
                p.set_value(p.value() - self.x[i]);
            }
            steps += 1;
        }

        debug!(
            "no convergence after {} steps over {} equations",
            self.max_steps,
            self.equations.len()
        );
        if self.revert_when_not_converged {
            self.revert_params();
            self.dof_changed = false;
        }
        SolveResult::DidntConverge
    }

    /// Evaluate the Jacobian at the current point and report whether its
    /// rank matches the equation count, along with the remaining degrees of
    /// freedom.
    pub fn test_rank(&mut self) -> (bool, usize) {
        self.update_dirty();
        self.eval_jacobian(false);
        let rank = linalg::rank(self.a.view(), linalg::RANK_EPSILON);
        let (rows, cols) = self.a.dim();
        (rank == rows, cols - rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::expr;

    #[test]
    fn solves_single_linear_equation() {
        let p = Param::new("p", 0.0);
        let mut sys = EquationSystem::new();
        sys.add_parameter(p.clone());
        sys.add_equation(&p.expr() - &expr(4.0));
        assert_eq!(sys.solve(), SolveResult::Okay);
        assert!((p.value() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn solves_nonlinear_equation() {
        let p = Param::new("p", 3.0);
        let mut sys = EquationSystem::new();
        sys.add_parameter(p.clone());
        // p^2 = 25, nearest root from 3 is 5
        sys.add_equation(p.expr().sqr() - expr(25.0));
        assert_eq!(sys.solve(), SolveResult::Okay);
        assert!((p.value() - 5.0).abs() < 1e-8);
    }

    #[test]
    fn substitution_eliminates_equal_parameters() {
        let p = Param::new("p", 1.0);
        let q = Param::new("q", 1.0);
        let r = Param::new("r", 0.0);
        let mut sys = EquationSystem::new();
        sys.add_parameters([p.clone(), q.clone(), r.clone()]);
        sys.add_equation(&p.expr() - &q.expr());
        sys.add_equation(&q.expr() + &r.expr() - &expr(3.0));
        sys.update_dirty();

        assert_eq!(sys.equations().len(), 1);
        assert_eq!(sys.current_params().len(), 2);
        assert_eq!(sys.substitution_map().get(&q), Some(&p));

        assert_eq!(sys.solve(), SolveResult::Okay);
        // q was written back from p
        assert_eq!(p.value(), q.value());
        assert!((p.value() + r.value() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn substitution_skips_pairs_with_distant_values() {
        let p = Param::new("p", 0.0);
        let q = Param::new("q", 2.0);
        let mut sys = EquationSystem::new();
        sys.add_parameters([p.clone(), q.clone()]);
        sys.add_equation(&p.expr() - &q.expr());
        sys.update_dirty();
        assert_eq!(sys.equations().len(), 1);
        assert!(sys.substitution_map().is_empty());
    }

    #[test]
    fn chained_coincidence_collapses_to_tautologies() {
        let names = ["a", "b", "c"];
        let params: Vec<Param> = names.iter().map(|n| Param::new(*n, 1.0)).collect();
        let mut sys = EquationSystem::new();
        sys.add_parameters(params.clone());
        sys.add_equation(&params[0].expr() - &params[1].expr());
        sys.add_equation(&params[1].expr() - &params[2].expr());
        sys.add_equation(&params[0].expr() - &params[2].expr());
        sys.update_dirty();

        assert_eq!(sys.equations().len(), 0);
        assert_eq!(sys.current_params().len(), 1);
        assert_eq!(sys.redundant_count(), 1);

        let (well_posed, dof) = sys.test_rank();
        assert!(well_posed);
        assert_eq!(dof, 1);
    }

    #[test]
    fn revert_on_failure_restores_exact_values() {
        let p = Param::new("p", 0.125);
        let mut sys = EquationSystem::new();
        sys.add_parameter(p.clone());
        // two incompatible targets for the same unknown
        sys.add_equation(&p.expr() - &expr(1.0));
        sys.add_equation(&p.expr() - &expr(2.0));
        assert_eq!(sys.solve(), SolveResult::DidntConverge);
        assert_eq!(p.value(), 0.125);
    }

    #[test]
    fn failure_without_revert_keeps_last_iterate() {
        let p = Param::new("p", 0.0);
        let mut sys = EquationSystem::new();
        sys.revert_when_not_converged = false;
        sys.add_parameter(p.clone());
        sys.add_equation(&p.expr() - &expr(1.0));
        sys.add_equation(&p.expr() - &expr(2.0));
        assert_eq!(sys.solve(), SolveResult::DidntConverge);
        assert!(p.value() != 0.0);
    }

    #[test]
    fn drag_fades_after_drag_steps() {
        let p = Param::new("p", 0.0);
        let mut sys = EquationSystem::new();
        sys.add_parameter(p.clone());
        // an infeasible drag must not keep the hard constraint from
        // converging exactly
        sys.add_equation(p.expr().drag(&expr(1000.0)));
        sys.add_equation(&p.expr() - &expr(5.0));
        assert!(sys.has_dragged());
        assert_eq!(sys.solve(), SolveResult::Okay);
        assert!((p.value() - 5.0).abs() < 1e-8);
    }

    #[test]
    fn drag_alone_is_honored() {
        let p = Param::new("p", 0.0);
        let mut sys = EquationSystem::new();
        sys.add_parameter(p.clone());
        sys.add_equation(p.expr().drag(&expr(2.0)));
        assert_eq!(sys.solve(), SolveResult::Okay);
        assert!((p.value() - 2.0).abs() < 1e-8);
    }

    #[test]
    fn vector_equations_add_three_rows() {
        let p = Param::new("p", 1.0);
        let mut sys = EquationSystem::new();
        let v = ExprVector::new(p.expr() - expr(1.0), expr(0.0), expr(0.0));
        sys.add_equation_vector(&v);
        assert_eq!(sys.source_equations().len(), 3);
        assert_eq!(sys.solve(), SolveResult::Okay);
    }

    #[test]
    fn remove_unknown_items_fails_loudly() {
        let mut sys = EquationSystem::new();
        let eq = expr(1.0);
        assert!(matches!(
            sys.remove_equation(&eq),
            Err(Error::UnknownEquation)
        ));
        let p = Param::new("ghost", 0.0);
        assert!(matches!(
            sys.remove_parameter(&p),
            Err(Error::UnknownParameter(_))
        ));
    }

    #[test]
    fn remove_equation_matches_by_identity() {
        let mut sys = EquationSystem::new();
        let p = Param::new("p", 0.0);
        let eq = &p.expr() - &expr(1.0);
        sys.add_equation(eq.clone());
        // a structurally equal but distinct equation does not match
        let other = &p.expr() - &expr(1.0);
        assert!(sys.remove_equation(&other).is_err());
        assert!(sys.remove_equation(&eq).is_ok());
        assert!(sys.source_equations().is_empty());
    }

    #[test]
    fn underdetermined_system_takes_minimum_norm_step() {
        let p = Param::new("p", 0.0);
        let q = Param::new("q", 0.0);
        let mut sys = EquationSystem::new();
        sys.add_parameters([p.clone(), q.clone()]);
        sys.add_equation(&(&p.expr() + &q.expr()) - &expr(2.0));
        assert_eq!(sys.solve(), SolveResult::Okay);
        assert!((p.value() - 1.0).abs() < 1e-10);
        assert!((q.value() - 1.0).abs() < 1e-10);

        let (well_posed, dof) = sys.test_rank();
        assert!(well_posed);
        assert_eq!(dof, 1);
    }

    #[test]
    fn test_rank_flags_inconsistent_rows() {
        let p = Param::new("p", 0.0);
        let mut sys = EquationSystem::new();
        sys.add_parameter(p.clone());
        sys.add_equation(&p.expr() - &expr(1.0));
        sys.add_equation(&p.expr() - &expr(2.0));
        let (well_posed, dof) = sys.test_rank();
        assert!(!well_posed);
        assert_eq!(dof, 0);
    }
}
