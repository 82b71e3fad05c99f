//! The constraint store and its editing operations

use crate::config::SolverConfig;
use crate::error::{Error, Result};
use crate::model::{ConstraintId, IntVar, LinearConstraint, Relation, VarId};
use crate::search::{propagate, Domains, Linear, Search};
use crate::snapshot::SolverSnapshot;
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Integer variables linked by linear constraints
///
/// Values are only ever replaced by a complete assignment that satisfies every
/// constraint; a failed solve leaves them untouched.
#[derive(Debug, Clone, Default)]
pub struct Solver {
    pub(crate) vars: IndexMap<VarId, IntVar>,
    pub(crate) constraints: IndexMap<ConstraintId, LinearConstraint>,
    pub(crate) next_var: u32,
    pub(crate) next_constraint: u32,
    config: SolverConfig,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Add a variable with domain `[min, max]`; `init` is clamped into it
    pub fn add_int_var(&mut self, min: i64, max: i64, init: i64, tag: u32) -> Result<VarId> {
        if min > max {
            return Err(Error::EmptyDomain { min, max });
        }
        let id = VarId::new(self.next_var);
        self.next_var += 1;
        self.vars.insert(
            id,
            IntVar {
                min,
                max,
                value: init.clamp(min, max),
                tag,
            },
        );
        trace!(var = %id, min, max, "variable added");
        Ok(id)
    }

    /// Replace a variable's domain, clamping its value into it
    pub fn set_int_var(&mut self, id: VarId, min: i64, max: i64) -> Result<()> {
        if min > max {
            return Err(Error::EmptyDomain { min, max });
        }
        let var = self.vars.get_mut(&id).ok_or(Error::VariableNotFound(id))?;
        var.min = min;
        var.max = max;
        var.value = var.value.clamp(min, max);
        Ok(())
    }

    /// Remove a variable no constraint refers to any more
    pub fn remove_int_var(&mut self, id: VarId) -> Result<()> {
        if !self.vars.contains_key(&id) {
            return Err(Error::VariableNotFound(id));
        }
        if self.is_referenced(id) {
            return Err(Error::VariableInUse(id));
        }
        self.vars.shift_remove(&id);
        Ok(())
    }

    /// Add `sum(coeffs[i] * vars[i]) <relation> bound`
    ///
    /// With `propagate_now`, the current values are re-solved immediately and the
    /// constraint is rejected (not kept) if the system becomes infeasible.
    pub fn add_constraint(
        &mut self,
        vars: &[VarId],
        coeffs: &[i64],
        relation: Relation,
        bound: i64,
        propagate_now: bool,
    ) -> Result<ConstraintId> {
        if vars.len() != coeffs.len() {
            return Err(Error::ArityMismatch {
                vars: vars.len(),
                coeffs: coeffs.len(),
            });
        }
        let mut terms: Vec<(VarId, i64)> = Vec::with_capacity(vars.len());
        for (var, coeff) in vars.iter().zip(coeffs) {
            if !self.vars.contains_key(var) {
                return Err(Error::VariableNotFound(*var));
            }
            match terms.iter_mut().find(|(v, _)| v == var) {
                Some((_, c)) => *c += coeff,
                None => terms.push((*var, *coeff)),
            }
        }

        let id = ConstraintId::new(self.next_constraint);
        self.next_constraint += 1;
        let constraint = LinearConstraint {
            terms,
            relation,
            bound,
        };
        trace!(constraint = %id, "{}", constraint);
        self.constraints.insert(id, constraint);

        if propagate_now && !self.update_variables_values() {
            self.constraints.shift_remove(&id);
            return Err(Error::Infeasible(id));
        }
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<()> {
        self.constraints
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(Error::ConstraintNotFound(id))
    }

    pub fn value(&self, id: VarId) -> Result<i64> {
        self.vars
            .get(&id)
            .map(|v| v.value)
            .ok_or(Error::VariableNotFound(id))
    }

    pub fn var(&self, id: VarId) -> Option<&IntVar> {
        self.vars.get(&id)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&LinearConstraint> {
        self.constraints.get(&id)
    }

    /// Whether any constraint mentions `id`
    pub fn is_referenced(&self, id: VarId) -> bool {
        self.constraints.values().any(|c| c.references(id))
    }

    pub fn nb_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn nb_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Check every constraint against the current values
    pub fn is_satisfied(&self) -> bool {
        self.constraints.values().all(|c| {
            c.evaluate(|v| self.vars.get(&v).map(|var| var.value))
                .is_some_and(|lhs| c.relation.holds(lhs, c.bound))
        })
    }

    /// Pin `vars` to `targets` and re-solve the others within `delta_budget` of
    /// their current values
    ///
    /// Returns false, with every value unchanged, when no such assignment exists.
    pub fn suggest_values(
        &mut self,
        vars: &[VarId],
        targets: &[i64],
        delta_budget: i64,
    ) -> Result<bool> {
        if vars.len() != targets.len() {
            return Err(Error::ArityMismatch {
                vars: vars.len(),
                coeffs: targets.len(),
            });
        }
        let budget = delta_budget.max(0);
        let mut domains = Domains {
            lo: Vec::with_capacity(self.vars.len()),
            hi: Vec::with_capacity(self.vars.len()),
        };
        for var in self.vars.values() {
            domains.lo.push(var.min.max(var.value.saturating_sub(budget)));
            domains.hi.push(var.max.min(var.value.saturating_add(budget)));
        }
        for (var, target) in vars.iter().zip(targets) {
            let index = self
                .vars
                .get_index_of(var)
                .ok_or(Error::VariableNotFound(*var))?;
            let v = &self.vars[index];
            if *target < v.min || *target > v.max {
                debug!(var = %var, target, "suggested value outside the domain");
                return Ok(false);
            }
            domains.lo[index] = *target;
            domains.hi[index] = *target;
        }
        Ok(self.solve(domains))
    }

    /// Re-solve every variable within its full domain, staying close to the
    /// current values
    pub fn update_variables_values(&mut self) -> bool {
        let domains = Domains {
            lo: self.vars.values().map(|v| v.min).collect(),
            hi: self.vars.values().map(|v| v.max).collect(),
        };
        self.solve(domains)
    }

    /// Check whether the constraints admit any assignment at all
    pub fn is_consistent(&self) -> bool {
        let mut domains = Domains {
            lo: self.vars.values().map(|v| v.min).collect(),
            hi: self.vars.values().map(|v| v.max).collect(),
        };
        propagate(&self.linearize(), &mut domains)
    }

    fn linearize(&self) -> Vec<Linear> {
        self.constraints
            .values()
            .map(|c| Linear {
                terms: c
                    .terms
                    .iter()
                    .filter_map(|(var, coeff)| Some((self.vars.get_index_of(var)?, *coeff)))
                    .collect(),
                relation: c.relation,
                bound: c.bound,
            })
            .collect()
    }

    fn solve(&mut self, domains: Domains) -> bool {
        let constraints = self.linearize();
        let preferred: Vec<i64> = self.vars.values().map(|v| v.value).collect();
        let mut search = Search::new(&constraints, &preferred, self.config.node_limit());
        let solution = search.solve(domains);
        debug!(
            nodes = search.nodes(),
            found = solution.is_some(),
            "solve finished"
        );
        match solution {
            Some(values) => {
                for (var, value) in self.vars.values_mut().zip(values) {
                    var.value = value;
                }
                true
            }
            None => false,
        }
    }

    /// Capture the whole store for a later [`restore`](Self::restore)
    pub fn snapshot(&self) -> SolverSnapshot {
        SolverSnapshot::capture(self)
    }

    /// Roll back to a previously captured state
    pub fn restore(&mut self, snapshot: SolverSnapshot) {
        snapshot.apply(self);
    }
}
