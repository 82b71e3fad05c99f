//! Variables, relations and linear constraints

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an integer variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl VarId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var:{}", self.0)
    }
}

/// Identifier of a linear constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub u32);

impl ConstraintId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint:{}", self.0)
    }
}

/// Comparison between the weighted sum and the bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// `==`
    Eq,
    /// `!=`
    Nq,
    /// `<=`
    Lq,
    /// `<`
    Le,
    /// `>=`
    Gq,
    /// `>`
    Gr,
}

impl Relation {
    pub fn holds(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Relation::Eq => lhs == rhs,
            Relation::Nq => lhs != rhs,
            Relation::Lq => lhs <= rhs,
            Relation::Le => lhs < rhs,
            Relation::Gq => lhs >= rhs,
            Relation::Gr => lhs > rhs,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Eq => "==",
            Relation::Nq => "!=",
            Relation::Lq => "<=",
            Relation::Le => "<",
            Relation::Gq => ">=",
            Relation::Gr => ">",
        }
    }
}

/// An integer variable with its domain `[min, max]` and current value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntVar {
    pub min: i64,
    pub max: i64,
    pub value: i64,
    /// Caller-defined label, kept for inspection
    pub tag: u32,
}

/// `sum(coeff * var) <relation> bound`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub terms: Vec<(VarId, i64)>,
    pub relation: Relation,
    pub bound: i64,
}

impl LinearConstraint {
    /// Weighted sum under a value lookup, `None` if a variable is missing
    pub fn evaluate(&self, value: impl Fn(VarId) -> Option<i64>) -> Option<i64> {
        self.terms
            .iter()
            .try_fold(0i64, |acc, (var, coeff)| Some(acc + coeff * value(*var)?))
    }

    pub fn references(&self, var: VarId) -> bool {
        self.terms.iter().any(|(v, _)| *v == var)
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (var, coeff)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}*{}", coeff, var)?;
        }
        write!(f, " {} {}", self.relation.symbol(), self.bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_holds() {
        assert!(Relation::Eq.holds(3, 3));
        assert!(Relation::Nq.holds(3, 4));
        assert!(Relation::Lq.holds(3, 3));
        assert!(!Relation::Le.holds(3, 3));
        assert!(Relation::Gq.holds(3, 3));
        assert!(!Relation::Gr.holds(3, 3));
    }

    #[test]
    fn test_constraint_display_and_eval() {
        let c = LinearConstraint {
            terms: vec![(VarId(0), 1), (VarId(1), -1)],
            relation: Relation::Gq,
            bound: 100,
        };
        assert_eq!(format!("{}", c), "1*var:0 + -1*var:1 >= 100");
        let values = [250, 100];
        assert_eq!(c.evaluate(|v| values.get(v.raw() as usize).copied()), Some(150));
        assert!(c.references(VarId(1)));
        assert!(!c.references(VarId(2)));
    }
}
