//! Bounds propagation and depth-first search
//!
//! Problems are flattened to dense indices before solving. Value ordering always
//! starts from the variable's current value and widens outwards, so the first
//! solution found stays close to the previous assignment.

use crate::model::Relation;

/// One `sum(coeff * x[index]) <relation> bound` over dense indices
#[derive(Debug, Clone)]
pub(crate) struct Linear {
    pub terms: Vec<(usize, i64)>,
    pub relation: Relation,
    pub bound: i64,
}

/// Domains being narrowed during search
#[derive(Debug, Clone)]
pub(crate) struct Domains {
    pub lo: Vec<i64>,
    pub hi: Vec<i64>,
}

impl Domains {
    fn is_fixed(&self, i: usize) -> bool {
        self.lo[i] == self.hi[i]
    }

    fn is_empty(&self) -> bool {
        self.lo.iter().zip(&self.hi).any(|(lo, hi)| lo > hi)
    }

    fn fix(&mut self, i: usize, value: i64) {
        self.lo[i] = value;
        self.hi[i] = value;
    }
}

fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

/// Narrow domains for `sum(terms) <= bound`; returns true if anything changed
fn tighten_upper(terms: &[(usize, i64)], bound: i64, d: &mut Domains) -> bool {
    let term_min = |(i, c): (usize, i64), d: &Domains| {
        if c > 0 {
            c.saturating_mul(d.lo[i])
        } else {
            c.saturating_mul(d.hi[i])
        }
    };
    let total: i64 = terms
        .iter()
        .fold(0i64, |acc, t| acc.saturating_add(term_min(*t, d)));
    let mut changed = false;
    for &(i, c) in terms {
        if c == 0 {
            continue;
        }
        let rest = total.saturating_sub(term_min((i, c), d));
        let slack = bound.saturating_sub(rest);
        if c > 0 {
            let hi = div_floor(slack, c);
            if hi < d.hi[i] {
                d.hi[i] = hi;
                changed = true;
            }
        } else {
            let lo = div_ceil(slack, c);
            if lo > d.lo[i] {
                d.lo[i] = lo;
                changed = true;
            }
        }
    }
    changed
}

fn negated(terms: &[(usize, i64)]) -> Vec<(usize, i64)> {
    terms.iter().map(|&(i, c)| (i, -c)).collect()
}

fn tighten(constraint: &Linear, d: &mut Domains) -> bool {
    let terms = &constraint.terms;
    let b = constraint.bound;
    match constraint.relation {
        Relation::Lq => tighten_upper(terms, b, d),
        Relation::Le => tighten_upper(terms, b - 1, d),
        Relation::Gq => tighten_upper(&negated(terms), -b, d),
        Relation::Gr => tighten_upper(&negated(terms), -b - 1, d),
        Relation::Eq => {
            let upper = tighten_upper(terms, b, d);
            let lower = tighten_upper(&negated(terms), -b, d);
            upper || lower
        }
        Relation::Nq => {
            let open: Vec<_> = terms
                .iter()
                .filter(|(i, c)| *c != 0 && !d.is_fixed(*i))
                .collect();
            if open.len() != 1 {
                return false;
            }
            let (i, c) = *open[0];
            let fixed: i64 = terms
                .iter()
                .filter(|(j, _)| *j != i)
                .map(|(j, cj)| cj * d.lo[*j])
                .sum();
            let rest = b - fixed;
            if rest % c != 0 {
                return false;
            }
            let forbidden = rest / c;
            if forbidden == d.lo[i] {
                d.lo[i] += 1;
                true
            } else if forbidden == d.hi[i] {
                d.hi[i] -= 1;
                true
            } else {
                false
            }
        }
    }
}

/// Run bounds propagation to a fixpoint; false if a domain becomes empty
pub(crate) fn propagate(constraints: &[Linear], d: &mut Domains) -> bool {
    loop {
        let mut changed = false;
        for c in constraints {
            changed |= tighten(c, d);
            if d.is_empty() {
                return false;
            }
        }
        if !changed {
            return true;
        }
    }
}

fn satisfied(constraints: &[Linear], values: &[i64]) -> bool {
    constraints.iter().all(|c| {
        let lhs: i64 = c.terms.iter().map(|&(i, coeff)| coeff * values[i]).sum();
        c.relation.holds(lhs, c.bound)
    })
}

/// Values of `[lo, hi]` ordered by distance to `center`
fn candidates(center: i64, lo: i64, hi: i64) -> impl Iterator<Item = i64> {
    let start = center.clamp(lo, hi);
    let span = (hi - lo).max(0);
    (0..=span)
        .flat_map(move |step| [start + step, start - step])
        .enumerate()
        .filter(|(n, _)| *n != 1)
        .map(|(_, v)| v)
        .filter(move |v| (lo..=hi).contains(v))
}

pub(crate) struct Search<'a> {
    constraints: &'a [Linear],
    preferred: &'a [i64],
    node_limit: usize,
    nodes: usize,
}

impl<'a> Search<'a> {
    pub fn new(constraints: &'a [Linear], preferred: &'a [i64], node_limit: usize) -> Self {
        Self {
            constraints,
            preferred,
            node_limit,
            nodes: 0,
        }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// First assignment found, preferring values close to `preferred`
    pub fn solve(&mut self, mut domains: Domains) -> Option<Vec<i64>> {
        if !propagate(self.constraints, &mut domains) {
            return None;
        }
        self.nodes += 1;
        if self.nodes > self.node_limit {
            return None;
        }

        let open = (0..domains.lo.len())
            .filter(|i| !domains.is_fixed(*i))
            .min_by_key(|i| domains.hi[*i] - domains.lo[*i]);
        let Some(var) = open else {
            return satisfied(self.constraints, &domains.lo).then(|| domains.lo.clone());
        };

        for value in candidates(self.preferred[var], domains.lo[var], domains.hi[var]) {
            let mut branch = domains.clone();
            branch.fix(var, value);
            if let Some(solution) = self.solve(branch) {
                return Some(solution);
            }
            if self.nodes > self.node_limit {
                return None;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains(bounds: &[(i64, i64)]) -> Domains {
        Domains {
            lo: bounds.iter().map(|b| b.0).collect(),
            hi: bounds.iter().map(|b| b.1).collect(),
        }
    }

    #[test]
    fn test_division_rounding() {
        assert_eq!(div_floor(7, 2), 3);
        assert_eq!(div_floor(-7, 2), -4);
        assert_eq!(div_ceil(7, 2), 4);
        assert_eq!(div_ceil(-7, 2), -3);
        assert_eq!(div_ceil(7, -2), -3);
    }

    #[test]
    fn test_candidates_order() {
        let values: Vec<_> = candidates(5, 3, 7).collect();
        assert_eq!(values, vec![5, 6, 4, 7, 3]);
        let values: Vec<_> = candidates(0, 3, 5).collect();
        assert_eq!(values, vec![3, 4, 5]);
    }

    #[test]
    fn test_propagate_difference() {
        // x1 - x0 >= 100
        let c = Linear {
            terms: vec![(1, 1), (0, -1)],
            relation: Relation::Gq,
            bound: 100,
        };
        let mut d = domains(&[(0, 1000), (0, 1000)]);
        assert!(propagate(&[c.clone()], &mut d));
        assert_eq!(d.lo[1], 100);
        assert_eq!(d.hi[0], 900);

        let mut d = domains(&[(500, 500), (0, 550)]);
        assert!(!propagate(&[c], &mut d));
    }

    #[test]
    fn test_propagate_not_equal() {
        let c = Linear {
            terms: vec![(0, 1), (1, 1)],
            relation: Relation::Nq,
            bound: 10,
        };
        let mut d = domains(&[(4, 4), (6, 9)]);
        assert!(propagate(&[c], &mut d));
        assert_eq!(d.lo[1], 7);
    }

    #[test]
    fn test_search_prefers_current_values() {
        // x0 + x1 == 10
        let c = vec![Linear {
            terms: vec![(0, 1), (1, 1)],
            relation: Relation::Eq,
            bound: 10,
        }];
        let preferred = [3, 9];
        let mut search = Search::new(&c, &preferred, 1000);
        let solution = search.solve(domains(&[(0, 10), (0, 10)])).unwrap();
        assert_eq!(solution.iter().sum::<i64>(), 10);
        assert!(solution[0] == 3 || solution[1] == 9);
        assert!(search.nodes() > 0);
    }

    #[test]
    fn test_search_infeasible() {
        let c = vec![
            Linear {
                terms: vec![(0, 1)],
                relation: Relation::Gr,
                bound: 5,
            },
            Linear {
                terms: vec![(0, 1)],
                relation: Relation::Le,
                bound: 6,
            },
        ];
        let preferred = [0];
        let mut search = Search::new(&c, &preferred, 1000);
        assert!(search.solve(domains(&[(0, 10)])).is_none());
    }
}
