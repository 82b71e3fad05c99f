//! Time conditions: branch points deciding which events happen

use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::identity::{ConditionId, EventId};
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// How one event of a condition reacts to incoming values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Case {
    /// Passing triggers the event; failing on the same address disposes it
    pub trigger: Expression,
    /// Passing releases the whole condition
    pub dispose: Expression,
    /// Happen rather than be disposed when the condition is released
    pub default: bool,
}

impl Case {
    pub fn on(trigger: Expression) -> Self {
        Self {
            trigger,
            ..Self::default()
        }
    }
}

/// Outcome of an incoming value on a ready condition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub triggered: Vec<EventId>,
    pub disposed: Vec<EventId>,
}

/// A set of `(event, case)` pairs plus a ready flag
///
/// The condition becomes ready once every one of its events is pending, and
/// only a ready condition reacts to incoming values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeCondition {
    id: ConditionId,
    pub name: String,
    cases: IndexMap<EventId, Case>,
    pending: IndexSet<EventId>,
    ready: bool,
}

impl TimeCondition {
    pub(crate) fn new(id: ConditionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cases: IndexMap::new(),
            pending: IndexSet::new(),
            ready: false,
        }
    }

    pub fn id(&self) -> ConditionId {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn cases(&self) -> impl Iterator<Item = (EventId, &Case)> {
        self.cases.iter().map(|(e, c)| (*e, c))
    }

    pub fn case(&self, event: EventId) -> Option<&Case> {
        self.cases.get(&event)
    }

    pub fn events(&self) -> impl Iterator<Item = EventId> + '_ {
        self.cases.keys().copied()
    }

    pub fn contains(&self, event: EventId) -> bool {
        self.cases.contains_key(&event)
    }

    /// Addresses this condition listens to
    pub fn addresses(&self) -> IndexSet<&str> {
        self.cases
            .values()
            .flat_map(|c| [c.trigger.address(), c.dispose.address()])
            .filter(|a| !a.is_empty())
            .collect()
    }

    pub(crate) fn add_case(&mut self, event: EventId, case: Case) -> Result<()> {
        if self.cases.contains_key(&event) {
            return Err(Error::Validation(format!(
                "{} already has a case for {}",
                self.id, event
            )));
        }
        self.cases.insert(event, case);
        self.refresh_ready();
        Ok(())
    }

    pub(crate) fn remove_case(&mut self, event: EventId) -> Option<Case> {
        let case = self.cases.shift_remove(&event);
        self.pending.shift_remove(&event);
        self.refresh_ready();
        case
    }

    pub(crate) fn case_mut(&mut self, event: EventId) -> Result<&mut Case> {
        self.cases
            .get_mut(&event)
            .ok_or(Error::EventNotFound(event))
    }

    /// Record an event becoming pending (or not); returns the new ready flag
    /// when it changed
    pub(crate) fn event_ready(&mut self, event: EventId, pending: bool) -> Option<bool> {
        if !self.cases.contains_key(&event) {
            return None;
        }
        if pending {
            self.pending.insert(event);
        } else {
            self.pending.shift_remove(&event);
        }
        let before = self.ready;
        self.refresh_ready();
        (before != self.ready).then_some(self.ready)
    }

    fn refresh_ready(&mut self) {
        self.ready = !self.cases.is_empty() && self.pending.len() == self.cases.len();
    }

    /// Forget every pending event, e.g. before a new run
    pub(crate) fn reset(&mut self) {
        self.pending.clear();
        self.ready = false;
    }

    /// React to a value received at `address`
    ///
    /// Returns `None` while not ready or when nothing was decided. Once decided,
    /// the condition is no longer ready.
    pub fn resolve(&mut self, address: &str, value: &Value) -> Option<Resolution> {
        if !self.ready {
            return None;
        }
        let mut resolution = Resolution::default();
        let mut released = false;
        for (event, case) in &self.cases {
            if !case.trigger.is_empty() && case.trigger.address() == address {
                if case.trigger.evaluate(value) {
                    resolution.triggered.push(*event);
                } else {
                    resolution.disposed.push(*event);
                }
            }
            if !released && case.dispose.matches(address, value) {
                released = true;
            }
        }

        if released {
            for (event, case) in &self.cases {
                if resolution.triggered.contains(event) || resolution.disposed.contains(event) {
                    continue;
                }
                if case.default {
                    resolution.triggered.push(*event);
                } else {
                    resolution.disposed.push(*event);
                }
            }
        }

        if resolution.triggered.is_empty() && !released {
            return None;
        }
        self.ready = false;
        Some(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch() -> (TimeCondition, EventId, EventId) {
        let mut c = TimeCondition::new(ConditionId::new(1), "branch");
        let a = EventId::new(10);
        let b = EventId::new(11);
        c.add_case(a, Case::on(Expression::parse("/choice == 1").unwrap()))
            .unwrap();
        c.add_case(b, Case::on(Expression::parse("/choice == 2").unwrap()))
            .unwrap();
        (c, a, b)
    }

    #[test]
    fn test_ready_when_all_pending() {
        let (mut c, a, b) = branch();
        assert!(!c.is_ready());
        assert_eq!(c.event_ready(a, true), None);
        assert_eq!(c.event_ready(b, true), Some(true));
        assert!(c.is_ready());
        assert_eq!(c.event_ready(a, false), Some(false));
        assert_eq!(c.event_ready(EventId::new(99), true), None);
    }

    #[test]
    fn test_resolve_triggers_and_disposes() {
        let (mut c, a, b) = branch();
        assert!(c.resolve("/choice", &Value::Int(2)).is_none());
        c.event_ready(a, true);
        c.event_ready(b, true);

        assert!(c.resolve("/other", &Value::Int(2)).is_none());
        assert!(c.is_ready());

        let r = c.resolve("/choice", &Value::Int(2)).unwrap();
        assert_eq!(r.triggered, vec![b]);
        assert_eq!(r.disposed, vec![a]);
        assert!(!c.is_ready());
        assert!(c.resolve("/choice", &Value::Int(1)).is_none());
    }

    #[test]
    fn test_no_match_keeps_condition_ready() {
        let (mut c, a, b) = branch();
        c.event_ready(a, true);
        c.event_ready(b, true);
        assert!(c.resolve("/choice", &Value::Int(3)).is_none());
        assert!(c.is_ready());
    }

    #[test]
    fn test_dispose_expression_releases_defaults() {
        let (mut c, a, b) = branch();
        c.case_mut(a).unwrap().dispose = Expression::parse("/skip").unwrap();
        c.case_mut(b).unwrap().default = true;
        c.event_ready(a, true);
        c.event_ready(b, true);

        let r = c.resolve("/skip", &Value::Null).unwrap();
        assert_eq!(r.triggered, vec![b]);
        assert_eq!(r.disposed, vec![a]);
    }

    #[test]
    fn test_duplicate_case_rejected() {
        let (mut c, a, _) = branch();
        assert!(c.add_case(a, Case::default()).unwrap_err().is_validation());
        assert!(c.remove_case(a).is_some());
        assert_eq!(c.events().count(), 1);
        assert_eq!(c.addresses().into_iter().collect::<Vec<_>>(), vec!["/choice"]);
    }
}
