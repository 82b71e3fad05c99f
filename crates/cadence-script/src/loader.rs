//! RON score loader
//!
//! Documents are read into a [`ScoreFile`] first, then built into a scenario in
//! [`ExecutionMode::Loading`] so that edits skip the solver; the solver is built
//! once at the end from the whole document.

use crate::error::{Error, Result};
use crate::schema::{
    CaseDef, ConditionDef, EventDef, ProcessDef, ProcessKindDef, ScoreFile, END_ID, START_ID,
};
use cadence_score::{EventId, ExecutionMode, ProcessKind, Scenario};
use indexmap::{IndexMap, IndexSet};
use ron::ser::PrettyConfig;
use std::fs;
use std::hash::Hash;
use std::path::Path;
use tracing::{debug, warn};

/// Parse a score document
pub fn load_str(content: &str) -> Result<ScoreFile> {
    Ok(ron::from_str(content)?)
}

/// Read and parse a score document
pub fn load_file(path: impl AsRef<Path>) -> Result<ScoreFile> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let doc = load_str(&content)?;
    debug!(path = %path.display(), events = doc.events.len(), "score loaded");
    Ok(doc)
}

/// Write a score document as pretty RON
pub fn save_str(doc: &ScoreFile) -> Result<String> {
    Ok(ron::ser::to_string_pretty(doc, PrettyConfig::new())?)
}

pub fn save_file(doc: &ScoreFile, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, save_str(doc)?)?;
    debug!(path = %path.display(), "score saved");
    Ok(())
}

/// Build a scenario from a document
///
/// The scenario ends up in the document's mode, [`ExecutionMode::Normal`] when
/// the document asks for `Loading`.
pub fn build_scenario(doc: &ScoreFile) -> Result<Scenario> {
    let mode = match doc.config.mode {
        ExecutionMode::Loading => ExecutionMode::Normal,
        mode => mode,
    };
    let mut scenario = Scenario::new(doc.config.clone().with_mode(ExecutionMode::Loading));
    if !doc.name.is_empty() {
        scenario.name = doc.name.clone();
    }

    let mut events: IndexMap<&str, EventId> = IndexMap::new();
    events.insert(START_ID, scenario.start_event());
    events.insert(END_ID, scenario.end_event());
    for def in &doc.events {
        if events.contains_key(def.id.as_str()) {
            return Err(Error::DuplicateDefinition(format!("event '{}'", def.id)));
        }
        let id = scenario.add_event(def.display_name(), def.date)?;
        if def.mute {
            scenario.set_event_mute(id, true)?;
        }
        events.insert(&def.id, id);
    }
    let event = |id: &str| {
        events
            .get(id)
            .copied()
            .ok_or_else(|| Error::MissingReference(format!("event '{}'", id)))
    };

    let mut processes = IndexSet::new();
    for def in &doc.processes {
        if !processes.insert(def.id.as_str()) {
            return Err(Error::DuplicateDefinition(format!("process '{}'", def.id)));
        }
        let (start, end) = (event(&def.start)?, event(&def.end)?);
        let kind = match &def.kind {
            ProcessKindDef::Plain => ProcessKind::Plain,
            ProcessKindDef::Interval => ProcessKind::Interval,
            ProcessKindDef::Scenario(nested) => {
                ProcessKind::Scenario(Box::new(build_scenario(nested)?))
            }
        };
        let id = scenario.add_process(def.display_name(), kind, start, end)?;
        if def.min > 0 || def.max > 0 {
            scenario.set_limits(id, def.min, def.max)?;
        }
        if def.mute {
            scenario.set_process_mute(id, true)?;
        }
    }

    let mut conditions = IndexSet::new();
    for def in &doc.conditions {
        if !conditions.insert(def.id.as_str()) {
            return Err(Error::DuplicateDefinition(format!("condition '{}'", def.id)));
        }
        if def.cases.is_empty() {
            return Err(Error::InvalidDocument(format!(
                "condition '{}' has no case",
                def.id
            )));
        }
        let id = scenario.add_condition(def.display_name());
        for case in &def.cases {
            scenario.add_case(id, event(&case.event)?, case.to_case())?;
        }
    }

    scenario.set_mode(mode)?;
    debug!(
        scenario = %scenario.name,
        events = doc.events.len(),
        processes = doc.processes.len(),
        conditions = doc.conditions.len(),
        "scenario built"
    );
    Ok(scenario)
}

/// Symbolic ids: the name when unique and not reserved, `prefix` + raw id otherwise
///
/// A generated id never collides with a kept name; the number is bumped past it.
fn symbols<K: Copy + Eq + Hash>(
    items: &[(K, &str, u64)],
    prefix: &str,
    reserved: &[&str],
) -> IndexMap<K, String> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for (_, name, _) in items {
        *counts.entry(*name).or_default() += 1;
    }
    let kept: IndexSet<&str> = counts
        .iter()
        .filter(|(name, n)| **n == 1 && !name.is_empty() && !reserved.contains(name))
        .map(|(name, _)| *name)
        .collect();
    let mut taken: IndexSet<String> = kept
        .iter()
        .chain(reserved)
        .map(|name| name.to_string())
        .collect();

    items
        .iter()
        .map(|(key, name, raw)| {
            if kept.contains(name) {
                return (*key, name.to_string());
            }
            let mut n = *raw;
            loop {
                let symbol = format!("{}{}", prefix, n);
                if taken.insert(symbol.clone()) {
                    return (*key, symbol);
                }
                n += 1;
            }
        })
        .collect()
}

/// Describe a scenario as a document
///
/// Behavior processes are saved as plain processes.
pub fn export(scenario: &Scenario) -> ScoreFile {
    let (start, end) = (scenario.start_event(), scenario.end_event());
    let user_events: Vec<_> = scenario
        .events()
        .filter(|e| e.id() != start && e.id() != end)
        .map(|e| (e.id(), e.name.as_str(), e.id().raw()))
        .collect();
    let mut ids = symbols(&user_events, "e", &[START_ID, END_ID]);
    ids.insert(start, START_ID.to_string());
    ids.insert(end, END_ID.to_string());
    let symbol = |id: EventId| ids.get(&id).cloned().unwrap_or_default();

    let mut doc = ScoreFile::new(scenario.name.clone(), scenario.config().clone());
    doc.events = scenario
        .events()
        .filter(|e| e.id() != start && e.id() != end)
        .map(|e| EventDef {
            id: symbol(e.id()),
            name: (e.name != symbol(e.id())).then(|| e.name.clone()),
            date: e.date(),
            mute: e.mute,
        })
        .collect();

    let processes: Vec<_> = scenario
        .processes()
        .map(|p| (p.id(), p.name.as_str(), p.id().raw()))
        .collect();
    let process_ids = symbols(&processes, "p", &[]);
    doc.processes = scenario
        .processes()
        .map(|p| {
            let kind = match p.kind() {
                ProcessKind::Plain => ProcessKindDef::Plain,
                ProcessKind::Interval => ProcessKindDef::Interval,
                ProcessKind::Scenario(nested) => ProcessKindDef::Scenario(Box::new(export(nested))),
                ProcessKind::Behavior(_) => {
                    warn!(process = %p.id(), "behavior saved as a plain process");
                    ProcessKindDef::Plain
                }
            };
            let id = process_ids.get(&p.id()).cloned().unwrap_or_default();
            ProcessDef {
                name: (p.name != id).then(|| p.name.clone()),
                id,
                start: symbol(p.start_event()),
                end: symbol(p.end_event()),
                kind,
                min: p.duration_min(),
                max: p.duration_max(),
                mute: p.mute,
            }
        })
        .collect();

    let conditions: Vec<_> = scenario
        .conditions()
        .map(|c| (c.id(), c.name.as_str(), c.id().raw()))
        .collect();
    let condition_ids = symbols(&conditions, "c", &[]);
    doc.conditions = scenario
        .conditions()
        .map(|c| {
            let id = condition_ids.get(&c.id()).cloned().unwrap_or_default();
            ConditionDef {
                name: (c.name != id).then(|| c.name.clone()),
                id,
                cases: c
                    .cases()
                    .map(|(event, case)| CaseDef::from_case(symbol(event), case))
                    .collect(),
            }
        })
        .collect();
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_score::{EventStatus, Expression, ScenarioConfig, Value};

    const SCORE: &str = r#"
    (
        name: "branch",
        config: (duration: 1000),
        events: [
            (id: "a", date: 200),
            (id: "b", name: Some("answer"), date: 700),
            (id: "c", date: 800),
        ],
        processes: [
            (id: "fixed", start: "a", end: "b", min: 500, max: 500),
            (id: "wait", start: "start", end: "a", kind: Interval),
            (id: "tail", start: "b", end: "c", min: 50, max: 400),
        ],
        conditions: [
            (
                id: "go",
                cases: [(event: "c", trigger: "/go == 1")],
            ),
        ],
    )
    "#;

    fn event_named<'a>(s: &'a Scenario, name: &str) -> &'a cadence_score::TimeEvent {
        s.events().find(|e| e.name == name).unwrap()
    }

    #[test]
    fn test_load_score() {
        let doc = load_str(SCORE).unwrap();
        assert_eq!(doc.events.len(), 3);
        assert_eq!(doc.processes[1].kind, ProcessKindDef::Interval);
        assert_eq!(
            doc.conditions[0].cases[0].trigger,
            Expression::parse("/go == 1").unwrap()
        );

        let s = build_scenario(&doc).unwrap();
        assert_eq!(s.name, "branch");
        assert_eq!(s.mode(), ExecutionMode::Normal);
        assert_eq!(s.duration(), 1000);
        assert_eq!(event_named(&s, "answer").date(), 700);
        assert!(event_named(&s, "c").is_interactive());
        let fixed = s.processes().find(|p| p.name == "fixed").unwrap();
        assert!(fixed.is_rigid());
        assert!(s.solver().is_satisfied());
        assert_eq!(s.solver().nb_variables(), 5);
    }

    #[test]
    fn test_loaded_score_plays() {
        let mut s = build_scenario(&load_str(SCORE).unwrap()).unwrap();
        let c = event_named(&s, "c").id();
        s.start().unwrap();
        for t in (0..=800).step_by(50) {
            s.process(t, t).unwrap();
        }
        assert_eq!(s.event(c).unwrap().status(), EventStatus::Pending);
        s.receive("/go", &Value::Int(1)).unwrap();
        s.process(850, 850).unwrap();
        assert_eq!(s.event(c).unwrap().status(), EventStatus::Happened);
    }

    #[test]
    fn test_missing_reference() {
        let doc = load_str(
            r#"(events: [(id: "a", date: 10)], processes: [(id: "p", start: "a", end: "nowhere")])"#,
        )
        .unwrap();
        assert!(matches!(
            build_scenario(&doc),
            Err(Error::MissingReference(r)) if r.contains("nowhere")
        ));
    }

    #[test]
    fn test_duplicate_definitions() {
        let doc = load_str(r#"(events: [(id: "a", date: 10), (id: "a", date: 20)])"#).unwrap();
        assert!(matches!(
            build_scenario(&doc),
            Err(Error::DuplicateDefinition(_))
        ));

        let doc = load_str(r#"(events: [(id: "start", date: 10)])"#).unwrap();
        assert!(matches!(
            build_scenario(&doc),
            Err(Error::DuplicateDefinition(_))
        ));
    }

    #[test]
    fn test_rejected_scores() {
        let doc = load_str(r#"(events: [(id: "a", date: 20000)])"#).unwrap();
        assert!(matches!(
            build_scenario(&doc),
            Err(Error::Score(e)) if e.is_validation()
        ));

        // the boundary events cannot move to honor a short interval
        let doc = load_str(
            r#"(
                config: (duration: 1000),
                processes: [(id: "p", start: "start", end: "end", kind: Interval, min: 0, max: 200)],
            )"#,
        )
        .unwrap();
        assert!(matches!(
            build_scenario(&doc),
            Err(Error::Score(e)) if e.is_infeasible()
        ));

        let doc = load_str(r#"(conditions: [(id: "c", cases: [])])"#).unwrap();
        assert!(matches!(
            build_scenario(&doc),
            Err(Error::InvalidDocument(_))
        ));

        assert!(matches!(load_str("(events: [oops])"), Err(Error::Ron(_))));
    }

    #[test]
    fn test_export_keeps_the_score() {
        let mut inner = ScoreFile::new("inner", ScenarioConfig::default().with_duration(300));
        inner.events.push(EventDef::new("x", 100));
        let mut doc = load_str(SCORE).unwrap();
        doc.processes.push(
            ProcessDef::new("nested", "a", "b")
                .with_kind(ProcessKindDef::Scenario(Box::new(inner)))
                .with_limits(300, 600),
        );
        let s = build_scenario(&doc).unwrap();

        let text = save_str(&export(&s)).unwrap();
        let again = build_scenario(&load_str(&text).unwrap()).unwrap();

        let dates = |s: &Scenario| {
            s.events()
                .map(|e| (e.name.clone(), e.date()))
                .collect::<Vec<_>>()
        };
        assert_eq!(dates(&again), dates(&s));
        let limits = |s: &Scenario| {
            s.processes()
                .map(|p| (p.name.clone(), p.duration_min(), p.duration_max()))
                .collect::<Vec<_>>()
        };
        assert_eq!(limits(&again), limits(&s));

        let exported = export(&again);
        // ids follow the names when those are unique
        assert_eq!(exported.events[1].id, "answer");
        assert_eq!(exported.events[1].name, None);
        assert_eq!(exported.conditions[0].cases[0].event, "c");
        let ProcessKindDef::Scenario(nested) = &exported.processes[3].kind else {
            panic!("nested score lost");
        };
        assert_eq!(nested.events, vec![EventDef::new("x", 100)]);
    }

    #[test]
    fn test_symbols() {
        let items = [(1, "a", 1), (2, "b", 2), (3, "b", 3), (4, "start", 4), (5, "", 5)];
        let ids = symbols(&items, "e", &[START_ID]);
        let ids: Vec<_> = ids.values().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "e2", "e3", "e4", "e5"]);
    }

    #[test]
    fn test_generated_ids_skip_kept_names() {
        let items = [(1, "e5", 1), (2, "dup", 5), (3, "dup", 6)];
        let ids = symbols(&items, "e", &[]);
        let ids: Vec<_> = ids.values().map(String::as_str).collect();
        assert_eq!(ids, vec!["e5", "e6", "e7"]);

        let mut s = Scenario::new(ScenarioConfig::default().with_duration(1000));
        s.add_event("dup", 100).unwrap();
        s.add_event("dup", 200).unwrap();
        let named = s.add_event("e2", 300).unwrap();
        let doc = export(&s);
        let ids: Vec<_> = doc.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e4", "e2"]);
        assert_eq!(named.raw(), 4);

        let again = build_scenario(&doc).unwrap();
        let dates: Vec<u32> = again.events().map(|e| e.date()).collect();
        assert_eq!(dates, vec![0, 1000, 100, 200, 300]);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.ron");
        let doc = load_str(SCORE).unwrap();
        save_file(&doc, &path).unwrap();
        assert_eq!(load_file(&path).unwrap(), doc);

        let missing = dir.path().join("missing.ron");
        assert!(matches!(load_file(missing), Err(Error::Io(_))));
    }
}
