//! Metronome Example
//!
//! Plays a small interactive score tick by tick. A click process counts beats
//! over the whole score while a conditional event waits for `/go`, which the
//! demo sends halfway through.
//!
//! Pass a path to play another score document; `RUST_LOG=debug` shows the
//! engine at work.

use cadence_score::{
    NotificationKind, ProcessKind, Scenario, TimeProcessBehavior, Value,
};
use cadence_script::{build_scenario, load_file, load_str};

const SCORE: &str = r#"
(
    name: "metronome",
    config: (duration: 2000),
    events: [
        (id: "intro", date: 250),
        (id: "verse", date: 750),
        (id: "answer", date: 1250),
    ],
    processes: [
        (id: "count-in", start: "intro", end: "verse", min: 500, max: 500),
        (id: "wait", start: "verse", end: "answer", min: 200, max: 1000),
    ],
    conditions: [
        (id: "go", cases: [(event: "answer", trigger: "/go == 1")]),
    ],
)
"#;

const TICK: u64 = 50;

/// Prints a click on every beat
#[derive(Debug)]
struct Click {
    beats: u32,
    last: Option<u32>,
}

impl TimeProcessBehavior for Click {
    fn process_start(&mut self) {
        self.last = None;
    }

    fn process(&mut self, progression: f64, real_time: u64) {
        let beat = (progression * self.beats as f64) as u32;
        if self.last != Some(beat) {
            self.last = Some(beat);
            println!("  click {} ({} ms)", beat + 1, real_time);
        }
    }

    fn process_end(&mut self) {
        println!("  click done");
    }
}

fn load() -> Result<Scenario, cadence_script::Error> {
    let doc = match std::env::args().nth(1) {
        Some(path) => load_file(path)?,
        None => load_str(SCORE)?,
    };
    let mut score = build_scenario(&doc)?;
    let (start, end) = (score.start_event(), score.end_event());
    score.add_process(
        "click",
        ProcessKind::Behavior(Box::new(Click {
            beats: 8,
            last: None,
        })),
        start,
        end,
    )?;
    Ok(score)
}

fn main() -> Result<(), cadence_script::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    println!("=== Cadence Metronome Example ===\n");
    let mut score = load()?;
    println!(
        "Score '{}': {} events, {} processes, {} ms\n",
        score.name,
        score.events().count(),
        score.processes().count(),
        score.duration()
    );

    score.start()?;
    let mut t = 0;
    loop {
        if t == score.duration() as u64 / 2 {
            println!("  -> sending /go 1");
            score.receive("/go", &Value::Int(1))?;
        }
        let running = score.process(t, t)?;

        for n in score.drain_notifications() {
            let name = |id| score.event(id).map(|e| e.name.clone()).unwrap_or_default();
            match n.kind {
                NotificationKind::EventStatusChanged { event, status, .. } => {
                    println!("{:>5} ms  {} {}", n.position, name(event), status)
                }
                NotificationKind::EventReadyChanged { event, ready: true } => {
                    println!("{:>5} ms  {} is waiting for /go", n.position, name(event))
                }
                NotificationKind::ScenarioEnded => println!("{:>5} ms  end of score", n.position),
                _ => {}
            }
        }

        if !running {
            break;
        }
        t += TICK;
    }

    println!("\n=== Score Complete ===");
    Ok(())
}
