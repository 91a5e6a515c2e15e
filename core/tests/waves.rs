mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use common::{
    capabilities, controller_with_log, FailingReviewer, Invocation, RecordingWorker,
    ScriptedPlanner,
};
use pretty_assertions::assert_eq;
use swarm_core::api::{AppConfig, Batch, EventLog, EventType, JobStatus, Task};

fn paths_overlap(a: &str, b: &str) -> bool {
    a == b || (a.ends_with('/') && b.starts_with(a)) || (b.ends_with('/') && a.starts_with(b))
}

fn scopes_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.iter().any(|x| b.iter().any(|y| paths_overlap(x, y)))
}

/// Every pair of invocations sharing a wave must touch disjoint paths.
fn assert_waves_disjoint(invocations: &[Invocation]) {
    let mut by_wave: BTreeMap<u64, Vec<&Invocation>> = BTreeMap::new();
    for inv in invocations {
        by_wave.entry(inv.wave).or_default().push(inv);
    }
    for (wave, members) in by_wave {
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                assert!(
                    !scopes_overlap(&a.scope, &b.scope),
                    "wave {wave}: {} {:?} overlaps {} {:?}",
                    a.task_id,
                    a.scope,
                    b.task_id,
                    b.scope
                );
            }
        }
    }
}

fn wave_of(worker: &RecordingWorker, task_id: &str) -> u64 {
    worker
        .invocation(task_id)
        .unwrap_or_else(|| panic!("{task_id} never ran"))
        .wave
}

#[tokio::test]
async fn ordered_overlapping_tasks_run_in_separate_waves() {
    let batch = Batch::new(
        "",
        vec![
            Task::new("model", "board model").with_scope(["game/board.py"]),
            Task::new("view", "board view")
                .with_scope(["game/board.py", "game/view.py"])
                .depends_on(["model"]),
            Task::new("entry", "entry point").with_scope(["main.py"]),
        ],
    );
    let log = EventLog::new();
    let worker = Arc::new(RecordingWorker::new(&log));
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![batch])),
        worker.clone(),
        Arc::new(FailingReviewer::passing()),
    );
    let ctl = controller_with_log(caps, AppConfig::default(), &log);

    let outcome = ctl.run("board game").await;

    assert_eq!(outcome.status, JobStatus::Success);
    assert_waves_disjoint(&worker.invocations());
    assert_eq!(wave_of(&worker, "model"), wave_of(&worker, "entry"));
    assert!(wave_of(&worker, "view") > wave_of(&worker, "model"));
}

#[tokio::test]
async fn gate_fix_waits_for_the_pending_task_it_overlaps() {
    let game = Task::new("game", "build the game")
        .with_scope(["game/", "game/ui.py", "game/rules.py", "game/board.py"]);
    let planner = Arc::new(
        ScriptedPlanner::new(vec![Batch::new(
            "",
            vec![game, Task::new("cli", "command line").with_scope(["cli.py"])],
        )])
        .for_task(
            "game",
            vec![Batch::new(
                "ui first",
                vec![Task::new("ui", "game ui").with_scope(["game/ui.py"])],
            )],
        ),
    );
    let log = EventLog::new();
    let worker = Arc::new(RecordingWorker::new(&log));
    // The first review, of `cli`, blames a file still owned by `game`.
    let reviewer = Arc::new(FailingReviewer::new(1).scoped_to(["game/ui.py"]));
    let caps = capabilities(planner.clone(), worker.clone(), reviewer.clone())
        .with_subplanner(planner.clone());
    let ctl = controller_with_log(caps, AppConfig::default(), &log);

    let outcome = ctl.run("make a game").await;

    assert_eq!(outcome.status, JobStatus::Success, "{:?}", outcome.error);
    assert_eq!(outcome.revision, 1);
    assert_eq!(log.count(EventType::ReviewFailed), 1);
    assert_eq!(log.count(EventType::BatchRejected), 0);

    let invocations = worker.invocations();
    assert_waves_disjoint(&invocations);
    assert!(invocations.iter().all(|i| i.task_id != "game"));
    assert!(wave_of(&worker, "fix-r1-1") > wave_of(&worker, "ui"));

    // The fix saw the child's output for the file it repairs.
    let fix = worker.invocation("fix-r1-1").unwrap();
    assert_eq!(fix.request.files["game/ui.py"], "# written by ui\n");
    assert_eq!(outcome.artifacts["game/ui.py"].task_id, "fix-r1-1");
}
