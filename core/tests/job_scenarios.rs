mod common;

use std::sync::Arc;

use common::{
    capabilities, controller, BrokenPlanner, BrokenReviewer, FailingReviewer, ScriptedPlanner,
    StubWorker,
};
use pretty_assertions::assert_eq;
use swarm_core::api::{
    AppConfig, Batch, EventType, HandoffStatus, JobOptions, JobStatus, RetryPolicy, Task,
};

fn two_independent_tasks() -> Batch {
    Batch::new(
        "two files",
        vec![
            Task::new("t1", "write module a").with_scope(["a.py"]),
            Task::new("t2", "write module b").with_scope(["b.py"]),
        ],
    )
}

#[tokio::test]
async fn scenario_a_independent_tasks_succeed() {
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![two_independent_tasks()])),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::passing()),
    );
    let (ctl, log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("two modules").await;

    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(outcome.handoffs.len(), 2);
    assert_eq!(outcome.revision, 0);
    assert_eq!(outcome.error, None);
    assert_eq!(
        outcome.artifacts.keys().cloned().collect::<Vec<_>>(),
        vec!["a.py".to_string(), "b.py".to_string()]
    );
    assert_eq!(log.count(EventType::JobStarted), 1);
    assert_eq!(log.count(EventType::JobDone), 1);
    assert_eq!(log.count(EventType::TaskCompleted), 2);
    assert_eq!(log.count(EventType::ReviewFailed), 0);
}

#[tokio::test]
async fn scenario_b_single_fix_cycle() {
    let reviewer = Arc::new(FailingReviewer::new(1));
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![two_independent_tasks()])),
        Arc::new(StubWorker::new()),
        reviewer.clone(),
    );
    let (ctl, log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("two modules").await;

    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(outcome.revision, 1);
    assert_eq!(reviewer.calls(), 2);
    assert_eq!(log.count(EventType::ReviewFailed), 1);

    let fix = outcome
        .handoffs
        .iter()
        .find(|h| h.task_id == "fix-r1-1")
        .expect("fix task executed");
    assert_eq!(fix.status, HandoffStatus::Complete);

    // The fix rewrote a.py at revision 1.
    let a = &outcome.artifacts["a.py"];
    assert_eq!(a.revision, 1);
    assert_eq!(a.task_id, "fix-r1-1");
    assert_eq!(outcome.artifacts["b.py"].revision, 0);
}

#[tokio::test]
async fn fix_ids_never_collide_with_planner_ids() {
    let batch = Batch::new(
        "",
        vec![
            Task::new("fix-r1-1", "write module a").with_scope(["a.py"]),
            Task::new("t2", "write module b").with_scope(["b.py"]),
        ],
    );
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![batch])),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::new(1)),
    );
    let (ctl, log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("two modules").await;

    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(outcome.revision, 1);
    assert_eq!(log.count(EventType::ReviewFailed), 1);
    assert_eq!(log.count(EventType::BatchRejected), 0);
    let a = &outcome.artifacts["a.py"];
    assert_eq!(a.task_id, "fix-r1-1-2");
    assert_eq!(a.revision, 1);
}

#[tokio::test]
async fn scenario_c_revision_ceiling_forces_partial() {
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![two_independent_tasks()])),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::always()),
    );
    let (ctl, log) = controller(caps, AppConfig::default());
    let ctl = ctl.with_options(JobOptions {
        revision_ceiling: Some(15),
        max_fixes_per_sweep: None,
    });

    let outcome = ctl.run("never good enough").await;

    assert_eq!(outcome.status, JobStatus::Partial);
    assert_eq!(outcome.revision, 15);
    let fixes: Vec<&str> = outcome
        .handoffs
        .iter()
        .map(|h| h.task_id.as_str())
        .filter(|id| id.starts_with("fix-"))
        .collect();
    assert_eq!(fixes.len(), 15);
    assert!(fixes.contains(&"fix-r15-1"));
    assert!(!fixes.iter().any(|id| id.starts_with("fix-r16")));
    assert_eq!(log.count(EventType::RevisionLimitReached), 1);
    assert_eq!(log.count(EventType::ReviewFailed), 15);
}

#[tokio::test]
async fn scenario_d_unknown_dependency_rejects_batch_then_retries() {
    let bad = Batch::new(
        "",
        vec![
            Task::new("ok", "valid sibling").with_scope(["ok.py"]),
            Task::new("t2", "depends on ghost")
                .with_scope(["t2.py"])
                .depends_on(["X"]),
        ],
    );
    let good = Batch::new("", vec![Task::new("t3", "fixed plan").with_scope(["t3.py"])]);
    let planner = Arc::new(ScriptedPlanner::new(vec![bad, good]));
    let caps = capabilities(
        planner.clone(),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::passing()),
    );
    let (ctl, log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("plan with a typo").await;

    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(log.count(EventType::BatchRejected), 1);
    // Nothing from the rejected batch ran, not even the valid sibling.
    let ran: Vec<&str> = outcome.handoffs.iter().map(|h| h.task_id.as_str()).collect();
    assert_eq!(ran, vec!["t3"]);

    let requests = planner.requests();
    let feedback = requests[1].feedback.as_deref().unwrap_or_default();
    assert!(feedback.contains("dependency_not_found"), "{feedback}");
    assert!(feedback.contains("'X'"), "{feedback}");
    assert_eq!(requests[1].turn, 0);
}

#[tokio::test]
async fn scenario_e_scope_conflict_rejects_batch() {
    let conflicting = Batch::new(
        "",
        vec![
            Task::new("t1", "edit a").with_scope(["a.py"]),
            Task::new("t2", "also edit a").with_scope(["a.py"]),
        ],
    );
    let ordered = Batch::new(
        "",
        vec![
            Task::new("t1", "edit a").with_scope(["a.py"]),
            Task::new("t2", "then edit a")
                .with_scope(["a.py"])
                .depends_on(["t1"]),
        ],
    );
    let planner = Arc::new(ScriptedPlanner::new(vec![conflicting, ordered]));
    let caps = capabilities(
        planner.clone(),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::passing()),
    );
    let (ctl, log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("two edits").await;

    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(log.count(EventType::BatchRejected), 1);
    assert!(planner.requests()[1]
        .feedback
        .as_deref()
        .is_some_and(|f| f.contains("scope_conflict")));
    assert_eq!(outcome.artifacts["a.py"].task_id, "t2");
    assert!(outcome.waves >= 2);
}

#[tokio::test]
async fn failed_dependency_blocks_dependents() {
    let batch = Batch::new(
        "",
        vec![
            Task::new("t1", "foundation").with_scope(["base.py"]),
            Task::new("t2", "builds on t1")
                .with_scope(["top.py"])
                .depends_on(["t1"]),
            Task::new("t3", "independent").with_scope(["side.py"]),
        ],
    );
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![batch])),
        Arc::new(StubWorker::failing(["t1"])),
        Arc::new(FailingReviewer::passing()),
    );
    let (ctl, log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("cascade").await;

    assert_eq!(outcome.status, JobStatus::Partial);
    let t1 = outcome.handoffs.iter().find(|h| h.task_id == "t1").unwrap();
    assert_eq!(t1.status, HandoffStatus::Failed);
    assert!(t1.concerns[0].contains("worker crashed"));

    let t2 = outcome.handoffs.iter().find(|h| h.task_id == "t2").unwrap();
    assert_eq!(t2.status, HandoffStatus::Blocked);
    assert!(t2.concerns[0].contains("'t1'"));
    assert_eq!(log.count(EventType::TaskBlocked), 1);
}

#[tokio::test]
async fn all_tasks_failing_fails_the_job() {
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![Batch::new(
            "",
            vec![Task::new("t1", "doomed").with_scope(["x.py"])],
        )])),
        Arc::new(StubWorker::failing(["t1"])),
        Arc::new(FailingReviewer::passing()),
    );
    let (ctl, _log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("doomed").await;
    assert_eq!(outcome.status, JobStatus::Failed);
}

#[tokio::test]
async fn empty_plan_fails_the_job() {
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(Vec::new())),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::passing()),
    );
    let (ctl, _log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("nothing to do").await;
    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.error.as_deref(), Some("planner produced no tasks"));
}

#[tokio::test]
async fn oversized_batch_is_retried_with_feedback() {
    let mut config = AppConfig::default();
    config.planner.max_batch_size = 2;

    let too_big = Batch::new(
        "",
        (1..=3)
            .map(|i| Task::new(format!("t{i}"), "x").with_scope([format!("f{i}.py")]))
            .collect(),
    );
    let planner = Arc::new(ScriptedPlanner::new(vec![too_big, two_independent_tasks()]));
    let caps = capabilities(
        planner.clone(),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::passing()),
    );
    let (ctl, log) = controller(caps, config);

    let outcome = ctl.run("big job").await;

    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(outcome.handoffs.len(), 2);
    let rejected = log
        .events()
        .into_iter()
        .find(|e| e.event_type == EventType::BatchRejected)
        .unwrap();
    assert_eq!(rejected.data["code"], "batch_too_large");
    let feedback = planner.requests()[1].feedback.clone().unwrap();
    assert!(feedback.contains("at most 2"), "{feedback}");
}

#[tokio::test]
async fn planner_retry_exhaustion_aborts_as_failed() {
    let caps = capabilities(
        Arc::new(BrokenPlanner),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::passing()),
    );
    let (ctl, log) = controller(caps, AppConfig::default());
    let ctl = ctl.with_retry_policy(RetryPolicy::new(2, 0, 0));

    let outcome = ctl.run("unreachable planner").await;

    assert_eq!(outcome.status, JobStatus::Failed);
    let error = outcome.error.unwrap();
    assert!(error.contains("planner failed after 3 attempts"), "{error}");
    assert!(error.contains("model endpoint unavailable"), "{error}");
    assert_eq!(log.count(EventType::PlanningTurn), 3);
}

#[tokio::test]
async fn reviewer_exhaustion_after_progress_is_partial() {
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![two_independent_tasks()])),
        Arc::new(StubWorker::new()),
        Arc::new(BrokenReviewer),
    );
    let (ctl, _log) = controller(caps, AppConfig::default());

    let outcome = ctl.run("unreviewable").await;

    assert_eq!(outcome.status, JobStatus::Partial);
    assert!(outcome.error.unwrap().contains("reviewer"));
    assert_eq!(outcome.artifacts.len(), 2);
}

#[tokio::test]
async fn fix_batches_respect_max_fixes_option() {
    let many = Batch::new(
        "",
        (1..=4)
            .map(|i| Task::new(format!("t{i}"), "x").with_scope([format!("f{i}.py")]))
            .collect(),
    );
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![many])),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::new(1).on_every_artifact()),
    );
    let (ctl, log) = controller(caps, AppConfig::default());
    let ctl = ctl.with_options(JobOptions {
        revision_ceiling: None,
        max_fixes_per_sweep: Some(2),
    });

    let outcome = ctl.run("one fix").await;

    assert_eq!(outcome.status, JobStatus::Success);
    let failed = log
        .events()
        .into_iter()
        .find(|e| e.event_type == EventType::ReviewFailed)
        .unwrap();
    assert_eq!(failed.data["defects"].as_array().map(Vec::len), Some(4));
    assert_eq!(failed.data["fixes"].as_array().map(Vec::len), Some(2));
    assert_eq!(outcome.revision, 1);
}

#[tokio::test]
async fn reconciler_runs_on_its_cadence_and_shares_the_budget() {
    let mut config = AppConfig::default();
    config.reconciler.interval_cycles = 1;

    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![two_independent_tasks()])),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::passing()),
    )
    .with_reconciler(Arc::new(FailingReviewer::new(1)));
    let (ctl, log) = controller(caps, config);

    let outcome = ctl.run("reconcile me").await;

    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(outcome.revision, 1);
    assert_eq!(log.count(EventType::ReconcilerIssue), 1);
    assert!(outcome.handoffs.iter().any(|h| h.task_id == "reconcile-r1-1"));
}

#[tokio::test]
async fn disabled_reconciler_never_sweeps() {
    let mut config = AppConfig::default();
    config.reconciler.enabled = false;
    config.reconciler.interval_cycles = 1;

    let reconciler = Arc::new(FailingReviewer::always());
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![two_independent_tasks()])),
        Arc::new(StubWorker::new()),
        Arc::new(FailingReviewer::passing()),
    )
    .with_reconciler(reconciler.clone());
    let (ctl, _log) = controller(caps, config);

    let outcome = ctl.run("quiet").await;
    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(reconciler.calls(), 0);
}
