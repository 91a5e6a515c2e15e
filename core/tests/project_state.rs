mod common;

use std::sync::Arc;

use common::{
    capabilities, controller_with_log, FailingReviewer, RecordingWorker, ScriptedPlanner,
};
use pretty_assertions::assert_eq;
use swarm_core::api::{AppConfig, Batch, EventLog, JobStatus, Objective, Task};

fn two_files() -> Batch {
    Batch::new(
        "two files",
        vec![
            Task::new("t1", "write module a").with_scope(["a.py"]),
            Task::new("t2", "write module b").with_scope(["b.py"]),
        ],
    )
}

#[tokio::test]
async fn follow_up_planner_turn_sees_tree_delta_and_handoff_digests() {
    let planner = Arc::new(ScriptedPlanner::new(vec![two_files()]));
    let log = EventLog::new();
    let worker = Arc::new(RecordingWorker::new(&log));
    let caps = capabilities(planner.clone(), worker, Arc::new(FailingReviewer::passing()));
    let ctl = controller_with_log(caps, AppConfig::default(), &log);

    let outcome = ctl.run("two modules").await;
    assert_eq!(outcome.status, JobStatus::Success);

    let root: Vec<_> = planner
        .requests()
        .into_iter()
        .filter(|r| matches!(r.objective, Objective::Job { .. }))
        .collect();
    assert_eq!(root.len(), 2);

    assert!(root[0].file_tree.is_empty());
    assert_eq!(root[0].total_files, 0);

    let follow_up = &root[1];
    assert_eq!(follow_up.new_files, vec!["a.py".to_string(), "b.py".to_string()]);
    assert!(follow_up.removed_files.is_empty());
    assert_eq!(follow_up.file_tree, follow_up.new_files);
    assert_eq!(follow_up.total_files, 2);

    let mut digests = follow_up.prior_handoffs.clone();
    digests.sort_by(|a, b| a.task_id.cmp(&b.task_id));
    assert_eq!(digests.len(), 2);
    assert_eq!(digests[0].task_id, "t1");
    assert_eq!(digests[0].summary, "did t1");
    assert_eq!(digests[0].files_changed, vec!["a.py".to_string()]);
}

#[tokio::test]
async fn fix_worker_receives_current_content_of_its_scope() {
    let log = EventLog::new();
    let worker = Arc::new(RecordingWorker::new(&log));
    let caps = capabilities(
        Arc::new(ScriptedPlanner::new(vec![two_files()])),
        worker.clone(),
        Arc::new(FailingReviewer::new(1)),
    );
    let ctl = controller_with_log(caps, AppConfig::default(), &log);

    let outcome = ctl.run("two modules").await;
    assert_eq!(outcome.status, JobStatus::Success);

    // Nothing existed when the first wave ran.
    let first = worker.invocation("t1").unwrap().request;
    assert!(first.files.is_empty());
    assert!(first.file_tree.is_empty());

    let fix = worker.invocation("fix-r1-1").unwrap().request;
    assert_eq!(fix.task.revision, 1);
    assert_eq!(fix.file_tree, vec!["a.py".to_string(), "b.py".to_string()]);
    assert_eq!(fix.files.len(), 1);
    assert_eq!(fix.files["a.py"], "# written by t1\n");
}
