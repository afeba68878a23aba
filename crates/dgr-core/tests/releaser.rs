//! End-to-end releases against the scripted job executor.

use std::sync::Arc;
use std::time::Duration;

use dgr_core::analyser::{DeclaredDependency, UniverseProject};
use dgr_core::fakes::{JobOutcome, RecordingPublisher, ScriptedJobExecutor, StaticJobDataFactory};
use dgr_core::{
    BuildOptions, CommandState, InMemoryAnalyser, PollOptions, ProjectId, ProjectUniverse,
    ReleaseError, ReleasePlan, ReleasePlanBuilder, ReleaseState, Releaser,
};

fn plan(projects: &[(&str, Option<&str>, &[&str])], options: BuildOptions) -> ReleasePlan {
    let analyser = InMemoryAnalyser::new(ProjectUniverse {
        projects: projects
            .iter()
            .map(|(id, parent, deps)| UniverseProject {
                id: ProjectId::new(*id),
                version: "1.4.0-SNAPSHOT".to_string(),
                relative_path: format!("{id}/"),
                parent: parent.map(ProjectId::new),
                dependencies: deps
                    .iter()
                    .map(|d| DeclaredDependency {
                        id: ProjectId::new(*d),
                        self_managed: true,
                    })
                    .collect(),
            })
            .collect(),
        ..Default::default()
    })
    .unwrap();
    ReleasePlanBuilder::new(options)
        .build(&ProjectId::new(projects[0].0), &analyser)
        .unwrap()
}

fn diamond() -> ReleasePlan {
    plan(
        &[
            ("r", None, &[]),
            ("a", None, &["r"]),
            ("b", None, &["r"]),
            ("c", None, &["a", "b"]),
        ],
        BuildOptions::new("diamond"),
    )
}

fn releaser(plan: ReleasePlan, executor: &Arc<ScriptedJobExecutor>) -> Releaser {
    Releaser::new(
        plan,
        executor.clone(),
        Arc::new(StaticJobDataFactory::new("https://ci.invalid")),
    )
    .with_poll_options(PollOptions {
        interval: Duration::from_secs(1),
        max_wait: Duration::from_secs(60),
    })
}

fn all_states(plan: &ReleasePlan) -> Vec<(ProjectId, CommandState)> {
    plan.projects()
        .flat_map(|p| p.commands.iter().map(|c| (p.id.clone(), c.state.clone())))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_diamond_releases_everything_in_order() {
    let executor = Arc::new(ScriptedJobExecutor::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let releaser = releaser(diamond(), &executor).with_publisher(publisher.clone());

    assert!(releaser.release().await.unwrap());

    let plan = releaser.plan().await;
    assert_eq!(plan.state(), ReleaseState::Succeeded);
    for (project_id, state) in all_states(&plan) {
        assert_eq!(state, CommandState::Succeeded, "{project_id}");
    }

    let start_c = executor.position("start:release c").unwrap();
    assert!(executor.position("end:release a").unwrap() < start_c);
    assert!(executor.position("end:release b").unwrap() < start_c);
    assert!(executor.position("end:release r").unwrap() < executor.position("start:release a").unwrap());

    let last = publisher.last().unwrap();
    assert_eq!(last.state(), ReleaseState::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_failed_root_leaves_dependents_waiting() {
    let executor = Arc::new(ScriptedJobExecutor::new().with_outcome("release r", JobOutcome::Fail));
    let releaser = releaser(diamond(), &executor);

    assert!(!releaser.release().await.unwrap());

    let plan = releaser.plan().await;
    assert_eq!(plan.state(), ReleaseState::Failed);
    assert_eq!(
        plan.command_state(&ProjectId::new("r"), 0).unwrap(),
        &CommandState::Failed
    );
    for (project_id, state) in all_states(&plan) {
        if project_id != ProjectId::new("r") {
            assert!(matches!(state, CommandState::Waiting { .. }), "{project_id}: {state}");
        }
    }
    assert_eq!(executor.events(), vec!["start:release r", "end:release r"]);
}

#[tokio::test(start_paused = true)]
async fn test_failing_side_blocks_only_its_dependents() {
    let executor = Arc::new(ScriptedJobExecutor::new().with_outcome("release b", JobOutcome::Fail));
    let releaser = releaser(diamond(), &executor);

    assert!(!releaser.release().await.unwrap());

    let plan = releaser.plan().await;
    let release_of = |id: &str| {
        plan.project(&ProjectId::new(id))
            .unwrap()
            .commands
            .iter()
            .find(|c| c.is_release_command())
            .unwrap()
            .state
            .clone()
    };
    assert_eq!(release_of("a"), CommandState::Succeeded);
    assert_eq!(release_of("b"), CommandState::Failed);
    assert_eq!(release_of("c"), CommandState::waiting_for(ProjectId::new("b")));
    assert!(executor.position("start:release c").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_re_process_during_release_is_serialised() {
    let executor = Arc::new(ScriptedJobExecutor::new().with_polls_until_done(3));
    let releaser = releaser(diamond(), &executor);

    let (released, re_processed) = tokio::join!(releaser.release(), async {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        for id in ["r", "a", "b", "c"] {
            releaser.re_process(ProjectId::new(id)).await?;
            tokio::task::yield_now().await;
        }
        Ok::<_, ReleaseError>(())
    });

    re_processed.unwrap();
    assert!(released.unwrap());
    let plan = releaser.plan().await;
    for (project_id, state) in all_states(&plan) {
        assert_eq!(state, CommandState::Succeeded, "{project_id}");
    }
    // every job ran exactly once
    let starts = executor
        .events()
        .iter()
        .filter(|e| e.starts_with("start:release"))
        .count();
    assert_eq!(starts, 4);
}

#[tokio::test(start_paused = true)]
async fn test_submodule_commands_run_with_their_multi_module() {
    let plan = plan(
        &[("r", None, &[]), ("m", None, &[]), ("s", Some("m"), &["r"])],
        BuildOptions::new("multi"),
    );
    let executor = Arc::new(ScriptedJobExecutor::new());
    let releaser = releaser(plan, &executor);

    assert!(releaser.release().await.unwrap());

    let update_of_s = executor.position("end:update dependency of s").unwrap();
    assert!(update_of_s < executor.position("start:release m").unwrap());
    let plan = releaser.plan().await;
    for (project_id, state) in all_states(&plan) {
        assert_eq!(state, CommandState::Succeeded, "{project_id}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_multi_module_waits_for_late_dependency_of_its_submodule() {
    let plan = plan(
        &[
            ("r", None, &[]),
            ("a", None, &["r"]),
            ("b", None, &["r"]),
            ("m", None, &["a"]),
            ("s", Some("m"), &["b"]),
        ],
        BuildOptions::new("late-submodule-dependency"),
    );
    let executor = Arc::new(ScriptedJobExecutor::new().with_polls_for("release b", 6));
    let releaser = releaser(plan, &executor);

    assert!(releaser.release().await.unwrap());

    let plan = releaser.plan().await;
    for (project_id, state) in all_states(&plan) {
        assert_eq!(state, CommandState::Succeeded, "{project_id}");
    }
    let end_b = executor.position("end:release b").unwrap();
    assert!(executor.position("end:release a").unwrap() < end_b);
    assert!(end_b < executor.position("start:update dependency of s").unwrap());
    assert!(
        executor.position("end:update dependency of s").unwrap()
            < executor.position("start:release m").unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn test_nested_submodules_run_with_their_top_multi_module() {
    let plan = plan(
        &[
            ("r", None, &[]),
            ("m1", None, &[]),
            ("m2", Some("m1"), &[]),
            ("s", Some("m2"), &["r"]),
        ],
        BuildOptions::new("nested"),
    );
    let executor = Arc::new(ScriptedJobExecutor::new());
    let releaser = releaser(plan, &executor);

    assert!(releaser.release().await.unwrap());

    let plan = releaser.plan().await;
    assert_eq!(plan.state(), ReleaseState::Succeeded);
    for (project_id, state) in all_states(&plan) {
        assert_eq!(state, CommandState::Succeeded, "{project_id}");
    }
    assert!(
        executor.position("end:update dependency of s").unwrap()
            < executor.position("start:release m1").unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn test_disabled_release_counts_as_success_but_blocks_dependents() {
    let options = BuildOptions::new("disabled").disable_release_for("a").unwrap();
    let plan = plan(
        &[("r", None, &[]), ("a", None, &["r"]), ("b", None, &["a"])],
        options,
    );
    let executor = Arc::new(ScriptedJobExecutor::new());
    let releaser = releaser(plan, &executor);

    assert!(releaser.release().await.unwrap());

    let plan = releaser.plan().await;
    let a = plan.project(&ProjectId::new("a")).unwrap();
    assert_eq!(a.commands[0].state, CommandState::Succeeded);
    assert_eq!(a.commands[1].state, CommandState::Disabled);
    for command in &plan.project(&ProjectId::new("b")).unwrap().commands {
        assert_eq!(command.state, CommandState::waiting_for(ProjectId::new("a")));
    }
}

#[tokio::test(start_paused = true)]
async fn test_deactivated_dependent_is_resolved_but_not_run() {
    let mut plan = plan(
        &[("r", None, &[]), ("a", None, &["r"])],
        BuildOptions::new("deactivated"),
    );
    let a = ProjectId::new("a");
    plan.deactivate_command(&a, 1).unwrap();
    let executor = Arc::new(ScriptedJobExecutor::new());
    let releaser = releaser(plan, &executor);

    assert!(releaser.release().await.unwrap());

    let mut plan = releaser.plan().await;
    assert_eq!(
        plan.command_state(&a, 1).unwrap(),
        &CommandState::Deactivated {
            previous: Box::new(CommandState::Ready)
        }
    );
    assert!(executor.position("start:release a").is_none());
    plan.reactivate_command(&a, 1).unwrap();
    assert_eq!(plan.command_state(&a, 1).unwrap(), &CommandState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_failed_release_can_be_retriggered() {
    let failing = Arc::new(ScriptedJobExecutor::new().with_outcome("release a", JobOutcome::Fail));
    let first = releaser(diamond(), &failing);
    assert!(!first.release().await.unwrap());

    let mut plan = first.plan().await;
    plan.prepare_retrigger(&ProjectId::new("a"), 1).unwrap();

    let executor = Arc::new(ScriptedJobExecutor::new());
    let second = releaser(plan, &executor);
    assert!(second.release().await.unwrap());
    assert!(executor.position("start:release r").is_none());
    assert!(executor.position("start:release c").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_save_failures_do_not_abort() {
    let executor = Arc::new(ScriptedJobExecutor::new());
    let publisher = Arc::new(RecordingPublisher::failing());
    let releaser = releaser(diamond(), &executor).with_publisher(publisher.clone());

    assert!(releaser.release().await.unwrap());
    assert!(publisher.saves() > 4);
}
