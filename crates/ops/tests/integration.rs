//! End-to-end orchestration scenarios

use deskbuild_builder::{
    AbortToken, BuildConfig, CommandOutput, CommandRunner, CommandSpec, ComponentBuilder,
};
use deskbuild_errors::Error;
use deskbuild_ops::Orchestrator;
use deskbuild_store::{Fetcher, InMemoryIndex, RunIndex, VendorStore};
use deskbuild_types::{
    ComponentDescriptor, ComponentStatus, DepKind, Dependency, Lifecycle, StagePhase, StageStep,
    Version,
};
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Fetcher that serves a fixed payload, optionally failing for one name
struct TestFetcher {
    payload: Vec<u8>,
    fail_for: Option<String>,
    calls: AtomicUsize,
}

impl TestFetcher {
    fn new(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            fail_for: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_for(payload: &[u8], name: &str) -> Self {
        Self {
            payload: payload.to_vec(),
            fail_for: Some(name.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Fetcher for TestFetcher {
    fn fetch<'a>(
        &'a self,
        name: &'a str,
        _version: &'a Version,
    ) -> BoxFuture<'a, Result<Vec<u8>, Error>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_for.as_deref() == Some(name) {
                Err(Error::internal(format!("network unreachable for {name}")))
            } else {
                Ok(self.payload.clone())
            }
        })
    }
}

/// Runner that records command order and succeeds unless told otherwise
struct RecordingRunner {
    ran: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingRunner {
    fn new() -> Self {
        Self {
            ran: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    fn failing_on(token: &str) -> Self {
        Self {
            ran: Mutex::new(Vec::new()),
            fail_on: Some(token.to_string()),
        }
    }

    fn commands(&self) -> Vec<String> {
        self.ran.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<CommandOutput, Error>> {
        Box::pin(async move {
            self.ran.lock().unwrap().push(spec.command.clone());
            let fails = self
                .fail_on
                .as_ref()
                .is_some_and(|token| spec.command.contains(token.as_str()));
            Ok(CommandOutput {
                exit_code: i32::from(fails),
            })
        })
    }
}

fn component(name: &str, build_deps: &[&str]) -> ComponentDescriptor {
    ComponentDescriptor {
        name: name.to_string(),
        version: Version::new(1, 0, 0),
        source: None,
        dependencies: build_deps
            .iter()
            .map(|d| Dependency::any(*d, DepKind::Build))
            .collect(),
        patches: vec![],
        lifecycle: Lifecycle {
            steps: vec![StageStep {
                phase: StagePhase::Build,
                command: format!("build {name}"),
                workdir: None,
            }],
        },
        outputs: vec![],
    }
}

fn meta(name: &str, members: &[&str]) -> ComponentDescriptor {
    ComponentDescriptor {
        name: name.to_string(),
        version: Version::new(1, 0, 0),
        source: None,
        dependencies: members
            .iter()
            .map(|m| Dependency::any(*m, DepKind::Runtime))
            .collect(),
        patches: vec![],
        lifecycle: Lifecycle::default(),
        outputs: vec![],
    }
}

/// The diamond scenario descriptor set: A, B and C build-depending on A,
/// and a meta M over {B, C}. B and C also build-depend on the indexed
/// library so the fetching stage has something to vendor.
fn diamond() -> Vec<ComponentDescriptor> {
    let mut b = component("b", &["a"]);
    b.dependencies.push(Dependency::any("libshared", DepKind::Build));
    let mut c = component("c", &["a"]);
    c.dependencies.push(Dependency::any("libshared", DepKind::Build));
    vec![component("a", &[]), b, c, meta("m", &["b", "c"])]
}

struct Harness {
    orchestrator: Orchestrator,
    fetcher: Arc<TestFetcher>,
    runner: Arc<RecordingRunner>,
}

fn harness(temp: &Path, fetcher: TestFetcher, runner: RecordingRunner) -> Harness {
    let payload_hash = blake3::hash(&fetcher.payload).to_hex().to_string();
    let mut mirror = InMemoryIndex::new();
    mirror.publish("libshared", Version::new(1, 0, 0), payload_hash);
    let index = Arc::new(RunIndex::new(Arc::new(mirror)));

    let fetcher = Arc::new(fetcher);
    let runner = Arc::new(runner);
    let store = Arc::new(VendorStore::new(temp.join("vendor"), fetcher.clone()));
    let builder = ComponentBuilder::new(
        BuildConfig::new(temp.join("build"), temp.join("artifacts")),
        store,
        index,
        runner.clone(),
    );

    Harness {
        orchestrator: Orchestrator::new(builder).with_jobs(2),
        fetcher,
        runner,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn diamond_builds_and_assembles_meta() {
    let temp = tempfile::tempdir().unwrap();
    let h = harness(temp.path(), TestFetcher::new(b"lib"), RecordingRunner::new());

    let outcome = h.orchestrator.run_all(diamond()).await.unwrap();

    for name in ["a", "b", "c", "m"] {
        assert_eq!(
            outcome.report.status(name),
            Some(&ComponentStatus::Succeeded),
            "{name} should succeed"
        );
    }

    // a builds strictly before b and c
    let commands = h.runner.commands();
    let pos = |needle: &str| commands.iter().position(|c| c.contains(needle)).unwrap();
    assert!(pos("build a") < pos("build b"));
    assert!(pos("build a") < pos("build c"));

    // The meta records its direct members only
    assert_eq!(outcome.meta_packages.len(), 1);
    let m = &outcome.meta_packages[0];
    let expected: std::collections::BTreeSet<String> =
        ["b", "c"].iter().map(|s| s.to_string()).collect();
    assert_eq!(m.runtime_dependencies, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn in_run_build_dependency_locks_against_the_fresh_artifact() {
    let temp = tempfile::tempdir().unwrap();
    let h = harness(temp.path(), TestFetcher::new(b"lib"), RecordingRunner::new());

    // b build-depends on a, which exists only as a descriptor in this run;
    // the mirror index has no entry for it
    let descriptors = vec![component("a", &[]), component("b", &["a"])];
    let outcome = h.orchestrator.run_all(descriptors).await.unwrap();

    assert!(outcome.report.all_succeeded());
    // b vendored a's packaged artifact straight from the cache
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_dependency_is_fetched_once() {
    let temp = tempfile::tempdir().unwrap();
    let h = harness(temp.path(), TestFetcher::new(b"lib"), RecordingRunner::new());

    h.orchestrator.run_all(diamond()).await.unwrap();

    // b and c both vendor libshared-1.0.0 concurrently; the store
    // deduplicates to one fetch
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_dependency_cascades_as_skipped() {
    let temp = tempfile::tempdir().unwrap();
    let h = harness(
        temp.path(),
        TestFetcher::new(b"lib"),
        RecordingRunner::failing_on("build a"),
    );

    let outcome = h.orchestrator.run_all(diamond()).await.unwrap();

    assert!(matches!(
        outcome.report.status("a"),
        Some(ComponentStatus::Failed { .. })
    ));
    for name in ["b", "c"] {
        assert_eq!(
            outcome.report.status(name),
            Some(&ComponentStatus::Skipped {
                caused_by: "a".to_string()
            }),
            "{name} should be skipped by a's failure"
        );
    }
    // The meta is skipped because a member did not succeed
    assert!(matches!(
        outcome.report.status("m"),
        Some(ComponentStatus::Skipped { .. })
    ));
    assert!(outcome.meta_packages.is_empty());

    // b and c were never attempted
    let commands = h.runner.commands();
    assert!(!commands.iter().any(|c| c.contains("build b")));
    assert!(!commands.iter().any(|c| c.contains("build c")));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_failure_fails_component_and_skips_dependents() {
    let temp = tempfile::tempdir().unwrap();

    // a build-depends on the unfetchable library; b and c depend on a
    let mut a = component("a", &[]);
    a.dependencies.push(Dependency::any("libshared", DepKind::Build));
    let descriptors = vec![
        a,
        component("b", &["a"]),
        component("c", &["a"]),
        meta("m", &["b", "c"]),
    ];

    let h = harness(
        temp.path(),
        TestFetcher::failing_for(b"lib", "libshared"),
        RecordingRunner::new(),
    );
    let outcome = h.orchestrator.run_all(descriptors).await.unwrap();

    match outcome.report.status("a") {
        Some(ComponentStatus::Failed { reason }) => {
            assert!(reason.contains("fetch failed"), "reason: {reason}");
        }
        other => panic!("unexpected status for a: {other:?}"),
    }
    for name in ["b", "c", "m"] {
        assert!(
            matches!(
                outcome.report.status(name),
                Some(ComponentStatus::Skipped { .. })
            ),
            "{name} should be skipped"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn independent_branches_survive_a_failure() {
    let temp = tempfile::tempdir().unwrap();
    let descriptors = vec![
        component("a", &[]),
        component("b", &["a"]),
        component("standalone", &[]),
    ];

    let h = harness(
        temp.path(),
        TestFetcher::new(b"lib"),
        RecordingRunner::failing_on("build a"),
    );
    let outcome = h.orchestrator.run_all(descriptors).await.unwrap();

    assert!(matches!(
        outcome.report.status("a"),
        Some(ComponentStatus::Failed { .. })
    ));
    assert!(matches!(
        outcome.report.status("b"),
        Some(ComponentStatus::Skipped { .. })
    ));
    assert_eq!(
        outcome.report.status("standalone"),
        Some(&ComponentStatus::Succeeded)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn cyclic_build_deps_abort_before_any_build() {
    let temp = tempfile::tempdir().unwrap();
    let descriptors = vec![component("a", &["b"]), component("b", &["a"])];

    let h = harness(temp.path(), TestFetcher::new(b"lib"), RecordingRunner::new());
    let err = h.orchestrator.run_all(descriptors).await.unwrap_err();

    assert!(matches!(err, Error::Resolve(_)));
    assert!(h.runner.commands().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn abort_before_run_skips_everything() {
    let temp = tempfile::tempdir().unwrap();
    let h = harness(temp.path(), TestFetcher::new(b"lib"), RecordingRunner::new());

    h.orchestrator.abort_token().abort();
    let outcome = h.orchestrator.run_all(diamond()).await.unwrap();

    // The report is still total: every component has a terminal status and
    // nothing ran
    assert_eq!(outcome.report.len(), 4);
    assert!(outcome
        .report
        .iter()
        .all(|(_, status)| matches!(status, ComponentStatus::Skipped { .. })));
    assert!(h.runner.commands().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn external_requirements_are_surfaced() {
    let temp = tempfile::tempdir().unwrap();
    let mut a = component("a", &[]);
    a.dependencies.push(Dependency::any("ncurses", DepKind::Runtime));

    let h = harness(temp.path(), TestFetcher::new(b"lib"), RecordingRunner::new());
    let outcome = h.orchestrator.run_all(vec![a]).await.unwrap();

    assert!(outcome.external_requirements.contains("ncurses"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unused_abort_token_changes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let h = harness(temp.path(), TestFetcher::new(b"lib"), RecordingRunner::new());

    let _token: AbortToken = h.orchestrator.abort_token();
    let outcome = h.orchestrator.run_all(diamond()).await.unwrap();
    assert!(outcome.report.all_succeeded());
}
