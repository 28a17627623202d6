#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Orchestration driver for deskbuild
//!
//! Resolves the descriptor set once, then drives the lifecycle executor
//! over the build DAG with a bounded worker pool. Independent components
//! run concurrently; a component starts only after every build-time
//! dependency has succeeded, which also gives the dependent a fully
//! materialized view of its dependencies' packaged outputs (the scheduler
//! joins the dependency's task before marking anything ready).
//!
//! Failure containment: a failed component skips its transitive build
//! dependents and nothing else. Descriptor and resolution errors abort the
//! whole run before any build starts. Nothing is retried automatically.

use deskbuild_builder::{AbortToken, BuiltArtifact, ComponentBuilder};
use deskbuild_errors::Error;
use deskbuild_events::{AppEvent, BuildEvent, EventEmitter, EventSender, GeneralEvent, ResolverEvent};
use deskbuild_resolver::{DependencyGraph, ExecutionPlan};
use deskbuild_types::{BuildReport, ComponentDescriptor, ComponentStatus, MetaPackage};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Cause string recorded for components skipped by an orchestration abort
const ABORTED: &str = "aborted";

/// Result of one orchestration run
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// One terminal status per component, keyed by name
    pub report: BuildReport,
    /// Assembled meta-packages, in resolution order
    pub meta_packages: Vec<MetaPackage>,
    /// Packaged artifacts for succeeded components
    pub artifacts: Vec<BuiltArtifact>,
    /// Names to verify on the build host before trusting the run
    pub external_requirements: BTreeSet<String>,
}

/// Top-level orchestration driver
pub struct Orchestrator {
    builder: Arc<ComponentBuilder>,
    jobs: usize,
    abort: AbortToken,
    events: Option<EventSender>,
}

impl EventEmitter for Orchestrator {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl Orchestrator {
    /// Create a driver over a lifecycle builder
    pub fn new(builder: ComponentBuilder) -> Self {
        Self {
            builder: Arc::new(builder),
            jobs: 4,
            abort: AbortToken::new(),
            events: None,
        }
    }

    /// Set the worker pool width
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Attach an event sender
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Token that stops scheduling when signalled; running components
    /// finish their current stage and then stop
    pub fn abort_token(&self) -> AbortToken {
        self.abort.clone()
    }

    /// Resolve and build the whole descriptor set
    ///
    /// # Errors
    ///
    /// Returns an error only for input-set problems (malformed descriptors,
    /// duplicate names, build-dependency cycles). Per-component failures
    /// are reported in the returned [`BuildReport`], never as an `Err`.
    pub async fn run_all(
        &self,
        descriptors: Vec<ComponentDescriptor>,
    ) -> Result<BuildOutcome, Error> {
        let graph = DependencyGraph::from_descriptors(descriptors)?;
        let resolution = graph.resolve_order()?;

        self.emit(AppEvent::Resolver(ResolverEvent::OrderResolved {
            order: resolution.order.clone(),
        }));
        for name in &resolution.external_requirements {
            self.emit(AppEvent::Resolver(ResolverEvent::ExternalRequirement {
                name: name.clone(),
            }));
        }
        for cycle in &resolution.runtime_cycles {
            self.emit(AppEvent::Resolver(ResolverEvent::RuntimeCycleDetected {
                names: cycle.clone(),
            }));
        }

        let buildable: Vec<&str> = resolution
            .order
            .iter()
            .map(String::as_str)
            .filter(|name| graph.get(name).is_some_and(|d| !d.is_meta()))
            .collect();
        let mut plan = ExecutionPlan::new(&graph, buildable);

        let mut report = BuildReport::new();
        let mut artifacts = Vec::new();
        self.drive_pool(&graph, &mut plan, &mut report, &mut artifacts)
            .await;

        // Anything still pending was never started (abort, or a dependency
        // chain that stopped); the report must stay total.
        if self.abort.is_aborted() {
            self.emit(AppEvent::General(GeneralEvent::Aborted));
        }
        for name in plan.remaining() {
            report.record(&name, ComponentStatus::Skipped {
                caused_by: ABORTED.to_string(),
            });
        }

        let meta_packages = self.assemble_metas(&graph, &resolution.order, &mut report);

        Ok(BuildOutcome {
            report,
            meta_packages,
            artifacts,
            external_requirements: resolution.external_requirements,
        })
    }

    /// Ready-queue worker loop over the execution plan
    async fn drive_pool(
        &self,
        graph: &DependencyGraph,
        plan: &mut ExecutionPlan,
        report: &mut BuildReport,
        artifacts: &mut Vec<BuiltArtifact>,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut join_set: JoinSet<(String, Result<BuiltArtifact, Error>)> = JoinSet::new();
        let mut ready: VecDeque<String> = plan.ready().into();

        loop {
            // Schedule everything ready, unless aborted
            while let Some(name) = ready.pop_front() {
                if self.abort.is_aborted() {
                    continue; // final sweep records the skip
                }
                let Some(descriptor) = graph.get(&name).cloned() else {
                    continue;
                };
                let builder = self.builder.clone();
                let abort = self.abort.clone();
                let semaphore = semaphore.clone();
                join_set.spawn(async move {
                    let permit = semaphore.acquire_owned().await;
                    let result = match permit {
                        Ok(_permit) => builder.build(&descriptor, &abort).await,
                        Err(_) => Err(Error::Cancelled),
                    };
                    (descriptor.name.clone(), result)
                });
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };
            let (name, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    // A panicked build task fails the run like any build error
                    self.emit(AppEvent::Build(BuildEvent::Failed {
                        component: "<unknown>".to_string(),
                        reason: e.to_string(),
                    }));
                    continue;
                }
            };

            match result {
                Ok(artifact) => {
                    report.record(&name, ComponentStatus::Succeeded);
                    artifacts.push(artifact);
                    ready.extend(plan.complete(&name));
                }
                Err(Error::Cancelled) => {
                    report.record(&name, ComponentStatus::Skipped {
                        caused_by: ABORTED.to_string(),
                    });
                    for skipped in plan.fail(&name) {
                        report.record(&skipped, ComponentStatus::Skipped {
                            caused_by: ABORTED.to_string(),
                        });
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    report.record(&name, ComponentStatus::Failed {
                        reason: reason.clone(),
                    });
                    self.emit(AppEvent::Build(BuildEvent::Failed {
                        component: name.clone(),
                        reason,
                    }));
                    for skipped in plan.fail(&name) {
                        report.record(&skipped, ComponentStatus::Skipped {
                            caused_by: name.clone(),
                        });
                        self.emit(AppEvent::Build(BuildEvent::Skipped {
                            component: skipped,
                            caused_by: name.clone(),
                        }));
                    }
                }
            }
        }
    }

    /// Assemble meta-packages once their members have terminal statuses
    fn assemble_metas(
        &self,
        graph: &DependencyGraph,
        order: &[String],
        report: &mut BuildReport,
    ) -> Vec<MetaPackage> {
        let mut assembled = Vec::new();

        for name in order {
            let Some(descriptor) = graph.get(name) else {
                continue;
            };
            if !descriptor.is_meta() {
                continue;
            }

            let member_names: Vec<&str> = descriptor
                .runtime_deps()
                .map(|d| d.name.as_str())
                .filter(|n| graph.contains(n))
                .collect();

            let blocking = member_names.iter().find(|member| {
                !report
                    .status(member)
                    .is_some_and(ComponentStatus::is_succeeded)
            });

            if let Some(blocking) = blocking {
                report.record(name, ComponentStatus::Skipped {
                    caused_by: (*blocking).to_string(),
                });
                self.emit(AppEvent::Build(BuildEvent::Skipped {
                    component: name.clone(),
                    caused_by: (*blocking).to_string(),
                }));
                continue;
            }

            let members: Vec<&ComponentDescriptor> = member_names
                .iter()
                .filter_map(|m| graph.get(m))
                .collect();
            let meta = MetaPackage::assemble(name, descriptor.version.clone(), &members);

            self.emit(AppEvent::Build(BuildEvent::MetaAssembled {
                component: name.clone(),
                members: meta.runtime_dependencies.iter().cloned().collect(),
            }));
            report.record(name, ComponentStatus::Succeeded);
            assembled.push(meta);
        }

        assembled
    }
}
