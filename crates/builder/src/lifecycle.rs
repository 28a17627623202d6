//! Per-component lifecycle executor

use crate::abort::AbortToken;
use crate::config::BuildConfig;
use crate::patches::apply_patches;
use crate::runner::{CommandRunner, CommandSpec};
use crate::state::{LifecycleState, StageOutcome};
use deskbuild_errors::{BuildError, Error};
use deskbuild_events::{AppEvent, BuildEvent, EventEmitter, EventSender};
use deskbuild_store::{lock_dependencies, RunIndex, VendorDir, VendorStore};
use deskbuild_types::{ComponentDescriptor, StagePhase, VendorLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Metadata written next to every packaged artifact
///
/// This is what the external package manager consumes: the opaque payload
/// plus the component's declared runtime and recommend sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub version: String,
    pub runtime_dependencies: BTreeSet<String>,
    pub recommends: BTreeSet<String>,
}

/// A successfully packaged component
#[derive(Debug, Clone)]
pub struct BuiltArtifact {
    pub name: String,
    /// Artifact directory containing the outputs and `artifact.json`
    pub path: PathBuf,
    pub metadata: ArtifactMetadata,
}

/// Drives one component through its staged lifecycle
pub struct ComponentBuilder {
    config: BuildConfig,
    store: Arc<VendorStore>,
    index: Arc<RunIndex>,
    runner: Arc<dyn CommandRunner>,
    events: Option<EventSender>,
}

impl EventEmitter for ComponentBuilder {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl ComponentBuilder {
    /// Create a builder over an injected store, index, and runner
    pub fn new(
        config: BuildConfig,
        store: Arc<VendorStore>,
        index: Arc<RunIndex>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            store,
            index,
            runner,
            events: None,
        }
    }

    /// Attach an event sender
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Run the full lifecycle for one component
    ///
    /// Stages run strictly in order and any failure short-circuits the
    /// rest. The abort token is checked at stage boundaries only: a running
    /// stage always finishes, so vendor locks and artifacts are never left
    /// half-written.
    ///
    /// # Errors
    ///
    /// Returns the failing stage's error (`UnresolvableDependency`,
    /// `FetchFailed`, `PatchConflict`, `PrepareFailed`, `BuildFailed`,
    /// `MissingArtifact`) or `Error::Cancelled` when aborted between
    /// stages.
    pub async fn build(
        &self,
        descriptor: &ComponentDescriptor,
        abort: &AbortToken,
    ) -> Result<BuiltArtifact, Error> {
        self.emit(AppEvent::Build(BuildEvent::Started {
            component: descriptor.name.clone(),
        }));

        let workdir = self.config.build_root.join(descriptor.ident());
        tokio::fs::create_dir_all(&workdir)
            .await
            .map_err(|e| Error::io_with_path(&e, &workdir))?;

        let mut state = LifecycleState::Pending.advance(StageOutcome::Ok);
        debug_assert_eq!(state, LifecycleState::Locking);

        let lock = self.run_stage(descriptor, state, abort, self.lock(descriptor)).await?;
        state = state.advance(StageOutcome::Ok);

        let vendored = self
            .run_stage(descriptor, state, abort, self.fetch(descriptor, &lock))
            .await?;
        state = state.advance(StageOutcome::Ok);

        self.run_stage(descriptor, state, abort, self.prepare(descriptor, &workdir, &vendored))
            .await?;
        state = state.advance(StageOutcome::Ok);

        self.run_stage(descriptor, state, abort, self.compile(descriptor, &workdir, &vendored))
            .await?;
        state = state.advance(StageOutcome::Ok);

        let artifact = self
            .run_stage(descriptor, state, abort, self.package(descriptor, &workdir, &vendored))
            .await?;
        state = state.advance(StageOutcome::Ok);
        debug_assert!(state.is_terminal());

        self.emit(AppEvent::Build(BuildEvent::Succeeded {
            component: descriptor.name.clone(),
        }));
        Ok(artifact)
    }

    /// Gate one stage on the abort token and wrap its events
    async fn run_stage<T>(
        &self,
        descriptor: &ComponentDescriptor,
        state: LifecycleState,
        abort: &AbortToken,
        stage: impl std::future::Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        if abort.is_aborted() {
            return Err(Error::Cancelled);
        }

        self.emit(AppEvent::Build(BuildEvent::StageStarted {
            component: descriptor.name.clone(),
            stage: state.to_string(),
        }));

        let value = stage.await?;

        self.emit(AppEvent::Build(BuildEvent::StageCompleted {
            component: descriptor.name.clone(),
            stage: state.to_string(),
        }));
        Ok(value)
    }

    /// Locking: pin every build-time dependency to a version/hash
    async fn lock(&self, descriptor: &ComponentDescriptor) -> Result<VendorLock, Error> {
        let lock = lock_dependencies(descriptor, &*self.index)?;
        for (name, pinned) in &lock.entries {
            self.emit(AppEvent::Build(BuildEvent::DependencyLocked {
                component: descriptor.name.clone(),
                name: name.clone(),
                version: pinned.version.to_string(),
            }));
        }
        Ok(lock)
    }

    /// Fetching: materialize the lock into the offline cache
    async fn fetch(
        &self,
        descriptor: &ComponentDescriptor,
        lock: &VendorLock,
    ) -> Result<VendorDir, Error> {
        let vendored = self.store.materialize(lock).await?;
        for (name, pinned) in &lock.entries {
            self.emit(AppEvent::Build(BuildEvent::DependencyVendored {
                component: descriptor.name.clone(),
                name: name.clone(),
                version: pinned.version.to_string(),
            }));
        }
        Ok(vendored)
    }

    /// Preparing: patches first, then declared prepare commands
    async fn prepare(
        &self,
        descriptor: &ComponentDescriptor,
        workdir: &Path,
        vendored: &VendorDir,
    ) -> Result<(), Error> {
        apply_patches(
            &descriptor.name,
            workdir,
            &descriptor.patches,
            &*self.runner,
            &self.events,
        )
        .await?;

        for step in descriptor.lifecycle.phase_steps(StagePhase::Prepare) {
            let output = self
                .runner
                .run(&self.command_spec(step.command.clone(), workdir, step.workdir.as_deref(), vendored))
                .await?;
            if !output.success() {
                return Err(BuildError::PrepareFailed {
                    message: format!("`{}` exited {}", step.command, output.exit_code),
                }
                .into());
            }
            self.emit(AppEvent::Build(BuildEvent::CommandCompleted {
                component: descriptor.name.clone(),
                phase: StagePhase::Prepare,
                command: step.command.clone(),
            }));
        }
        Ok(())
    }

    /// Building: declared build commands against the vendored set only
    async fn compile(
        &self,
        descriptor: &ComponentDescriptor,
        workdir: &Path,
        vendored: &VendorDir,
    ) -> Result<(), Error> {
        let mut ran_any = false;
        for step in descriptor.lifecycle.phase_steps(StagePhase::Build) {
            ran_any = true;
            let output = self
                .runner
                .run(&self.command_spec(step.command.clone(), workdir, step.workdir.as_deref(), vendored))
                .await?;
            if !output.success() {
                return Err(BuildError::BuildFailed {
                    exit_code: output.exit_code,
                }
                .into());
            }
            self.emit(AppEvent::Build(BuildEvent::CommandCompleted {
                component: descriptor.name.clone(),
                phase: StagePhase::Build,
                command: step.command.clone(),
            }));
        }

        if ran_any {
            Ok(())
        } else {
            Err(BuildError::MissingBuildCommand {
                name: descriptor.name.clone(),
            }
            .into())
        }
    }

    /// Packaging: declared package commands, then collect declared outputs
    async fn package(
        &self,
        descriptor: &ComponentDescriptor,
        workdir: &Path,
        vendored: &VendorDir,
    ) -> Result<BuiltArtifact, Error> {
        for step in descriptor.lifecycle.phase_steps(StagePhase::Package) {
            let output = self
                .runner
                .run(&self.command_spec(step.command.clone(), workdir, step.workdir.as_deref(), vendored))
                .await?;
            if !output.success() {
                return Err(BuildError::CommandFailed {
                    command: step.command.clone(),
                    exit_code: output.exit_code,
                }
                .into());
            }
        }

        let artifact_dir = self.config.artifact_root.join(descriptor.ident());
        tokio::fs::create_dir_all(&artifact_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &artifact_dir))?;

        for output in &descriptor.outputs {
            let source = workdir.join(output);
            if !source.exists() {
                return Err(BuildError::MissingArtifact {
                    path: output.display().to_string(),
                }
                .into());
            }
            let file_name = output
                .file_name()
                .ok_or_else(|| Error::internal("declared output has no file name"))?;
            let target = artifact_dir.join(file_name);
            tokio::fs::copy(&source, &target)
                .await
                .map_err(|e| Error::io_with_path(&e, &source))?;
        }

        let metadata = ArtifactMetadata {
            name: descriptor.name.clone(),
            version: descriptor.version.to_string(),
            runtime_dependencies: descriptor.runtime_deps().map(|d| d.name.clone()).collect(),
            recommends: descriptor.recommends().map(|d| d.name.clone()).collect(),
        };
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| Error::internal(format!("artifact metadata serialization: {e}")))?;
        let metadata_path = artifact_dir.join("artifact.json");
        tokio::fs::write(&metadata_path, &json)
            .await
            .map_err(|e| Error::io_with_path(&e, &metadata_path))?;

        // Register the packaged component so dependents scheduled after
        // this one can lock and fetch it like any other candidate.
        let entry = self
            .store
            .publish_local(&descriptor.name, &descriptor.version, &json)
            .await?;
        self.index
            .publish(descriptor.name.clone(), descriptor.version.clone(), entry.hash);

        Ok(BuiltArtifact {
            name: descriptor.name.clone(),
            path: artifact_dir,
            metadata,
        })
    }

    fn command_spec(
        &self,
        command: String,
        workdir: &Path,
        step_workdir: Option<&Path>,
        vendored: &VendorDir,
    ) -> CommandSpec {
        let workdir = match step_workdir {
            Some(rel) => workdir.join(rel),
            None => workdir.to_path_buf(),
        };

        let mut env = self.config.env.clone();
        env.push((
            "DESKBUILD_VENDOR_DIR".to_string(),
            vendored.root.display().to_string(),
        ));

        CommandSpec {
            command,
            workdir,
            env,
        }
    }
}
