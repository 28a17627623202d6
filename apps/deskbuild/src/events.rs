//! Event drain and structured logging
//!
//! Orchestration emits domain events over an unbounded channel; the drain
//! task converts each into a tracing record with structured fields so the
//! same stream feeds both the terminal and log collectors.

use deskbuild_events::{AppEvent, BuildEvent, EventReceiver, GeneralEvent, PatchEvent, ResolverEvent};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Spawn the drain task; it runs until every sender is dropped
pub fn spawn_drain(mut receiver: EventReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            log_event(&event);
        }
    })
}

/// Log one event at the appropriate level with structured fields
pub fn log_event(event: &AppEvent) {
    match event {
        AppEvent::Resolver(e) => log_resolver_event(e),
        AppEvent::Build(e) => log_build_event(e),
        AppEvent::Patch(e) => log_patch_event(e),
        AppEvent::General(e) => log_general_event(e),
    }
}

fn log_resolver_event(event: &ResolverEvent) {
    match event {
        ResolverEvent::OrderResolved { order } => {
            info!(components = order.len(), "Build order resolved");
        }
        ResolverEvent::ExternalRequirement { name } => {
            warn!(name = %name, "External requirement, must be satisfied by the build host");
        }
        ResolverEvent::RuntimeCycleDetected { names } => {
            warn!(cycle = ?names, "Runtime dependency cycle detected");
        }
    }
}

fn log_build_event(event: &BuildEvent) {
    match event {
        BuildEvent::Started { component } => {
            info!(component = %component, "Build started");
        }
        BuildEvent::StageStarted { component, stage } => {
            info!(component = %component, stage = %stage, "Stage started");
        }
        BuildEvent::StageCompleted { component, stage } => {
            info!(component = %component, stage = %stage, "Stage completed");
        }
        BuildEvent::CommandCompleted {
            component,
            phase,
            command,
        } => {
            info!(component = %component, phase = %phase, command = %command, "Command completed");
        }
        BuildEvent::DependencyLocked {
            component,
            name,
            version,
        } => {
            info!(component = %component, dependency = %name, version = %version, "Dependency locked");
        }
        BuildEvent::DependencyVendored {
            component,
            name,
            version,
        } => {
            info!(component = %component, dependency = %name, version = %version, "Dependency vendored");
        }
        BuildEvent::Succeeded { component } => {
            info!(component = %component, "Build succeeded");
        }
        BuildEvent::Failed { component, reason } => {
            error!(component = %component, reason = %reason, "Build failed");
        }
        BuildEvent::Skipped {
            component,
            caused_by,
        } => {
            warn!(component = %component, caused_by = %caused_by, "Build skipped");
        }
        BuildEvent::MetaAssembled { component, members } => {
            info!(component = %component, members = ?members, "Meta-package assembled");
        }
    }
}

fn log_patch_event(event: &PatchEvent) {
    match event {
        PatchEvent::Applied { component, patch } => {
            info!(component = %component, patch = %patch, "Patch applied");
        }
        PatchEvent::AlreadyApplied { component, patch } => {
            info!(component = %component, patch = %patch, "Patch already applied, skipping");
        }
    }
}

fn log_general_event(event: &GeneralEvent) {
    match event {
        GeneralEvent::Message { message } => {
            info!("{message}");
        }
        GeneralEvent::Aborted => {
            warn!("Orchestration aborted, waiting for running stages to finish");
        }
    }
}
