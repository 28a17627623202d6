//! Final report rendering

use deskbuild_ops::BuildOutcome;
use deskbuild_types::ComponentStatus;
use serde_json::json;

/// Render the outcome of a build run
pub fn render_outcome(outcome: &BuildOutcome, json_mode: bool) {
    if json_mode {
        render_json(outcome);
    } else {
        render_text(outcome);
    }
}

fn render_text(outcome: &BuildOutcome) {
    println!("Build report:");
    for (name, status) in outcome.report.iter() {
        let mark = match status {
            ComponentStatus::Succeeded => "ok  ",
            ComponentStatus::Failed { .. } => "FAIL",
            ComponentStatus::Skipped { .. } => "skip",
        };
        println!("  {mark}  {name}  {status}");
    }

    for meta in &outcome.meta_packages {
        let members: Vec<_> = meta.runtime_dependencies.iter().cloned().collect();
        println!("Meta-package {}: {}", meta.name, members.join(", "));
    }

    if !outcome.external_requirements.is_empty() {
        let names: Vec<_> = outcome.external_requirements.iter().cloned().collect();
        println!("External requirements (verify on the host): {}", names.join(", "));
    }

    if !outcome.artifacts.is_empty() {
        println!("Artifacts:");
        for artifact in &outcome.artifacts {
            println!("  {}  {}", artifact.name, artifact.path.display());
        }
    }
}

fn render_json(outcome: &BuildOutcome) {
    let value = json!({
        "report": outcome.report,
        "meta_packages": outcome.meta_packages,
        "external_requirements": outcome.external_requirements,
        "artifacts": outcome
            .artifacts
            .iter()
            .map(|a| json!({ "name": a.name, "path": a.path, "metadata": a.metadata }))
            .collect::<Vec<_>>(),
    });
    // Pretty-printing a just-built value cannot fail
    if let Ok(text) = serde_json::to_string_pretty(&value) {
        println!("{text}");
    }
}
