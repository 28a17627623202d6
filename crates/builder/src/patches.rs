//! Ordered, idempotent patch application
//!
//! Patches run before the build stage, each against the pristine or
//! previously-patched tree. Applied patch ids are recorded in a marker file
//! inside the work tree, so re-running the prepare stage never
//! double-applies. An unclean apply is fatal for the component: it means
//! the patch no longer matches upstream and needs human attention.

use crate::runner::{CommandRunner, CommandSpec};
use deskbuild_errors::{BuildError, Error};
use deskbuild_events::{AppEvent, EventEmitter, EventSender, PatchEvent};
use deskbuild_types::PatchRef;
use std::collections::BTreeSet;
use std::path::Path;

const MARKER_FILE: &str = ".deskbuild-applied-patches";

/// Apply a descriptor's patch list to its work tree, in declared order
///
/// # Errors
///
/// Returns `BuildError::PatchConflict` if a patch does not apply cleanly.
/// Conflicts are never retried.
pub async fn apply_patches(
    component: &str,
    workdir: &Path,
    patches: &[PatchRef],
    runner: &dyn CommandRunner,
    events: &Option<EventSender>,
) -> Result<(), Error> {
    if patches.is_empty() {
        return Ok(());
    }

    let marker = workdir.join(MARKER_FILE);
    let mut applied = read_marker(&marker).await?;

    for patch in patches {
        if applied.contains(&patch.id) {
            events.emit(AppEvent::Patch(PatchEvent::AlreadyApplied {
                component: component.to_string(),
                patch: patch.id.clone(),
            }));
            continue;
        }

        let spec = CommandSpec {
            command: format!("patch -p1 --forward -i '{}'", patch.file.display()),
            workdir: workdir.to_path_buf(),
            env: vec![],
        };
        let output = runner.run(&spec).await?;
        if !output.success() {
            return Err(BuildError::PatchConflict {
                patch: patch.id.clone(),
            }
            .into());
        }

        applied.insert(patch.id.clone());
        write_marker(&marker, &applied).await?;

        events.emit(AppEvent::Patch(PatchEvent::Applied {
            component: component.to_string(),
            patch: patch.id.clone(),
        }));
    }

    Ok(())
}

async fn read_marker(marker: &Path) -> Result<BTreeSet<String>, Error> {
    match tokio::fs::read_to_string(marker).await {
        Ok(text) => Ok(text.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(Error::io_with_path(&e, marker)),
    }
}

async fn write_marker(marker: &Path, applied: &BTreeSet<String>) -> Result<(), Error> {
    let mut text = applied.iter().cloned().collect::<Vec<_>>().join("\n");
    text.push('\n');
    tokio::fs::write(marker, text)
        .await
        .map_err(|e| Error::io_with_path(&e, marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use futures::future::BoxFuture;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records commands; fails any command containing a marked token
    struct FakeRunner {
        ran: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl FakeRunner {
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

    impl CommandRunner for FakeRunner {
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

    fn patch(id: &str) -> PatchRef {
        PatchRef {
            id: id.to_string(),
            file: PathBuf::from(format!("/patches/{id}.patch")),
        }
    }

    #[tokio::test]
    async fn applies_in_declared_order() {
        let temp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();

        apply_patches(
            "xterm",
            temp.path(),
            &[patch("02-fonts"), patch("01-build")],
            &runner,
            &None,
        )
        .await
        .unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("02-fonts"));
        assert!(commands[1].contains("01-build"));
    }

    #[tokio::test]
    async fn rerun_is_a_no_op() {
        let temp = tempfile::tempdir().unwrap();
        let patches = [patch("01-build")];

        let runner = FakeRunner::new();
        apply_patches("xterm", temp.path(), &patches, &runner, &None)
            .await
            .unwrap();
        assert_eq!(runner.commands().len(), 1);

        // Retried prepare stage: marker file short-circuits the patch
        let runner = FakeRunner::new();
        apply_patches("xterm", temp.path(), &patches, &runner, &None)
            .await
            .unwrap();
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn conflict_is_fatal_and_preserves_earlier_marks() {
        let temp = tempfile::tempdir().unwrap();
        let patches = [patch("01-build"), patch("02-broken"), patch("03-late")];

        let runner = FakeRunner::failing_on("02-broken");
        let err = apply_patches("xterm", temp.path(), &patches, &runner, &None)
            .await
            .unwrap_err();

        match err {
            Error::Build(BuildError::PatchConflict { patch }) => {
                assert_eq!(patch, "02-broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The third patch never ran
        assert_eq!(runner.commands().len(), 2);

        // A retry skips the first patch and re-attempts only the conflict
        let runner = FakeRunner::new();
        apply_patches("xterm", temp.path(), &patches, &runner, &None)
            .await
            .unwrap();
        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("02-broken"));
        assert!(commands[1].contains("03-late"));
    }
}
