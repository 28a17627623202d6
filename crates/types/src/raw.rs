//! Raw descriptor parsing and validation
//!
//! Raw descriptors are the serde-facing form of the on-disk TOML. They are
//! turned into [`ComponentDescriptor`]s by [`RawDescriptor::validate`],
//! which is a pure check-and-convert: no file is touched other than probing
//! that each referenced patch file exists.

use crate::descriptor::{
    ComponentDescriptor, DepKind, Dependency, Lifecycle, PatchRef, SourcePin, StagePhase,
    StageStep, UpstreamSource,
};
use deskbuild_errors::DescriptorError;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw, unvalidated descriptor as declared on disk
#[derive(Debug, Clone, Deserialize)]
pub struct RawDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub source: Option<RawSource>,
    #[serde(default)]
    pub dependencies: RawDependencies,
    #[serde(default)]
    pub patches: Vec<RawPatch>,
    #[serde(default)]
    pub stages: Vec<RawStage>,
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSource {
    pub url: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDependencies {
    #[serde(default)]
    pub build: Vec<String>,
    #[serde(default)]
    pub runtime: Vec<String>,
    #[serde(default)]
    pub recommends: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPatch {
    pub id: String,
    pub file: PathBuf,
}

// deny_unknown_fields so a top-level key placed after a [[stages]] table
// (which TOML assigns to that stage) is rejected instead of silently lost
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStage {
    pub phase: StagePhase,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl RawDescriptor {
    /// Parse a descriptor from TOML text
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::ParseFailed` if the text is not valid TOML
    /// or does not match the descriptor schema.
    pub fn from_toml(text: &str) -> Result<Self, DescriptorError> {
        toml::from_str(text).map_err(|e| DescriptorError::ParseFailed {
            component: "<unknown>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate into the typed model
    ///
    /// `base_dir` is the directory the descriptor was loaded from; patch
    /// files are resolved against it to check they are discoverable.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError` when the component name or a dependency
    /// name is empty, a lifecycle stage is missing a command, a patch
    /// references a file that does not exist, or a version/requirement
    /// string does not parse.
    pub fn validate(self, base_dir: &Path) -> Result<ComponentDescriptor, DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyComponentName);
        }
        let name = self.name.trim().to_string();

        let version =
            Version::parse(&self.version).map_err(|e| DescriptorError::InvalidVersion {
                component: name.clone(),
                version: self.version.clone(),
                message: e.to_string(),
            })?;

        let mut dependencies = Vec::new();
        for (kind, declared) in [
            (DepKind::Build, &self.dependencies.build),
            (DepKind::Runtime, &self.dependencies.runtime),
            (DepKind::Recommend, &self.dependencies.recommends),
        ] {
            for spec in declared {
                dependencies.push(parse_dependency(&name, spec, kind)?);
            }
        }

        let mut patches = Vec::new();
        for patch in self.patches {
            let resolved = base_dir.join(&patch.file);
            if !resolved.is_file() {
                return Err(DescriptorError::UnknownPatch {
                    component: name.clone(),
                    patch: patch.id,
                });
            }
            patches.push(PatchRef {
                id: patch.id,
                file: resolved,
            });
        }

        let mut steps = Vec::new();
        for stage in self.stages {
            let command = match stage.command {
                Some(c) if !c.trim().is_empty() => c,
                _ => {
                    return Err(DescriptorError::MissingStageCommand {
                        component: name.clone(),
                        phase: stage.phase.to_string(),
                    })
                }
            };
            steps.push(StageStep {
                phase: stage.phase,
                command,
                workdir: stage.workdir,
            });
        }

        let source = self.source.map(|s| UpstreamSource {
            url: s.url,
            pin: match (s.tag, s.commit) {
                (Some(tag), _) => SourcePin::Tag(tag),
                (None, Some(commit)) => SourcePin::Commit(commit),
                (None, None) => SourcePin::Tag("HEAD".to_string()),
            },
        });

        Ok(ComponentDescriptor {
            name,
            version,
            source,
            dependencies,
            patches,
            lifecycle: Lifecycle { steps },
            outputs: self.outputs,
        })
    }
}

/// Parse a declared dependency string (e.g. `libx11` or `libxft >=2.0`)
fn parse_dependency(
    component: &str,
    spec: &str,
    kind: DepKind,
) -> Result<Dependency, DescriptorError> {
    // Find the first constraint operator, if any
    let split_pos = spec.find(|c: char| "<>=^~*".contains(c) || c.is_whitespace());

    let (name, requirement_str) = match split_pos {
        Some(pos) => (spec[..pos].trim(), spec[pos..].trim()),
        None => (spec.trim(), ""),
    };

    if name.is_empty() {
        return Err(DescriptorError::EmptyDependencyName {
            component: component.to_string(),
        });
    }

    let requirement = if requirement_str.is_empty() {
        VersionReq::STAR
    } else {
        VersionReq::parse(requirement_str).map_err(|e| DescriptorError::InvalidRequirement {
            component: component.to_string(),
            dependency: name.to_string(),
            requirement: requirement_str.to_string(),
            message: e.to_string(),
        })?
    };

    Ok(Dependency::new(name, requirement, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XTERM: &str = r#"
name = "xterm"
version = "398.0.0"
outputs = ["xterm"]

[source]
url = "https://invisible-island.net/xterm"
tag = "xterm-398"

[dependencies]
build = ["libx11 >=1.6", "libxft"]
runtime = ["libxft"]
recommends = ["fontconfig"]

[[stages]]
phase = "prepare"
command = "./configure --prefix=/usr"

[[stages]]
phase = "build"
command = "make"
"#;

    #[test]
    fn parses_and_validates_full_descriptor() {
        let raw = RawDescriptor::from_toml(XTERM).unwrap();
        let d = raw.validate(Path::new("/nonexistent")).unwrap();

        assert_eq!(d.name, "xterm");
        assert_eq!(d.version, Version::new(398, 0, 0));
        assert_eq!(d.build_deps().count(), 2);
        assert_eq!(d.runtime_deps().count(), 1);
        assert_eq!(d.recommends().count(), 1);
        assert_eq!(d.lifecycle.steps.len(), 2);
        assert_eq!(d.outputs, vec![PathBuf::from("xterm")]);

        let libx11 = d.build_deps().find(|dep| dep.name == "libx11").unwrap();
        assert!(libx11.requirement.matches(&Version::new(1, 7, 0)));
        assert!(!libx11.requirement.matches(&Version::new(1, 5, 0)));
    }

    #[test]
    fn top_level_key_after_a_stage_table_is_rejected() {
        // TOML scoping would hand this `outputs` to the last stage table;
        // the schema rejects it rather than dropping the declaration
        let text = r#"
name = "xterm"
version = "398.0.0"

[[stages]]
phase = "build"
command = "make"

outputs = ["xterm"]
"#;
        let err = RawDescriptor::from_toml(text).unwrap_err();
        assert!(matches!(err, DescriptorError::ParseFailed { .. }));
    }

    #[test]
    fn empty_dependency_name_is_malformed() {
        let raw = RawDescriptor {
            name: "xterm".to_string(),
            version: "1.0.0".to_string(),
            source: None,
            dependencies: RawDependencies {
                build: vec![">=1.0".to_string()],
                ..RawDependencies::default()
            },
            patches: vec![],
            stages: vec![],
            outputs: vec![],
        };

        let err = raw.validate(Path::new("/nonexistent")).unwrap_err();
        assert!(matches!(err, DescriptorError::EmptyDependencyName { .. }));
    }

    #[test]
    fn stage_without_command_is_malformed() {
        let raw = RawDescriptor {
            name: "xterm".to_string(),
            version: "1.0.0".to_string(),
            source: None,
            dependencies: RawDependencies::default(),
            patches: vec![],
            stages: vec![RawStage {
                phase: StagePhase::Build,
                command: None,
                workdir: None,
            }],
            outputs: vec![],
        };

        let err = raw.validate(Path::new("/nonexistent")).unwrap_err();
        assert!(matches!(err, DescriptorError::MissingStageCommand { .. }));
    }

    #[test]
    fn missing_patch_file_is_malformed() {
        let raw = RawDescriptor {
            name: "xterm".to_string(),
            version: "1.0.0".to_string(),
            source: None,
            dependencies: RawDependencies::default(),
            patches: vec![RawPatch {
                id: "no-such-patch".to_string(),
                file: PathBuf::from("patches/no-such.patch"),
            }],
            stages: vec![],
            outputs: vec![],
        };

        let err = raw.validate(Path::new("/nonexistent")).unwrap_err();
        match err {
            DescriptorError::UnknownPatch { patch, .. } => assert_eq!(patch, "no-such-patch"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_component_name_is_malformed() {
        let raw = RawDescriptor {
            name: "  ".to_string(),
            version: "1.0.0".to_string(),
            source: None,
            dependencies: RawDependencies::default(),
            patches: vec![],
            stages: vec![],
            outputs: vec![],
        };

        let err = raw.validate(Path::new("/nonexistent")).unwrap_err();
        assert!(matches!(err, DescriptorError::EmptyComponentName));
    }
}
