//! Loading workflow definitions from disk.
//!
//! A definition named `say` lives in `say.yaml`, `say.yml` or `say.json` under the
//! definitions root (first match wins). Step bodies may be inline text or
//! `{ file: path }` references, which are read verbatim relative to the file
//! that declares them.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use wfsync_types::{StepBody, WorkflowDefinition};

use crate::SyncError;

const DEFINITION_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Anything able to produce a workflow definition by configured name.
pub trait DefinitionSource: Send + Sync {
    fn load(&self, name: &str) -> Result<WorkflowDefinition, SyncError>;
}

/// Definitions stored as YAML or JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FsDefinitionSource {
    root: PathBuf,
}

impl FsDefinitionSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the definition file for `name`, if one exists.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        DEFINITION_EXTENSIONS
            .iter()
            .map(|extension| self.root.join(format!("{name}.{extension}")))
            .find(|candidate| candidate.is_file())
    }
}

impl DefinitionSource for FsDefinitionSource {
    fn load(&self, name: &str) -> Result<WorkflowDefinition, SyncError> {
        let path = self.locate(name).ok_or_else(|| {
            SyncError::definition(
                name,
                format!("no {name}.yaml, {name}.yml or {name}.json in {}", self.root.display()),
            )
        })?;
        let mut definition = parse_definition_file(&path)?;
        if definition.name.trim().is_empty() {
            definition.name = name.to_string();
        }
        Ok(definition)
    }
}

/// Parse one definition file and inline every file-referenced body.
///
/// YAML is a superset of JSON, so both formats go through the YAML parser.
pub fn parse_definition_file(path: impl AsRef<Path>) -> Result<WorkflowDefinition, SyncError> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let bytes = fs::read(path).map_err(|err| SyncError::definition(&label, format!("failed to read file: {err}")))?;
    let content = String::from_utf8_lossy(&bytes);

    let mut definition: WorkflowDefinition =
        serde_yaml::from_str(&content).map_err(|err| SyncError::definition(&label, format!("invalid definition: {err}")))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for step in definition.all_steps_mut() {
        resolve_body(&mut step.body, base, &label)?;
        if let Some(fallback) = step.fallback.as_mut() {
            resolve_body(fallback, base, &label)?;
        }
    }

    debug!(path = %label, workflow = %definition.display_name(), "loaded workflow definition");
    Ok(definition)
}

fn resolve_body(body: &mut StepBody, base: &Path, label: &str) -> Result<(), SyncError> {
    if let StepBody::File { file } = body {
        let source_path = base.join(&*file);
        let text = fs::read_to_string(&source_path)
            .map_err(|err| SyncError::definition(label, format!("failed to read step body {}: {err}", source_path.display())))?;
        *body = StepBody::Source(text);
    }
    Ok(())
}
