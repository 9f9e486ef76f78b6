//! Loading coder files and session manifests from disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use irr_core::{CoderAnnotations, Condition};
use serde::Deserialize;

/// Reads and validates one coder's annotation file.
pub fn load_annotations(path: &Path) -> Result<CoderAnnotations> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    CoderAnnotations::from_json_str(&json)
        .with_context(|| format!("invalid annotations in {}", path.display()))
}

/// A list of coded sessions.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub sessions: Vec<SessionEntry>,
}

/// One coder's annotation file for one session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionEntry {
    /// Identifier written to export rows.
    pub id: String,
    pub condition: Condition,
    /// Annotation file, relative to the manifest's directory.
    pub annotations: PathBuf,
}

impl Manifest {
    /// Reads a manifest and resolves its annotation paths.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let mut manifest: Self = serde_json::from_str(&json)
            .with_context(|| format!("invalid manifest {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for session in &mut manifest.sessions {
            if session.annotations.is_relative() {
                session.annotations = base.join(&session.annotations);
            }
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_paths_resolve_against_manifest_dir() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sessions.json");
        fs::write(
            &path,
            r#"{"sessions": [
                {"id": "s01-a", "condition": "childchild", "annotations": "s01-a.json"},
                {"id": "s02-a", "condition": "childrobot", "annotations": "/abs/s02-a.json"}
            ]}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.sessions.len(), 2);
        assert_eq!(
            manifest.sessions[0].annotations,
            temp.path().join("s01-a.json")
        );
        assert_eq!(manifest.sessions[1].condition, Condition::OneStream);
        assert_eq!(
            manifest.sessions[1].annotations,
            PathBuf::from("/abs/s02-a.json")
        );
    }

    #[test]
    fn load_annotations_reports_the_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("coder.json");
        fs::write(&path, r#"{"purple": [{"aimless": [3, 1]}]}"#).unwrap();

        let err = load_annotations(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("invalid annotations in"), "{message}");
        assert!(message.contains("purple entry 0"), "{message}");
    }

    #[test]
    fn load_annotations_missing_file() {
        let err = load_annotations(Path::new("/nonexistent/coder.json")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));
    }
}
