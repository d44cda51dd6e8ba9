use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::flake::lock::LockFile;
use crate::flake::metadata::MetadataModel;
use crate::flake::{ResolutionError, Result};

pub const LOCK_FILE_NAME: &str = "flake.lock";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolveStrategy {
    #[default]
    Auto,
    Nix,
}

pub fn resolve(reference: &str, strategy: ResolveStrategy) -> Result<MetadataModel> {
    if strategy == ResolveStrategy::Auto {
        if let Some(lock_path) = local_lock_path(reference) {
            return resolve_lock_file(&lock_path);
        }
    }
    resolve_with_nix(reference)
}

/// The title is the `path:` URL of the directory holding the lock.
pub fn resolve_lock_file(path: &Path) -> Result<MetadataModel> {
    let content = std::fs::read_to_string(path).map_err(|source| ResolutionError::ReadLock {
        path: path.to_path_buf(),
        source,
    })?;
    let lock = LockFile::parse(&content, &path.display().to_string())?;
    MetadataModel::from_lock(lock, Some(lock_title(path)))
}

fn lock_title(lock_path: &Path) -> String {
    let dir = match lock_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    format!("path:{}", dir.display())
}

pub fn resolve_with_nix(reference: &str) -> Result<MetadataModel> {
    let output = Command::new("nix")
        .args([
            "--extra-experimental-features",
            "nix-command flakes",
            "flake",
            "metadata",
            "--json",
            "--no-write-lock-file",
            "--",
        ])
        .arg(reference)
        .stdin(Stdio::null())
        .output()
        .map_err(ResolutionError::NixUnavailable)?;

    if !output.status.success() {
        return Err(ResolutionError::NixCommand {
            reference: reference.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_nix_metadata(&output.stdout, reference)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NixFlakeMetadata {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    resolved_url: Option<String>,
    locks: LockFile,
}

fn parse_nix_metadata(stdout: &[u8], reference: &str) -> Result<MetadataModel> {
    let metadata: NixFlakeMetadata =
        serde_json::from_slice(stdout).map_err(|source| ResolutionError::Parse {
            origin: format!("nix flake metadata {reference}"),
            source,
        })?;
    let title = metadata.url.or(metadata.resolved_url);
    MetadataModel::from_lock(metadata.locks, title)
}

fn local_lock_path(reference: &str) -> Option<PathBuf> {
    let path = Path::new(reference.strip_prefix("path:").unwrap_or(reference));
    if path.is_dir() {
        let candidate = path.join(LOCK_FILE_NAME);
        return candidate.is_file().then_some(candidate);
    }
    let is_lock = path
        .extension()
        .map(|ext| ext == "lock")
        .unwrap_or(false);
    (is_lock && path.is_file()).then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::flake::resolve::{
        local_lock_path, lock_title, parse_nix_metadata, resolve_lock_file,
    };
    use crate::flake::ResolutionError;

    const LOCK: &str = r#"{
  "nodes": {
    "nixpkgs": { "locked": { "type": "github", "owner": "NixOS", "repo": "nixpkgs", "rev": "abc" } },
    "root": { "inputs": { "nixpkgs": "nixpkgs" } }
  },
  "root": "root",
  "version": 7
}"#;

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos();
        let pid = std::process::id();
        std::env::temp_dir().join(format!("flakedot-{prefix}-{pid}-{nanos}"))
    }

    #[test]
    fn local_directory_with_lock_is_read_directly() {
        let root = unique_temp_dir("resolve-local");
        fs::create_dir_all(&root).expect("create dir");
        fs::write(root.join("flake.lock"), LOCK).expect("write lock");

        let reference = root.display().to_string();
        assert_eq!(local_lock_path(&reference), Some(root.join("flake.lock")));
        assert_eq!(
            local_lock_path(&format!("path:{reference}")),
            Some(root.join("flake.lock"))
        );

        let model = resolve_lock_file(&root.join("flake.lock")).expect("resolve lock");
        let title = model.title().expect("title");
        assert!(title.starts_with("path:"), "unexpected title {title}");
        assert!(model.direct_inputs().contains("nixpkgs"));

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn bare_lock_file_name_is_titled_by_working_directory() {
        let cwd = Path::new(".").canonicalize().expect("canonical cwd");
        assert_eq!(
            lock_title(Path::new("flake.lock")),
            format!("path:{}", cwd.display())
        );
        assert_ne!(lock_title(Path::new("flake.lock")), "path:");
    }

    #[test]
    fn lock_title_uses_canonical_parent() {
        let root = unique_temp_dir("resolve-title");
        fs::create_dir_all(root.join("sub")).expect("create dir");
        let canonical = root.canonicalize().expect("canonical dir");
        assert_eq!(
            lock_title(&root.join("sub").join("..").join("flake.lock")),
            format!("path:{}", canonical.display())
        );
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn remote_references_are_not_local() {
        assert_eq!(local_lock_path("github:NixOS/nixpkgs"), None);
    }

    #[test]
    fn unreadable_lock_is_a_resolution_error() {
        let missing = unique_temp_dir("resolve-missing").join("flake.lock");
        let err = resolve_lock_file(&missing).expect_err("missing lock");
        assert!(matches!(err, ResolutionError::ReadLock { .. }));
    }

    #[test]
    fn nix_metadata_provides_title_and_locks() {
        let stdout = format!(
            r#"{{"url": "github:owner/flake/0123", "resolvedUrl": "github:owner/flake", "locks": {LOCK}}}"#
        );
        let model = parse_nix_metadata(stdout.as_bytes(), "github:owner/flake").expect("parse");
        assert_eq!(model.title(), Some("github:owner/flake/0123"));
        assert!(model.is_locked("nixpkgs"));
    }

    #[test]
    fn nix_metadata_without_url_has_no_title() {
        let stdout = format!(r#"{{"locks": {LOCK}}}"#);
        let model = parse_nix_metadata(stdout.as_bytes(), "x").expect("parse");
        assert_eq!(model.title(), None);
    }

    #[test]
    fn malformed_nix_output_is_a_parse_error() {
        let err = parse_nix_metadata(b"not json", "x").expect_err("parse failure");
        assert!(matches!(err, ResolutionError::Parse { .. }));
    }
}
