use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::flake::{resolve, MetadataModel, ResolveStrategy};
use crate::graph::{classify, Classification, RenderOptions, Renderer};
use crate::lookup::VersionLookup;
use crate::util::output;
use crate::util::progress::TrackedLookup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    pub fn from_path(path: &Path) -> Self {
        if path == Path::new("-") {
            Self::Stdout
        } else {
            Self::File(path.to_path_buf())
        }
    }
}

#[derive(Debug, Clone)]
pub struct DotRequest {
    pub flake: String,
    pub output: OutputTarget,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub strategy: ResolveStrategy,
    pub title: Option<String>,
    pub render: RenderOptions,
    pub progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    pub nodes: usize,
    pub bytes: usize,
}

/// Nothing is written unless resolution and rendering both succeed.
pub fn generate(
    request: &DotRequest,
    lookup: &dyn VersionLookup,
    options: &GenerateOptions,
) -> Result<GenerateSummary> {
    let model = load_model(&request.flake, options)?;
    let dot = render_model(&model, lookup, options)?;
    write_output(&request.output, &dot)?;

    Ok(GenerateSummary {
        nodes: model.locked_nodes().count(),
        bytes: dot.len(),
    })
}

pub fn load_model(reference: &str, options: &GenerateOptions) -> Result<MetadataModel> {
    output::debug(&format!("resolving {reference} ({:?})", options.strategy));
    let model = resolve(reference, options.strategy)?;
    if !model.has_known_lock_version() {
        output::warn(&format!(
            "flake.lock version {} is not known, reading it anyway",
            model.lock_version()
        ));
    }
    for dangling in model.dangling_inputs() {
        output::warn(&format!(
            "input '{}' of '{}' does not resolve to a lock node ({:?})",
            dangling.input, dangling.from, dangling.reference
        ));
    }
    let model = match options.title.as_ref() {
        Some(title) => model.with_title(Some(title.clone())),
        None => model,
    };
    Ok(model)
}

pub fn render_model(
    model: &MetadataModel,
    lookup: &dyn VersionLookup,
    options: &GenerateOptions,
) -> Result<String> {
    let tracked = tracked_lookup(model, lookup, options.progress);
    let rendered = Renderer::new(&tracked, options.render.clone()).render(model);
    tracked.finish();
    Ok(rendered?)
}

pub fn classify_model(
    model: &MetadataModel,
    lookup: &dyn VersionLookup,
    progress: bool,
) -> Classification {
    let tracked = tracked_lookup(model, lookup, progress);
    let classification = classify(model, &tracked);
    tracked.finish();
    classification
}

fn tracked_lookup<'a>(
    model: &MetadataModel,
    lookup: &'a dyn VersionLookup,
    progress: bool,
) -> TrackedLookup<'a> {
    let total = model.locked_nodes().count() as u64;
    let visible = progress && !output::is_quiet() && lookup.id() != "none" && total > 1;
    TrackedLookup::new(lookup, total, visible)
}

pub fn write_output(target: &OutputTarget, text: &str) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
        OutputTarget::File(path) => std::fs::write(path, text)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::error::FlakedotError;
    use crate::generate::{generate, DotRequest, GenerateOptions, OutputTarget};
    use crate::graph::RenderError;
    use crate::lookup::NoLookup;

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
    fn dash_is_stdout() {
        assert_eq!(OutputTarget::from_path(Path::new("-")), OutputTarget::Stdout);
        assert_eq!(
            OutputTarget::from_path(Path::new("out.dot")),
            OutputTarget::File(PathBuf::from("out.dot"))
        );
    }

    #[test]
    fn writes_dot_file_for_local_flake() {
        let root = unique_temp_dir("generate-local");
        fs::create_dir_all(&root).expect("create dir");
        fs::write(root.join("flake.lock"), LOCK).expect("write lock");
        let output = root.join("graph.dot");

        let request = DotRequest {
            flake: root.display().to_string(),
            output: OutputTarget::File(output.clone()),
        };
        let summary =
            generate(&request, &NoLookup, &GenerateOptions::default()).expect("generate dot");
        assert_eq!(summary.nodes, 1);

        let dot = fs::read_to_string(&output).expect("read output");
        assert_eq!(dot.len(), summary.bytes);
        assert!(dot.contains("root -> nixpkgs;"));

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn blank_title_override_writes_nothing() {
        let root = unique_temp_dir("generate-no-title");
        fs::create_dir_all(&root).expect("create dir");
        fs::write(root.join("flake.lock"), LOCK).expect("write lock");
        let output = root.join("graph.dot");

        let request = DotRequest {
            flake: root.display().to_string(),
            output: OutputTarget::File(output.clone()),
        };
        let options = GenerateOptions {
            title: Some(String::new()),
            ..GenerateOptions::default()
        };
        let err = generate(&request, &NoLookup, &options).expect_err("title is required");
        assert!(matches!(err, FlakedotError::Render(RenderError::MissingTitle)));
        assert!(!output.exists());

        let _ = fs::remove_dir_all(root);
    }
}
