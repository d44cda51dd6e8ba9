use std::env;
use std::io;
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Serialize;

use crate::config::resolve::load_settings;
use crate::config::{LookupProvider, Settings};
use crate::error::{FlakedotError, Result};
use crate::flake::ResolveStrategy;
use crate::generate::{
    classify_model, generate, load_model, DotRequest, GenerateOptions, OutputTarget,
};
use crate::graph::{Classification, RenderOptions};
use crate::lookup::{lookup_for, VersionLookup};
use crate::util::output;

#[derive(Parser, Debug)]
#[command(name = "flakedot")]
#[command(about = "Render a Nix flake's locked inputs as a Graphviz graph", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Render(RenderArgs),
    Classify(ClassifyArgs),
    Completions(CompletionsArgs),
}

/// Options shared by every command that reads a flake.
#[derive(Args, Debug)]
pub struct FlakeArgs {
    /// Flake directory, flake.lock path or flake reference
    #[arg(short = 'f', long = "flake", default_value = ".")]
    pub flake: String,
    /// Token for the GitHub API, enables version labels
    #[arg(short = 't', long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
    /// Skip version lookups even when a token is available
    #[arg(long)]
    pub no_lookup: bool,
    /// Always resolve through `nix flake metadata`
    #[arg(long)]
    pub use_nix: bool,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub flake: FlakeArgs,
    /// Output file, `-` for stdout
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Graph title, replacing the flake URL
    #[arg(long)]
    pub title: Option<String>,
    /// Tera template used instead of the built-in one
    #[arg(long)]
    pub template: Option<PathBuf>,
    /// Draw direct version conflicts like direct duplicates
    #[arg(long)]
    pub merge_conflicts: bool,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub flake: FlakeArgs,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    pub shell: Shell,
}

pub fn run() {
    let cli = Cli::parse();
    output::init(cli.quiet, cli.verbose, cli.no_color);
    if let Err(err) = dispatch(cli) {
        output::error(&err.to_string());
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render(args) => handle_render(args, cli.config),
        Commands::Classify(args) => handle_classify(args, cli.config),
        Commands::Completions(args) => handle_completions(args),
    }
}

fn handle_render(args: RenderArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut settings = load_cli_settings(config_path, &args.flake)?;
    if let Some(template) = args.template {
        settings.render.template = Some(template);
    }
    if args.merge_conflicts {
        settings.render.split_version_conflicts = false;
    }

    let lookup = select_lookup(&settings, &args.flake)?;
    let options = GenerateOptions {
        strategy: strategy(&args.flake),
        title: args.title,
        render: RenderOptions::load(&settings.render, &settings.style)?,
        progress: true,
    };
    let request = DotRequest {
        flake: args.flake.flake,
        output: OutputTarget::from_path(&args.output),
    };

    let summary = generate(&request, lookup.as_ref(), &options)?;
    if let OutputTarget::File(path) = &request.output {
        output::success(&format!(
            "{} ({} nodes, {} bytes)",
            path.display(),
            summary.nodes,
            summary.bytes
        ));
    }
    Ok(())
}

fn handle_classify(args: ClassifyArgs, config_path: Option<PathBuf>) -> Result<()> {
    let settings = load_cli_settings(config_path, &args.flake)?;
    let lookup = select_lookup(&settings, &args.flake)?;
    let options = GenerateOptions {
        strategy: strategy(&args.flake),
        ..GenerateOptions::default()
    };

    let model = load_model(&args.flake.flake, &options)?;
    let classification = classify_model(&model, lookup.as_ref(), true);
    if args.json {
        print_classification_json(&classification)
    } else {
        print_classification_table(&classification);
        Ok(())
    }
}

fn handle_completions(args: CompletionsArgs) -> Result<()> {
    let mut command = Cli::command();
    clap_complete::generate(args.shell, &mut command, "flakedot", &mut io::stdout());
    Ok(())
}

fn load_cli_settings(config_path: Option<PathBuf>, flake: &FlakeArgs) -> Result<Settings> {
    let cwd = env::current_dir()?;
    let mut settings = load_settings(&cwd, config_path)?;
    if flake.no_lookup {
        settings.lookup.provider = LookupProvider::None;
    }
    Ok(settings)
}

fn select_lookup(settings: &Settings, flake: &FlakeArgs) -> Result<Box<dyn VersionLookup>> {
    let lookup = lookup_for(settings, flake.github_token.as_deref())?;
    output::debug(&format!("version lookup: {}", lookup.id()));
    Ok(lookup)
}

fn strategy(flake: &FlakeArgs) -> ResolveStrategy {
    if flake.use_nix {
        ResolveStrategy::Nix
    } else {
        ResolveStrategy::Auto
    }
}

#[derive(Serialize)]
struct ClassifiedJson<'a> {
    name: &'a str,
    normalized: &'a str,
    version: Option<&'a str>,
    class: &'static str,
    duplicate: bool,
}

fn print_classification_json(classification: &Classification) -> Result<()> {
    let rows: Vec<ClassifiedJson<'_>> = classification
        .nodes
        .iter()
        .map(|node| ClassifiedJson {
            name: &node.name,
            normalized: &node.normalized,
            version: node.version.as_deref(),
            class: node.class.label(),
            duplicate: classification.duplicates.contains(&node.name),
        })
        .collect();
    let json = serde_json::to_string_pretty(&rows)
        .map_err(|err| FlakedotError::Other(anyhow::Error::new(err)))?;
    println!("{}", json);
    Ok(())
}

fn print_classification_table(classification: &Classification) {
    println!("{:<28} {:<20} {:<24} Version", "Node", "Class", "Name");
    println!("{}", "-".repeat(82));
    for node in &classification.nodes {
        println!(
            "{:<28} {:<20} {:<24} {}",
            node.name,
            node.class.label(),
            node.normalized,
            node.version.as_deref().unwrap_or("-")
        );
    }
}
