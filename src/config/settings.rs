use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub style: StyleConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupProvider {
    #[default]
    Auto,
    None,
    Github,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub provider: LookupProvider,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default = "default_rankdir")]
    pub rankdir: String,
    #[serde(default = "default_true")]
    pub split_version_conflicts: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template: None,
            rankdir: default_rankdir(),
            split_version_conflicts: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StyleConfig {
    #[serde(default = "default_root_color")]
    pub root: String,
    #[serde(default = "default_direct_unique")]
    pub direct_unique: String,
    #[serde(default = "default_direct_same_version")]
    pub direct_same_version: String,
    #[serde(default = "default_direct_different_versions")]
    pub direct_different_versions: String,
    #[serde(default = "default_indirect_unique")]
    pub indirect_unique: String,
    #[serde(default = "default_indirect_same_version")]
    pub indirect_same_version: String,
    #[serde(default = "default_indirect_different_versions")]
    pub indirect_different_versions: String,
    #[serde(default = "default_direct_shape")]
    pub direct_shape: String,
    #[serde(default = "default_indirect_shape")]
    pub indirect_shape: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            root: default_root_color(),
            direct_unique: default_direct_unique(),
            direct_same_version: default_direct_same_version(),
            direct_different_versions: default_direct_different_versions(),
            indirect_unique: default_indirect_unique(),
            indirect_same_version: default_indirect_same_version(),
            indirect_different_versions: default_indirect_different_versions(),
            direct_shape: default_direct_shape(),
            indirect_shape: default_indirect_shape(),
        }
    }
}

fn default_max_pages() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_rankdir() -> String {
    "TB".to_string()
}

fn default_true() -> bool {
    true
}

fn default_root_color() -> String {
    "lightgrey".to_string()
}

fn default_direct_unique() -> String {
    "palegreen".to_string()
}

fn default_direct_same_version() -> String {
    "gold".to_string()
}

fn default_direct_different_versions() -> String {
    "orangered".to_string()
}

fn default_indirect_unique() -> String {
    "lightblue".to_string()
}

fn default_indirect_same_version() -> String {
    "khaki".to_string()
}

fn default_indirect_different_versions() -> String {
    "salmon".to_string()
}

fn default_direct_shape() -> String {
    "ellipse".to_string()
}

fn default_indirect_shape() -> String {
    "box".to_string()
}
