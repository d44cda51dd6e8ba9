use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::flake::LockedRef;
use crate::lookup::{Result, VersionLookup};

pub struct TrackedLookup<'a> {
    inner: &'a dyn VersionLookup,
    bar: ProgressBar,
}

impl<'a> TrackedLookup<'a> {
    pub fn new(inner: &'a dyn VersionLookup, total: u64, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix("versions");
        Self { inner, bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl VersionLookup for TrackedLookup<'_> {
    fn id(&self) -> &'static str {
        self.inner.id()
    }

    fn version_for(&self, locked: &LockedRef) -> Result<Option<String>> {
        if let (Some(owner), Some(repo)) = (locked.owner.as_deref(), locked.repo.as_deref()) {
            self.bar.set_message(format!("{owner}/{repo}"));
        }
        let result = self.inner.version_for(locked);
        self.bar.inc(1);
        result
    }
}
