//! Tree provider that parses every matching source file below a directory.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};

use metamorph_types::{MetamorphError, Result};

use crate::parser::parse;
use crate::tree::SyntaxTree;

pub const DEFAULT_PATTERN: &str = "**/*.mm";

pub struct SourceLoader {
    root: PathBuf,
    matcher: GlobSet,
}

impl SourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_pattern(root, DEFAULT_PATTERN)
    }

    /// `pattern` is matched against paths relative to `root`.
    pub fn with_pattern(root: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        let glob = Glob::new(pattern).map_err(|e| {
            MetamorphError::InvalidConfiguration(format!("invalid source pattern '{pattern}': {e}"))
        })?;
        let mut builder = GlobSetBuilder::new();
        builder.add(glob);
        let matcher = builder.build().map_err(|e| {
            MetamorphError::InvalidConfiguration(format!("invalid source pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            root: root.into(),
            matcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Matching files, sorted, relative to the root.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(MetamorphError::InvalidConfiguration(format!(
                "source location '{}' is not a directory",
                self.root.display()
            )));
        }
        let mut matches = Vec::new();
        collect_matches(&self.root, &self.root, &self.matcher, &mut matches)?;
        matches.sort();
        Ok(matches)
    }

    /// Parse every discovered file into one tree, one unit per file.
    pub fn load(&self) -> Result<SyntaxTree> {
        let files = self.discover()?;
        let mut tree = SyntaxTree::new();
        for relative in &files {
            let unit_path = unit_path(relative);
            let source = std::fs::read_to_string(self.root.join(relative))?;
            let unit = parse(&unit_path, &source)?;
            debug!(path = %unit_path, items = unit.items.len(), "parsed source unit");
            tree.add_unit(&unit);
        }
        info!(
            root = %self.root.display(),
            files = files.len(),
            classes = tree.classes().len(),
            methods = tree.methods().len(),
            "loaded sources"
        );
        Ok(tree)
    }
}

/// Unit paths always use `/` so manifests and output layout do not depend on
/// the host platform.
fn unit_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Recursively collect files matching a globset.
fn collect_matches(
    base: &Path,
    current: &Path,
    set: &GlobSet,
    matches: &mut Vec<PathBuf>,
) -> Result<()> {
    let meta = std::fs::metadata(current)?;
    if meta.is_file() {
        if let Ok(rel) = current.strip_prefix(base) {
            if set.is_match(rel) {
                matches.push(rel.to_path_buf());
            }
        }
    } else if meta.is_dir() {
        for entry in std::fs::read_dir(current)? {
            collect_matches(base, &entry?.path(), set, matches)?;
        }
    }
    Ok(())
}
