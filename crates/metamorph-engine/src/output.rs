//! Writing the transformed tree back to disk.

use std::path::Path;

use metamorph_tree::{NodeKind, SyntaxTree};
use metamorph_types::{MetamorphError, Result};

/// Persists a tree below an output location.
pub trait Printer: Send {
    fn print(&mut self, tree: &SyntaxTree, output: &Path) -> Result<()>;
}

/// Renders every unit to `<output>/<unit path>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourcePrinter;

impl Printer for SourcePrinter {
    fn print(&mut self, tree: &SyntaxTree, output: &Path) -> Result<()> {
        let units = tree.units();
        for unit in &units {
            let NodeKind::Unit { path } = tree.kind(*unit)? else {
                continue;
            };
            let relative = Path::new(path);
            if relative.is_absolute()
                || relative
                    .components()
                    .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                return Err(MetamorphError::InvalidConfiguration(format!(
                    "unit path '{path}' escapes the output directory"
                )));
            }
            let target = output.join(relative);
            if let Some(dir) = target.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&target, tree.render(*unit))?;
            tracing::debug!(path = %target.display(), "wrote unit");
        }
        tracing::info!(output = %output.display(), units = units.len(), "output written");
        Ok(())
    }
}
