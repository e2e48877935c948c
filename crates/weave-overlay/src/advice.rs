//! Advice unit relocation

use std::fs;
use std::path::{Path, PathBuf};

use weave_program::{CompilationUnit, UnitId};

use crate::error::OverlayError;

/// Read the advice unit at `path` and return its text with the package
/// clause renamed to `package_name`.
///
/// # Errors
/// [`OverlayError::Io`] when the file cannot be read,
/// [`OverlayError::AdviceUnit`] when it does not parse.
pub fn relocate_advice_unit(path: &Path, package_name: &str) -> Result<String, OverlayError> {
    let source = fs::read_to_string(path).map_err(|e| OverlayError::io_error(path, e))?;
    let file_name = path.file_name().map_or_else(PathBuf::new, PathBuf::from);
    let (unit, _) = CompilationUnit::parse(
        UnitId(0),
        path.to_path_buf(),
        file_name,
        String::new(),
        source,
        true,
    )?;
    let clause = unit.package_clause.clone();
    Ok(format!(
        "{}package {package_name}{}",
        &unit.source[..clause.start],
        &unit.source[clause.end..]
    ))
}
