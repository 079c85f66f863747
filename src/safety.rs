//! Guards against overwriting the input table.

use crate::io::TableFormat;
use anyhow::{bail, Result};
use std::path::Path;

/// Validates that an output path is safe to write.
///
/// Checks:
/// - the output extension is a supported table format
/// - the output is not the input file (compared after canonicalizing when
///   both exist)
pub fn validate_output_path(output: &Path, input: &Path) -> Result<()> {
    TableFormat::from_path(output)?;

    let same_file = match (output.canonicalize(), input.canonicalize()) {
        (Ok(out), Ok(inp)) => out == inp,
        _ => output == input,
    };
    if same_file {
        bail!(
            "Safety check failed: output '{}' cannot be the same as input '{}'",
            output.display(),
            input.display()
        );
    }

    Ok(())
}
