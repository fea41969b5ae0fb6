//! Staged output files
//!
//! Output is written to a temporary file beside the destination and renamed
//! over it only once writing succeeds. A failed write leaves any existing
//! destination untouched and removes the temporary file.

use crate::{FormatError, Result};
use std::path::Path;
use tracing::debug;

/// Directory that will hold `output`
fn parent_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Run `write` against a temporary path next to `output`, then move it into place
///
/// File errors raised on the temporary path are reported against `output`.
pub(crate) fn write_staged<T, F>(output: &Path, write: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let staged = tempfile::Builder::new()
        .prefix(".iqkit-")
        .tempfile_in(parent_dir(output))
        .map_err(FormatError::file(output))?
        .into_temp_path();

    let value = write(&staged).map_err(|e| match e {
        FormatError::File { path, source } if path.as_path() == &*staged => FormatError::File {
            path: output.to_path_buf(),
            source,
        },
        other => other,
    })?;

    staged
        .persist(output)
        .map_err(|e| FormatError::file(output)(e.error))?;
    debug!("Staged output moved to {}", output.display());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_success_replaces_destination() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.cs16");
        std::fs::write(&output, b"old").unwrap();

        let n = write_staged(&output, |staged| {
            std::fs::write(staged, b"new contents").map_err(FormatError::file(staged))?;
            Ok(12)
        })
        .unwrap();

        assert_eq!(n, 12);
        assert_eq!(std::fs::read(&output).unwrap(), b"new contents");
        assert_eq!(entries(dir.path()), 1);
    }

    #[test]
    fn test_failure_keeps_existing_destination() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.cs16");
        std::fs::write(&output, b"keep me").unwrap();

        let result: Result<()> = write_staged(&output, |staged| {
            std::fs::write(staged, b"half").map_err(FormatError::file(staged))?;
            Err(FormatError::decode("bad input"))
        });

        assert!(matches!(result, Err(FormatError::Decode { .. })));
        assert_eq!(std::fs::read(&output).unwrap(), b"keep me");
        assert_eq!(entries(dir.path()), 1);
    }

    #[test]
    fn test_file_errors_name_the_destination() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.wav");

        let err = write_staged(&output, |staged| {
            // The staged path is a file, so listing it fails
            std::fs::read_dir(staged).map(|_| ()).map_err(FormatError::file(staged))
        })
        .unwrap_err();

        match err {
            FormatError::File { path, .. } => assert_eq!(path, output),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!output.exists());
    }
}
