//! Local flag overrides.
//!
//! A TOML file mapping flag keys to booleans, e.g.
//!
//! ```toml
//! longer-trial-duration = true
//! dark-theme = false
//! ```
//!
//! Overrides win over remote evaluation, which makes experiments
//! deterministic in development and tests.

use std::collections::HashMap;
use std::path::Path;

use crate::FlagsError;

/// Load an override file. A missing file is an error; callers decide
/// whether the file is optional.
pub fn load_overrides(path: &Path) -> Result<HashMap<String, bool>, FlagsError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| FlagsError::Overrides(format!("{}: {e}", path.display())))?;
    toml::from_str(&raw).map_err(|e| FlagsError::Overrides(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_boolean_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "longer-trial-duration = true").unwrap();
        writeln!(file, "dark-theme = false").unwrap();

        let overrides = load_overrides(file.path()).unwrap();
        assert_eq!(overrides.get("longer-trial-duration"), Some(&true));
        assert_eq!(overrides.get("dark-theme"), Some(&false));
    }

    #[test]
    fn rejects_non_boolean_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "longer-trial-duration = \"yes\"").unwrap();
        assert!(load_overrides(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_overrides(Path::new("/nonexistent/flags.toml")).is_err());
    }
}
