use std::path::Path;

// config lets settings come from a separate file and the environment
use config::{Config, Environment, File};
use serde::Deserialize;

// our own stuff that we need
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default tracing filter, RUST_LOG wins when set.
    pub log_filter: String,
    /// Appended to a Title's name to form the banner Comment placed before it.
    pub banner_suffix: String,
    /// Turns `-c` against a non-Title into an error instead of a warned no-op.
    pub strict_child_target: bool,
    /// Makes the CLI list parameters that no script mentions.
    pub report_unused: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            banner_suffix: ": PARAMETER BLOCK ===== PARAMETER BLOCK ===== PARAMETER BLOCK ===== PARAMETER BLOCK "
                .to_string(),
            strict_child_target: false,
            report_unused: false,
        }
    }
}

impl Settings {
    /// Reads an optional settings file, then GSMPARAM_* environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("GSMPARAM"));
        Ok(builder.build()?.try_deserialize()?)
    }
    pub fn banner_for(&self, title: &str) -> String {
        format!(" {}{}", title, self.banner_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_wraps_the_title_name() {
        let settings = Settings {
            banner_suffix: " =====".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.banner_for("Frame"), " Frame =====");
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/gsmparam.toml")));
        assert!(matches!(result, Err(crate::GsmParamError::Config(_))));
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("gsmparam-settings-{}.toml", std::process::id()));
        std::fs::write(&path, "strict_child_target = true\nbanner_suffix = \" ---\"\n").unwrap();
        let settings = Settings::load(Some(&path));
        std::fs::remove_file(&path).unwrap();
        let settings = settings.unwrap();
        assert!(settings.strict_child_target);
        assert_eq!(settings.banner_for("Frame"), " Frame ---");
        assert_eq!(settings.log_filter, "info");
    }
}
