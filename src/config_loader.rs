use crate::config::{Config, ConfigOverrides};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// Load the configuration file if one is given, otherwise use defaults,
/// then apply command-line overrides
pub fn resolve_config(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => {
            info!("No configuration file given, using built-in defaults");
            Config::default()
        }
    };

    if !overrides.is_empty() {
        info!("Applying command-line overrides");
    }
    config.apply_overrides(overrides)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SumSource;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
input:
  base_path: "simulations/run"
  first_index: 1
  last_index: 20
statistics:
  z_score: 1.96
solver:
  source: external
  timeout: "30s"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.input.last_index, 20);
        assert_eq!(config.statistics.z_score, 1.96);
        assert_eq!(config.solver.source, SumSource::External);
    }

    #[test]
    fn test_load_invalid_config() {
        let yaml = r#"
statistics:
  z_score: -1.0
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("z_score"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_config(Path::new("/nonexistent/lpi.yaml")).is_err());
    }

    #[test]
    fn test_resolve_config_defaults_with_overrides() {
        let overrides = ConfigOverrides {
            input_base: Some(PathBuf::from("out/data")),
            ..ConfigOverrides::default()
        };
        let config = resolve_config(None, &overrides).unwrap();
        assert_eq!(config.input.base_path, "out/data");
        assert_eq!(config.output.results, PathBuf::from("results.txt"));
    }
}
