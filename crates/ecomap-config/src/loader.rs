//! Settings file locations and layering.
//!
//! A workspace sees at most two files: the global one under the home directory
//! and the one inside the workspace. Either may be missing. Command-line
//! overrides are applied last.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ConfigLayer;
use crate::{ConfigOverrides, MapConfig};

/// Directory holding settings, under the home directory and in a workspace.
pub const SETTINGS_DIR: &str = ".ecomap";

/// Settings file name inside `SETTINGS_DIR`.
pub const SETTINGS_FILE: &str = "config.toml";

/// The settings files that apply to one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFiles {
    /// `~/.ecomap/config.toml`, `None` without a home directory
    pub global: Option<PathBuf>,

    /// `<workspace>/.ecomap/config.toml`
    pub local: PathBuf,
}

impl ConfigFiles {
    /// Files for `workspace`, with the global file under the user's home.
    pub fn for_workspace(workspace: &Path) -> Self {
        Self::with_home(dirs::home_dir().as_deref(), workspace)
    }

    /// Files for `workspace`, with the global file under `home`.
    pub fn with_home(home: Option<&Path>, workspace: &Path) -> Self {
        Self {
            global: home.map(settings_path),
            local: settings_path(workspace),
        }
    }

    /// Defaults, then the global file, then the workspace file, then `overrides`.
    pub fn load(&self, overrides: &ConfigOverrides) -> Result<MapConfig, ConfigError> {
        let mut config = MapConfig::default();

        for path in self.global.iter().chain(Some(&self.local)) {
            if !path.exists() {
                trace!("No settings at {}", path.display());
                continue;
            }
            debug!("Applying settings from {}", path.display());
            ConfigLayer::read(path)?.apply(&mut config);
        }

        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Write default settings to the workspace file unless it exists.
    pub fn init_local(&self) -> Result<PathBuf, ConfigError> {
        write_defaults(&self.local)
    }

    /// Write default settings to the global file unless it exists.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        match self.global {
            Some(ref path) => write_defaults(path),
            None => Err(ConfigError::NoHomeDir),
        }
    }
}

/// Defaults, then the file at `path`, then `overrides`.
///
/// Used for `--config`; the global and workspace files are not read.
pub fn load_explicit(path: &Path, overrides: &ConfigOverrides) -> Result<MapConfig, ConfigError> {
    debug!("Applying settings from {}", path.display());
    let mut config = MapConfig::default();
    ConfigLayer::read(path)?.apply(&mut config);
    config.apply_overrides(overrides);
    Ok(config)
}

fn settings_path(dir: &Path) -> PathBuf {
    dir.join(SETTINGS_DIR).join(SETTINGS_FILE)
}

fn write_defaults(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        debug!("Keeping existing settings at {}", path.display());
        return Ok(path.to_path_buf());
    }

    let unwritable = |source| ConfigError::Unwritable {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(unwritable)?;
    }
    let text = toml::to_string_pretty(&MapConfig::default())?;
    std::fs::write(path, text).map_err(unwritable)?;

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EdgeClosure;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// A home and a workspace side by side in one temp dir.
    struct Dirs {
        _temp: TempDir,
        home: PathBuf,
        workspace: PathBuf,
    }

    impl Dirs {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let home = temp.path().join("home");
            let workspace = temp.path().join("map");
            std::fs::create_dir_all(&workspace).unwrap();
            Self {
                _temp: temp,
                home,
                workspace,
            }
        }

        fn files(&self) -> ConfigFiles {
            ConfigFiles::with_home(Some(&self.home), &self.workspace)
        }

        fn write_global(&self, text: &str) {
            write(&settings_path(&self.home), text);
        }

        fn write_local(&self, text: &str) {
            write(&settings_path(&self.workspace), text);
        }
    }

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let dirs = Dirs::new();
        let config = dirs.files().load(&ConfigOverrides::default()).unwrap();
        assert_eq!(config, MapConfig::default());
    }

    #[test]
    fn test_paths() {
        let files = ConfigFiles::with_home(Some(Path::new("/home/ana")), Path::new("/srv/map"));
        assert_eq!(
            files.global.as_deref(),
            Some(Path::new("/home/ana/.ecomap/config.toml"))
        );
        assert_eq!(files.local, PathBuf::from("/srv/map/.ecomap/config.toml"));
        assert_eq!(ConfigFiles::with_home(None, Path::new("/srv/map")).global, None);
    }

    #[test]
    fn test_workspace_file_wins_over_global() {
        let dirs = Dirs::new();
        dirs.write_global(
            r#"
            [data]
            root = "/shared/corpus"

            [graph]
            closure_policy = "strict-and"
            base_size = 20

            [cache]
            use_cache = true
            "#,
        );
        dirs.write_local(
            r#"
            [graph]
            closure_policy = "inclusive-or"

            [cache]
            use_cache = false
            "#,
        );

        let config = dirs.files().load(&ConfigOverrides::default()).unwrap();

        assert_eq!(config.data.root, PathBuf::from("/shared/corpus"));
        assert_eq!(config.graph.closure_policy, EdgeClosure::InclusiveOr);
        assert_eq!(config.graph.base_size, 20);
        assert!(!config.cache.use_cache);
    }

    #[test]
    fn test_overrides_win_over_files() {
        let dirs = Dirs::new();
        dirs.write_local("[graph]\nclosure_policy = \"strict-and\"\n");

        let overrides = ConfigOverrides {
            closure_policy: Some(EdgeClosure::InclusiveOr),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };
        let config = dirs.files().load(&overrides).unwrap();

        assert_eq!(config.graph.closure_policy, EdgeClosure::InclusiveOr);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_category_folders_accumulate() {
        let dirs = Dirs::new();
        dirs.write_global("[data.categories]\npartners = \"Organization\"\n");
        dirs.write_local("[data.categories]\ndatasets = \"Dataset\"\n");

        let config = dirs.files().load(&ConfigOverrides::default()).unwrap();

        assert_eq!(config.data.categories.len(), 9);
        assert_eq!(config.data.categories["partners"], "Organization");
        assert_eq!(config.data.categories["datasets"], "Dataset");
    }

    #[test]
    fn test_malformed_file() {
        let dirs = Dirs::new();
        dirs.write_local("[graph\nbase_size = ");

        let err = dirs.files().load(&ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_load_explicit_skips_other_files() {
        let dirs = Dirs::new();
        dirs.write_local("[graph]\nbase_size = 99\n");
        let explicit = dirs.workspace.join("custom.toml");
        write(&explicit, "[graph]\nsize_per_degree = 5\n");

        let config = load_explicit(&explicit, &ConfigOverrides::default()).unwrap();

        assert_eq!(config.graph.size_per_degree, 5);
        assert_eq!(config.graph.base_size, 10);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dirs = Dirs::new();
        let err = load_explicit(&dirs.workspace.join("none.toml"), &ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn test_init_local_writes_defaults() {
        let dirs = Dirs::new();
        let path = dirs.files().init_local().unwrap();

        assert!(path.ends_with(".ecomap/config.toml"));
        let parsed: MapConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, MapConfig::default());
    }

    #[test]
    fn test_init_global_keeps_existing_file() {
        let dirs = Dirs::new();
        dirs.write_global("[logging]\nlevel = \"error\"\n");

        let path = dirs.files().init_global().unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("error"));
    }

    #[test]
    fn test_init_global_without_home() {
        let dirs = Dirs::new();
        let files = ConfigFiles::with_home(None, &dirs.workspace);
        assert!(matches!(files.init_global(), Err(ConfigError::NoHomeDir)));
    }
}
