//! Runtime settings consumed by the loader: where classes come from and
//! where the module-map snapshot lives.

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use log::{debug, warn};
use parking_lot::RwLock;

use crate::consts::JAVA_VERSION_OFFSET;

pub const DEFAULT_MAX_JAVA_VERSION: u16 = 21;

static CONFIG: LazyLock<RwLock<Option<Arc<Config>>>> = LazyLock::new(|| RwLock::new(None));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub class_path: Vec<PathBuf>,
    pub starting_jar: Option<PathBuf>,
    pub jacobin_home: PathBuf,
    pub java_home: Option<PathBuf>,
    pub java_version: String,
    pub max_java_version: u16,
    /// Load the classes named in `java.base`'s `lib/classlist` at startup.
    pub preload_base_classes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            class_path: vec![PathBuf::from(".")],
            starting_jar: None,
            jacobin_home: PathBuf::from("."),
            java_home: None,
            java_version: "unknown".to_string(),
            max_java_version: DEFAULT_MAX_JAVA_VERSION,
            preload_base_classes: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Some(home) = env::var_os("JACOBIN_HOME") {
            config.jacobin_home = PathBuf::from(home);
        } else if let Some(home) = env::var_os("HOME") {
            config.jacobin_home = Path::new(&home).join(".jacobin");
        }

        if let Some(java_home) = env::var_os("JAVA_HOME") {
            let java_home = PathBuf::from(java_home);
            config.java_version = read_java_version(&java_home).unwrap_or_else(|| {
                warn!("no JAVA_VERSION in {}/release", java_home.display());
                "unknown".to_string()
            });
            config.java_home = Some(java_home);
        }

        if let Some(class_path) = env::var_os("CLASSPATH") {
            let entries: Vec<PathBuf> = env::split_paths(&class_path)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !entries.is_empty() {
                config.class_path = entries;
            }
        }

        debug!("config from environment: {config:?}");
        config
    }

    pub fn with_class_path(mut self, class_path: impl IntoIterator<Item = PathBuf>) -> Self {
        self.class_path = class_path.into_iter().collect();
        self
    }

    pub fn with_starting_jar(mut self, jar: impl Into<PathBuf>) -> Self {
        self.starting_jar = Some(jar.into());
        self
    }

    pub fn with_jacobin_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.jacobin_home = home.into();
        self
    }

    pub fn with_java_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.java_home = Some(home.into());
        self
    }

    pub fn with_java_version(mut self, version: impl Into<String>) -> Self {
        self.java_version = version.into();
        self
    }

    pub fn with_max_java_version(mut self, version: u16) -> Self {
        self.max_java_version = version;
        self
    }

    pub fn with_preload_base_classes(mut self, preload: bool) -> Self {
        self.preload_base_classes = preload;
        self
    }

    /// Highest class file major version accepted by the parser.
    pub fn max_class_major_version(&self) -> u16 {
        self.max_java_version.saturating_add(JAVA_VERSION_OFFSET)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.jacobin_home.join(format!("{}.gob", self.java_version))
    }

    pub fn jmods_dir(&self) -> Option<PathBuf> {
        self.java_home.as_ref().map(|home| home.join("jmods"))
    }
}

/// Reads `JAVA_VERSION="..."` from `<java_home>/release`.
pub fn read_java_version(java_home: &Path) -> Option<String> {
    let release = fs::read_to_string(java_home.join("release")).ok()?;
    release.lines().find_map(|line| {
        let value = line.strip_prefix("JAVA_VERSION=")?;
        Some(value.trim().trim_matches('"').to_string())
    })
}

pub fn install(config: Config) {
    *CONFIG.write() = Some(Arc::new(config));
}

pub fn current() -> Arc<Config> {
    if let Some(config) = CONFIG.read().as_ref() {
        return config.clone();
    }
    let mut slot = CONFIG.write();
    slot.get_or_insert_with(|| Arc::new(Config::default()))
        .clone()
}
