//! Which JDK module holds each system class, persisted between runs as a
//! snapshot named after the Java version.

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
    sync::Arc,
};

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::{
    Result,
    config::Config,
    error::Error,
    runtime::class_loader::jmod::{Jmod, is_jmod_path},
};

/// Reserved key holding the number of class entries.
pub const COUNT_KEY: &str = "$COUNT";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMap {
    /// `pkg/Class.class` to `module.jmod`, plus `COUNT_KEY`.
    map: HashMap<String, String>,
    found_snapshot: bool,
}

impl ModuleMap {
    /// Loads the snapshot in the runtime home, or scans the JDK's jmods and
    /// writes a new snapshot when there is none or it is corrupt.
    pub fn build(config: &Config) -> Result<Self> {
        let snapshot = config.snapshot_path();
        if snapshot.is_file() {
            match load_snapshot(&snapshot) {
                Ok(map) => {
                    debug!("module map loaded from {}", snapshot.display());
                    return Ok(ModuleMap {
                        map,
                        found_snapshot: true,
                    });
                }
                Err(e) => warn!("discarding snapshot {}: {e}", snapshot.display()),
            }
        }

        let Some(jmods) = config.jmods_dir() else {
            return Err(Error::Archive(
                "cannot build module map: JAVA_HOME is not set".to_string(),
            ));
        };
        let map = scan_jmods(&jmods)?;
        info!(
            "module map built from {} with {} classes",
            jmods.display(),
            map.len() - 1
        );
        if let Err(e) = save_snapshot(&snapshot, &map) {
            warn!("cannot write snapshot {}: {e}", snapshot.display());
        }
        Ok(ModuleMap {
            map,
            found_snapshot: false,
        })
    }

    /// Module file holding `class_name` (slash form, no `.class`).
    pub fn lookup(&self, class_name: &str) -> Option<&str> {
        self.map
            .get(&format!("{class_name}.class"))
            .map(String::as_str)
            .filter(|m| !m.is_empty())
    }

    /// Number of class entries.
    pub fn len(&self) -> usize {
        self.map.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value stored under `COUNT_KEY`.
    pub fn count(&self) -> Option<usize> {
        self.map.get(COUNT_KEY)?.parse().ok()
    }

    pub fn found_snapshot(&self) -> bool {
        self.found_snapshot
    }

    pub fn entries(&self) -> &HashMap<String, String> {
        &self.map
    }
}

fn scan_jmods(dir: &Path) -> Result<HashMap<String, String>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_jmod_path(path))
        .collect();
    paths.sort();

    let mut map = HashMap::new();
    for path in &paths {
        let jmod = Jmod::open(path)?;
        let module = jmod.file_name();
        let classes = jmod.class_entries();
        debug!("{module}: {} classes", classes.len());
        for class in classes {
            map.insert(class, module.clone());
        }
    }
    let count = map.len();
    map.insert(COUNT_KEY.to_string(), count.to_string());
    Ok(map)
}

/// Reads a snapshot and checks its entry count.
pub fn load_snapshot(path: &Path) -> Result<HashMap<String, String>> {
    let map: HashMap<String, String> = bincode::deserialize_from(BufReader::new(File::open(path)?))?;
    let count = map.get(COUNT_KEY).and_then(|c| c.parse::<usize>().ok());
    match count {
        Some(count) if count + 1 == map.len() => Ok(map),
        _ => Err(Error::Archive(format!(
            "snapshot {} has a missing or wrong {COUNT_KEY}",
            path.display()
        ))),
    }
}

pub fn save_snapshot(path: &Path, map: &HashMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    bincode::serialize_into(BufWriter::new(File::create(path)?), map)?;
    Ok(())
}

// write-locked for the whole build, so lookups wait for it to finish
static MODULE_MAP: RwLock<Option<Arc<ModuleMap>>> = RwLock::new(None);

/// Builds the module map for `config` and makes it the one `lookup` uses.
pub fn init_module_map(config: &Config) -> Result<Arc<ModuleMap>> {
    let mut slot = MODULE_MAP.write();
    let map = Arc::new(ModuleMap::build(config)?);
    *slot = Some(Arc::clone(&map));
    Ok(map)
}

/// Module file holding `class_name`, `None` when the class is not a system
/// class or no map was built.
pub fn lookup(class_name: &str) -> Option<String> {
    MODULE_MAP
        .read()
        .as_ref()?
        .lookup(class_name)
        .map(str::to_string)
}

pub fn current() -> Option<Arc<ModuleMap>> {
    MODULE_MAP.read().clone()
}
