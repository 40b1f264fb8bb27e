use std::{
    collections::HashSet,
    fs,
    io::{Cursor, Read},
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use dashmap::DashMap;
use log::{debug, trace};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use zip::ZipArchive;

use crate::{Result, config, error::Error};

pub const JMOD_MAGIC: u16 = 0x4A4D;
const HEADER_LEN: usize = 4;
const CLASSES_PREFIX: &str = "classes/";
const CLASSLIST: &str = "lib/classlist";

pub(crate) fn is_jmod_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jmod")
}

/// Reads a JMOD file and returns its ZIP payload, the bytes after the header.
pub(crate) fn read_jmod_payload(path: &Path) -> Result<Cursor<Vec<u8>>> {
    let mut bytes = fs::read(path)?;
    let found = match bytes.get(..2) {
        Some(&[hi, lo]) => u16::from_be_bytes([hi, lo]),
        _ => 0,
    };
    if found != JMOD_MAGIC || bytes.len() < HEADER_LEN {
        return Err(Error::InvalidJmod {
            path: path.display().to_string(),
            found,
        });
    }
    bytes.drain(..HEADER_LEN);
    Ok(Cursor::new(bytes))
}

/// A JDK module file.
pub struct Jmod {
    path: PathBuf,
    zip: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
}

impl std::fmt::Debug for Jmod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jmod").field("path", &self.path).finish()
    }
}

impl Jmod {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let zip = ZipArchive::new(read_jmod_payload(&path)?)?;
        debug!("opened jmod {} ({} entries)", path.display(), zip.len());
        Ok(Jmod {
            path,
            zip: Mutex::new(zip),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the module, e.g. `java.base.jmod`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Paths of all classes in the module relative to `classes/`, e.g.
    /// `java/lang/String.class`.
    pub fn class_entries(&self) -> Vec<String> {
        self.zip
            .lock()
            .file_names()
            .filter_map(|name| name.strip_prefix(CLASSES_PREFIX))
            .filter(|name| name.ends_with(".class"))
            .map(str::to_string)
            .collect()
    }

    /// Class names listed in `lib/classlist` with `.class` appended; empty
    /// when the module has no class list.
    fn classlist(zip: &mut ZipArchive<Cursor<Vec<u8>>>) -> HashSet<String> {
        let mut contents = String::new();
        let read = zip
            .by_name(CLASSLIST)
            .map_err(Error::from)
            .and_then(|mut file| Ok(file.read_to_string(&mut contents)?));
        if let Err(e) = read {
            trace!("no usable {CLASSLIST}, walking every class: {e}");
            return HashSet::new();
        }
        contents
            .split('\n')
            .map(|line| line.trim_end_matches(['\r', '\n']))
            .filter(|line| !line.is_empty())
            .map(|line| format!("{line}.class"))
            .collect()
    }

    /// Calls `visit` with the bytes and path of every class in the module,
    /// restricted to `lib/classlist` when the module has one. Returns the
    /// number of classes visited.
    pub fn walk(&self, mut visit: impl FnMut(&[u8], &str) -> Result<()>) -> Result<usize> {
        let mut zip = self.zip.lock();
        let classlist = Self::classlist(&mut zip);

        let names: Vec<String> = zip
            .file_names()
            .filter_map(|name| name.strip_prefix(CLASSES_PREFIX))
            .filter(|name| {
                if classlist.is_empty() {
                    name.ends_with(".class")
                } else {
                    classlist.contains(*name)
                }
            })
            .map(str::to_string)
            .collect();

        let mut bytes = Vec::new();
        for name in &names {
            bytes.clear();
            zip.by_name(&format!("{CLASSES_PREFIX}{name}"))?
                .read_to_end(&mut bytes)?;
            visit(&bytes, name)?;
        }
        Ok(names.len())
    }

    /// Bytes of `class_name` (slash form, no `.class`).
    pub fn class_bytes(&self, class_name: &str) -> Result<Vec<u8>> {
        let mut zip = self.zip.lock();
        let mut file = zip.by_name(&format!("{CLASSES_PREFIX}{class_name}.class"))?;
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        trace!("read {class_name} from {}", self.path.display());
        Ok(bytes)
    }
}

// opened modules, keyed by file name
static JMODS: LazyLock<DashMap<String, Arc<OnceCell<Arc<Jmod>>>>> = LazyLock::new(DashMap::new);

/// Opens `<java_home>/jmods/<jmod_file>` once and keeps it open.
pub fn cached_jmod(jmod_file: &str) -> Result<Arc<Jmod>> {
    let cell = Arc::clone(JMODS.entry(jmod_file.to_string()).or_default().value());
    let jmod = cell.get_or_try_init(|| {
        let Some(dir) = config::current().jmods_dir() else {
            return Err(Error::Archive(format!(
                "cannot open {jmod_file}: JAVA_HOME is not set"
            )));
        };
        Jmod::open(dir.join(jmod_file)).map(Arc::new)
    })?;
    Ok(Arc::clone(jmod))
}

/// Reads a class from a JDK module by the module's file name.
pub fn class_bytes(jmod_file: &str, class_name: &str) -> Result<Vec<u8>> {
    cached_jmod(jmod_file)?.class_bytes(class_name)
}
