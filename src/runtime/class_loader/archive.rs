use std::{
    collections::HashMap,
    fs::File,
    io::{Read, Seek},
    path::{Path, PathBuf},
};

use log::{debug, warn};
use parking_lot::Mutex;
use zip::ZipArchive;

use crate::{
    Result,
    error::Error,
    runtime::class_loader::jmod::{is_jmod_path, read_jmod_payload},
};

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Resource,
    ClassFile,
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive.
    pub location: String,
    pub kind: EntryKind,
}

/// Bytes of a class read from an archive.
#[derive(Debug, Clone)]
pub struct ClassBytes {
    pub bytes: Vec<u8>,
    pub entry: ArchiveEntry,
}

/// An opened JAR or JMOD file with its entries indexed.
///
/// Class entries are keyed by their dotted name without `.class`
/// (`jacobin/HelloWorld.class` is `jacobin.HelloWorld`); all other entries by
/// their path.
pub struct Archive {
    file_path: PathBuf,
    entries: HashMap<String, ArchiveEntry>,
    manifest: HashMap<String, String>,
    class_path_raw: String,
    class_path: Vec<PathBuf>,
    zip: Mutex<ZipArchive<Box<dyn ReadSeek>>>,
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("file_path", &self.file_path)
            .field("entries", &self.entries.len())
            .field("manifest", &self.manifest)
            .field("class_path", &self.class_path)
            .finish()
    }
}

impl Archive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let reader: Box<dyn ReadSeek> = if is_jmod_path(&file_path) {
            Box::new(read_jmod_payload(&file_path)?)
        } else {
            Box::new(File::open(&file_path)?)
        };
        let mut zip = ZipArchive::new(reader).inspect_err(|e| {
            warn!("invalid or corrupt archive {}: {e}", file_path.display());
        })?;

        let mut entries = HashMap::with_capacity(zip.len());
        let mut manifest = HashMap::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let location = file.name().to_string();
            let (key, kind) = classify_entry(&location);
            if kind == EntryKind::Manifest {
                let mut contents = String::new();
                file.read_to_string(&mut contents)?;
                manifest = parse_manifest(&contents);
            }
            entries.insert(key, ArchiveEntry { location, kind });
        }

        let class_path_raw = manifest.get("Class-Path").cloned().unwrap_or_default();
        let class_path = resolve_class_path(&file_path, &class_path_raw);
        debug!(
            "opened archive {} with {} entries",
            file_path.display(),
            entries.len()
        );

        Ok(Archive {
            file_path,
            entries,
            manifest,
            class_path_raw,
            class_path,
            zip: Mutex::new(zip),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ArchiveEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn has_resource(&self, name: &str, kind: EntryKind) -> bool {
        self.entries.get(name).is_some_and(|e| e.kind == kind)
    }

    /// Reads the class named in dotted form, e.g. `jacobin.HelloWorld`.
    pub fn load_class(&self, class_name: &str) -> Result<ClassBytes> {
        let Some(entry) = self.entries.get(class_name) else {
            return Err(Error::Archive(format!(
                "Unable to load class {class_name} in archive {}",
                self.file_path.display()
            )));
        };
        if entry.kind != EntryKind::ClassFile {
            return Err(Error::Archive(format!(
                "Class {class_name} in archive {} is not a classfile",
                self.file_path.display()
            )));
        }

        let mut zip = self.zip.lock();
        let mut file = zip.by_name(&entry.location)?;
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        Ok(ClassBytes {
            bytes,
            entry: entry.clone(),
        })
    }

    /// `Main-Class` from the manifest. The key is case-sensitive.
    pub fn main_class(&self) -> Option<&str> {
        self.manifest.get("Main-Class").map(String::as_str)
    }

    pub fn manifest(&self) -> &HashMap<String, String> {
        &self.manifest
    }

    pub fn class_path_raw(&self) -> &str {
        &self.class_path_raw
    }

    /// The archive itself, then every `Class-Path` entry of the manifest.
    pub fn class_path(&self) -> &[PathBuf] {
        &self.class_path
    }
}

fn classify_entry(location: &str) -> (String, EntryKind) {
    if let Some(stem) = location.strip_suffix(".class") {
        (stem.replace('/', "."), EntryKind::ClassFile)
    } else if location == MANIFEST_PATH {
        (location.to_string(), EntryKind::Manifest)
    } else {
        (location.to_string(), EntryKind::Resource)
    }
}

/// Parses `key: value` lines. Lines without a colon are skipped and a value
/// ends at the next colon.
pub fn parse_manifest(contents: &str) -> HashMap<String, String> {
    contents
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter_map(|line| {
            let mut parts = line.split(':');
            let key = parts.next()?;
            let value = parts.next()?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn resolve_class_path(archive: &Path, raw: &str) -> Vec<PathBuf> {
    let base = archive.parent().unwrap_or(Path::new(""));
    std::iter::once(archive.to_path_buf())
        .chain(raw.split_whitespace().map(|entry| {
            let entry = Path::new(entry);
            if entry.is_absolute() {
                entry.to_path_buf()
            } else {
                base.join(entry)
            }
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = parse_manifest(
            "Manifest-Version: 1.0\r\nMain-Class: jacobin.HelloWorld\r\nno colon here\r\nEmpty:\r\nUrl: http://example.com\r\n",
        );
        assert_eq!(manifest["Manifest-Version"], "1.0");
        assert_eq!(manifest["Main-Class"], "jacobin.HelloWorld");
        assert_eq!(manifest["Empty"], "");
        assert_eq!(manifest["Url"], "http");
        assert!(!manifest.contains_key("no colon here"));
        assert_eq!(manifest.len(), 4);
    }

    #[test]
    fn test_classify_entry() {
        assert_eq!(
            classify_entry("jacobin/HelloWorld.class"),
            ("jacobin.HelloWorld".to_string(), EntryKind::ClassFile)
        );
        assert_eq!(
            classify_entry(MANIFEST_PATH),
            (MANIFEST_PATH.to_string(), EntryKind::Manifest)
        );
        assert_eq!(
            classify_entry("images/logo.png"),
            ("images/logo.png".to_string(), EntryKind::Resource)
        );
    }

    #[test]
    fn test_resolve_class_path() {
        let jar = Path::new("/opt/app/app.jar");
        let resolved = resolve_class_path(jar, "lib/a.jar  /abs/b.jar");
        assert_eq!(
            resolved,
            [
                PathBuf::from("/opt/app/app.jar"),
                PathBuf::from("/opt/app/lib/a.jar"),
                PathBuf::from("/abs/b.jar"),
            ]
        );
        assert_eq!(resolve_class_path(jar, ""), [PathBuf::from("/opt/app/app.jar")]);
    }
}
