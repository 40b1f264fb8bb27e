//! Turns class bytes into entries of the method area, finding the bytes in
//! JDK modules, the starting JAR or the class path.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use dashmap::DashMap;
use log::{debug, trace, warn};
use once_cell::sync::OnceCell;

use crate::{
    Result,
    class::{self, ConstantPool, CpEntry, CpKind, MemberRef, ParsedClass},
    config,
    error::Error,
    runtime::{
        CPool, ClData, ClassStatus, ClinitState, Field, Klass, Loader, Method,
        ResolvedMethodRef,
        exceptions::throw_error,
        method_area,
        mirror::{self, ClassMirror},
        object_method_list,
        statics::{self, Static},
    },
    string_pool::{self, INVALID_INDEX, OBJECT_INDEX},
};

pub mod archive;
pub mod jmod;
pub mod module_map;

pub use archive::{Archive, ArchiveEntry, ClassBytes, EntryKind};
pub use jmod::Jmod;
pub use module_map::{ModuleMap, init_module_map};

const CLINIT: &str = "<clinit>()V";

/// Module whose class list is loaded at startup.
pub const BASE_MODULE: &str = "java.base.jmod";

/// Converts a parsed, format-checked class into its loaded form.
///
/// String constants are folded into the UTF8 entries they name, method and
/// interface refs are resolved to string pool indices, static fields get
/// their initial values and the class mirror is posted.
pub fn post_process(class: ParsedClass, loader: Loader) -> Result<Klass> {
    let cp = convert_constant_pool(&class.constant_pool)?;

    let interfaces = class
        .interfaces
        .iter()
        .filter_map(|&index| {
            let name_index = class.constant_pool.class_ref(index)?.name_index;
            match cp.entry(name_index)? {
                CpEntry {
                    kind: CpKind::Utf8,
                    slot,
                } => Some(slot),
                _ => None,
            }
        })
        .collect();

    let fields: Vec<Field> = class
        .fields
        .into_iter()
        .map(|f| Field {
            is_static: f.is_static(),
            access_flags: f.access_flags,
            name_index: string_pool::intern(&f.name),
            name: f.name,
            descriptor: f.descriptor,
            const_value: f.const_value,
        })
        .collect();

    let mut statics_names = Vec::new();
    for field in fields.iter().filter(|f| f.is_static) {
        statics_names.push(format!("{}{}", field.name, field.descriptor));
        let value = match &field.const_value {
            Some(value) => Static::from_const(&field.descriptor, value),
            None => Static::default_for(&field.descriptor),
        };
        statics::add_static(class.class_name_index, field.name_index, value);
    }

    let class_object = mirror::add_mirror(ClassMirror {
        name_index: class.class_name_index,
        super_index: class.super_class_index,
        access_flags: class.access_flags,
        statics: statics_names,
    });

    let mut method_list = object_method_list();
    let mut methods = HashMap::with_capacity(class.methods.len());
    for m in class.methods {
        let key = format!("{}{}", m.name, m.descriptor);
        method_list.insert(key.clone(), format!("{}.{key}", class.class_name));
        methods.insert(
            key,
            Method {
                access_flags: m.access_flags,
                name: m.name,
                descriptor: m.descriptor,
                code: m.code,
                attributes: m.attributes,
                exceptions: m.exceptions,
                parameters: m.parameters,
                deprecated: m.deprecated,
            },
        );
    }
    let clinit = if methods.contains_key(CLINIT) {
        ClinitState::NotRun
    } else {
        ClinitState::None
    };

    let mut data = ClData::empty(&class.class_name);
    data.name_index = class.class_name_index;
    data.super_index = class.super_class_index;
    data.module = module_name(&class.class_name);
    data.source_file = class.source_file;
    data.interfaces = interfaces;
    data.fields = fields;
    data.methods = methods;
    data.method_list = method_list;
    data.cp = Arc::new(cp);
    data.class_object = class_object;
    data.access = class.access_flags;
    data.major_version = class.major_version;
    data.deprecated = class.deprecated;
    data.resolved = true;
    data.set_clinit_state(clinit);

    Ok(Klass::new(ClassStatus::FormatChecked, loader, data))
}

fn module_name(class_name: &str) -> String {
    module_map::lookup(class_name)
        .map(|jmod| jmod.trim_end_matches(".jmod").to_string())
        .unwrap_or_default()
}

fn convert_constant_pool(cp: &ConstantPool) -> Result<CPool> {
    let cp_index = cp
        .entries
        .iter()
        .map(|&entry| match entry.kind {
            CpKind::StringConst => {
                let utf8_index = cp.string_refs.get(entry.slot as usize).copied();
                utf8_index
                    .and_then(|index| cp.entry(index))
                    .filter(|target| target.kind == CpKind::Utf8)
                    .ok_or_else(|| {
                        Error::class_format(format!(
                            "string constant slot {} does not name a UTF8 entry",
                            entry.slot
                        ))
                    })
            }
            _ => Ok(entry),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CPool {
        cp_index,
        utf8_refs: cp.utf8_refs.iter().map(|u| Arc::clone(&u.text)).collect(),
        class_refs: cp.class_refs.iter().map(|c| c.name).collect(),
        int_consts: cp.int_consts.clone(),
        float_consts: cp.float_consts.clone(),
        long_consts: cp.long_consts.clone(),
        double_consts: cp.double_consts.clone(),
        field_refs: cp.field_refs.clone(),
        method_refs: cp.method_refs.clone(),
        interface_refs: cp.interface_refs.clone(),
        name_and_types: cp.name_and_types.clone(),
        method_handles: cp.method_handles.clone(),
        method_types: cp.method_types.clone(),
        dynamics: cp.dynamics.clone(),
        invoke_dynamics: cp.invoke_dynamics.clone(),
        bootstrap_methods: cp.bootstrap_methods.clone(),
        resolved_method_refs: resolve_method_refs(cp, &cp.method_refs)?,
        resolved_interface_refs: resolve_method_refs(cp, &cp.interface_refs)?,
    })
}

fn resolve_method_refs(cp: &ConstantPool, refs: &[MemberRef]) -> Result<Vec<ResolvedMethodRef>> {
    refs.iter()
        .map(|r| {
            let class_name = cp.class_name(r.class_index);
            let name_and_type = cp.name_and_type_strings(r.name_and_type);
            let (Some(class_name), Some((name, desc))) = (class_name, name_and_type) else {
                return Err(Error::class_format(format!(
                    "unresolvable method ref to class index {} and name-and-type index {}",
                    r.class_index, r.name_and_type
                )));
            };
            Ok(ResolvedMethodRef {
                class_index: string_pool::intern(class_name),
                name_index: string_pool::intern(name),
                type_index: string_pool::intern(desc),
                fqn_index: string_pool::intern(&format!("{class_name}.{name}{desc}")),
            })
        })
        .collect()
}

/// Parses, checks and post-processes `bytes`, then posts the class to the
/// method area with status `FormatChecked`.
pub fn load_class_from_bytes(bytes: &[u8], loader: Loader) -> Result<Arc<Klass>> {
    define_class(bytes, loader, None)
}

/// Like [`load_class_from_bytes`], but rejects bytes holding a class other
/// than `expected` before anything is posted.
fn define_class(bytes: &[u8], loader: Loader, expected: Option<&str>) -> Result<Arc<Klass>> {
    let parsed = class::parse_class(bytes, config::current().max_java_version)?;
    class::format_check(&parsed)?;
    if let Some(expected) = expected.filter(|e| **e != *parsed.class_name) {
        return Err(Error::class_format(format!(
            "{expected} holds the wrong class {}",
            parsed.class_name
        )));
    }
    let name = Arc::clone(&parsed.class_name);
    let klass = Arc::new(post_process(parsed, loader)?);
    method_area::insert(&name, Arc::clone(&klass));
    Ok(klass)
}

/// Loads the classes named in the module's `lib/classlist` (every class when
/// there is none) through the bootstrap loader. Classes that fail to load are
/// skipped. Returns the number of classes loaded.
pub fn load_base_classes(jmod_file: &str) -> Result<usize> {
    let jmod = jmod::cached_jmod(jmod_file)?;
    let mut loaded = 0;
    let visited = jmod.walk(|bytes, path| {
        let name = path.trim_end_matches(".class");
        if method_area::fetch(name).is_some() {
            return Ok(());
        }
        match define_class(bytes, Loader::Bootstrap, Some(name)) {
            Ok(_) => loaded += 1,
            Err(e) => warn!("skipping base class {name}: {e}"),
        }
        Ok(())
    })?;
    debug!("loaded {loaded} of {visited} base classes from {jmod_file}");
    Ok(loaded)
}

/// Reduces a class reference to a loadable name: `[Lpkg/Name;` becomes
/// `pkg/Name`, other array descriptors have no class to load.
pub fn normalize_class_reference(name: &str) -> Option<&str> {
    if let Some(element) = name.strip_prefix("[L") {
        return element.strip_suffix(';').or(Some(element));
    }
    if name.starts_with('[') || name.is_empty() {
        return None;
    }
    Some(name)
}

/// Loads `name` (slash form) and its superclasses unless already present.
pub fn load_class_from_name_only(name: &str) -> Result<Arc<Klass>> {
    let wrap = |source: Error| Error::ClassLoad {
        class: name.to_string(),
        source: Box::new(source),
    };

    let Some(class_name) = normalize_class_reference(name) else {
        // primitive arrays are preloaded
        return method_area::fetch(name)
            .ok_or_else(|| wrap(throw_error(Error::ClassNotFound(name.to_string()))));
    };
    if let Some(klass) = method_area::fetch(class_name) {
        if klass.status() == ClassStatus::Initializing {
            return method_area::wait_for_class_status(class_name).map_err(wrap);
        }
        return Ok(klass);
    }
    if !method_area::reserve(class_name, Loader::Bootstrap) {
        // another thread got there first
        return method_area::wait_for_class_status(class_name).map_err(wrap);
    }

    let klass = match locate_and_load(class_name) {
        Ok(klass) => klass,
        Err(e) => {
            method_area::delete(class_name);
            return Err(wrap(e));
        }
    };

    let super_index = klass.data.super_index;
    if super_index != OBJECT_INDEX && super_index != INVALID_INDEX {
        let super_name = string_pool::lookup(super_index).ok_or_else(|| {
            wrap(throw_error(Error::internal(format!(
                "superclass index {super_index} of {class_name} missing from string pool"
            ))))
        })?;
        load_class_from_name_only(&super_name)?;
    }
    Ok(klass)
}

fn locate_and_load(name: &str) -> Result<Arc<Klass>> {
    if let Some(jmod_file) = module_map::lookup(name) {
        trace!("{name} is in {jmod_file}");
        let bytes = jmod::class_bytes(&jmod_file, name)?;
        return define_class(&bytes, Loader::Bootstrap, Some(name));
    }

    let config = config::current();
    let dotted = name.replace('/', ".");
    if let Some(jar) = &config.starting_jar {
        match cached_archive(jar).and_then(|archive| archive.load_class(&dotted)) {
            Ok(class) => return define_class(&class.bytes, Loader::Application, Some(name)),
            Err(e) => trace!("{name} not in starting jar: {e}"),
        }
    }

    for entry in &config.class_path {
        if is_archive_path(entry) {
            let archive = match cached_archive(entry) {
                Ok(archive) => archive,
                Err(e) => {
                    warn!("skipping class path entry {}: {e}", entry.display());
                    continue;
                }
            };
            if archive.has_resource(&dotted, EntryKind::ClassFile) {
                let class = archive.load_class(&dotted)?;
                return define_class(&class.bytes, Loader::Application, Some(name));
            }
        } else {
            let path = class_file_path(entry, name);
            match fs::read(&path) {
                Ok(bytes) => {
                    debug!("loading {name} from {}", path.display());
                    return define_class(&bytes, Loader::Application, Some(name));
                }
                Err(e) => trace!("{}: {e}", path.display()),
            }
        }
    }

    Err(throw_error(Error::ClassNotFound(name.to_string())))
}

fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip"))
}

fn class_file_path(dir: &Path, class_name: &str) -> PathBuf {
    let mut path = dir.to_path_buf();
    path.extend(class_name.split('/'));
    path.as_mut_os_string().push(".class");
    path
}

// opened archives, keyed by path
static ARCHIVES: LazyLock<DashMap<PathBuf, Arc<OnceCell<Arc<Archive>>>>> =
    LazyLock::new(DashMap::new);

/// Opens a JAR once and keeps it open.
pub fn cached_archive(path: &Path) -> Result<Arc<Archive>> {
    let cell = Arc::clone(ARCHIVES.entry(path.to_path_buf()).or_default().value());
    let archive = cell.get_or_try_init(|| Archive::open(path).map(Arc::new))?;
    Ok(Arc::clone(archive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_class_reference() {
        assert_eq!(normalize_class_reference("java/lang/String"), Some("java/lang/String"));
        assert_eq!(
            normalize_class_reference("[Ljava/lang/String;"),
            Some("java/lang/String")
        );
        assert_eq!(normalize_class_reference("[I"), None);
        assert_eq!(normalize_class_reference("[[Ljava/lang/String;"), None);
        assert_eq!(normalize_class_reference(""), None);
    }

    #[test]
    fn test_archive_path() {
        assert!(is_archive_path(Path::new("lib/app.jar")));
        assert!(is_archive_path(Path::new("lib/APP.ZIP")));
        assert!(!is_archive_path(Path::new("classes")));
        assert!(!is_archive_path(Path::new("java.base.jmod")));
    }

    #[test]
    fn test_class_file_path() {
        assert_eq!(
            class_file_path(Path::new("/work/classes"), "com/example/Main"),
            PathBuf::from("/work/classes/com/example/Main.class")
        );
        assert_eq!(
            class_file_path(Path::new("."), "Hello"),
            PathBuf::from("./Hello.class")
        );
    }

    #[test]
    fn test_missing_class() {
        let err = load_class_from_name_only("class_loader/test/Gherkin").unwrap_err();
        assert!(
            err.to_string()
                .starts_with("load_class_from_name_only for class_loader/test/Gherkin failed")
        );
        assert!(method_area::fetch("class_loader/test/Gherkin").is_none());
    }
}
