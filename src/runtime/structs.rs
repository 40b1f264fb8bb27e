use std::{
    cell::Cell,
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::{ReentrantMutex, RwLock};

pub use constant_pool::*;

use crate::{
    class::{AttributeInfo, CodeAttribute, ConstValue, ParamAttribute},
    consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag},
    string_pool::{self, INVALID_INDEX, OBJECT_INDEX},
};

mod constant_pool;

/// Progress of a class through loading. Variants are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassStatus {
    Initializing,
    FormatChecked,
    Verified,
    Linked,
    Instantiated,
}

impl ClassStatus {
    pub fn as_char(self) -> char {
        match self {
            ClassStatus::Initializing => 'I',
            ClassStatus::FormatChecked => 'F',
            ClassStatus::Verified => 'V',
            ClassStatus::Linked => 'L',
            ClassStatus::Instantiated => 'N',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    Bootstrap,
    Extension,
    Application,
}

impl Loader {
    /// The loader this one delegates to.
    pub fn parent(self) -> Option<Loader> {
        match self {
            Loader::Bootstrap => None,
            Loader::Extension => Some(Loader::Bootstrap),
            Loader::Application => Some(Loader::Extension),
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Loader::Bootstrap => "bootstrap",
            Loader::Extension => "extension",
            Loader::Application => "application",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClinitState {
    /// The class has no `<clinit>()V`.
    None,
    NotRun,
    Running,
    Done,
}

/// A class in the method area.
#[derive(Debug)]
pub struct Klass {
    status: RwLock<ClassStatus>,
    pub loader: Loader,
    pub data: ClData,
}

impl Klass {
    pub fn new(status: ClassStatus, loader: Loader, data: ClData) -> Self {
        Self {
            status: RwLock::new(status),
            loader,
            data,
        }
    }

    pub fn status(&self) -> ClassStatus {
        *self.status.read()
    }

    pub fn set_status(&self, status: ClassStatus) {
        *self.status.write() = status;
    }

    /// Runs `f` with exclusive access to the status.
    pub(crate) fn with_status<T>(&self, f: impl FnOnce(&mut ClassStatus) -> T) -> T {
        f(&mut self.status.write())
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }
}

#[derive(Debug)]
pub struct ClData {
    pub name: Arc<str>,
    pub name_index: u32,
    /// `INVALID_INDEX` for `java/lang/Object`.
    pub super_index: u32,
    pub module: String,
    pub package: String,
    pub source_file: Option<Arc<str>>,
    /// Slots into `cp.utf8_refs` holding the interface names.
    pub interfaces: Vec<u16>,
    pub fields: Vec<Field>,
    /// Keyed by `name + descriptor`.
    pub methods: HashMap<String, Method>,
    /// `name + descriptor` to the FQN of the class declaring it.
    pub method_list: HashMap<String, String>,
    pub cp: Arc<CPool>,
    /// Key of the class's mirror in the mirror map.
    pub class_object: u32,
    pub access: ClassAccessFlag,
    pub major_version: u16,
    pub deprecated: bool,
    pub clinit: ReentrantMutex<Cell<ClinitState>>,
    pub resolved: bool,
    code_checked: AtomicBool,
}

/// Methods every class inherits from `java/lang/Object`.
pub const OBJECT_METHODS: [&str; 10] = [
    "clone()Ljava/lang/Object;",
    "equals(Ljava/lang/Object;)Z",
    "getClass()Ljava/lang/Class;",
    "hashCode()I",
    "notify()V",
    "notifyAll()V",
    "toString()Ljava/lang/String;",
    "wait()V",
    "wait(J)V",
    "wait(JI)V",
];

impl ClData {
    /// Class data with no members, used for array classes and as a base for builders.
    pub fn empty(name: &str) -> Self {
        let name_index = string_pool::intern(name);
        let package = match name.rsplit_once('/') {
            Some((package, _)) => package.to_string(),
            None => String::new(),
        };
        ClData {
            name: Arc::from(name),
            name_index,
            super_index: if name_index == OBJECT_INDEX {
                INVALID_INDEX
            } else {
                OBJECT_INDEX
            },
            module: String::new(),
            package,
            source_file: None,
            interfaces: vec![],
            fields: vec![],
            methods: HashMap::new(),
            method_list: object_method_list(),
            cp: Arc::new(CPool::default()),
            class_object: name_index,
            access: ClassAccessFlag::PUBLIC,
            major_version: 0,
            deprecated: false,
            clinit: ReentrantMutex::new(Cell::new(ClinitState::None)),
            resolved: false,
            code_checked: AtomicBool::new(false),
        }
    }

    pub fn super_name(&self) -> Option<Arc<str>> {
        if self.super_index == INVALID_INDEX {
            return None;
        }
        string_pool::lookup(self.super_index)
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces
            .iter()
            .filter_map(|&slot| self.cp.utf8_refs.get(slot as usize))
            .map(AsRef::as_ref)
    }

    pub fn clinit_state(&self) -> ClinitState {
        self.clinit.lock().get()
    }

    pub fn set_clinit_state(&self, state: ClinitState) {
        self.clinit.lock().set(state);
    }

    pub fn code_checked(&self) -> bool {
        self.code_checked.load(Ordering::Acquire)
    }

    pub(crate) fn mark_code_checked(&self) {
        self.code_checked.store(true, Ordering::Release);
    }

    pub fn is_abstract(&self) -> bool {
        self.access.contains(ClassAccessFlag::ABSTRACT)
    }
}

pub(crate) fn object_method_list() -> HashMap<String, String> {
    OBJECT_METHODS
        .iter()
        .map(|m| (m.to_string(), format!("java/lang/Object.{m}")))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Field {
    pub access_flags: FieldAccessFlag,
    /// String pool index of the field name.
    pub name_index: u32,
    pub name: Arc<str>,
    pub descriptor: Arc<str>,
    pub is_static: bool,
    pub const_value: Option<ConstValue>,
}

pub type CodeAttrib = CodeAttribute;

#[derive(Debug, Clone)]
pub struct Method {
    pub access_flags: MethodAccessFlag,
    pub name: Arc<str>,
    pub descriptor: Arc<str>,
    /// `None` for native and abstract methods.
    pub code: Option<CodeAttrib>,
    pub attributes: Vec<AttributeInfo>,
    /// String pool indices of the declared exception classes.
    pub exceptions: Vec<u32>,
    pub parameters: Vec<ParamAttribute>,
    pub deprecated: bool,
}

impl Method {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::STATIC)
    }
}
