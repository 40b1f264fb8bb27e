//! Global method table: resolved methods keyed by `class.name+descriptor`.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use parking_lot::Mutex;

use crate::{
    class::{AttributeInfo, ExceptionTableItem, LineNumber, ParamAttribute},
    consts::MethodAccessFlag,
    runtime::{CPool, native::NativeMethod},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Java,
    Native,
}

#[derive(Debug)]
pub struct JavaMethod {
    pub class_name: Arc<str>,
    pub access_flags: MethodAccessFlag,
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Arc<[u8]>,
    pub exception_table: Vec<ExceptionTableItem>,
    pub line_numbers: Vec<LineNumber>,
    pub attributes: Vec<AttributeInfo>,
    /// String pool indices of the declared exception classes.
    pub exceptions: Vec<u32>,
    pub parameters: Vec<ParamAttribute>,
    pub deprecated: bool,
    pub cp: Arc<CPool>,
}

#[derive(Debug, Clone)]
pub enum MTEntry {
    Java(Arc<JavaMethod>),
    Native(NativeMethod),
}

impl MTEntry {
    pub fn kind(&self) -> MethodKind {
        match self {
            MTEntry::Java(_) => MethodKind::Java,
            MTEntry::Native(_) => MethodKind::Native,
        }
    }
}

static MTABLE: LazyLock<Mutex<HashMap<String, MTEntry>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

pub fn get(fqn: &str) -> Option<MTEntry> {
    MTABLE.lock().get(fqn).cloned()
}

pub fn add(fqn: impl Into<String>, entry: MTEntry) {
    MTABLE.lock().insert(fqn.into(), entry);
}

pub fn contains(fqn: &str) -> bool {
    MTABLE.lock().contains_key(fqn)
}

pub fn len() -> usize {
    MTABLE.lock().len()
}

pub(crate) fn add_all(entries: impl IntoIterator<Item = (String, MTEntry)>) {
    MTABLE.lock().extend(entries);
}
