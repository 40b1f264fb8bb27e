use std::sync::Arc;

use crate::class::{
    BootstrapMethod, CpEntry, CpKind, DynamicEntry, MemberRef, MethodHandleEntry, NameAndType,
};

/// A method or interface-method ref reduced to string pool indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedMethodRef {
    pub class_index: u32,
    pub name_index: u32,
    pub type_index: u32,
    /// `class + "." + name + type`
    pub fqn_index: u32,
}

/// Constant pool of a loaded class.
///
/// `StringConst` entries are folded into the UTF8 entry they name. Every
/// method ref and interface ref has a resolved counterpart at the same slot.
#[derive(Debug, Clone, Default)]
pub struct CPool {
    pub cp_index: Vec<CpEntry>,
    pub utf8_refs: Vec<Arc<str>>,
    /// String pool indices of class names.
    pub class_refs: Vec<u32>,
    pub int_consts: Vec<i32>,
    pub float_consts: Vec<f32>,
    pub long_consts: Vec<i64>,
    pub double_consts: Vec<f64>,
    pub field_refs: Vec<MemberRef>,
    pub method_refs: Vec<MemberRef>,
    pub interface_refs: Vec<MemberRef>,
    pub name_and_types: Vec<NameAndType>,
    pub method_handles: Vec<MethodHandleEntry>,
    pub method_types: Vec<u16>,
    pub dynamics: Vec<DynamicEntry>,
    pub invoke_dynamics: Vec<DynamicEntry>,
    pub bootstrap_methods: Vec<BootstrapMethod>,
    pub resolved_method_refs: Vec<ResolvedMethodRef>,
    pub resolved_interface_refs: Vec<ResolvedMethodRef>,
}

impl CPool {
    pub fn len(&self) -> usize {
        self.cp_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_index.is_empty()
    }

    pub fn entry(&self, index: u16) -> Option<CpEntry> {
        self.cp_index.get(index as usize).copied()
    }

    pub fn kind_at(&self, index: u16) -> Option<CpKind> {
        self.entry(index).map(|e| e.kind)
    }

    pub fn utf8(&self, index: u16) -> Option<&Arc<str>> {
        match self.entry(index)? {
            CpEntry {
                kind: CpKind::Utf8,
                slot,
            } => self.utf8_refs.get(slot as usize),
            _ => None,
        }
    }

    pub fn resolved_method_ref(&self, index: u16) -> Option<&ResolvedMethodRef> {
        match self.entry(index)? {
            CpEntry {
                kind: CpKind::MethodRef,
                slot,
            } => self.resolved_method_refs.get(slot as usize),
            CpEntry {
                kind: CpKind::Interface,
                slot,
            } => self.resolved_interface_refs.get(slot as usize),
            _ => None,
        }
    }
}
