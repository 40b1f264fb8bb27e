//! Typed reads from a loaded class's constant pool.

use std::sync::Arc;

use crate::{
    class::CpKind,
    runtime::{CPool, ResolvedMethodRef},
    string_pool,
};

/// Value of a single constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CpValue {
    /// Index out of range, a placeholder slot or a dangling reference.
    Error,
    /// Entries made of two CP indices, such as a method ref's class and name-and-type.
    StructAddr(u16, u16),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Module and package entries, which are not read through this path.
    Empty,
}

pub fn fetch_cp_entry(cp: &CPool, index: u16) -> CpValue {
    if index == 0 {
        return CpValue::Error;
    }
    let Some(entry) = cp.entry(index) else {
        return CpValue::Error;
    };
    let slot = entry.slot as usize;

    let value = match entry.kind {
        CpKind::IntConst => cp.int_consts.get(slot).map(|&i| CpValue::Int(i as i64)),
        CpKind::LongConst => cp.long_consts.get(slot).map(|&l| CpValue::Int(l)),
        CpKind::MethodType => cp.method_types.get(slot).map(|&t| CpValue::Int(t as i64)),
        CpKind::FloatConst => cp.float_consts.get(slot).map(|&f| CpValue::Float(f as f64)),
        CpKind::DoubleConst => cp.double_consts.get(slot).map(|&d| CpValue::Float(d)),
        CpKind::ClassRef => cp
            .class_refs
            .get(slot)
            .and_then(|&name| string_pool::lookup(name))
            .map(CpValue::Str),
        CpKind::Utf8 => cp.utf8_refs.get(slot).cloned().map(CpValue::Str),
        CpKind::Dynamic => cp
            .dynamics
            .get(slot)
            .map(|d| CpValue::StructAddr(d.bootstrap_index, d.name_and_type)),
        CpKind::InvokeDynamic => cp
            .invoke_dynamics
            .get(slot)
            .map(|d| CpValue::StructAddr(d.bootstrap_index, d.name_and_type)),
        CpKind::Interface => cp
            .interface_refs
            .get(slot)
            .map(|r| CpValue::StructAddr(r.class_index, r.name_and_type)),
        CpKind::MethodRef => cp
            .method_refs
            .get(slot)
            .map(|r| CpValue::StructAddr(r.class_index, r.name_and_type)),
        CpKind::FieldRef => cp
            .field_refs
            .get(slot)
            .map(|r| CpValue::StructAddr(r.class_index, r.name_and_type)),
        CpKind::MethodHandle => cp
            .method_handles
            .get(slot)
            .map(|h| CpValue::StructAddr(h.ref_kind as u16, h.ref_index)),
        CpKind::NameAndType => cp
            .name_and_types
            .get(slot)
            .map(|n| CpValue::StructAddr(n.name_index, n.desc_index)),
        CpKind::Module | CpKind::Package => Some(CpValue::Empty),
        // string constants are folded into UTF8 entries when the class is loaded
        CpKind::StringConst | CpKind::Dummy => None,
    };
    value.unwrap_or(CpValue::Error)
}

/// A method or interface-method ref with its names looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRefInfo {
    pub class_name: Arc<str>,
    pub name: Arc<str>,
    pub descriptor: Arc<str>,
    /// `class_name.name+descriptor`
    pub fqn: Arc<str>,
}

impl MethodRefInfo {
    fn from_resolved(resolved: &ResolvedMethodRef) -> Option<Self> {
        Some(MethodRefInfo {
            class_name: string_pool::lookup(resolved.class_index)?,
            name: string_pool::lookup(resolved.name_index)?,
            descriptor: string_pool::lookup(resolved.type_index)?,
            fqn: string_pool::lookup(resolved.fqn_index)?,
        })
    }
}

pub fn method_info_from_cp_methodref(cp: &CPool, index: u16) -> Option<MethodRefInfo> {
    if cp.kind_at(index)? != CpKind::MethodRef {
        return None;
    }
    MethodRefInfo::from_resolved(cp.resolved_method_ref(index)?)
}

pub fn method_info_from_cp_interface_ref(cp: &CPool, index: u16) -> Option<MethodRefInfo> {
    if cp.kind_at(index)? != CpKind::Interface {
        return None;
    }
    MethodRefInfo::from_resolved(cp.resolved_method_ref(index)?)
}

/// Name of the class a `ClassRef` entry points to.
pub fn class_name_from_cp_classref(cp: &CPool, index: u16) -> Option<Arc<str>> {
    match cp.kind_at(index)? {
        CpKind::ClassRef => match fetch_cp_entry(cp, index) {
            CpValue::Str(name) => Some(name),
            _ => None,
        },
        _ => None,
    }
}

pub fn utf8_from_cp_entry(cp: &CPool, index: u16) -> Option<Arc<str>> {
    cp.utf8(index).cloned()
}

/// Reads a field or method ref as `(class name, member name, descriptor)`.
pub fn member_info_from_cp_ref(cp: &CPool, index: u16) -> Option<(Arc<str>, Arc<str>, Arc<str>)> {
    let CpValue::StructAddr(class_index, nat_index) = fetch_cp_entry(cp, index) else {
        return None;
    };
    if !matches!(
        cp.kind_at(index)?,
        CpKind::FieldRef | CpKind::MethodRef | CpKind::Interface
    ) {
        return None;
    }
    let class_name = class_name_from_cp_classref(cp, class_index)?;
    let CpValue::StructAddr(name_index, desc_index) = fetch_cp_entry(cp, nat_index) else {
        return None;
    };
    Some((
        class_name,
        utf8_from_cp_entry(cp, name_index)?,
        utf8_from_cp_entry(cp, desc_index)?,
    ))
}
