use std::sync::Arc;

mod java_str;

pub use java_str::*;

use crate::{
    class::ConstantPool,
    consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag, ParameterAccessFlag},
};

/// A class file after parsing, before post-processing.
#[derive(Debug)]
pub struct ParsedClass {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: ClassAccessFlag,
    pub this_class: u16,
    /// String pool index of this class's name.
    pub class_name_index: u32,
    pub class_name: Arc<str>,
    pub super_class: u16,
    /// String pool index of the superclass name, `INVALID_INDEX` for `java/lang/Object`.
    pub super_class_index: u32,
    pub super_class_name: Option<Arc<str>>,
    pub interface_count: u16,
    pub interfaces: Vec<u16>,
    pub field_count: u16,
    pub fields: Vec<FieldInfo>,
    pub method_count: u16,
    pub methods: Vec<MethodInfo>,
    pub attribute_count: u16,
    pub attributes: Vec<AttributeInfo>,
    pub bootstrap_count: u16,
    pub source_file: Option<Arc<str>>,
    pub deprecated: bool,
}

impl ParsedClass {
    pub fn package_name(&self) -> &str {
        match self.class_name.rsplit_once('/') {
            Some((package, _)) => package,
            None => "",
        }
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::INTERFACE)
    }
}

/// Value of a `ConstantValue` attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Arc<str>),
}

#[derive(Debug)]
pub struct FieldInfo {
    pub access_flags: FieldAccessFlag,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub name: Arc<str>,
    pub descriptor: Arc<str>,
    /// Only read for static fields.
    pub const_value: Option<ConstValue>,
    pub deprecated: bool,
    pub attributes: Vec<AttributeInfo>,
}

impl FieldInfo {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlag::STATIC)
    }
}

#[derive(Debug)]
pub struct MethodInfo {
    pub access_flags: MethodAccessFlag,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub name: Arc<str>,
    pub descriptor: Arc<str>,
    pub code: Option<CodeAttribute>,
    /// String pool indices of the classes named in `Exceptions`.
    pub exceptions: Vec<u32>,
    pub parameters: Vec<ParamAttribute>,
    pub deprecated: bool,
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Arc<[u8]>,
    pub exception_table: Vec<ExceptionTableItem>,
    pub attributes: Vec<AttributeInfo>,
    /// Sorted by bytecode position.
    pub line_numbers: Vec<LineNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableItem {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// CP index of the caught class; 0 catches everything.
    pub catch_type: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub bc_pos: u16,
    pub src_line: u16,
}

/// One entry of a `MethodParameters` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamAttribute {
    /// Empty for a nameless parameter.
    pub name: Arc<str>,
    pub access_flags: ParameterAccessFlag,
}

/// An attribute kept as raw bytes.
#[derive(Debug, Clone)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub name: Arc<str>,
    pub info: Vec<u8>,
}
