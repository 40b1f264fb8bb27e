use std::sync::Arc;

/// Tag of a constant pool slot. `Dummy` marks slot 0 and the slot following
/// a long or double constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CpKind {
    Dummy = 0,
    Utf8 = 1,
    IntConst = 3,
    FloatConst = 4,
    LongConst = 5,
    DoubleConst = 6,
    ClassRef = 7,
    StringConst = 8,
    FieldRef = 9,
    MethodRef = 10,
    Interface = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

impl CpKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        let kind = match tag {
            1 => CpKind::Utf8,
            3 => CpKind::IntConst,
            4 => CpKind::FloatConst,
            5 => CpKind::LongConst,
            6 => CpKind::DoubleConst,
            7 => CpKind::ClassRef,
            8 => CpKind::StringConst,
            9 => CpKind::FieldRef,
            10 => CpKind::MethodRef,
            11 => CpKind::Interface,
            12 => CpKind::NameAndType,
            15 => CpKind::MethodHandle,
            16 => CpKind::MethodType,
            17 => CpKind::Dynamic,
            18 => CpKind::InvokeDynamic,
            19 => CpKind::Module,
            20 => CpKind::Package,
            _ => return None,
        };
        Some(kind)
    }
}

/// One slot of the primary index: the kind and the position in that kind's side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpEntry {
    pub kind: CpKind,
    pub slot: u16,
}

impl CpEntry {
    pub const DUMMY: CpEntry = CpEntry {
        kind: CpKind::Dummy,
        slot: 0,
    };
}

#[derive(Debug, Clone)]
pub struct Utf8Entry {
    /// Bytes as found in the class file.
    pub raw: Box<[u8]>,
    pub text: Arc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRefEntry {
    /// CP index of the class name.
    pub name_index: u16,
    /// String pool index of the class name.
    pub name: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub class_index: u16,
    pub name_and_type: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameAndType {
    pub name_index: u16,
    pub desc_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandleEntry {
    pub ref_kind: u8,
    pub ref_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DynamicEntry {
    pub bootstrap_index: u16,
    pub name_and_type: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BootstrapMethod {
    pub method_ref: u16,
    pub args: Vec<u16>,
}

/// Constant pool of a class as read from the class file.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    pub declared_count: u16,
    pub entries: Vec<CpEntry>,
    pub utf8_refs: Vec<Utf8Entry>,
    pub class_refs: Vec<ClassRefEntry>,
    pub int_consts: Vec<i32>,
    pub float_consts: Vec<f32>,
    pub long_consts: Vec<i64>,
    pub double_consts: Vec<f64>,
    /// CP index of the UTF8 entry holding each string constant.
    pub string_refs: Vec<u16>,
    pub field_refs: Vec<MemberRef>,
    pub method_refs: Vec<MemberRef>,
    pub interface_refs: Vec<MemberRef>,
    pub name_and_types: Vec<NameAndType>,
    pub method_handles: Vec<MethodHandleEntry>,
    pub method_types: Vec<u16>,
    pub dynamics: Vec<DynamicEntry>,
    pub invoke_dynamics: Vec<DynamicEntry>,
    pub module_refs: Vec<u16>,
    pub package_refs: Vec<u16>,
    pub bootstrap_methods: Vec<BootstrapMethod>,
}

impl ConstantPool {
    pub fn entry(&self, index: u16) -> Option<CpEntry> {
        self.entries.get(index as usize).copied()
    }

    pub fn kind_at(&self, index: u16) -> Option<CpKind> {
        self.entry(index).map(|e| e.kind)
    }

    pub fn is_kind(&self, index: u16, kind: CpKind) -> bool {
        self.kind_at(index) == Some(kind)
    }

    pub fn utf8_entry(&self, index: u16) -> Option<&Utf8Entry> {
        match self.entry(index)? {
            CpEntry {
                kind: CpKind::Utf8,
                slot,
            } => self.utf8_refs.get(slot as usize),
            _ => None,
        }
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        self.utf8_entry(index).map(|e| e.text.as_ref())
    }

    pub fn class_ref(&self, index: u16) -> Option<&ClassRefEntry> {
        match self.entry(index)? {
            CpEntry {
                kind: CpKind::ClassRef,
                slot,
            } => self.class_refs.get(slot as usize),
            _ => None,
        }
    }

    /// Name of the class referenced at `index`.
    pub fn class_name(&self, index: u16) -> Option<&str> {
        self.utf8(self.class_ref(index)?.name_index)
    }

    pub fn name_and_type(&self, index: u16) -> Option<&NameAndType> {
        match self.entry(index)? {
            CpEntry {
                kind: CpKind::NameAndType,
                slot,
            } => self.name_and_types.get(slot as usize),
            _ => None,
        }
    }

    /// `(name, descriptor)` of the NameAndType at `index`.
    pub fn name_and_type_strings(&self, index: u16) -> Option<(&str, &str)> {
        let nat = self.name_and_type(index)?;
        Some((self.utf8(nat.name_index)?, self.utf8(nat.desc_index)?))
    }

    /// Field, method or interface-method ref at `index`, with its kind.
    pub fn member_ref(&self, index: u16) -> Option<(CpKind, &MemberRef)> {
        let entry = self.entry(index)?;
        let table = match entry.kind {
            CpKind::FieldRef => &self.field_refs,
            CpKind::MethodRef => &self.method_refs,
            CpKind::Interface => &self.interface_refs,
            _ => return None,
        };
        table.get(entry.slot as usize).map(|r| (entry.kind, r))
    }

    pub fn has_module_entries(&self) -> bool {
        !self.module_refs.is_empty() || !self.package_refs.is_empty()
    }

    /// Appends a side-table row and its primary index entry.
    pub(crate) fn push<T>(
        &mut self,
        kind: CpKind,
        table: impl FnOnce(&mut Self) -> &mut Vec<T>,
        value: T,
    ) {
        let rows = table(self);
        let slot = rows.len() as u16;
        rows.push(value);
        self.entries.push(CpEntry { kind, slot });
    }
}
