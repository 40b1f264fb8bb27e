//! Structural checks run on a parsed class before anything else uses it.
//!
//! The checks follow JVMS 4.8. They never touch global state; the first
//! violation found is returned as a class format error.

use crate::{
    class::{CodeAttribute, ConstantPool, CpKind, FieldInfo, JavaStr, MethodInfo, ParsedClass},
    consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag},
    descriptor::{is_valid_field_descriptor, is_valid_method_descriptor},
    error::{Error, Result},
};

/// Whitespace that may not appear in field names.
const FORBIDDEN_NAME_CHARS: [char; 8] = [
    '\t', '\n', '\u{0B}', '\u{0C}', '\r', ' ', '\u{85}', '\u{A0}',
];

pub fn format_check(class: &ParsedClass) -> Result<()> {
    let checker = FormatChecker { class };
    checker.check_constant_pool()?;
    checker.check_class_refs()?;
    checker.check_fields()?;
    checker.check_methods()?;
    checker.check_counts()?;
    Ok(())
}

struct FormatChecker<'a> {
    class: &'a ParsedClass,
}

impl FormatChecker<'_> {
    fn cp(&self) -> &ConstantPool {
        &self.class.constant_pool
    }

    #[track_caller]
    fn error(&self, msg: impl std::fmt::Display) -> Error {
        Error::class_format(format!("{msg} in class {}", self.class.class_name))
    }

    #[track_caller]
    fn expect_kind(&self, index: u16, kind: CpKind, what: &str) -> Result<()> {
        if self.cp().is_kind(index, kind) {
            Ok(())
        } else {
            Err(self.error(format_args!(
                "{what} points to CP entry {index} of kind {:?}, expected {kind:?}",
                self.cp().kind_at(index)
            )))
        }
    }

    fn check_constant_pool(&self) -> Result<()> {
        let cp = self.cp();
        if cp.declared_count as usize != cp.entries.len() {
            return Err(self.error(format_args!(
                "constant pool count {} does not match actual size {}",
                cp.declared_count,
                cp.entries.len()
            )));
        }
        if cp.kind_at(0) != Some(CpKind::Dummy) {
            return Err(self.error("constant pool slot 0 is not empty"));
        }

        let mut index: u16 = 1;
        while (index as usize) < cp.entries.len() {
            let entry = cp.entries[index as usize];
            let slot = entry.slot as usize;
            match entry.kind {
                CpKind::Dummy => {
                    return Err(self.error(format_args!(
                        "empty CP entry at {index} does not follow a long or double"
                    )));
                }
                CpKind::Utf8 => self.check_utf8(index, &cp.utf8_refs[slot].raw)?,
                CpKind::IntConst | CpKind::FloatConst => {}
                CpKind::LongConst | CpKind::DoubleConst => {
                    if cp.kind_at(index + 1) != Some(CpKind::Dummy) {
                        return Err(self.error(format_args!(
                            "8-byte constant at CP entry {index} is not followed by an empty slot"
                        )));
                    }
                    index += 1;
                }
                CpKind::ClassRef => {
                    self.expect_kind(cp.class_refs[slot].name_index, CpKind::Utf8, "ClassRef")?
                }
                CpKind::StringConst => {
                    self.expect_kind(cp.string_refs[slot], CpKind::Utf8, "StringConst")?
                }
                CpKind::FieldRef => self.check_field_ref(index)?,
                CpKind::MethodRef | CpKind::Interface => self.check_method_ref(index)?,
                CpKind::NameAndType => self.check_name_and_type(index, slot)?,
                CpKind::MethodHandle => self.check_method_handle(index, slot)?,
                CpKind::MethodType => {
                    let desc_index = cp.method_types[slot];
                    self.expect_kind(desc_index, CpKind::Utf8, "MethodType")?;
                    if !cp.utf8(desc_index).is_some_and(|d| d.starts_with('(')) {
                        return Err(self.error(format_args!(
                            "MethodType at CP entry {index} does not refer to a method descriptor"
                        )));
                    }
                }
                CpKind::Dynamic => self.check_dynamic(index, slot, false)?,
                CpKind::InvokeDynamic => self.check_dynamic(index, slot, true)?,
                CpKind::Module | CpKind::Package => {
                    if !self.class.access_flags.contains(ClassAccessFlag::MODULE) {
                        return Err(self.error(format_args!(
                            "{:?} entry at {index} in a class without ACC_MODULE",
                            entry.kind
                        )));
                    }
                    let name_index = if entry.kind == CpKind::Module {
                        cp.module_refs[slot]
                    } else {
                        cp.package_refs[slot]
                    };
                    self.expect_kind(name_index, CpKind::Utf8, "Module/Package name")?;
                    let name = cp.utf8(name_index).unwrap_or_default();
                    if !is_valid_module_name(name) {
                        return Err(self.error(format_args!(
                            "invalid module or package name {name:?} at CP entry {index}"
                        )));
                    }
                }
            }
            index += 1;
        }
        Ok(())
    }

    fn check_utf8(&self, index: u16, raw: &[u8]) -> Result<()> {
        let java_str = JavaStr::new(raw);
        if java_str.has_forbidden_bytes() {
            return Err(self.error(format_args!(
                "UTF8 entry at {index} contains a zero byte or a byte in 0xF0..=0xFF"
            )));
        }
        if java_str.to_str().is_none() {
            return Err(self.error(format_args!(
                "UTF8 entry at {index} is not valid modified UTF-8"
            )));
        }
        Ok(())
    }

    /// Returns `(name, descriptor)` of the NameAndType a member ref points at.
    fn member_name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        let cp = self.cp();
        let Some((_, member)) = cp.member_ref(index) else {
            return Err(self.error(format_args!("CP entry {index} is not a member ref")));
        };
        self.expect_kind(member.class_index, CpKind::ClassRef, "member ref class")?;
        self.expect_kind(member.name_and_type, CpKind::NameAndType, "member ref")?;
        cp.name_and_type_strings(member.name_and_type)
            .ok_or_else(|| self.error(format_args!("unresolvable NameAndType for CP entry {index}")))
    }

    fn check_field_ref(&self, index: u16) -> Result<()> {
        let (name, desc) = self.member_name_and_type(index)?;
        check_unqualified_name(name, false)
            .map_err(|msg| self.error(format_args!("FieldRef at CP entry {index}: {msg}")))?;
        if !is_valid_field_descriptor(desc) {
            return Err(self.error(format_args!(
                "FieldRef at CP entry {index} has invalid descriptor {desc}"
            )));
        }
        Ok(())
    }

    fn check_method_ref(&self, index: u16) -> Result<()> {
        let is_interface = self.cp().kind_at(index) == Some(CpKind::Interface);
        let (name, desc) = self.member_name_and_type(index)?;
        if name.starts_with('<') && (is_interface || name != "<init>") {
            return Err(self.error(format_args!(
                "method ref at CP entry {index} has invalid name {name}"
            )));
        }
        if !is_valid_method_descriptor(desc) {
            return Err(self.error(format_args!(
                "method ref at CP entry {index} has invalid descriptor {desc}"
            )));
        }
        if name == "<init>" && !desc.ends_with(")V") {
            return Err(self.error(format_args!(
                "<init> at CP entry {index} must return void, found {desc}"
            )));
        }
        Ok(())
    }

    fn check_name_and_type(&self, index: u16, slot: usize) -> Result<()> {
        let nat = self.cp().name_and_types[slot];
        self.expect_kind(nat.name_index, CpKind::Utf8, "NameAndType name")?;
        self.expect_kind(nat.desc_index, CpKind::Utf8, "NameAndType descriptor")?;
        let desc = self.cp().utf8(nat.desc_index).unwrap_or_default();
        match desc.as_bytes().first() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'L' | b'S' | b'Z' | b'[' | b'(') => {
                Ok(())
            }
            _ => Err(self.error(format_args!(
                "NameAndType at CP entry {index} has invalid descriptor {desc:?}"
            ))),
        }
    }

    fn check_method_handle(&self, index: u16, slot: usize) -> Result<()> {
        let cp = self.cp();
        let handle = cp.method_handles[slot];
        let target = cp.kind_at(handle.ref_index);
        let ok = match handle.ref_kind {
            1..=4 => target == Some(CpKind::FieldRef),
            5 | 8 => target == Some(CpKind::MethodRef),
            6 | 7 => {
                target == Some(CpKind::MethodRef)
                    || (self.class.major_version >= 52 && target == Some(CpKind::Interface))
            }
            9 => target == Some(CpKind::Interface),
            _ => false,
        };
        if !ok {
            return Err(self.error(format_args!(
                "MethodHandle at CP entry {index} of reference kind {} points to {target:?}",
                handle.ref_kind
            )));
        }

        if handle.ref_kind >= 5 {
            let (name, _) = self.member_name_and_type(handle.ref_index)?;
            let invalid = match handle.ref_kind {
                5..=7 | 9 => name == "<init>" || name == "<clinit>",
                8 => name != "<init>",
                _ => false,
            };
            if invalid {
                return Err(self.error(format_args!(
                    "MethodHandle at CP entry {index} of reference kind {} may not name {name}",
                    handle.ref_kind
                )));
            }
        }
        Ok(())
    }

    fn check_dynamic(&self, index: u16, slot: usize, invoke: bool) -> Result<()> {
        let cp = self.cp();
        let entry = if invoke {
            cp.invoke_dynamics[slot]
        } else {
            cp.dynamics[slot]
        };
        if entry.bootstrap_index as usize >= cp.bootstrap_methods.len() {
            return Err(self.error(format_args!(
                "dynamic CP entry {index} refers to bootstrap method {} of {}",
                entry.bootstrap_index,
                cp.bootstrap_methods.len()
            )));
        }
        self.expect_kind(entry.name_and_type, CpKind::NameAndType, "dynamic entry")?;
        let (_, desc) = cp
            .name_and_type_strings(entry.name_and_type)
            .unwrap_or_default();
        let valid = if invoke {
            is_valid_method_descriptor(desc)
        } else {
            is_valid_field_descriptor(desc)
        };
        if !valid {
            return Err(self.error(format_args!(
                "dynamic CP entry {index} has invalid descriptor {desc:?}"
            )));
        }
        Ok(())
    }

    fn check_class_refs(&self) -> Result<()> {
        let class = self.class;
        self.expect_kind(class.this_class, CpKind::ClassRef, "this_class")?;
        if class.super_class != 0 {
            self.expect_kind(class.super_class, CpKind::ClassRef, "super_class")?;
        }
        for &interface in &class.interfaces {
            self.expect_kind(interface, CpKind::ClassRef, "interface")?;
        }
        for bootstrap in &self.cp().bootstrap_methods {
            self.expect_kind(bootstrap.method_ref, CpKind::MethodHandle, "bootstrap method")?;
        }
        Ok(())
    }

    fn check_fields(&self) -> Result<()> {
        let is_interface = self.class.is_interface();
        for field in &self.class.fields {
            self.check_field(field, is_interface)?;
        }
        Ok(())
    }

    fn check_field(&self, field: &FieldInfo, is_interface: bool) -> Result<()> {
        self.expect_kind(field.name_index, CpKind::Utf8, "field name")?;
        self.expect_kind(field.descriptor_index, CpKind::Utf8, "field descriptor")?;
        check_unqualified_name(&field.name, false)
            .map_err(|msg| self.error(format_args!("field {}: {msg}", field.name)))?;
        if !is_valid_field_descriptor(&field.descriptor) {
            return Err(self.error(format_args!(
                "field {} has invalid descriptor {}",
                field.name, field.descriptor
            )));
        }

        let flags = field.access_flags;
        if flags.visibility_count() > 1 {
            return Err(self.error(format_args!(
                "field {} has more than one of public, private and protected",
                field.name
            )));
        }
        if flags.contains(FieldAccessFlag::FINAL | FieldAccessFlag::VOLATILE) {
            return Err(self.error(format_args!(
                "field {} is both final and volatile",
                field.name
            )));
        }
        if is_interface
            && !flags.contains(
                FieldAccessFlag::PUBLIC | FieldAccessFlag::STATIC | FieldAccessFlag::FINAL,
            )
        {
            return Err(self.error(format_args!(
                "interface field {} must be public, static and final",
                field.name
            )));
        }
        Ok(())
    }

    fn check_methods(&self) -> Result<()> {
        for method in &self.class.methods {
            self.check_method(method)?;
        }
        Ok(())
    }

    fn check_method(&self, method: &MethodInfo) -> Result<()> {
        let name = method.name.as_ref();
        self.expect_kind(method.name_index, CpKind::Utf8, "method name")?;
        self.expect_kind(method.descriptor_index, CpKind::Utf8, "method descriptor")?;
        if name.starts_with('<') && name != "<init>" && name != "<clinit>" {
            return Err(self.error(format_args!("invalid method name {name}")));
        }
        if !name.starts_with('<') {
            check_unqualified_name(name, true)
                .map_err(|msg| self.error(format_args!("method {name}: {msg}")))?;
        }
        if !method.descriptor.starts_with('(') || !is_valid_method_descriptor(&method.descriptor)
        {
            return Err(self.error(format_args!(
                "method {name} has invalid descriptor {}",
                method.descriptor
            )));
        }

        self.check_method_flags(method)?;

        let needs_code = !method
            .access_flags
            .intersects(MethodAccessFlag::NATIVE | MethodAccessFlag::ABSTRACT);
        match (&method.code, needs_code) {
            (Some(code), true) => self.check_code(method, code),
            (None, false) => Ok(()),
            (Some(_), false) => Err(self.error(format_args!(
                "native or abstract method {name} has a Code attribute"
            ))),
            (None, true) => Err(self.error(format_args!(
                "method {name}{} has no Code attribute",
                method.descriptor
            ))),
        }
    }

    fn check_method_flags(&self, method: &MethodInfo) -> Result<()> {
        let flags = method.access_flags;
        let name = &method.name;
        if flags.visibility_count() > 1 {
            return Err(self.error(format_args!(
                "method {name} has more than one of public, private and protected"
            )));
        }
        if name.as_ref() == "<clinit>" {
            if self.class.major_version >= 51 && !flags.contains(MethodAccessFlag::STATIC) {
                return Err(self.error("<clinit> must be static"));
            }
            return Ok(());
        }
        if self.class.is_interface()
            && flags.intersects(
                MethodAccessFlag::PROTECTED
                    | MethodAccessFlag::FINAL
                    | MethodAccessFlag::NATIVE
                    | MethodAccessFlag::SYNCHRONIZED,
            )
        {
            return Err(self.error(format_args!(
                "interface method {name} has an illegal modifier"
            )));
        }
        if flags.contains(MethodAccessFlag::ABSTRACT)
            && flags.intersects(
                MethodAccessFlag::PRIVATE
                    | MethodAccessFlag::STATIC
                    | MethodAccessFlag::FINAL
                    | MethodAccessFlag::NATIVE
                    | MethodAccessFlag::STRICT
                    | MethodAccessFlag::SYNCHRONIZED,
            )
        {
            return Err(self.error(format_args!(
                "abstract method {name} has an illegal modifier"
            )));
        }
        Ok(())
    }

    fn check_code(&self, method: &MethodInfo, code: &CodeAttribute) -> Result<()> {
        let name = &method.name;
        let len = code.code.len();
        if len == 0 || len > 65535 {
            return Err(self.error(format_args!(
                "method {name} has invalid code length {len}"
            )));
        }
        for handler in &code.exception_table {
            let valid = handler.start_pc < handler.end_pc
                && handler.end_pc as usize <= len
                && (handler.handler_pc as usize) < len
                && (handler.catch_type == 0
                    || self.cp().is_kind(handler.catch_type, CpKind::ClassRef));
            if !valid {
                return Err(self.error(format_args!(
                    "method {name} has an invalid exception table entry {handler:?}"
                )));
            }
        }
        Ok(())
    }

    fn check_counts(&self) -> Result<()> {
        let class = self.class;
        let counts = [
            ("interfaces", class.interface_count as usize, class.interfaces.len()),
            ("fields", class.field_count as usize, class.fields.len()),
            ("methods", class.method_count as usize, class.methods.len()),
            ("attributes", class.attribute_count as usize, class.attributes.len()),
            (
                "bootstrap methods",
                class.bootstrap_count as usize,
                self.cp().bootstrap_methods.len(),
            ),
        ];
        for (what, declared, actual) in counts {
            if declared != actual {
                return Err(self.error(format_args!(
                    "{what} count {declared} does not match actual number {actual}"
                )));
            }
        }
        Ok(())
    }
}

/// Field and method names: no leading digit, none of the forbidden whitespace
/// and none of `. ; [ /`.
fn check_unqualified_name(name: &str, is_method: bool) -> Result<(), String> {
    let Some(first) = name.chars().next() else {
        return Err("empty name".to_string());
    };
    if first.is_ascii_digit() {
        return Err(format!("name {name:?} starts with a digit"));
    }
    if name.chars().any(|c| FORBIDDEN_NAME_CHARS.contains(&c)) {
        return Err(format!("name {name:?} contains whitespace"));
    }
    if name.chars().any(|c| matches!(c, '.' | ';' | '[' | '/'))
        || (is_method && name.contains(['<', '>']))
    {
        return Err(format!("name {name:?} contains an illegal character"));
    }
    Ok(())
}

/// `@` and `:` must be escaped; a backslash may only escape `@`, `:` or itself.
fn is_valid_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        match c {
            '@' | ':' => return false,
            '\\' => match chars.next() {
                Some('@' | ':' | '\\') => {}
                _ => return false,
            },
            _ => {}
        }
    }
    true
}
