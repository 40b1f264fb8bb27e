use std::sync::Arc;

use log::trace;
use nom::{
    IResult, Parser,
    bytes::complete::take,
    error::ErrorKind,
    multi::count,
    number::complete::{be_f32, be_f64, be_i32, be_i64, be_u16, be_u32, u8},
};

use crate::{
    class::{
        AttributeInfo, BootstrapMethod, ClassRefEntry, CodeAttribute, ConstValue, ConstantPool,
        CpEntry, CpKind, DynamicEntry, ExceptionTableItem, FieldInfo, JavaStr, LineNumber,
        MemberRef, MethodHandleEntry, MethodInfo, NameAndType, ParamAttribute, ParsedClass,
        Utf8Entry,
    },
    consts::{
        ClassAccessFlag, FieldAccessFlag, JAVA_VERSION_OFFSET, MethodAccessFlag,
        OBJECT_CLASS_NAME, ParameterAccessFlag, is_jdk_class,
    },
    error::{Error, Result},
    string_pool::{self, INVALID_INDEX},
};

const MAGIC: u32 = 0xCAFE_BABE;

#[derive(Debug)]
pub struct ParseError {
    /// Address of the first unparsed byte.
    position: usize,
    /// Set when `position` points into an attribute body rather than the class bytes.
    in_attribute: bool,
    kind: ParseErrorKind,
}

#[derive(Debug)]
enum ParseErrorKind {
    Nom(ErrorKind),
    Message(String),
}

impl ParseError {
    fn message(input: &[u8], msg: impl Into<String>) -> Self {
        Self {
            position: input.as_ptr() as usize,
            in_attribute: false,
            kind: ParseErrorKind::Message(msg.into()),
        }
    }
}

impl nom::error::ParseError<&[u8]> for ParseError {
    fn from_error_kind(input: &[u8], kind: ErrorKind) -> Self {
        Self {
            position: input.as_ptr() as usize,
            in_attribute: false,
            kind: ParseErrorKind::Nom(kind),
        }
    }

    fn append(_: &[u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a [u8], T, ParseError>;

fn fail<T>(input: &[u8], msg: impl Into<String>) -> PResult<'_, T> {
    Err(nom::Err::Failure(ParseError::message(input, msg)))
}

/// Marks an error raised while parsing an attribute body.
fn nested(err: nom::Err<ParseError>) -> nom::Err<ParseError> {
    err.map(|e| ParseError {
        in_attribute: true,
        ..e
    })
}

/// Parses a class file. `max_java_version` is a Java release number, e.g. 21.
pub fn parse_class(bytes: &[u8], max_java_version: u16) -> Result<ParsedClass> {
    match class_file(bytes, max_java_version) {
        Ok((_, class)) => {
            trace!("parsed class {}", class.class_name);
            Ok(class)
        }
        Err(nom::Err::Incomplete(_)) => Err(Error::class_format("truncated class file")),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let location = if e.in_attribute {
                " inside an attribute".to_string()
            } else {
                format!(" at byte {}", e.position.saturating_sub(bytes.as_ptr() as usize))
            };
            Err(match e.kind {
                ParseErrorKind::Message(msg) => Error::class_format(msg),
                ParseErrorKind::Nom(ErrorKind::Eof) => {
                    Error::class_format(format!("truncated class file{location}"))
                }
                ParseErrorKind::Nom(kind) => Error::class_format(format!(
                    "malformed class file{location} ({})",
                    kind.description()
                )),
            })
        }
    }
}

fn class_file(input: &[u8], max_java_version: u16) -> PResult<'_, ParsedClass> {
    let (input, (minor, major)) = parse_header(input, max_java_version)?;
    let (input, mut constant_pool) = parse_constant_pool(input)?;
    let input = intern_class_refs(input, &mut constant_pool)?;

    let (input, access_flags) = be_u16(input)?;
    let access_flags = ClassAccessFlag::from_bits_retain(access_flags);
    if constant_pool.has_module_entries() && !access_flags.contains(ClassAccessFlag::MODULE) {
        return fail(input, "Module and Package entries require ACC_MODULE");
    }

    let (input, this_class) = be_u16(input)?;
    let Some(&ClassRefEntry {
        name: class_name_index,
        ..
    }) = constant_pool.class_ref(this_class)
    else {
        return fail(
            input,
            format!("this_class index {this_class} is not a ClassRef"),
        );
    };
    let Some(class_name) = string_pool::lookup(class_name_index) else {
        return fail(input, "class name missing from string pool");
    };

    let (input, super_class) = be_u16(input)?;
    let (super_class_index, super_class_name) = if super_class == 0 {
        if class_name.as_ref() != OBJECT_CLASS_NAME
            && !access_flags.contains(ClassAccessFlag::MODULE)
        {
            return fail(
                input,
                format!("class {class_name} has no superclass but is not {OBJECT_CLASS_NAME}"),
            );
        }
        (INVALID_INDEX, None)
    } else {
        let Some(super_ref) = constant_pool.class_ref(super_class) else {
            return fail(
                input,
                format!("super_class index {super_class} is not a ClassRef"),
            );
        };
        (super_ref.name, string_pool::lookup(super_ref.name))
    };

    let jdk_class = is_jdk_class(&class_name);

    let (input, interface_count) = be_u16(input)?;
    let (input, interfaces) = count(be_u16, interface_count as _).parse(input)?;

    let (input, field_count) = be_u16(input)?;
    let (input, fields) = count(parse_field(&constant_pool), field_count as _).parse(input)?;

    let (input, method_count) = be_u16(input)?;
    let (input, methods) =
        count(parse_method(&constant_pool, jdk_class), method_count as _).parse(input)?;

    let (input, attribute_count) = be_u16(input)?;
    let (input, attributes) =
        count(parse_attribute_raw(&constant_pool), attribute_count as _).parse(input)?;

    let mut class = ParsedClass {
        minor_version: minor,
        major_version: major,
        constant_pool,
        access_flags,
        this_class,
        class_name_index,
        class_name,
        super_class,
        super_class_index,
        super_class_name,
        interface_count,
        interfaces,
        field_count,
        fields,
        method_count,
        methods,
        attribute_count,
        attributes: vec![],
        bootstrap_count: 0,
        source_file: None,
        deprecated: false,
    };
    for attribute in attributes {
        apply_class_attribute(&mut class, &attribute).map_err(nested)?;
        class.attributes.push(attribute);
    }

    if !input.is_empty() {
        return fail(
            input,
            format!("{} extra bytes at end of class file", input.len()),
        );
    }

    Ok((input, class))
}

fn parse_header(input: &[u8], max_java_version: u16) -> PResult<'_, (u16, u16)> {
    let (input, magic) = be_u32(input)?;
    if magic != MAGIC {
        return fail(input, format!("invalid magic number 0x{magic:08X}"));
    }
    let (input, minor) = be_u16(input)?;
    let (input, major) = be_u16(input)?;
    if major > max_java_version.saturating_add(JAVA_VERSION_OFFSET) {
        return fail(
            input,
            format!(
                "class file version {major}.{minor}: this JVM supports only Java versions through Java {max_java_version}"
            ),
        );
    }
    Ok((input, (minor, major)))
}

fn parse_constant_pool(input: &[u8]) -> PResult<'_, ConstantPool> {
    let (mut input, constant_pool_count) = be_u16(input)?;
    if constant_pool_count < 2 {
        return fail(
            input,
            format!("invalid constant pool count {constant_pool_count}"),
        );
    }

    let mut cp = ConstantPool {
        declared_count: constant_pool_count,
        entries: Vec::with_capacity(constant_pool_count as usize),
        ..Default::default()
    };
    cp.entries.push(CpEntry::DUMMY);

    while cp.entries.len() < constant_pool_count as usize {
        let kind;
        (input, kind) = parse_constant(input, &mut cp)?;
        if matches!(kind, CpKind::LongConst | CpKind::DoubleConst) {
            if cp.entries.len() >= constant_pool_count as usize {
                return fail(
                    input,
                    format!(
                        "8-byte constant at index {} has no room for its second slot",
                        cp.entries.len() - 1
                    ),
                );
            }
            cp.entries.push(CpEntry::DUMMY);
        }
    }

    Ok((input, cp))
}

fn parse_constant<'a>(mut input: &'a [u8], cp: &mut ConstantPool) -> PResult<'a, CpKind> {
    let index = cp.entries.len();
    let tag;
    (input, tag) = u8(input)?;
    let Some(kind) = CpKind::from_tag(tag) else {
        return fail(
            input,
            format!("invalid constant pool tag {tag} at index {index}"),
        );
    };

    match kind {
        CpKind::Utf8 => {
            let length;
            (input, length) = be_u16(input)?;
            let bytes;
            (input, bytes) = take(length)(input)?;
            let text = Arc::from(JavaStr::new(bytes).to_str_lossy());
            let entry = Utf8Entry {
                raw: bytes.into(),
                text,
            };
            cp.push(kind, |cp| &mut cp.utf8_refs, entry);
        }
        CpKind::IntConst => {
            let int;
            (input, int) = be_i32(input)?;
            cp.push(kind, |cp| &mut cp.int_consts, int);
        }
        CpKind::FloatConst => {
            let float;
            (input, float) = be_f32(input)?;
            cp.push(kind, |cp| &mut cp.float_consts, float);
        }
        CpKind::LongConst => {
            let long;
            (input, long) = be_i64(input)?;
            cp.push(kind, |cp| &mut cp.long_consts, long);
        }
        CpKind::DoubleConst => {
            let double;
            (input, double) = be_f64(input)?;
            cp.push(kind, |cp| &mut cp.double_consts, double);
        }
        CpKind::ClassRef => {
            let name_index;
            (input, name_index) = be_u16(input)?;
            // the name is interned once the whole pool is read
            let entry = ClassRefEntry {
                name_index,
                name: INVALID_INDEX,
            };
            cp.push(kind, |cp| &mut cp.class_refs, entry);
        }
        CpKind::StringConst => {
            let string_index;
            (input, string_index) = be_u16(input)?;
            cp.push(kind, |cp| &mut cp.string_refs, string_index);
        }
        CpKind::FieldRef | CpKind::MethodRef | CpKind::Interface => {
            let (class_index, name_and_type);
            (input, class_index) = be_u16(input)?;
            (input, name_and_type) = be_u16(input)?;
            let entry = MemberRef {
                class_index,
                name_and_type,
            };
            match kind {
                CpKind::FieldRef => cp.push(kind, |cp| &mut cp.field_refs, entry),
                CpKind::MethodRef => cp.push(kind, |cp| &mut cp.method_refs, entry),
                _ => cp.push(kind, |cp| &mut cp.interface_refs, entry),
            }
        }
        CpKind::NameAndType => {
            let (name_index, desc_index);
            (input, name_index) = be_u16(input)?;
            (input, desc_index) = be_u16(input)?;
            let entry = NameAndType {
                name_index,
                desc_index,
            };
            cp.push(kind, |cp| &mut cp.name_and_types, entry);
        }
        CpKind::MethodHandle => {
            let (ref_kind, ref_index);
            (input, ref_kind) = u8(input)?;
            (input, ref_index) = be_u16(input)?;
            if !(1..=9).contains(&ref_kind) {
                return fail(
                    input,
                    format!("MethodHandle at index {index} has invalid reference kind {ref_kind}"),
                );
            }
            let entry = MethodHandleEntry {
                ref_kind,
                ref_index,
            };
            cp.push(kind, |cp| &mut cp.method_handles, entry);
        }
        CpKind::MethodType => {
            let desc_index;
            (input, desc_index) = be_u16(input)?;
            cp.push(kind, |cp| &mut cp.method_types, desc_index);
        }
        CpKind::Dynamic | CpKind::InvokeDynamic => {
            let (bootstrap_index, name_and_type);
            (input, bootstrap_index) = be_u16(input)?;
            (input, name_and_type) = be_u16(input)?;
            let entry = DynamicEntry {
                bootstrap_index,
                name_and_type,
            };
            if kind == CpKind::Dynamic {
                cp.push(kind, |cp| &mut cp.dynamics, entry);
            } else {
                cp.push(kind, |cp| &mut cp.invoke_dynamics, entry);
            }
        }
        CpKind::Module | CpKind::Package => {
            let name_index;
            (input, name_index) = be_u16(input)?;
            if kind == CpKind::Module {
                cp.push(kind, |cp| &mut cp.module_refs, name_index);
            } else {
                cp.push(kind, |cp| &mut cp.package_refs, name_index);
            }
        }
        CpKind::Dummy => unreachable!("from_tag never yields Dummy"),
    }

    Ok((input, kind))
}

fn intern_class_refs<'a>(
    input: &'a [u8],
    cp: &mut ConstantPool,
) -> Result<&'a [u8], nom::Err<ParseError>> {
    for i in 0..cp.class_refs.len() {
        let name_index = cp.class_refs[i].name_index;
        let Some(name) = cp.utf8(name_index) else {
            return Err(nom::Err::Failure(ParseError::message(
                input,
                format!("ClassRef name index {name_index} does not point to a UTF8 entry"),
            )));
        };
        let name = string_pool::intern(name);
        cp.class_refs[i].name = name;
    }
    Ok(input)
}

fn utf8_at<'a, 'c>(
    input: &'a [u8],
    cp: &'c ConstantPool,
    index: u16,
    what: &str,
) -> PResult<'a, &'c str> {
    match cp.utf8(index) {
        Some(s) => Ok((input, s)),
        None => fail(input, format!("{what} index {index} is not a UTF8 entry")),
    }
}

fn parse_attribute_raw(
    cp: &ConstantPool,
) -> impl FnMut(&[u8]) -> PResult<'_, AttributeInfo> + '_ {
    move |input| {
        let (input, name_index) = be_u16(input)?;
        let (input, attribute_length) = be_u32(input)?;
        let (input, info) = take(attribute_length)(input)?;
        let (_, name) = utf8_at(input, cp, name_index, "attribute name")?;
        Ok((
            input,
            AttributeInfo {
                name_index,
                name: Arc::from(name),
                info: info.to_vec(),
            },
        ))
    }
}

fn parse_field(cp: &ConstantPool) -> impl FnMut(&[u8]) -> PResult<'_, FieldInfo> + '_ {
    move |input| {
        let (input, access_flags) = be_u16(input)?;
        let access_flags = FieldAccessFlag::from_bits_retain(access_flags);
        let (input, name_index) = be_u16(input)?;
        let (input, descriptor_index) = be_u16(input)?;
        let (_, name) = utf8_at(input, cp, name_index, "field name")?;
        let (_, descriptor) = utf8_at(input, cp, descriptor_index, "field descriptor")?;

        let (input, attribute_count) = be_u16(input)?;
        let (input, attributes) =
            count(parse_attribute_raw(cp), attribute_count as _).parse(input)?;

        let mut field = FieldInfo {
            access_flags,
            name_index,
            descriptor_index,
            name: Arc::from(name),
            descriptor: Arc::from(descriptor),
            const_value: None,
            deprecated: false,
            attributes: vec![],
        };
        for attribute in attributes {
            match attribute.name.as_ref() {
                // ignored for instance fields
                "ConstantValue" if field.is_static() => {
                    let (_, value) =
                        parse_constant_value(cp, &field)(&attribute.info).map_err(nested)?;
                    field.const_value = Some(value);
                }
                "Deprecated" => field.deprecated = true,
                _ => {}
            }
            field.attributes.push(attribute);
        }
        Ok((input, field))
    }
}

fn parse_constant_value<'c>(
    cp: &'c ConstantPool,
    field: &'c FieldInfo,
) -> impl FnMut(&[u8]) -> PResult<'_, ConstValue> + 'c {
    move |input| {
        let (input, index) = be_u16(input)?;
        let Some(entry) = cp.entry(index) else {
            return fail(
                input,
                format!("ConstantValue index {index} of field {} out of range", field.name),
            );
        };
        let slot = entry.slot as usize;
        let value = match (entry.kind, field.descriptor.as_bytes().first()) {
            (CpKind::IntConst, Some(b'I' | b'S' | b'C' | b'B' | b'Z')) => {
                ConstValue::Int(cp.int_consts[slot])
            }
            (CpKind::LongConst, Some(b'J')) => ConstValue::Long(cp.long_consts[slot]),
            (CpKind::FloatConst, Some(b'F')) => ConstValue::Float(cp.float_consts[slot]),
            (CpKind::DoubleConst, Some(b'D')) => ConstValue::Double(cp.double_consts[slot]),
            (CpKind::StringConst, Some(b'L')) if field.descriptor.as_ref() == "Ljava/lang/String;" => {
                let string_index = cp.string_refs[slot];
                let (_, s) = utf8_at(input, cp, string_index, "string constant")?;
                ConstValue::String(Arc::from(s))
            }
            (kind, _) => {
                return fail(
                    input,
                    format!(
                        "ConstantValue of kind {kind:?} does not match field {} of type {}",
                        field.name, field.descriptor
                    ),
                );
            }
        };
        Ok((input, value))
    }
}

fn parse_method(
    cp: &ConstantPool,
    jdk_class: bool,
) -> impl FnMut(&[u8]) -> PResult<'_, MethodInfo> + '_ {
    move |input| {
        let (input, access_flags) = be_u16(input)?;
        let access_flags = MethodAccessFlag::from_bits_retain(access_flags);
        let (input, name_index) = be_u16(input)?;
        let (input, descriptor_index) = be_u16(input)?;
        let (_, name) = utf8_at(input, cp, name_index, "method name")?;
        let (_, descriptor) = utf8_at(input, cp, descriptor_index, "method descriptor")?;

        let (input, attribute_count) = be_u16(input)?;
        let (input, attributes) =
            count(parse_attribute_raw(cp), attribute_count as _).parse(input)?;

        let mut method = MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            name: Arc::from(name),
            descriptor: Arc::from(descriptor),
            code: None,
            exceptions: vec![],
            parameters: vec![],
            deprecated: false,
            attributes: vec![],
        };
        for attribute in attributes {
            match attribute.name.as_ref() {
                "Code" => {
                    if method.code.is_some() {
                        return fail(
                            input,
                            format!("method {name}{descriptor} has more than one Code attribute"),
                        );
                    }
                    let (_, code) =
                        parse_code_attribute(cp, jdk_class)(&attribute.info).map_err(nested)?;
                    method.code = Some(code);
                }
                "Exceptions" => {
                    let (_, exceptions) = parse_exceptions(cp)(&attribute.info).map_err(nested)?;
                    method.exceptions = exceptions;
                }
                "MethodParameters" => {
                    let (_, parameters) =
                        parse_method_parameters(cp)(&attribute.info).map_err(nested)?;
                    method.parameters = parameters;
                }
                "Deprecated" => method.deprecated = true,
                _ => {}
            }
            method.attributes.push(attribute);
        }

        Ok((input, method))
    }
}

fn parse_code_attribute(
    cp: &ConstantPool,
    jdk_class: bool,
) -> impl FnMut(&[u8]) -> PResult<'_, CodeAttribute> + '_ {
    move |input| {
        let (input, max_stack) = be_u16(input)?;
        let (input, max_locals) = be_u16(input)?;
        let (input, code_length) = be_u32(input)?;
        let (input, code) = take(code_length)(input)?;

        let (input, exception_table_length) = be_u16(input)?;
        let (input, exception_table) =
            count(parse_exception_table_item, exception_table_length as _).parse(input)?;

        let (input, attribute_count) = be_u16(input)?;
        let (input, attributes) =
            count(parse_attribute_raw(cp), attribute_count as _).parse(input)?;

        let mut line_numbers = vec![];
        if !jdk_class {
            for attribute in attributes.iter().filter(|a| a.name.as_ref() == "LineNumberTable") {
                let (_, mut table) = parse_line_number_table(&attribute.info)?;
                line_numbers.append(&mut table);
            }
            line_numbers.sort_by_key(|l| l.bc_pos);
        }

        Ok((
            input,
            CodeAttribute {
                max_stack,
                max_locals,
                code: Arc::from(code),
                exception_table,
                attributes,
                line_numbers,
            },
        ))
    }
}

fn parse_exception_table_item(input: &[u8]) -> PResult<'_, ExceptionTableItem> {
    let (input, start_pc) = be_u16(input)?;
    let (input, end_pc) = be_u16(input)?;
    let (input, handler_pc) = be_u16(input)?;
    let (input, catch_type) = be_u16(input)?;
    Ok((
        input,
        ExceptionTableItem {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        },
    ))
}

fn parse_line_number_table(input: &[u8]) -> PResult<'_, Vec<LineNumber>> {
    let (input, length) = be_u16(input)?;
    count(
        |input| {
            let (input, bc_pos) = be_u16(input)?;
            let (input, src_line) = be_u16(input)?;
            Ok((input, LineNumber { bc_pos, src_line }))
        },
        length as _,
    )
    .parse(input)
}

fn parse_exceptions(cp: &ConstantPool) -> impl FnMut(&[u8]) -> PResult<'_, Vec<u32>> + '_ {
    move |input| {
        let (input, number_of_exceptions) = be_u16(input)?;
        count(
            |input| {
                let (input, index) = be_u16(input)?;
                match cp.class_ref(index) {
                    Some(class_ref) => Ok((input, class_ref.name)),
                    None => fail(
                        input,
                        format!("Exceptions entry {index} is not a ClassRef"),
                    ),
                }
            },
            number_of_exceptions as _,
        )
        .parse(input)
    }
}

fn parse_method_parameters(
    cp: &ConstantPool,
) -> impl FnMut(&[u8]) -> PResult<'_, Vec<ParamAttribute>> + '_ {
    move |input| {
        let (input, parameters_count) = u8(input)?;
        count(
            |input| {
                let (input, name_index) = be_u16(input)?;
                let (input, access_flags) = be_u16(input)?;
                if !ParameterAccessFlag::is_valid_combination(access_flags) {
                    return fail(
                        input,
                        format!("invalid MethodParameters access flags 0x{access_flags:04X}"),
                    );
                }
                let name = if name_index == 0 {
                    Arc::from("")
                } else {
                    let (_, name) = utf8_at(input, cp, name_index, "parameter name")?;
                    Arc::from(name)
                };
                Ok((
                    input,
                    ParamAttribute {
                        name,
                        access_flags: ParameterAccessFlag::from_bits_retain(access_flags),
                    },
                ))
            },
            parameters_count as _,
        )
        .parse(input)
    }
}

fn parse_bootstrap_methods(input: &[u8]) -> PResult<'_, (u16, Vec<BootstrapMethod>)> {
    let (input, num_bootstrap_methods) = be_u16(input)?;
    let (input, methods) = count(
        |input| {
            let (input, method_ref) = be_u16(input)?;
            let (input, num_args) = be_u16(input)?;
            let (input, args) = count(be_u16, num_args as _).parse(input)?;
            Ok((input, BootstrapMethod { method_ref, args }))
        },
        num_bootstrap_methods as _,
    )
    .parse(input)?;
    Ok((input, (num_bootstrap_methods, methods)))
}

fn apply_class_attribute<'a>(
    class: &mut ParsedClass,
    attribute: &'a AttributeInfo,
) -> Result<(), nom::Err<ParseError>> {
    let input: &'a [u8] = &attribute.info;
    match attribute.name.as_ref() {
        "BootstrapMethods" => {
            let (_, (declared, methods)) = parse_bootstrap_methods(input)?;
            class.bootstrap_count = declared;
            class.constant_pool.bootstrap_methods = methods;
        }
        "SourceFile" => {
            let (input, index) = be_u16(input)?;
            let (_, source_file) = utf8_at(input, &class.constant_pool, index, "SourceFile")?;
            class.source_file = Some(Arc::from(source_file));
        }
        "Deprecated" => class.deprecated = true,
        _ => {}
    }
    Ok(())
}
