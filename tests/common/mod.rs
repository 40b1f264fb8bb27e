//! A small class-file assembler for building test inputs.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    fs,
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use zip::{ZipWriter, write::SimpleFileOptions};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_MODULE: u16 = 0x8000;

pub const OBJECT: &str = "java/lang/Object";
pub const MAIN_DESC: &str = "([Ljava/lang/String;)V";

/// Bytecode of a method plus its frame sizes.
#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytes: Vec<u8>,
    /// `(start_pc, end_pc, handler_pc, catch_type)`
    pub handlers: Vec<(u16, u16, u16, u16)>,
}

impl Code {
    pub fn new(max_stack: u16, max_locals: u16, bytes: impl Into<Vec<u8>>) -> Self {
        Code {
            max_stack,
            max_locals,
            bytes: bytes.into(),
            handlers: vec![],
        }
    }

    /// `return`
    pub fn ret() -> Self {
        Code::new(0, 1, [0xB1])
    }
}

#[derive(Debug, Clone)]
pub struct ClassBuilder {
    magic: u32,
    major: u16,
    cp: Vec<u8>,
    cp_count: u16,
    utf8s: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassBuilder {
    /// A public class extending `java/lang/Object`.
    pub fn new(name: &str) -> Self {
        Self::with_super(name, Some(OBJECT))
    }

    pub fn with_super(name: &str, super_name: Option<&str>) -> Self {
        let mut builder = ClassBuilder {
            magic: 0xCAFE_BABE,
            major: 65,
            cp: vec![],
            cp_count: 1,
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            access: ACC_PUBLIC | ACC_SUPER,
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        };
        builder.this_class = builder.class_ref(name);
        if let Some(super_name) = super_name {
            builder.super_class = builder.class_ref(super_name);
        }
        builder
    }

    pub fn major(mut self, major: u16) -> Self {
        self.major = major;
        self
    }

    pub fn magic(mut self, magic: u32) -> Self {
        self.magic = magic;
        self
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    fn push(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.cp_count;
        self.cp.extend_from_slice(bytes);
        self.cp_count += slots;
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        if let Some(&index) = self.utf8s.get(s) {
            return index;
        }
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
        let index = self.push(&bytes, 1);
        self.utf8s.insert(s.to_string(), index);
        index
    }

    pub fn class_ref(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.classes.get(name) {
            return index;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![7];
        bytes.extend_from_slice(&name_index.to_be_bytes());
        let index = self.push(&bytes, 1);
        self.classes.insert(name.to_string(), index);
        index
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let utf8 = self.utf8(s);
        let mut bytes = vec![8];
        bytes.extend_from_slice(&utf8.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn int(&mut self, value: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push(&bytes, 2)
    }

    pub fn double(&mut self, value: f64) -> u16 {
        let mut bytes = vec![6];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push(&bytes, 2)
    }

    pub fn name_and_type(&mut self, name: &str, desc: &str) -> u16 {
        let name = self.utf8(name);
        let desc = self.utf8(desc);
        let mut bytes = vec![12];
        bytes.extend_from_slice(&name.to_be_bytes());
        bytes.extend_from_slice(&desc.to_be_bytes());
        self.push(&bytes, 1)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, desc: &str) -> u16 {
        let class = self.class_ref(class);
        let nat = self.name_and_type(name, desc);
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&class.to_be_bytes());
        bytes.extend_from_slice(&nat.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn field_ref(&mut self, class: &str, name: &str, desc: &str) -> u16 {
        self.member_ref(9, class, name, desc)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, desc: &str) -> u16 {
        self.member_ref(10, class, name, desc)
    }

    pub fn interface_method_ref(&mut self, class: &str, name: &str, desc: &str) -> u16 {
        self.member_ref(11, class, name, desc)
    }

    /// A UTF8 entry holding `raw` as is, bypassing the string cache.
    pub fn utf8_raw(&mut self, raw: &[u8]) -> u16 {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(raw.len() as u16).to_be_bytes());
        bytes.extend_from_slice(raw);
        self.push(&bytes, 1)
    }

    pub fn method_handle(&mut self, ref_kind: u8, ref_index: u16) -> u16 {
        let mut bytes = vec![15, ref_kind];
        bytes.extend_from_slice(&ref_index.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn method_type(&mut self, desc: &str) -> u16 {
        let desc = self.utf8(desc);
        let mut bytes = vec![16];
        bytes.extend_from_slice(&desc.to_be_bytes());
        self.push(&bytes, 1)
    }

    fn dynamic_entry(&mut self, tag: u8, bootstrap: u16, name: &str, desc: &str) -> u16 {
        let nat = self.name_and_type(name, desc);
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&bootstrap.to_be_bytes());
        bytes.extend_from_slice(&nat.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn dynamic(&mut self, bootstrap: u16, name: &str, desc: &str) -> u16 {
        self.dynamic_entry(17, bootstrap, name, desc)
    }

    pub fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, desc: &str) -> u16 {
        self.dynamic_entry(18, bootstrap, name, desc)
    }

    pub fn module(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        let mut bytes = vec![19];
        bytes.extend_from_slice(&name.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn package(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        let mut bytes = vec![20];
        bytes.extend_from_slice(&name.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn interface(&mut self, name: &str) -> &mut Self {
        let index = self.class_ref(name);
        self.interfaces.push(index);
        self
    }

    /// `const_value` is the CP index for a `ConstantValue` attribute.
    pub fn field(&mut self, access: u16, name: &str, desc: &str, const_value: Option<u16>) -> &mut Self {
        let mut bytes = vec![];
        bytes.extend_from_slice(&access.to_be_bytes());
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(desc).to_be_bytes());
        match const_value {
            Some(index) => {
                bytes.extend_from_slice(&1u16.to_be_bytes());
                let attr = self.attribute("ConstantValue", &index.to_be_bytes());
                bytes.extend_from_slice(&attr);
            }
            None => bytes.extend_from_slice(&0u16.to_be_bytes()),
        }
        self.fields.push(bytes);
        self
    }

    pub fn method(&mut self, access: u16, name: &str, desc: &str, code: Option<Code>) -> &mut Self {
        self.method_with_params(access, name, desc, code, &[])
    }

    /// `params` are `(name, access flags)` pairs for a `MethodParameters` attribute.
    pub fn method_with_params(
        &mut self,
        access: u16,
        name: &str,
        desc: &str,
        code: Option<Code>,
        params: &[(&str, u16)],
    ) -> &mut Self {
        let mut attributes = vec![];
        if let Some(code) = code {
            let mut info = vec![];
            info.extend_from_slice(&code.max_stack.to_be_bytes());
            info.extend_from_slice(&code.max_locals.to_be_bytes());
            info.extend_from_slice(&(code.bytes.len() as u32).to_be_bytes());
            info.extend_from_slice(&code.bytes);
            info.extend_from_slice(&(code.handlers.len() as u16).to_be_bytes());
            for (start, end, handler, catch_type) in &code.handlers {
                for value in [start, end, handler, catch_type] {
                    info.extend_from_slice(&value.to_be_bytes());
                }
            }
            info.extend_from_slice(&0u16.to_be_bytes());
            attributes.push(self.attribute("Code", &info));
        }
        if !params.is_empty() {
            let mut info = vec![params.len() as u8];
            for (param, flags) in params {
                let name_index = if param.is_empty() { 0 } else { self.utf8(param) };
                info.extend_from_slice(&name_index.to_be_bytes());
                info.extend_from_slice(&flags.to_be_bytes());
            }
            attributes.push(self.attribute("MethodParameters", &info));
        }

        let mut bytes = vec![];
        bytes.extend_from_slice(&access.to_be_bytes());
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(desc).to_be_bytes());
        bytes.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for attribute in attributes {
            bytes.extend_from_slice(&attribute);
        }
        self.methods.push(bytes);
        self
    }

    /// A method carrying the given attributes verbatim.
    pub fn method_raw(&mut self, access: u16, name: &str, desc: &str, attributes: &[(&str, &[u8])]) -> &mut Self {
        let mut bytes = vec![];
        bytes.extend_from_slice(&access.to_be_bytes());
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(desc).to_be_bytes());
        bytes.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for (attr_name, info) in attributes {
            let attr = self.attribute(attr_name, info);
            bytes.extend_from_slice(&attr);
        }
        self.methods.push(bytes);
        self
    }

    pub fn source_file(&mut self, name: &str) -> &mut Self {
        let index = self.utf8(name);
        let attr = self.attribute("SourceFile", &index.to_be_bytes());
        self.attributes.push(attr);
        self
    }

    /// A `BootstrapMethods` attribute; each entry is a MethodHandle index and its arguments.
    pub fn bootstrap_methods(&mut self, methods: &[(u16, &[u16])]) -> &mut Self {
        let mut info = vec![];
        info.extend_from_slice(&(methods.len() as u16).to_be_bytes());
        for (handle, args) in methods {
            info.extend_from_slice(&handle.to_be_bytes());
            info.extend_from_slice(&(args.len() as u16).to_be_bytes());
            for arg in *args {
                info.extend_from_slice(&arg.to_be_bytes());
            }
        }
        let attr = self.attribute("BootstrapMethods", &info);
        self.attributes.push(attr);
        self
    }

    fn attribute(&mut self, name: &str, info: &[u8]) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&(info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(info);
        bytes
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![];
        out.extend_from_slice(&self.magic.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&self.major.to_be_bytes());
        out.extend_from_slice(&self.cp_count.to_be_bytes());
        out.extend_from_slice(&self.cp);
        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for index in &self.interfaces {
            out.extend_from_slice(&index.to_be_bytes());
        }
        for table in [&self.fields, &self.methods, &self.attributes] {
            out.extend_from_slice(&(table.len() as u16).to_be_bytes());
            for item in table {
                out.extend_from_slice(item);
            }
        }
        out
    }
}

/// A class whose `main` prints `message` through `System.out.println`.
pub fn hello_class(name: &str, message: &str) -> Vec<u8> {
    let mut class = ClassBuilder::new(name);
    let init = class.method_ref(OBJECT, "<init>", "()V");
    let out = class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let text = class.string(message);
    let println = class.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    assert!(text <= 0xFF, "ldc needs a one-byte index");

    let [init_hi, init_lo] = init.to_be_bytes();
    class.method(
        ACC_PUBLIC,
        "<init>",
        "()V",
        Some(Code::new(1, 1, [0x2A, 0xB7, init_hi, init_lo, 0xB1])),
    );

    let [out_hi, out_lo] = out.to_be_bytes();
    let [println_hi, println_lo] = println.to_be_bytes();
    class.method_with_params(
        ACC_PUBLIC | ACC_STATIC,
        "main",
        MAIN_DESC,
        Some(Code::new(
            2,
            1,
            [
                0xB2, out_hi, out_lo, // getstatic System.out
                0x12, text as u8, // ldc message
                0xB6, println_hi, println_lo, // invokevirtual println
                0xB1,
            ],
        )),
        &[("args", 0)],
    );
    class.source_file(&format!("{}.java", name.rsplit('/').next().unwrap_or(name)));
    class.build()
}

/// Writes `bytes` to `<dir>/<class_name>.class`, creating package directories.
pub fn write_class(dir: &Path, class_name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(format!("{class_name}.class"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, bytes).unwrap();
    path
}

/// Writes a ZIP archive holding `entries`.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let bytes = zip_bytes(entries);
    fs::write(path, bytes).unwrap();
    path.to_path_buf()
}

/// Writes a JMOD: the `JM` header followed by a ZIP of `entries`.
pub fn write_jmod(path: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let mut bytes = vec![0x4A, 0x4D, 0x01, 0x00];
    bytes.extend_from_slice(&zip_bytes(entries));
    fs::write(path, bytes).unwrap();
    path.to_path_buf()
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
