mod common;

use std::path::PathBuf;

use common::*;
use jvm_classloader::{
    error::Error,
    runtime::class_loader::{
        Archive, EntryKind, Jmod,
        archive::MANIFEST_PATH,
    },
};

#[test]
fn test_jar_with_main_class() {
    let dir = tempfile::tempdir().unwrap();
    let class = hello_class("jacobin/HelloWorld", "Hello from a jar");
    let jar = write_zip(
        &dir.path().join("hello.jar"),
        &[
            (MANIFEST_PATH, &b"Manifest-Version: 1.0\r\nMain-Class: jacobin.HelloWorld\r\n"[..]),
            ("jacobin/HelloWorld.class", &class[..]),
            ("config/app.properties", &b"k=v"[..]),
        ],
    );

    let archive = Archive::open(&jar).unwrap();
    assert_eq!(archive.main_class(), Some("jacobin.HelloWorld"));
    assert!(!archive.manifest().contains_key("main-class"));

    let loaded = archive.load_class("jacobin.HelloWorld").unwrap();
    assert_eq!(loaded.entry.kind, EntryKind::ClassFile);
    assert_eq!(loaded.entry.location, "jacobin/HelloWorld.class");
    assert_eq!(loaded.bytes, class);

    assert!(archive.has_resource("config/app.properties", EntryKind::Resource));
    assert!(archive.has_resource(MANIFEST_PATH, EntryKind::Manifest));
    assert!(!archive.has_resource("jacobin.HelloWorld", EntryKind::Resource));

    let err = archive.load_class("config/app.properties").unwrap_err();
    assert!(err.to_string().contains("is not a classfile"), "{err}");
    let err = archive.load_class("jacobin.Missing").unwrap_err();
    assert!(err.to_string().starts_with("Unable to load class jacobin.Missing"), "{err}");
}

#[test]
fn test_empty_jar() {
    let dir = tempfile::tempdir().unwrap();
    let jar = write_zip(&dir.path().join("empty.jar"), &[]);
    let archive = Archive::open(&jar).unwrap();
    assert_eq!(archive.entries().count(), 0);
    assert_eq!(archive.main_class(), None);
    assert_eq!(archive.class_path(), [jar]);
}

#[test]
fn test_manifest_class_path() {
    let dir = tempfile::tempdir().unwrap();
    let jar = write_zip(
        &dir.path().join("app.jar"),
        &[(
            MANIFEST_PATH,
            &b"Manifest-Version: 1.0\nClass-Path: lib/a.jar lib/b.jar\nCreated-By: 21.0.1 (Oracle)\n"[..],
        )],
    );
    let archive = Archive::open(&jar).unwrap();
    assert_eq!(archive.class_path_raw(), "lib/a.jar lib/b.jar");
    assert_eq!(
        archive.class_path(),
        [
            jar.clone(),
            dir.path().join("lib/a.jar"),
            dir.path().join("lib/b.jar"),
        ]
    );
    assert_eq!(archive.manifest()["Created-By"], "21.0.1 (Oracle)");
}

#[test]
fn test_not_a_zip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.jar");
    std::fs::write(&path, b"definitely not a zip").unwrap();
    assert!(matches!(Archive::open(&path), Err(Error::Zip(_))));
    assert!(matches!(
        Archive::open(PathBuf::from("/no/such/file.jar")),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_jmod_through_archive_reader() {
    let dir = tempfile::tempdir().unwrap();
    let class = hello_class("java/lang/Greeter", "hi");
    let path = write_jmod(
        &dir.path().join("java.base.jmod"),
        &[
            ("classes/java/lang/Greeter.class", &class[..]),
            ("classes/module-info.class", &b"-"[..]),
            ("lib/libjava.so", &b"-"[..]),
        ],
    );

    let archive = Archive::open(&path).unwrap();
    assert!(archive.has_resource("classes.java.lang.Greeter", EntryKind::ClassFile));
    assert!(archive.has_resource("lib/libjava.so", EntryKind::Resource));

    let jmod = Jmod::open(&path).unwrap();
    assert_eq!(jmod.class_bytes("java/lang/Greeter").unwrap(), class);
    let mut entries = jmod.class_entries();
    entries.sort();
    assert_eq!(entries, ["java/lang/Greeter.class", "module-info.class"]);
}

#[test]
fn test_jmod_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_zip(&dir.path().join("zip.jmod"), &[("classes/A.class", &b"a"[..])]);
    assert!(matches!(
        Archive::open(&path),
        Err(Error::InvalidJmod { found: 0x504B, .. })
    ));
}
