//! Installs its own config, so everything runs in one test.

mod common;

use std::{
    fs,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use common::*;
use jvm_classloader::{
    Error, ExceptionKind,
    config::{self, Config},
    runtime::{
        ClassStatus, Loader, exceptions, fetch_method_and_cp, load_class_from_name_only,
        method_area,
        mtable::MethodKind,
    },
};

static NOT_FOUND: AtomicUsize = AtomicUsize::new(0);

fn count_not_found(kind: ExceptionKind, _msg: &str) -> bool {
    if kind == ExceptionKind::ClassNotFoundException {
        NOT_FOUND.fetch_add(1, Ordering::SeqCst);
    }
    false
}

#[test]
fn test_class_path_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let classes = dir.path().join("classes");

    write_class(&classes, "cp/Base", &hello_class("cp/Base", "base"));
    let mut child = ClassBuilder::with_super("cp/Child", Some("cp/Base"));
    child.method(ACC_PUBLIC, "run", "()V", Some(Code::ret()));
    write_class(&classes, "cp/Child", &child.build());
    write_class(&classes, "cp/Shared", &hello_class("cp/Shared", "shared"));
    write_class(&classes, "cp/Victim", &hello_class("cp/Victim", "the real one"));
    write_class(&classes, "cp/Liar", &hello_class("cp/Victim", "not what you asked for"));
    write_class(&classes, "cp/Stray", &hello_class("cp/Other", "also wrong"));
    write_class(&classes, "cp/Corrupt", b"\xCA\xFE\xBA\xBE\x00");

    let lib = write_zip(
        &dir.path().join("lib.JAR"),
        &[("cp/FromJar.class", &hello_class("cp/FromJar", "jar")[..])],
    );
    let start = write_zip(
        &dir.path().join("start.jar"),
        &[("cp/Starter.class", &hello_class("cp/Starter", "start")[..])],
    );

    config::install(
        Config::default()
            .with_class_path([classes.clone(), dir.path().join("missing.jar"), lib])
            .with_starting_jar(start),
    );
    exceptions::set_throw_handler(count_not_found);
    method_area::preload();

    // superclasses are loaded with the class
    let before = method_area::size();
    let loaded = load_class_from_name_only("cp/Child").unwrap();
    assert_eq!(loaded.loader, Loader::Application);
    assert_eq!(loaded.status(), ClassStatus::FormatChecked);
    assert!(method_area::fetch("cp/Base").is_some());
    assert_eq!(method_area::size(), before + 2);

    // already present
    let again = load_class_from_name_only("cp/Child").unwrap();
    assert!(std::sync::Arc::ptr_eq(&loaded, &again));

    // archives on the class path match their extension case-insensitively
    let from_jar = load_class_from_name_only("[Lcp/FromJar;").unwrap();
    assert_eq!(from_jar.name(), "cp/FromJar");

    let (_, kind) = fetch_method_and_cp("cp/Starter", "main", MAIN_DESC).unwrap();
    assert_eq!(kind, MethodKind::Java);
    assert_eq!(method_area::fetch("cp/Starter").unwrap().status(), ClassStatus::Linked);

    // concurrent loads of one class all see the same result
    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| load_class_from_name_only("cp/Shared").map(|k| k.name().to_string())))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), "cp/Shared");
    }
    assert_eq!(
        method_area::fetch("cp/Shared").unwrap().status(),
        ClassStatus::FormatChecked
    );

    let err = load_class_from_name_only("cp/Nope").unwrap_err();
    let Error::ClassLoad { class, source } = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(class, "cp/Nope");
    assert!(matches!(**source, Error::ClassNotFound(ref name) if name == "cp/Nope"));
    assert_eq!(err.kind(), ExceptionKind::ClassNotFoundException);
    assert!(method_area::fetch("cp/Nope").is_none());
    assert!(NOT_FOUND.load(Ordering::SeqCst) >= 1);

    // the file name has to match the class inside, and a mismatch leaves
    // the method area untouched
    let err = load_class_from_name_only("cp/Stray").unwrap_err();
    assert!(err.to_string().contains("cp/Stray holds the wrong class cp/Other"), "{err}");
    assert!(method_area::fetch("cp/Stray").is_none());
    assert!(method_area::fetch("cp/Other").is_none());

    fetch_method_and_cp("cp/Victim", "main", MAIN_DESC).unwrap();
    let victim = method_area::fetch("cp/Victim").unwrap();
    assert_eq!(victim.status(), ClassStatus::Linked);
    let size = method_area::size();
    assert!(load_class_from_name_only("cp/Liar").is_err());
    assert!(method_area::fetch("cp/Liar").is_none());
    let still = method_area::fetch("cp/Victim").unwrap();
    assert!(std::sync::Arc::ptr_eq(&victim, &still));
    assert_eq!(still.status(), ClassStatus::Linked);
    assert_eq!(method_area::size(), size);

    let err = load_class_from_name_only("cp/Corrupt").unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::ClassFormatError);
    assert!(method_area::fetch("cp/Corrupt").is_none());

    // primitive arrays never touch the class path
    assert!(load_class_from_name_only("[I").is_ok());
    assert!(load_class_from_name_only("[Q").is_err());

    fs::remove_dir_all(&classes).unwrap();
}
