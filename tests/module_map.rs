//! Touches the installed config and the global module map, so everything
//! runs in one test.

mod common;

use std::fs;

use common::*;
use jvm_classloader::{
    config::{self, Config},
    runtime::{
        Loader,
        class_loader::{ModuleMap, init_module_map, jmod, load_base_classes, module_map},
        load_class_from_name_only, method_area,
    },
};

#[test]
fn test_module_map_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let jmods = dir.path().join("jdk").join("jmods");
    fs::create_dir_all(&jmods).unwrap();

    let greeter = hello_class("modtest/Greeter", "hello from a module");
    let extra = hello_class("modtest/Extra", "not on the class list");
    write_jmod(
        &jmods.join("java.base.jmod"),
        &[
            ("classes/java/lang/String.class", &b"-"[..]),
            ("classes/java/lang/Object.class", &b"-"[..]),
            ("classes/modtest/Greeter.class", &greeter[..]),
            ("classes/modtest/Extra.class", &extra[..]),
            ("classes/modtest/Broken.class", &b"-"[..]),
            ("lib/classlist", &b"modtest/Greeter\nmodtest/Broken\r\n"[..]),
            ("bin/java", &b"-"[..]),
        ],
    );
    write_jmod(
        &jmods.join("java.desktop.jmod"),
        &[(
            "classes/com/sun/accessibility/internal/resources/accessibility.class",
            &b"-"[..],
        )],
    );
    fs::write(jmods.join("README.txt"), "not a module").unwrap();

    let config = Config::default()
        .with_jacobin_home(dir.path().join("home"))
        .with_java_home(dir.path().join("jdk"))
        .with_java_version("21.0.1");
    let snapshot = dir.path().join("home").join("21.0.1.gob");
    assert!(!snapshot.exists());

    // first run scans the modules and writes the snapshot
    let first = init_module_map(&config).unwrap();
    assert!(!first.found_snapshot());
    assert!(snapshot.is_file());
    assert_eq!(first.lookup("java/lang/String"), Some("java.base.jmod"));
    assert_eq!(
        first.lookup("com/sun/accessibility/internal/resources/accessibility"),
        Some("java.desktop.jmod")
    );
    assert_eq!(first.lookup("java/lang/Missing"), None);
    assert_eq!(first.len(), 6);
    assert_eq!(first.count(), Some(first.len()));
    assert_eq!(module_map::lookup("modtest/Greeter").as_deref(), Some("java.base.jmod"));

    // second run reads it back
    let second = init_module_map(&config).unwrap();
    assert!(second.found_snapshot());
    assert_eq!(second.entries(), first.entries());

    // a corrupt snapshot is rebuilt
    fs::write(&snapshot, b"garbage").unwrap();
    let rebuilt = ModuleMap::build(&config).unwrap();
    assert!(!rebuilt.found_snapshot());
    assert_eq!(rebuilt.entries(), first.entries());
    assert!(ModuleMap::build(&config).unwrap().found_snapshot());

    // classes in the map come from their module through the bootstrap loader
    config::install(config.clone());
    assert_eq!(jmod::class_bytes("java.base.jmod", "modtest/Greeter").unwrap(), greeter);

    // only the listed classes are preloaded, and the broken one is skipped
    assert_eq!(load_base_classes("java.base.jmod").unwrap(), 1);
    let preloaded = method_area::fetch("modtest/Greeter").unwrap();
    assert!(method_area::fetch("modtest/Broken").is_none());
    assert!(method_area::fetch("modtest/Extra").is_none());
    assert_eq!(load_base_classes("java.base.jmod").unwrap(), 0);

    let klass = load_class_from_name_only("modtest/Greeter").unwrap();
    assert!(std::sync::Arc::ptr_eq(&klass, &preloaded));
    assert_eq!(klass.loader, Loader::Bootstrap);
    assert_eq!(klass.data.module, "java.base");
    assert_eq!(load_class_from_name_only("modtest/Extra").unwrap().loader, Loader::Bootstrap);

    // a file with the wrong magic stops the scan
    let bad = tempfile::tempdir().unwrap();
    let bad_jmods = bad.path().join("jdk").join("jmods");
    fs::create_dir_all(&bad_jmods).unwrap();
    write_zip(&bad_jmods.join("broken.jmod"), &[("classes/A.class", &b"a"[..])]);
    let bad_config = Config::default()
        .with_jacobin_home(bad.path().join("home"))
        .with_java_home(bad.path().join("jdk"))
        .with_java_version("21.0.1");
    assert!(ModuleMap::build(&bad_config).is_err());

    // without a JDK there is nothing to scan
    let no_jdk = Config::default().with_jacobin_home(bad.path().join("nowhere"));
    assert!(ModuleMap::build(&no_jdk).is_err());
}
