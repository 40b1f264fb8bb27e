//! Method lookup through the global method table, loading and linking the
//! owning class on a miss.

use std::{collections::HashSet, sync::Arc};

use log::{debug, trace};

use crate::{
    Result,
    consts::{MethodAccessFlag, OBJECT_CLASS_NAME},
    error::Error,
    runtime::{
        ClData, ClassStatus, Klass,
        class_loader::load_class_from_name_only,
        exceptions::throw_error,
        method_area,
        mtable::{self, JavaMethod, MTEntry, MethodKind},
        verifier::check_code_validity,
    },
};

const MAIN: &str = "main";

/// Finds `class_name.method_name+descriptor`, loading and linking classes as
/// needed, and caches the result in the global method table.
pub fn fetch_method_and_cp(
    class_name: &str,
    method_name: &str,
    descriptor: &str,
) -> Result<(MTEntry, MethodKind)> {
    if method_area::fetch(class_name).is_none() {
        load_class_from_name_only(class_name)?;
    }

    let fqn = format!("{class_name}.{method_name}{descriptor}");
    if let Some(entry) = mtable::get(&fqn) {
        trace!("method table hit for {fqn}");
        let kind = entry.kind();
        return Ok((entry, kind));
    }

    let klass = method_area::wait_for_class_status(class_name)?;
    link_class(&klass)?;
    let key = format!("{method_name}{descriptor}");
    if let Some(entry) = java_method_entry(&klass, &key)? {
        mtable::add(fqn, entry.clone());
        return Ok((entry, MethodKind::Java));
    }

    if method_name == MAIN {
        return Err(throw_error(Error::NoMainMethod(class_name.to_string())));
    }

    let mut visited = HashSet::from([Arc::clone(&klass.data.name)]);
    let mut super_name = klass.data.super_name();
    while let Some(name) = super_name {
        if !visited.insert(Arc::clone(&name)) {
            return Err(throw_error(Error::ClassCircularity(format!(
                "{name} is its own superclass, reached from {class_name}"
            ))));
        }
        let super_fqn = format!("{name}.{key}");
        // natives of Thread and ThreadGroup live here without a loaded class
        if let Some(entry) = mtable::get(&super_fqn) {
            let kind = entry.kind();
            return Ok((entry, kind));
        }
        if name.as_ref() == OBJECT_CLASS_NAME {
            break;
        }

        let super_klass = load_class_from_name_only(&name)?;
        let super_klass = match super_klass.status() {
            ClassStatus::Initializing => method_area::wait_for_class_status(&name)?,
            _ => super_klass,
        };
        link_class(&super_klass)?;
        if let Some(entry) = java_method_entry(&super_klass, &key)? {
            debug!("{fqn} resolved to {super_fqn}");
            mtable::add(super_fqn, entry.clone());
            return Ok((entry, MethodKind::Java));
        }
        super_name = super_klass.data.super_name();
    }

    Err(throw_error(Error::NoSuchMethod(fqn)))
}

fn java_method_entry(klass: &Klass, key: &str) -> Result<Option<MTEntry>> {
    let Some(method) = klass.data.methods.get(key) else {
        return Ok(None);
    };
    let Some(code) = &method.code else {
        return Err(throw_error(Error::NoSuchMethod(format!(
            "{}.{key} has no bytecode",
            klass.name()
        ))));
    };
    Ok(Some(MTEntry::Java(Arc::new(JavaMethod {
        class_name: Arc::clone(&klass.data.name),
        access_flags: method.access_flags,
        max_stack: code.max_stack,
        max_locals: code.max_locals,
        code: Arc::clone(&code.code),
        exception_table: code.exception_table.clone(),
        line_numbers: code.line_numbers.clone(),
        attributes: method.attributes.clone(),
        exceptions: method.exceptions.clone(),
        parameters: method.parameters.clone(),
        deprecated: method.deprecated,
        cp: Arc::clone(&klass.data.cp),
    }))))
}

/// Verifies a format-checked class and marks it linked. Classes that are
/// already linked, or past it, are left alone.
pub fn link_class(klass: &Klass) -> Result<()> {
    klass.with_status(|status| {
        if *status == ClassStatus::FormatChecked {
            verify_class(&klass.data)?;
            *status = ClassStatus::Verified;
        }
        if *status == ClassStatus::Verified {
            *status = ClassStatus::Linked;
            debug!("linked {}", klass.name());
        }
        Ok(())
    })
}

fn verify_class(data: &ClData) -> Result<()> {
    let no_code = MethodAccessFlag::NATIVE | MethodAccessFlag::ABSTRACT;
    for method in data.methods.values() {
        if method.access_flags.intersects(no_code) {
            continue;
        }
        let code = method.code.as_ref();
        check_code_validity(
            code.map(|c| &c.code[..]),
            Some(&*data.cp),
            code.map_or(0, |c| c.max_stack),
            data.access,
        )?;
    }
    data.mark_code_checked();
    Ok(())
}
