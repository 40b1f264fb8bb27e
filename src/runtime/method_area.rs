//! The method area: every loaded class, keyed by its slash-separated name.

use std::{
    sync::{Arc, LazyLock},
    thread,
    time::Duration,
};

use dashmap::{DashMap, mapref::entry::Entry};
use log::{info, trace};
use parking_lot::RwLock;

use crate::{
    Result,
    error::Error,
    runtime::{ClData, ClassStatus, Klass, Loader},
};

static METHOD_AREA: LazyLock<DashMap<String, Arc<Klass>>> = LazyLock::new(DashMap::new);
/// Number of entries. Writers hold it exclusively while touching the map.
static METHOD_AREA_SIZE: RwLock<usize> = RwLock::new(0);

/// Array classes present before anything is loaded.
pub const PRELOADED_ARRAY_CLASSES: [&str; 9] = [
    "[B",
    "[C",
    "[D",
    "[F",
    "[I",
    "[J",
    "[S",
    "[Z",
    "[Ljava/lang/Object;",
];

pub fn fetch(name: &str) -> Option<Arc<Klass>> {
    METHOD_AREA.get(name).map(|k| Arc::clone(k.value()))
}

/// Returns `false` when `name` replaced an existing entry.
pub fn insert(name: &str, klass: Arc<Klass>) -> bool {
    let status = klass.status();
    let loader = klass.loader;

    let mut size = METHOD_AREA_SIZE.write();
    let is_new = METHOD_AREA.insert(name.to_string(), klass).is_none();
    if is_new {
        *size += 1;
    }
    drop(size);

    if matches!(
        status,
        ClassStatus::FormatChecked | ClassStatus::Verified | ClassStatus::Linked
    ) {
        info!(target: "class", "Class: {name}, loader: {loader}");
    }
    is_new
}

/// Posts an `Initializing` placeholder for `name` unless an entry exists.
/// Returns `true` when the caller now owns loading the class.
pub fn reserve(name: &str, loader: Loader) -> bool {
    let mut size = METHOD_AREA_SIZE.write();
    match METHOD_AREA.entry(name.to_string()) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(Arc::new(Klass::new(
                ClassStatus::Initializing,
                loader,
                ClData::empty(name),
            )));
            *size += 1;
            true
        }
    }
}

pub fn delete(name: &str) {
    let mut size = METHOD_AREA_SIZE.write();
    if METHOD_AREA.remove(name).is_some() {
        *size -= 1;
    }
}

pub fn size() -> usize {
    *METHOD_AREA_SIZE.read()
}

pub fn preload() {
    for name in PRELOADED_ARRAY_CLASSES {
        if fetch(name).is_none() {
            let klass = Klass::new(
                ClassStatus::Instantiated,
                Loader::Bootstrap,
                ClData::empty(name),
            );
            insert(name, Arc::new(klass));
        }
    }
}

const STATUS_RETRY: Duration = Duration::from_millis(100);

/// Waits once for a class that is missing or still initializing, then gives up.
pub fn wait_for_class_status(name: &str) -> Result<Arc<Klass>> {
    trace!("waiting for class {name}");
    let klass = match fetch(name) {
        Some(klass) => klass,
        None => {
            thread::sleep(STATUS_RETRY);
            fetch(name).ok_or_else(|| {
                Error::internal(format!("timeout waiting for class {name} to load"))
            })?
        }
    };
    if klass.status() == ClassStatus::Initializing {
        thread::sleep(STATUS_RETRY);
        let klass = fetch(name).unwrap_or(klass);
        if klass.status() == ClassStatus::Initializing {
            return Err(Error::internal(format!(
                "timeout waiting for class {name} status"
            )));
        }
        return Ok(klass);
    }
    Ok(klass)
}
