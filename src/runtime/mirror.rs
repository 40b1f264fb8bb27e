//! `java.lang.Class` mirrors of loaded classes.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use parking_lot::Mutex;

use crate::consts::ClassAccessFlag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMirror {
    pub name_index: u32,
    pub super_index: u32,
    pub access_flags: ClassAccessFlag,
    /// `name + descriptor` of every static field.
    pub statics: Vec<String>,
}

// keyed by the string pool index of the class name, same as `ClData::class_object`
static CLASS_MIRRORS: LazyLock<Mutex<HashMap<u32, Arc<ClassMirror>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Returns the key the mirror is stored under.
pub fn add_mirror(mirror: ClassMirror) -> u32 {
    let key = mirror.name_index;
    CLASS_MIRRORS.lock().insert(key, Arc::new(mirror));
    key
}

pub fn mirror(name_index: u32) -> Option<Arc<ClassMirror>> {
    CLASS_MIRRORS.lock().get(&name_index).cloned()
}

pub fn mirror_count() -> usize {
    CLASS_MIRRORS.lock().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string_pool;

    #[test]
    fn test_add_mirror() {
        let name_index = string_pool::intern("mirror/test/Point");
        let key = add_mirror(ClassMirror {
            name_index,
            super_index: string_pool::OBJECT_INDEX,
            access_flags: ClassAccessFlag::PUBLIC,
            statics: vec!["ORIGINLmirror/test/Point;".to_string()],
        });
        assert_eq!(key, name_index);

        let found = mirror(key).unwrap();
        assert_eq!(found.statics, ["ORIGINLmirror/test/Point;"]);
        assert!(mirror_count() >= 1);
    }
}
