//! Process-wide append-only intern table.
//!
//! Every fully qualified class name, method FQN and exception class name the
//! runtime deals with is identified by its index here. Indices are never
//! reused; index 0 is always `java/lang/Object`.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use parking_lot::RwLock;

use crate::consts::OBJECT_CLASS_NAME;

/// Marks an absent entry, such as the superclass of `java/lang/Object`.
pub const INVALID_INDEX: u32 = u32::MAX;

pub const OBJECT_INDEX: u32 = 0;

struct StringPool {
    indices: HashMap<Arc<str>, u32>,
    strings: Vec<Arc<str>>,
}

static STRING_POOL: LazyLock<RwLock<StringPool>> = LazyLock::new(|| {
    let object: Arc<str> = Arc::from(OBJECT_CLASS_NAME);
    RwLock::new(StringPool {
        indices: HashMap::from([(object.clone(), OBJECT_INDEX)]),
        strings: vec![object],
    })
});

pub fn intern(s: &str) -> u32 {
    if let Some(&index) = STRING_POOL.read().indices.get(s) {
        return index;
    }

    let mut pool = STRING_POOL.write();
    // another writer may have won the race
    if let Some(&index) = pool.indices.get(s) {
        return index;
    }
    let index = pool.strings.len() as u32;
    let s: Arc<str> = Arc::from(s);
    pool.strings.push(s.clone());
    pool.indices.insert(s, index);
    index
}

pub fn lookup(index: u32) -> Option<Arc<str>> {
    STRING_POOL.read().strings.get(index as usize).cloned()
}

pub fn size() -> usize {
    STRING_POOL.read().strings.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_object_is_index_zero() {
        assert_eq!(intern("java/lang/Object"), OBJECT_INDEX);
        assert_eq!(lookup(OBJECT_INDEX).as_deref(), Some("java/lang/Object"));
    }

    #[test]
    fn test_intern_lookup() {
        let a = intern("string_pool/test/Alpha");
        let b = intern("string_pool/test/Beta");
        assert_ne!(a, b);
        assert_eq!(intern("string_pool/test/Alpha"), a);
        assert_eq!(lookup(a).as_deref(), Some("string_pool/test/Alpha"));
        assert_eq!(lookup(b).as_deref(), Some("string_pool/test/Beta"));
        assert!(size() >= 3);
        assert_eq!(lookup(INVALID_INDEX), None);
    }

    #[test]
    fn test_concurrent_intern() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(|| {
                    (0..100)
                        .map(|i| intern(&format!("string_pool/race/{i}")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let results: Vec<Vec<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
        for (i, index) in results[0].iter().enumerate() {
            assert_eq!(
                lookup(*index).as_deref(),
                Some(format!("string_pool/race/{i}").as_str())
            );
        }
    }
}
