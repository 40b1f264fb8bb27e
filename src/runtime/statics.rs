//! Static field storage, keyed by the string pool indices of the owning
//! class and the field name.

use std::{collections::HashMap, sync::LazyLock};

use parking_lot::RwLock;

use crate::{
    class::ConstValue,
    runtime::native::{STDERR_REF, STDOUT_REF, Value},
    string_pool,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Static {
    /// First character of the field descriptor.
    pub kind: char,
    pub value: Value,
}

impl Static {
    /// The zero value a field of type `descriptor` starts with.
    pub fn default_for(descriptor: &str) -> Self {
        let kind = descriptor.chars().next().unwrap_or('V');
        let value = match kind {
            'Z' => Value::Boolean(false),
            'C' => Value::Char(0),
            'B' | 'S' | 'I' => Value::Int(0),
            'J' => Value::Long(0),
            'F' => Value::Float(0.0),
            'D' => Value::Double(0.0),
            _ => Value::Ref(0),
        };
        Static { kind, value }
    }

    /// Value of a `ConstantValue` attribute for a field of type `descriptor`.
    pub fn from_const(descriptor: &str, value: &ConstValue) -> Self {
        let kind = descriptor.chars().next().unwrap_or('V');
        let value = match value.clone() {
            ConstValue::Int(i) => match kind {
                'Z' => Value::Boolean(i != 0),
                'C' => Value::Char(i as u16),
                _ => Value::Int(i),
            },
            ConstValue::Long(l) => Value::Long(l),
            ConstValue::Float(f) => Value::Float(f),
            ConstValue::Double(d) => Value::Double(d),
            ConstValue::String(s) => Value::Str(s),
        };
        Static { kind, value }
    }
}

static STATICS: LazyLock<RwLock<HashMap<(u32, u32), Static>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

pub fn add_static(class_index: u32, field_index: u32, value: Static) {
    STATICS.write().insert((class_index, field_index), value);
}

pub fn get_static(class_index: u32, field_index: u32) -> Option<Static> {
    STATICS.read().get(&(class_index, field_index)).cloned()
}

pub fn add_static_by_name(class: &str, field: &str, value: Static) {
    add_static(string_pool::intern(class), string_pool::intern(field), value);
}

pub fn get_static_by_name(class: &str, field: &str) -> Option<Static> {
    get_static(string_pool::intern(class), string_pool::intern(field))
}

pub fn len() -> usize {
    STATICS.read().len()
}

/// Statics the runtime provides before any class initializer runs.
pub fn preload() {
    let string = "java/lang/String";
    add_static_by_name(
        string,
        "COMPACT_STRINGS",
        Static {
            kind: 'Z',
            value: Value::Boolean(true),
        },
    );
    add_static_by_name(
        string,
        "LATIN1",
        Static {
            kind: 'B',
            value: Value::Int(0),
        },
    );
    add_static_by_name(
        string,
        "UTF16",
        Static {
            kind: 'B',
            value: Value::Int(1),
        },
    );
    add_static_by_name(
        "java/lang/System",
        "out",
        Static {
            kind: 'L',
            value: Value::Ref(STDOUT_REF),
        },
    );
    add_static_by_name(
        "java/lang/System",
        "err",
        Static {
            kind: 'L',
            value: Value::Ref(STDERR_REF),
        },
    );
    add_static_by_name(
        "java/lang/Thread",
        "MAX_PRIORITY",
        Static {
            kind: 'I',
            value: Value::Int(10),
        },
    );
    add_static_by_name(
        "java/lang/Thread",
        "MIN_PRIORITY",
        Static {
            kind: 'I',
            value: Value::Int(1),
        },
    );
    add_static_by_name(
        "java/lang/Thread",
        "NORM_PRIORITY",
        Static {
            kind: 'I',
            value: Value::Int(5),
        },
    );
    add_static_by_name(
        "jdk/internal/misc/Unsafe",
        "ADDRESS_SIZE",
        Static {
            kind: 'I',
            value: Value::Int(8),
        },
    );
}
