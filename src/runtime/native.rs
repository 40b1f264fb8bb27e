mod class;
mod math;
mod primitives;
mod print_stream;
mod string;
mod system;
mod throwable;

pub use class::load_lang_class;
pub use math::load_lang_math;
pub use primitives::load_primitives;
pub use print_stream::{STDERR_REF, STDOUT_REF, load_io_printstream};
pub use string::load_lang_string;
pub use system::{MAIN_THREAD_REF, load_lang_system};
pub use throwable::load_lang_throwable;

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use log::{debug, warn};

use crate::{
    descriptor,
    runtime::mtable::{self, MTEntry},
};

pub type NativeFunction = fn(&[Value]) -> Value;

/// A value passed to or returned from a native method. Longs and doubles
/// are single values here even though they fill two operand-stack slots.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Boolean(bool),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Object reference, 0 is null.
    Ref(u32),
    Str(Arc<str>),
    /// The native method raised a Java exception.
    Throw {
        class: &'static str,
        message: String,
    },
}

impl Value {
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Value::Int(i) => Some(i),
            Value::Boolean(b) => Some(b as i32),
            Value::Char(c) => Some(c as i32),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match *self {
            Value::Long(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match *self {
            Value::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_throw(&self) -> bool {
        matches!(self, Value::Throw { .. })
    }

    pub(crate) fn throw(class: &'static str, message: impl Into<String>) -> Self {
        Value::Throw {
            class,
            message: message.into(),
        }
    }
}

/// Argument list that does not match the registered descriptor.
fn bad_args(fqn: &str, args: &[Value]) -> Value {
    Value::throw(
        "java/lang/IllegalArgumentException",
        format!("{fqn} called with {args:?}"),
    )
}

#[derive(Debug, Clone, Copy)]
pub struct NativeMethod {
    /// Operand-stack slots the call consumes.
    pub param_slots: usize,
    pub func: NativeFunction,
}

// key: class.name+descriptor
static NATIVE_FUNCTIONS: LazyLock<DashMap<String, NativeMethod>> = LazyLock::new(DashMap::new);

fn register(class: &str, name: &str, desc: &str, is_static: bool, func: NativeFunction) {
    let fqn = format!("{class}.{name}{desc}");
    let Some(param_slots) = descriptor::param_slots(desc, is_static) else {
        warn!("skipping native {fqn}: invalid descriptor");
        return;
    };
    NATIVE_FUNCTIONS.insert(fqn, NativeMethod { param_slots, func });
}

pub fn native_method(fqn: &str) -> Option<NativeMethod> {
    NATIVE_FUNCTIONS.get(fqn).map(|m| *m.value())
}

/// Runs every native loader, then copies the registrations into the method table.
pub fn load_natives() -> usize {
    load_lang_system();
    load_lang_math();
    load_io_printstream();
    load_lang_string();
    load_lang_class();
    load_lang_throwable();
    load_primitives();

    let entries: Vec<_> = NATIVE_FUNCTIONS
        .iter()
        .map(|e| (e.key().clone(), MTEntry::Native(*e.value())))
        .collect();
    let count = entries.len();
    mtable::add_all(entries);
    debug!("registered {count} native methods");
    count
}

fn native_nop(_: &[Value]) -> Value {
    Value::Void
}
