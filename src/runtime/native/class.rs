use crate::{
    runtime::native::{Value, bad_args, native_nop, register},
    string_pool,
};

const CLASS: &str = "java/lang/Class";
const PRIMITIVES: [&str; 9] = [
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// Class objects are referenced by the string pool index of their name.
fn get_primitive_class(args: &[Value]) -> Value {
    match args {
        [Value::Str(name)] if PRIMITIVES.contains(&&**name) => Value::Ref(string_pool::intern(name)),
        [Value::Str(name)] => Value::throw(
            "java/lang/IllegalArgumentException",
            format!("not a primitive type: {name}"),
        ),
        _ => bad_args("Class.getPrimitiveClass", args),
    }
}

fn desired_assertion_status0(_: &[Value]) -> Value {
    Value::Boolean(false)
}

pub fn load_lang_class() {
    register(CLASS, "registerNatives", "()V", true, native_nop);
    register(
        CLASS,
        "getPrimitiveClass",
        "(Ljava/lang/String;)Ljava/lang/Class;",
        true,
        get_primitive_class,
    );
    register(
        CLASS,
        "desiredAssertionStatus0",
        "(Ljava/lang/Class;)Z",
        true,
        desired_assertion_status0,
    );
}
