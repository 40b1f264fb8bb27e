use crate::runtime::native::{Value, bad_args, native_nop, register};

const THROWABLE: &str = "java/lang/Throwable";

// no frames are recorded, the receiver comes back as is
fn fill_in_stack_trace(args: &[Value]) -> Value {
    match args {
        [receiver, ..] => receiver.clone(),
        [] => bad_args("Throwable.fillInStackTrace", args),
    }
}

fn get_stack_trace_depth(_: &[Value]) -> Value {
    Value::Int(0)
}

pub fn load_lang_throwable() {
    register(THROWABLE, "registerNatives", "()V", true, native_nop);
    register(
        THROWABLE,
        "fillInStackTrace",
        "(I)Ljava/lang/Throwable;",
        false,
        fill_in_stack_trace,
    );
    register(
        THROWABLE,
        "fillInStackTrace",
        "()Ljava/lang/Throwable;",
        false,
        fill_in_stack_trace,
    );
    register(THROWABLE, "getStackTraceDepth", "()I", false, get_stack_trace_depth);
}
