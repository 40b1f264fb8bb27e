use std::{
    process,
    sync::LazyLock,
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use log::info;

use crate::runtime::native::{Value, bad_args, native_nop, register};

const SYSTEM: &str = "java/lang/System";
const RUNTIME: &str = "java/lang/Runtime";
const THREAD: &str = "java/lang/Thread";
const THREAD_GROUP: &str = "java/lang/ThreadGroup";

/// Reference handed out for the main thread.
pub const MAIN_THREAD_REF: u32 = 1;

static START: LazyLock<Instant> = LazyLock::new(Instant::now);

fn current_time_millis(_: &[Value]) -> Value {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    Value::Long(millis)
}

fn nano_time(_: &[Value]) -> Value {
    Value::Long(START.elapsed().as_nanos() as i64)
}

fn exit(args: &[Value]) -> Value {
    match args {
        [status] => {
            let code = status.as_int().unwrap_or(1);
            info!("System.exit({code})");
            process::exit(code)
        }
        _ => bad_args("System.exit", args),
    }
}

fn available_processors(_: &[Value]) -> Value {
    let n = thread::available_parallelism().map_or(1, |n| n.get());
    Value::Int(n as i32)
}

fn current_thread(_: &[Value]) -> Value {
    Value::Ref(MAIN_THREAD_REF)
}

fn sleep(args: &[Value]) -> Value {
    match *args {
        [Value::Long(ms)] if ms < 0 => {
            Value::throw("java/lang/IllegalArgumentException", "timeout value is negative")
        }
        [Value::Long(ms)] => {
            thread::sleep(Duration::from_millis(ms as u64));
            Value::Void
        }
        _ => bad_args("Thread.sleep", args),
    }
}

fn yield_now(_: &[Value]) -> Value {
    thread::yield_now();
    Value::Void
}

pub fn load_lang_system() {
    register(SYSTEM, "registerNatives", "()V", true, native_nop);
    register(SYSTEM, "currentTimeMillis", "()J", true, current_time_millis);
    register(SYSTEM, "nanoTime", "()J", true, nano_time);
    register(SYSTEM, "exit", "(I)V", true, exit);
    register(RUNTIME, "availableProcessors", "()I", false, available_processors);

    // Thread and ThreadGroup are never loaded from the JDK; these stand in for them.
    register(THREAD, "registerNatives", "()V", true, native_nop);
    register(THREAD, "currentThread", "()Ljava/lang/Thread;", true, current_thread);
    register(THREAD, "sleep", "(J)V", true, sleep);
    register(THREAD, "yield", "()V", true, yield_now);
    register(THREAD, "<init>", "()V", false, native_nop);
    register(THREAD_GROUP, "<init>", "()V", false, native_nop);
}
