use std::io::{self, Write};

use crate::runtime::native::{Value, bad_args, register};

const PRINT_STREAM: &str = "java/io/PrintStream";

/// References stored in the `System.out` and `System.err` statics.
pub const STDOUT_REF: u32 = 1;
pub const STDERR_REF: u32 = 2;

/// Renders a value the way `String.valueOf` would.
fn render(value: &Value) -> Option<String> {
    Some(match value {
        Value::Boolean(b) => b.to_string(),
        Value::Char(c) => char::from_u32(*c as u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string(),
        Value::Int(i) => i.to_string(),
        Value::Long(l) => l.to_string(),
        Value::Float(f) => java_float(*f as f64),
        Value::Double(d) => java_float(*d),
        Value::Str(s) => s.to_string(),
        Value::Ref(0) => "null".to_string(),
        _ => return None,
    })
}

// Java always prints a fractional part for finite floats.
fn java_float(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if d.fract() == 0.0 && d.abs() < 1e7 {
        format!("{d:.1}")
    } else {
        d.to_string()
    }
}

fn write_to(receiver: &Value, text: &str, newline: bool) -> io::Result<()> {
    let mut out: Box<dyn Write> = match receiver {
        Value::Ref(STDERR_REF) => Box::new(io::stderr().lock()),
        _ => Box::new(io::stdout().lock()),
    };
    out.write_all(text.as_bytes())?;
    if newline {
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn print_impl(args: &[Value], newline: bool) -> Value {
    let (receiver, text) = match args {
        [receiver] if newline => (receiver, String::new()),
        [receiver, value] => match render(value) {
            Some(text) => (receiver, text),
            None => return bad_args("PrintStream.print", args),
        },
        _ => return bad_args("PrintStream.print", args),
    };
    match write_to(receiver, &text, newline) {
        Ok(()) => Value::Void,
        Err(e) => Value::throw("java/io/IOException", e.to_string()),
    }
}

fn println(args: &[Value]) -> Value {
    print_impl(args, true)
}

fn print(args: &[Value]) -> Value {
    print_impl(args, false)
}

pub fn load_io_printstream() {
    register(PRINT_STREAM, "println", "()V", false, println);
    for desc in ["Z", "C", "I", "J", "F", "D", "Ljava/lang/String;", "Ljava/lang/Object;"] {
        register(PRINT_STREAM, "println", &format!("({desc})V"), false, println);
        register(PRINT_STREAM, "print", &format!("({desc})V"), false, print);
    }
}
