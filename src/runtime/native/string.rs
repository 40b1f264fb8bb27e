use std::sync::Arc;

use crate::runtime::native::{Value, bad_args, native_nop, register};

const STRING: &str = "java/lang/String";
const STRING_UTF16: &str = "java/lang/StringUTF16";

fn value_of(args: &[Value]) -> Value {
    let text = match args {
        [Value::Boolean(b)] => b.to_string(),
        [Value::Char(c)] => char::from_u32(*c as u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string(),
        [Value::Int(i)] => i.to_string(),
        [Value::Long(l)] => l.to_string(),
        [Value::Float(f)] => f.to_string(),
        [Value::Double(d)] => d.to_string(),
        [Value::Str(s)] => return Value::Str(Arc::clone(s)),
        [Value::Ref(0)] => "null".to_string(),
        _ => return bad_args("String.valueOf", args),
    };
    Value::Str(text.into())
}

fn length(args: &[Value]) -> Value {
    match args {
        [Value::Str(s)] => Value::Int(s.encode_utf16().count() as i32),
        _ => bad_args("String.length", args),
    }
}

fn is_empty(args: &[Value]) -> Value {
    match args {
        [Value::Str(s)] => Value::Boolean(s.is_empty()),
        _ => bad_args("String.isEmpty", args),
    }
}

fn concat(args: &[Value]) -> Value {
    match args {
        [Value::Str(a), Value::Str(b)] => Value::Str(format!("{a}{b}").into()),
        [_, Value::Ref(0)] => Value::throw("java/lang/NullPointerException", "concat(null)"),
        _ => bad_args("String.concat", args),
    }
}

fn intern(args: &[Value]) -> Value {
    match args {
        [Value::Str(s)] => Value::Str(Arc::clone(s)),
        _ => bad_args("String.intern", args),
    }
}

fn hash_code(args: &[Value]) -> Value {
    match args {
        [Value::Str(s)] => Value::Int(
            s.encode_utf16()
                .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32)),
        ),
        _ => bad_args("String.hashCode", args),
    }
}

fn is_big_endian(_: &[Value]) -> Value {
    Value::Boolean(cfg!(target_endian = "big"))
}

pub fn load_lang_string() {
    register(STRING, "registerNatives", "()V", true, native_nop);
    for desc in ["Z", "C", "I", "J", "F", "D", "Ljava/lang/Object;"] {
        register(STRING, "valueOf", &format!("({desc})Ljava/lang/String;"), true, value_of);
    }
    register(STRING, "length", "()I", false, length);
    register(STRING, "isEmpty", "()Z", false, is_empty);
    register(STRING, "concat", "(Ljava/lang/String;)Ljava/lang/String;", false, concat);
    register(STRING, "intern", "()Ljava/lang/String;", false, intern);
    register(STRING, "hashCode", "()I", false, hash_code);
    register(STRING_UTF16, "isBigEndian", "()Z", true, is_big_endian);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_of() {
        assert_eq!(value_of(&[Value::Int(42)]), Value::Str("42".into()));
        assert_eq!(value_of(&[Value::Boolean(false)]), Value::Str("false".into()));
        assert_eq!(value_of(&[Value::Ref(0)]), Value::Str("null".into()));
    }

    #[test]
    fn test_length_counts_utf16_units() {
        assert_eq!(length(&[Value::Str("abc".into())]), Value::Int(3));
        // one supplementary character is a surrogate pair
        assert_eq!(length(&[Value::Str("\u{1F600}".into())]), Value::Int(2));
    }

    #[test]
    fn test_hash_code() {
        assert_eq!(hash_code(&[Value::Str("".into())]), Value::Int(0));
        // "hello".hashCode() in Java
        assert_eq!(hash_code(&[Value::Str("hello".into())]), Value::Int(99162322));
    }

    #[test]
    fn test_concat() {
        assert_eq!(
            concat(&[Value::Str("foo".into()), Value::Str("bar".into())]),
            Value::Str("foobar".into())
        );
        assert!(concat(&[Value::Str("foo".into()), Value::Ref(0)]).is_throw());
    }
}
