use crate::runtime::native::{Value, bad_args, register};

const DOUBLE: &str = "java/lang/Double";
const FLOAT: &str = "java/lang/Float";
const INTEGER: &str = "java/lang/Integer";
const LONG: &str = "java/lang/Long";

fn double_to_raw_long_bits(args: &[Value]) -> Value {
    match args {
        [Value::Double(value)] => Value::Long(value.to_bits() as i64),
        _ => bad_args("Double.doubleToRawLongBits", args),
    }
}

fn long_bits_to_double(args: &[Value]) -> Value {
    match args {
        [Value::Long(bits)] => Value::Double(f64::from_bits(*bits as u64)),
        _ => bad_args("Double.longBitsToDouble", args),
    }
}

fn float_to_raw_int_bits(args: &[Value]) -> Value {
    match args {
        [Value::Float(value)] => Value::Int(value.to_bits() as i32),
        _ => bad_args("Float.floatToRawIntBits", args),
    }
}

fn int_bits_to_float(args: &[Value]) -> Value {
    match args {
        [Value::Int(bits)] => Value::Float(f32::from_bits(*bits as u32)),
        _ => bad_args("Float.intBitsToFloat", args),
    }
}

fn number_format(input: &str) -> Value {
    Value::throw(
        "java/lang/NumberFormatException",
        format!("For input string: \"{input}\""),
    )
}

fn parse_int(args: &[Value]) -> Value {
    match args {
        [Value::Str(s)] => s.parse::<i32>().map_or_else(|_| number_format(s), Value::Int),
        [Value::Ref(0)] => number_format("null"),
        _ => bad_args("Integer.parseInt", args),
    }
}

fn parse_long(args: &[Value]) -> Value {
    match args {
        [Value::Str(s)] => s.parse::<i64>().map_or_else(|_| number_format(s), Value::Long),
        [Value::Ref(0)] => number_format("null"),
        _ => bad_args("Long.parseLong", args),
    }
}

fn parse_double(args: &[Value]) -> Value {
    match args {
        [Value::Str(s)] => s
            .trim()
            .parse::<f64>()
            .map_or_else(|_| number_format(s), Value::Double),
        [Value::Ref(0)] => Value::throw("java/lang/NullPointerException", "parseDouble(null)"),
        _ => bad_args("Double.parseDouble", args),
    }
}

fn to_string(args: &[Value]) -> Value {
    match args {
        [Value::Int(i)] => Value::Str(i.to_string().into()),
        [Value::Long(l)] => Value::Str(l.to_string().into()),
        _ => bad_args("toString", args),
    }
}

pub fn load_primitives() {
    register(DOUBLE, "doubleToRawLongBits", "(D)J", true, double_to_raw_long_bits);
    register(DOUBLE, "longBitsToDouble", "(J)D", true, long_bits_to_double);
    register(DOUBLE, "parseDouble", "(Ljava/lang/String;)D", true, parse_double);
    register(FLOAT, "floatToRawIntBits", "(F)I", true, float_to_raw_int_bits);
    register(FLOAT, "intBitsToFloat", "(I)F", true, int_bits_to_float);
    register(INTEGER, "parseInt", "(Ljava/lang/String;)I", true, parse_int);
    register(INTEGER, "toString", "(I)Ljava/lang/String;", true, to_string);
    register(LONG, "parseLong", "(Ljava/lang/String;)J", true, parse_long);
    register(LONG, "toString", "(J)Ljava/lang/String;", true, to_string);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits() {
        assert_eq!(
            double_to_raw_long_bits(&[Value::Double(1.0)]),
            Value::Long(0x3FF0_0000_0000_0000)
        );
        assert_eq!(
            long_bits_to_double(&[Value::Long(0x4000_0000_0000_0000)]),
            Value::Double(2.0)
        );
        assert_eq!(
            float_to_raw_int_bits(&[Value::Float(-0.0)]),
            Value::Int(i32::MIN)
        );
        assert_eq!(int_bits_to_float(&[Value::Int(0x3F80_0000)]), Value::Float(1.0));
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse_int(&[Value::Str("-17".into())]), Value::Int(-17));
        assert!(parse_int(&[Value::Str("2147483648".into())]).is_throw());
        assert_eq!(parse_long(&[Value::Str("2147483648".into())]), Value::Long(2147483648));
        assert_eq!(parse_double(&[Value::Str(" 1.5 ".into())]), Value::Double(1.5));
        let Value::Throw { class, message } = parse_int(&[Value::Str("x".into())]) else {
            panic!("expected a throw");
        };
        assert_eq!(class, "java/lang/NumberFormatException");
        assert_eq!(message, "For input string: \"x\"");
    }
}
