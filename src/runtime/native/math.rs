use paste::paste;

use crate::runtime::native::{Value, bad_args, register};

const MATH: &str = "java/lang/Math";
const STRICT_MATH: &str = "java/lang/StrictMath";

/// Generates `math_<name>(D)D` wrappers around an `f64` method.
macro_rules! unary_double {
    ($($name:ident => $method:ident),* $(,)?) => {
        paste! {
            $(
                fn [<math_ $name>](args: &[Value]) -> Value {
                    match args {
                        [Value::Double(d)] => Value::Double(d.$method()),
                        _ => bad_args(concat!("Math.", stringify!($name)), args),
                    }
                }
            )*

            fn register_unary_doubles(class: &str) {
                $(
                    register(class, stringify!($name), "(D)D", true, [<math_ $name>]);
                )*
            }
        }
    };
}

unary_double! {
    sqrt => sqrt,
    cbrt => cbrt,
    sin => sin,
    cos => cos,
    tan => tan,
    asin => asin,
    acos => acos,
    atan => atan,
    sinh => sinh,
    cosh => cosh,
    tanh => tanh,
    exp => exp,
    expm1 => exp_m1,
    log => ln,
    log10 => log10,
    log1p => ln_1p,
    floor => floor,
    ceil => ceil,
    rint => round_ties_even,
    toRadians => to_radians,
    toDegrees => to_degrees,
}

fn math_abs(args: &[Value]) -> Value {
    match *args {
        [Value::Int(i)] => Value::Int(i.wrapping_abs()),
        [Value::Long(l)] => Value::Long(l.wrapping_abs()),
        [Value::Float(f)] => Value::Float(f.abs()),
        [Value::Double(d)] => Value::Double(d.abs()),
        _ => bad_args("Math.abs", args),
    }
}

fn math_max(args: &[Value]) -> Value {
    match *args {
        [Value::Int(a), Value::Int(b)] => Value::Int(a.max(b)),
        [Value::Long(a), Value::Long(b)] => Value::Long(a.max(b)),
        [Value::Float(a), Value::Float(b)] => Value::Float(java_max(a as f64, b as f64) as f32),
        [Value::Double(a), Value::Double(b)] => Value::Double(java_max(a, b)),
        _ => bad_args("Math.max", args),
    }
}

fn math_min(args: &[Value]) -> Value {
    match *args {
        [Value::Int(a), Value::Int(b)] => Value::Int(a.min(b)),
        [Value::Long(a), Value::Long(b)] => Value::Long(a.min(b)),
        [Value::Float(a), Value::Float(b)] => Value::Float(java_min(a as f64, b as f64) as f32),
        [Value::Double(a), Value::Double(b)] => Value::Double(java_min(a, b)),
        _ => bad_args("Math.min", args),
    }
}

// NaN wins, unlike f64::max
fn java_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

fn java_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn math_pow(args: &[Value]) -> Value {
    match *args {
        [Value::Double(a), Value::Double(b)] => Value::Double(a.powf(b)),
        _ => bad_args("Math.pow", args),
    }
}

fn math_atan2(args: &[Value]) -> Value {
    match *args {
        [Value::Double(y), Value::Double(x)] => Value::Double(y.atan2(x)),
        _ => bad_args("Math.atan2", args),
    }
}

fn math_hypot(args: &[Value]) -> Value {
    match *args {
        [Value::Double(x), Value::Double(y)] => Value::Double(x.hypot(y)),
        _ => bad_args("Math.hypot", args),
    }
}

fn math_signum(args: &[Value]) -> Value {
    match *args {
        // zero and NaN are returned unchanged
        [Value::Double(d)] if d == 0.0 || d.is_nan() => Value::Double(d),
        [Value::Double(d)] => Value::Double(d.signum()),
        [Value::Float(f)] if f == 0.0 || f.is_nan() => Value::Float(f),
        [Value::Float(f)] => Value::Float(f.signum()),
        _ => bad_args("Math.signum", args),
    }
}

fn math_add_exact(args: &[Value]) -> Value {
    let sum = match *args {
        [Value::Int(a), Value::Int(b)] => a.checked_add(b).map(Value::Int),
        [Value::Long(a), Value::Long(b)] => a.checked_add(b).map(Value::Long),
        _ => return bad_args("Math.addExact", args),
    };
    sum.unwrap_or_else(|| Value::throw("java/lang/ArithmeticException", "integer overflow"))
}

fn math_multiply_exact(args: &[Value]) -> Value {
    let product = match *args {
        [Value::Int(a), Value::Int(b)] => a.checked_mul(b).map(Value::Int),
        [Value::Long(a), Value::Long(b)] => a.checked_mul(b).map(Value::Long),
        _ => return bad_args("Math.multiplyExact", args),
    };
    product.unwrap_or_else(|| Value::throw("java/lang/ArithmeticException", "integer overflow"))
}

fn math_floor_div(args: &[Value]) -> Value {
    match *args {
        [Value::Int(_), Value::Int(0)] | [Value::Long(_), Value::Long(0)] => {
            Value::throw("java/lang/ArithmeticException", "/ by zero")
        }
        [Value::Int(a), Value::Int(b)] => Value::Int(a.wrapping_div_euclid(b).wrapping_sub(
            if (a.wrapping_rem_euclid(b) != 0) && b < 0 { 1 } else { 0 },
        )),
        [Value::Long(a), Value::Long(b)] => Value::Long(a.wrapping_div_euclid(b).wrapping_sub(
            if (a.wrapping_rem_euclid(b) != 0) && b < 0 { 1 } else { 0 },
        )),
        _ => bad_args("Math.floorDiv", args),
    }
}

pub fn load_lang_math() {
    for class in [MATH, STRICT_MATH] {
        register_unary_doubles(class);

        register(class, "abs", "(I)I", true, math_abs);
        register(class, "abs", "(J)J", true, math_abs);
        register(class, "abs", "(F)F", true, math_abs);
        register(class, "abs", "(D)D", true, math_abs);
        register(class, "max", "(II)I", true, math_max);
        register(class, "max", "(JJ)J", true, math_max);
        register(class, "max", "(FF)F", true, math_max);
        register(class, "max", "(DD)D", true, math_max);
        register(class, "min", "(II)I", true, math_min);
        register(class, "min", "(JJ)J", true, math_min);
        register(class, "min", "(FF)F", true, math_min);
        register(class, "min", "(DD)D", true, math_min);
        register(class, "pow", "(DD)D", true, math_pow);
        register(class, "atan2", "(DD)D", true, math_atan2);
        register(class, "hypot", "(DD)D", true, math_hypot);
        register(class, "signum", "(D)D", true, math_signum);
        register(class, "signum", "(F)F", true, math_signum);
    }

    register(MATH, "addExact", "(II)I", true, math_add_exact);
    register(MATH, "addExact", "(JJ)J", true, math_add_exact);
    register(MATH, "multiplyExact", "(II)I", true, math_multiply_exact);
    register(MATH, "multiplyExact", "(JJ)J", true, math_multiply_exact);
    register(MATH, "floorDiv", "(II)I", true, math_floor_div);
    register(MATH, "floorDiv", "(JJ)J", true, math_floor_div);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary() {
        assert_eq!(math_sqrt(&[Value::Double(16.0)]), Value::Double(4.0));
        assert_eq!(math_log(&[Value::Double(1.0)]), Value::Double(0.0));
        assert_eq!(math_rint(&[Value::Double(2.5)]), Value::Double(2.0));
        assert!(math_sqrt(&[Value::Int(4)]).is_throw());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(math_max(&[Value::Int(3), Value::Int(7)]), Value::Int(7));
        assert_eq!(math_min(&[Value::Long(-3), Value::Long(7)]), Value::Long(-3));
        let Value::Double(d) = math_max(&[Value::Double(f64::NAN), Value::Double(1.0)]) else {
            panic!("expected a double");
        };
        assert!(d.is_nan());
    }

    #[test]
    fn test_exact_and_floor_div() {
        assert!(math_add_exact(&[Value::Int(i32::MAX), Value::Int(1)]).is_throw());
        assert_eq!(
            math_multiply_exact(&[Value::Long(6), Value::Long(7)]),
            Value::Long(42)
        );
        assert_eq!(math_floor_div(&[Value::Int(-7), Value::Int(2)]), Value::Int(-4));
        assert_eq!(math_floor_div(&[Value::Int(7), Value::Int(-2)]), Value::Int(-4));
        assert_eq!(math_floor_div(&[Value::Int(7), Value::Int(2)]), Value::Int(3));
        assert!(math_floor_div(&[Value::Int(1), Value::Int(0)]).is_throw());
    }

    #[test]
    fn test_signum() {
        assert_eq!(math_signum(&[Value::Double(0.0)]), Value::Double(0.0));
        assert_eq!(math_signum(&[Value::Double(-3.5)]), Value::Double(-1.0));
    }
}
