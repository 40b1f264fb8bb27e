use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_till1,
    character::complete::{char, one_of},
    combinator::{eof, map},
    multi::many0,
    sequence::delimited,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor(pub FieldType);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: ReturnType,
}

pub type ReturnType = Option<FieldType>;

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Object(String),
    Short,
    Boolean,
    Array(Box<FieldType>),
}

impl FieldType {
    /// Takes two operand-stack slots.
    pub fn is_long(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    pub fn slots(&self) -> usize {
        if self.is_long() { 2 } else { 1 }
    }
}

impl MethodDescriptor {
    /// Operand-stack slots consumed by a call, receiver included for instance methods.
    pub fn param_slots(&self, is_static: bool) -> usize {
        let receiver = if is_static { 0 } else { 1 };
        receiver + self.parameters.iter().map(FieldType::slots).sum::<usize>()
    }
}

pub fn parse_field_descriptor(input: &str) -> IResult<&str, FieldDescriptor> {
    let (input, field_type) = parse_field_type(input)?;
    eof(input)?;
    Ok((input, FieldDescriptor(field_type)))
}

pub fn parse_method_descriptor(input: &str) -> IResult<&str, MethodDescriptor> {
    let (input, parameters) =
        delimited(char('('), many0(parse_field_type), char(')')).parse(input)?;

    let (input, return_type) = parse_return_type_descriptor(input)?;

    eof(input)?;
    Ok((
        input,
        MethodDescriptor {
            parameters,
            return_type,
        },
    ))
}

pub fn parse_return_type_descriptor(input: &str) -> IResult<&str, ReturnType> {
    alt((map(parse_field_type, Some), parse_void_type)).parse(input)
}

fn parse_field_type(input: &str) -> IResult<&str, FieldType> {
    alt((parse_base_type, parse_object_type, parse_array_type)).parse(input)
}

fn parse_base_type(input: &str) -> IResult<&str, FieldType> {
    let (input, ch) = one_of("BCDFIJSZ")(input)?;
    let field_type = match ch {
        'B' => FieldType::Byte,
        'C' => FieldType::Char,
        'D' => FieldType::Double,
        'F' => FieldType::Float,
        'I' => FieldType::Int,
        'J' => FieldType::Long,
        'S' => FieldType::Short,
        _ => FieldType::Boolean,
    };
    Ok((input, field_type))
}

fn parse_object_type(input: &str) -> IResult<&str, FieldType> {
    let (input, _) = char('L')(input)?;

    let (input, class_name) = take_till1(|c| c == ';')(input)?;

    let (input, _) = char(';')(input)?;

    Ok((input, FieldType::Object(class_name.to_string())))
}

fn parse_array_type(input: &str) -> IResult<&str, FieldType> {
    let (input, _) = char('[')(input)?;

    let (input, field_type) = parse_field_type(input)?;

    Ok((input, FieldType::Array(Box::new(field_type))))
}

fn parse_void_type(input: &str) -> IResult<&str, Option<FieldType>> {
    let (input, _) = char('V')(input)?;
    Ok((input, None))
}

pub fn is_valid_field_descriptor(desc: &str) -> bool {
    parse_field_descriptor(desc).is_ok()
}

pub fn is_valid_method_descriptor(desc: &str) -> bool {
    parse_method_descriptor(desc).is_ok()
}

/// Slot count of a method descriptor, `None` if it does not parse.
pub fn param_slots(desc: &str, is_static: bool) -> Option<usize> {
    parse_method_descriptor(desc)
        .ok()
        .map(|(_, method)| method.param_slots(is_static))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_descriptor() {
        let (_, desc) = parse_method_descriptor("(IJ[Ljava/lang/String;D)V").unwrap();
        assert_eq!(
            desc.parameters,
            vec![
                FieldType::Int,
                FieldType::Long,
                FieldType::Array(Box::new(FieldType::Object("java/lang/String".into()))),
                FieldType::Double,
            ]
        );
        assert_eq!(desc.return_type, None);
    }

    #[test]
    fn test_param_slots() {
        assert_eq!(param_slots("(IJ[Ljava/lang/String;D)V", true), Some(6));
        assert_eq!(param_slots("(IJ[Ljava/lang/String;D)V", false), Some(7));
        assert_eq!(param_slots("()J", true), Some(0));
        assert_eq!(param_slots("(D)D", true), Some(2));
        assert_eq!(param_slots("(D", true), None);
    }

    #[test]
    fn test_invalid_descriptors() {
        assert!(!is_valid_field_descriptor("V"));
        assert!(!is_valid_field_descriptor("L;"));
        assert!(!is_valid_field_descriptor("II"));
        assert!(!is_valid_method_descriptor("(V)V"));
        assert!(!is_valid_method_descriptor("()"));
        assert!(is_valid_field_descriptor("[[J"));
        assert!(is_valid_method_descriptor("()Ljava/lang/Object;"));
    }
}
