//! Field and method descriptors

use crate::error::{Error, Result};
use std::fmt;

/// A field descriptor (JVMS 4.3.2)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    /// Internal (slash-separated) class name
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let (ty, rest) = Self::parse_prefix(descriptor)?;
        if !rest.is_empty() {
            return Err(invalid(descriptor));
        }
        Ok(ty)
    }

    /// Parse one type off the front of `input`, returning the remainder
    fn parse_prefix(input: &str) -> Result<(Self, &str)> {
        let mut chars = input.chars();
        let ty = match chars.next() {
            Some('B') => FieldType::Byte,
            Some('C') => FieldType::Char,
            Some('D') => FieldType::Double,
            Some('F') => FieldType::Float,
            Some('I') => FieldType::Int,
            Some('J') => FieldType::Long,
            Some('S') => FieldType::Short,
            Some('Z') => FieldType::Boolean,
            Some('L') => {
                let body = &input[1..];
                let end = body.find(';').ok_or_else(|| invalid(input))?;
                let name = &body[..end];
                if name.is_empty() || name.contains(&['.', '['][..]) {
                    return Err(invalid(input));
                }
                return Ok((FieldType::Object(name.to_string()), &body[end + 1..]));
            }
            Some('[') => {
                let (component, rest) = Self::parse_prefix(&input[1..])?;
                return Ok((FieldType::Array(Box::new(component)), rest));
            }
            _ => return Err(invalid(input)),
        };
        Ok((ty, chars.as_str()))
    }

    /// Object type for an internal class name
    pub fn object(internal_name: impl Into<String>) -> Self {
        FieldType::Object(internal_name.into())
    }

    /// Longs and doubles take two local/stack slots
    pub fn is_wide(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Byte => f.write_str("B"),
            FieldType::Char => f.write_str("C"),
            FieldType::Double => f.write_str("D"),
            FieldType::Float => f.write_str("F"),
            FieldType::Int => f.write_str("I"),
            FieldType::Long => f.write_str("J"),
            FieldType::Short => f.write_str("S"),
            FieldType::Boolean => f.write_str("Z"),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array(component) => write!(f, "[{}", component),
        }
    }
}

/// A method descriptor; `ret == None` is `V`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn new(params: Vec<FieldType>, ret: Option<FieldType>) -> Self {
        Self { params, ret }
    }

    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut rest = descriptor.strip_prefix('(').ok_or_else(|| invalid(descriptor))?;
        let mut params = Vec::new();
        while !rest.starts_with(')') {
            if rest.is_empty() {
                return Err(invalid(descriptor));
            }
            let (ty, tail) = FieldType::parse_prefix(rest)?;
            params.push(ty);
            rest = tail;
        }
        let ret = match &rest[1..] {
            "V" => None,
            other => Some(FieldType::parse(other).map_err(|_| invalid(descriptor))?),
        };
        Ok(Self { params, ret })
    }

    /// Local variable slots taken by the parameters (receiver excluded)
    pub fn param_slots(&self) -> usize {
        self.params.iter().map(|p| if p.is_wide() { 2 } else { 1 }).sum()
    }

    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{}", ret),
            None => f.write_str("V"),
        }
    }
}

fn invalid(descriptor: &str) -> Error {
    Error::malformed(format!("invalid descriptor '{}'", descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_types() {
        assert_eq!(FieldType::parse("I").unwrap(), FieldType::Int);
        assert_eq!(
            FieldType::parse("[[Ljava/lang/String;").unwrap(),
            FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::object("java/lang/String")))))
        );
        assert!(FieldType::parse("Ljava/lang/String").is_err());
        assert!(FieldType::parse("II").is_err());
        assert!(FieldType::parse("V").is_err());
    }

    #[test]
    fn test_method_descriptor_prints_back() {
        for text in ["()V", "(IJLp/X;)D", "([I[[Ljava/lang/Object;)Lp/Y;"] {
            let parsed = MethodDescriptor::parse(text).unwrap();
            assert_eq!(parsed.to_string(), text);
        }
        let d = MethodDescriptor::parse("(JID)V").unwrap();
        assert_eq!(d.param_slots(), 5);
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("I)V").is_err());
    }
}
