//! Java type references as written in source and in rule declarations.

use std::fmt;

/// A (possibly generic, possibly array) Java type reference.
///
/// Names are kept as written, so they may be simple (`List`) or qualified
/// (`java.util.List`). Wildcards are represented by the name `?`; their bounds
/// are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JavaType {
    pub name: String,
    pub args: Vec<JavaType>,
    pub dims: usize,
}

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "short", "char", "int", "long", "float", "double", "void",
];

impl JavaType {
    /// Creates a non-generic, non-array type.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            dims: 0,
        }
    }

    /// Creates a generic type with the given arguments.
    pub fn generic(name: impl Into<String>, args: Vec<JavaType>) -> Self {
        Self {
            name: name.into(),
            args,
            dims: 0,
        }
    }

    /// Returns the unbounded wildcard `?`.
    pub fn wildcard() -> Self {
        Self::named("?")
    }

    /// Parses a type as written in Java source, e.g. `Map<String, List<Integer>>[]`.
    pub fn parse(text: &str) -> Option<JavaType> {
        let mut parser = TypeParser {
            bytes: text.trim().as_bytes(),
            pos: 0,
        };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        (parser.pos == parser.bytes.len()).then_some(ty)
    }

    /// Returns the last segment of the (possibly qualified) name.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn is_primitive(&self) -> bool {
        self.dims == 0 && PRIMITIVES.contains(&self.name.as_str())
    }

    pub fn is_array(&self) -> bool {
        self.dims > 0
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == "?"
    }

    /// Returns true for the diamond form `Name<>` of a class instance creation.
    pub fn is_diamond(&self) -> bool {
        self.args.len() == 1 && self.args[0].name.is_empty()
    }

    /// Returns the element type of an array, or `None` for non-array types.
    pub fn element(&self) -> Option<JavaType> {
        (self.dims > 0).then(|| JavaType {
            name: self.name.clone(),
            args: self.args.clone(),
            dims: self.dims - 1,
        })
    }

    /// Returns the innermost element type of an array type.
    pub fn base(&self) -> JavaType {
        JavaType {
            name: self.name.clone(),
            args: self.args.clone(),
            dims: 0,
        }
    }

    /// Returns this type with `extra` more array dimensions.
    pub fn with_dims(mut self, extra: usize) -> Self {
        self.dims += extra;
        self
    }

    /// Returns the type without generic arguments.
    pub fn erased(&self) -> JavaType {
        JavaType {
            name: self.name.clone(),
            args: Vec::new(),
            dims: self.dims,
        }
    }

    /// Returns the boxed counterpart of a primitive type.
    pub fn boxed(&self) -> Option<&'static str> {
        if self.dims > 0 {
            return None;
        }
        Some(match self.name.as_str() {
            "boolean" => "Boolean",
            "byte" => "Byte",
            "short" => "Short",
            "char" => "Character",
            "int" => "Integer",
            "long" => "Long",
            "float" => "Float",
            "double" => "Double",
            _ => return None,
        })
    }

    /// Returns the primitive counterpart of a boxed type.
    pub fn unboxed(&self) -> Option<&'static str> {
        if self.dims > 0 {
            return None;
        }
        Some(match self.simple_name() {
            "Boolean" => "boolean",
            "Byte" => "byte",
            "Short" => "short",
            "Character" => "char",
            "Integer" => "int",
            "Long" => "long",
            "Float" => "float",
            "Double" => "double",
            _ => return None,
        })
    }

    /// Whether any name in this type satisfies the predicate.
    pub fn mentions(&self, pred: &impl Fn(&str) -> bool) -> bool {
        pred(&self.name) || self.args.iter().any(|a| a.mentions(pred))
    }
}

/// Returns the last dot-separated segment of a name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

struct TypeParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl TypeParser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let rest = &self.bytes[self.pos..];
        let kw = keyword.as_bytes();
        let boundary = rest
            .get(kw.len())
            .is_none_or(|b| !(b.is_ascii_alphanumeric() || *b == b'_'));
        if rest.starts_with(kw) && boundary {
            self.pos += kw.len();
            true
        } else {
            false
        }
    }

    fn skip_annotations(&mut self) {
        loop {
            self.skip_ws();
            if self.peek() != Some(b'@') {
                return;
            }
            self.pos += 1;
            let _ = self.name();
        }
    }

    fn name(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.pos;
        while let Some(b) = self.peek() {
            let continues = b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.';
            if !continues {
                break;
            }
            if b == b'.' && self.bytes[self.pos..].starts_with(b"...") {
                break;
            }
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).ok()?;
        let valid = text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
        valid.then(|| text.trim_end_matches('.').to_string())
    }

    fn parse_type(&mut self) -> Option<JavaType> {
        self.skip_annotations();
        let mut ty = if self.eat(b'?') {
            if self.eat_keyword("extends") || self.eat_keyword("super") {
                self.parse_type()?;
            }
            JavaType::wildcard()
        } else {
            let name = self.name()?;
            let mut args = Vec::new();
            if self.eat(b'<') {
                if self.eat(b'>') {
                    // diamond
                    args.push(JavaType::named(""));
                } else {
                    loop {
                        args.push(self.parse_type()?);
                        if self.eat(b',') {
                            continue;
                        }
                        if self.eat(b'>') {
                            break;
                        }
                        return None;
                    }
                }
            }
            JavaType::generic(name, args)
        };

        loop {
            self.skip_ws();
            if self.bytes[self.pos..].starts_with(b"...") {
                self.pos += 3;
                ty.dims += 1;
            } else if self.eat(b'[') {
                if !self.eat(b']') {
                    return None;
                }
                ty.dims += 1;
            } else {
                break;
            }
        }
        Some(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_and_generic() {
        assert_eq!(JavaType::parse("int").unwrap(), JavaType::named("int"));

        let map = JavaType::parse("Map<String, List<Integer>>").unwrap();
        assert_eq!(map.name, "Map");
        assert_eq!(map.args.len(), 2);
        assert_eq!(map.args[1].args[0].name, "Integer");
    }

    #[test]
    fn test_parse_arrays_and_varargs() {
        assert_eq!(JavaType::parse("String[][]").unwrap().dims, 2);
        assert_eq!(JavaType::parse("T...").unwrap().dims, 1);
    }

    #[test]
    fn test_parse_wildcards_and_diamond() {
        let ty = JavaType::parse("Comparator<? super T>").unwrap();
        assert!(ty.args[0].is_wildcard());

        let diamond = JavaType::parse("ArrayList<>").unwrap();
        assert!(diamond.is_diamond());
        assert_eq!(diamond.to_string(), "ArrayList<>");
        assert!(!JavaType::parse("ArrayList").unwrap().is_diamond());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(JavaType::parse("Map<String").is_none());
        assert!(JavaType::parse("1abc").is_none());
        assert!(JavaType::parse("").is_none());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let ty = JavaType::parse("java.util.Map<K, V[]>[]").unwrap();
        assert_eq!(ty.to_string(), "java.util.Map<K, V[]>[]");
        assert_eq!(ty.simple_name(), "Map");
    }

    #[test]
    fn test_boxing() {
        assert_eq!(JavaType::named("int").boxed(), Some("Integer"));
        assert_eq!(JavaType::named("java.lang.Long").unboxed(), Some("long"));
        assert!(JavaType::named("int").with_dims(1).boxed().is_none());
    }
}
