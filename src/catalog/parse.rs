use std::fmt;

use crate::error::CatalogError;

/// Unresolved type expression as written in a catalog: `Optional[list[str]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSyntax {
    Name(String),
    Apply { head: String, args: Vec<TypeSyntax> },
}

impl fmt::Display for TypeSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSyntax::Name(name) => write!(f, "{name}"),
            TypeSyntax::Apply { head, args } => {
                write!(f, "{head}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, "]")
            }
        }
    }
}

pub fn parse_type(text: &str) -> Result<TypeSyntax, CatalogError> {
    let mut parser = Parser { text, pos: 0 };
    let ty = parser.parse_type()?;
    parser.skip_ws();
    if parser.pos < text.len() {
        return Err(parser.err("unexpected trailing input"));
    }
    Ok(ty)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize, // byte offset
}

impl Parser<'_> {
    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    fn err(&self, message: impl Into<String>) -> CatalogError {
        CatalogError::Syntax { text: self.text.to_string(), offset: self.pos, message: message.into() }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_name(&mut self) -> Result<String, CatalogError> {
        self.skip_ws();
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(match self.peek() {
                Some(c) => self.err(format!("expected a type name, found `{c}`")),
                None => self.err("expected a type name, found end of input"),
            });
        }
        let name = self.rest()[..len].to_string();
        self.pos += len;
        Ok(name)
    }

    fn parse_type(&mut self) -> Result<TypeSyntax, CatalogError> {
        let head = self.take_name()?;
        if !self.eat('[') {
            return Ok(TypeSyntax::Name(head));
        }
        let mut args = vec![self.parse_type()?];
        loop {
            if self.eat(']') {
                return Ok(TypeSyntax::Apply { head, args });
            }
            if !self.eat(',') {
                self.skip_ws();
                return Err(match self.peek() {
                    Some(c) => self.err(format!("expected `,` or `]`, found `{c}`")),
                    None => self.err("unclosed `[`"),
                });
            }
            args.push(self.parse_type()?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> TypeSyntax {
        TypeSyntax::Name(s.to_string())
    }

    #[test]
    fn bare_names() {
        assert_eq!(parse_type("str").unwrap(), name("str"));
        assert_eq!(parse_type("  datetime.date ").unwrap(), name("datetime.date"));
    }

    #[test]
    fn nested_generics() {
        let ty = parse_type("Optional[ dict[str, list[int]] ]").unwrap();
        assert_eq!(
            ty,
            TypeSyntax::Apply {
                head: "Optional".into(),
                args: vec![TypeSyntax::Apply {
                    head: "dict".into(),
                    args: vec![
                        name("str"),
                        TypeSyntax::Apply { head: "list".into(), args: vec![name("int")] },
                    ],
                }],
            }
        );
        assert_eq!(ty.to_string(), "Optional[dict[str, list[int]]]");
    }

    #[test]
    fn syntax_errors_carry_offsets() {
        match parse_type("list[int").unwrap_err() {
            CatalogError::Syntax { offset, message, .. } => {
                assert_eq!(offset, 8);
                assert_eq!(message, "unclosed `[`");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(parse_type("list[]"), Err(CatalogError::Syntax { offset: 5, .. })));
        assert!(matches!(parse_type("int str"), Err(CatalogError::Syntax { offset: 4, .. })));
        assert!(matches!(parse_type(""), Err(CatalogError::Syntax { .. })));
    }
}
