use std::fmt;
use std::io::Read;
use anyhow::{
    Result,
    bail,
};

use crate::peekable_codepoints::*;

/// A dotted path into a document, e.g. `a.b.0`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FieldPath {
    parts: Vec<String>,
}

impl FieldPath {
    fn read_part<R>(peekable_cp: &mut PeekableCodePoints<R>) -> Result<String>
        where R: Read {
        let mut part = String::new();
        while let Some(c) = peekable_cp.peek_char(0)? {
            peekable_cp.skip(1)?;
            if c == '.' {
                break;
            }
            part.push(c);
        }

        Ok(part)
    }

    pub fn parse(path_str: &str) -> Result<Self> {
        if path_str.is_empty() {
            bail!("field path cannot be empty")
        }

        let mut parts = Vec::new();
        let mut peekable_cp = PeekableCodePoints::new(path_str.as_bytes());
        loop {
            let part = FieldPath::read_part(&mut peekable_cp)?;
            if part.is_empty() {
                bail!("field path has an empty component: {}", path_str)
            }
            parts.push(part);

            if peekable_cp.peek_char(0)?.is_none() {
                // a trailing dot leaves nothing to read but was still consumed
                if path_str.ends_with('.') {
                    bail!("field path has an empty component: {}", path_str)
                }
                break;
            }
        }

        Ok(FieldPath { parts })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}
