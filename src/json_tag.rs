use std::io::{
    Read,
};
use anyhow::{
    Result,
};

use crate::peekable_codepoints::*;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum JsonTag {
    LeftCurly,
    RightCurly,
    LeftSquare,
    RightSquare,
    Colon,
    Comma,
    Literal(String),
}

fn punctuation(c: char) -> Option<JsonTag> {
    match c {
        '{' => Some(JsonTag::LeftCurly),
        '}' => Some(JsonTag::RightCurly),
        '[' => Some(JsonTag::LeftSquare),
        ']' => Some(JsonTag::RightSquare),
        ',' => Some(JsonTag::Comma),
        ':' => Some(JsonTag::Colon),
        _ => None,
    }
}

impl JsonTag {
    /// Length of a quoted literal starting at the current position, quotes included.
    /// A line break inside the quote ends the literal early, leaving it unterminated.
    fn quoted_len<R>(peekable_cp: &mut PeekableCodePoints<R>, quote: char) -> Result<usize>
        where R: Read
    {
        let mut end = 1;
        let mut is_escape = false;
        while let Some(c) = peekable_cp.peek_char(end)? {
            match c {
                '\r' | '\n' => break,
                '\\' if !is_escape => is_escape = true,
                c if c == quote && !is_escape => return Ok(end + 1),
                _ => is_escape = false,
            }

            end += 1;
        }

        Ok(end)
    }

    fn bare_len<R>(peekable_cp: &mut PeekableCodePoints<R>) -> Result<usize>
        where R: Read
    {
        let mut end = 0;
        while let Some(c) = peekable_cp.peek_char(end)? {
            if c.is_whitespace() || punctuation(c).is_some() {
                break;
            }

            end += 1;
        }

        Ok(end)
    }

    pub fn read_json_tag<R>(peekable_cp: &mut PeekableCodePoints<R>) -> Result<Option<JsonTag>>
        where R: Read
    {
        loop {
            let c = match peekable_cp.peek_char(0)? {
                None => return Ok(None),
                Some(c) => c,
            };

            if c.is_whitespace() {
                peekable_cp.skip(1)?;
                continue;
            }

            if let Some(tag) = punctuation(c) {
                peekable_cp.skip(1)?;
                return Ok(Some(tag));
            }

            let len = match c {
                '"' | '\'' => JsonTag::quoted_len(peekable_cp, c)?,
                _ => JsonTag::bare_len(peekable_cp)?,
            };

            let literal = peekable_cp.pop(len)?;
            return Ok(Some(JsonTag::Literal(literal)));
        }
    }

    pub fn parse<R>(reader: R) -> Result<Vec<JsonTag>>
        where R: Read
    {
        let mut json_tag_list = Vec::new();
        let mut peekable_cp = PeekableCodePoints::new(reader);
        while let Some(json_tag) = JsonTag::read_json_tag(&mut peekable_cp)? {
            json_tag_list.push(json_tag);
        }

        Ok(json_tag_list)
    }

    /// Renders tags back to compact text, mainly for error messages.
    pub fn join(json_tags: &[JsonTag]) -> String {
        let mut text = String::new();
        for tag in json_tags {
            match tag {
                JsonTag::LeftCurly => text.push('{'),
                JsonTag::RightCurly => text.push('}'),
                JsonTag::LeftSquare => text.push('['),
                JsonTag::RightSquare => text.push(']'),
                JsonTag::Colon => text.push(':'),
                JsonTag::Comma => text.push(','),
                JsonTag::Literal(literal) => text.push_str(literal),
            }
        }

        text
    }
}
