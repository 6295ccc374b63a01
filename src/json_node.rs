use std::str::FromStr;

use anyhow::{
    Result,
    Error,
    bail,
};

use crate::json_tag::*;

#[derive(Debug, Clone, PartialEq)]
pub struct JsonObjProp {
    pub name: String,
    pub value: JsonNode,
}

/// A parsed JSON value. Numbers keep their source text.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonNode {
    PlainNull,
    PlainString(String),
    PlainNumber(String),
    PlainBoolean(bool),
    Array(Vec<JsonNode>),
    Object(Vec<JsonObjProp>),
}

impl JsonNode {
    /// Parses every top-level value found in `json_tags`.
    pub fn parse(json_tags: &[JsonTag]) -> Result<Vec<JsonNode>> {
        let mut i = 0;
        let mut json_nodes = Vec::new();
        while i < json_tags.len() {
            match &json_tags[i] {
                JsonTag::Literal(literal) => {
                    json_nodes.push(JsonNode::parse_plain(literal)?);
                    i += 1;
                }

                JsonTag::LeftCurly => {
                    let right_curly_i = JsonNode::find_match_tag(json_tags, i, JsonTag::LeftCurly, JsonTag::RightCurly)?;
                    json_nodes.push(JsonNode::parse_object(&json_tags[i + 1..right_curly_i])?);
                    i = right_curly_i + 1;
                }

                JsonTag::LeftSquare => {
                    let right_square_i = JsonNode::find_match_tag(json_tags, i, JsonTag::LeftSquare, JsonTag::RightSquare)?;
                    json_nodes.push(JsonNode::parse_array(&json_tags[i + 1..right_square_i])?);
                    i = right_square_i + 1;
                }

                tag => bail!("unexpected {} in json: {}", JsonTag::join(&[tag.clone()]), JsonTag::join(json_tags)),
            }
        }

        Ok(json_nodes)
    }

    fn parse_single(json_tags: &[JsonTag]) -> Result<JsonNode> {
        let mut json_nodes = JsonNode::parse(json_tags)?;
        if json_nodes.len() != 1 {
            bail!("expected exactly one json value, found {} in: {}", json_nodes.len(), JsonTag::join(json_tags))
        }

        Ok(json_nodes.remove(0))
    }

    fn find_match_tag(json_tags: &[JsonTag], start: usize, left_pair_tag: JsonTag, right_pair_tag: JsonTag) -> Result<usize> {
        let mut depth = 0;
        for (i, tag) in json_tags.iter().enumerate().skip(start + 1) {
            if *tag == left_pair_tag {
                depth += 1;
            } else if *tag == right_pair_tag {
                if depth == 0 {
                    return Ok(i);
                }
                depth -= 1;
            }
        }

        bail!("matching {} not found for json: {}", JsonTag::join(&[right_pair_tag]), JsonTag::join(&json_tags[start..]))
    }

    /// Splits on commas that are not nested inside brackets.
    fn split_top_level(json_tags: &[JsonTag]) -> Result<Vec<&[JsonTag]>> {
        if json_tags.is_empty() {
            return Ok(Vec::new());
        }

        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut part_start = 0;
        for (i, tag) in json_tags.iter().enumerate() {
            match tag {
                JsonTag::LeftCurly | JsonTag::LeftSquare => depth += 1,
                JsonTag::RightCurly | JsonTag::RightSquare => depth = depth.saturating_sub(1),
                JsonTag::Comma if depth == 0 => {
                    parts.push(&json_tags[part_start..i]);
                    part_start = i + 1;
                }
                _ => (),
            }
        }
        parts.push(&json_tags[part_start..]);

        if parts.iter().any(|part| part.is_empty()) {
            bail!("empty element in json: {}", JsonTag::join(json_tags))
        }

        Ok(parts)
    }

    fn parse_plain(plain_literal: &str) -> Result<JsonNode> {
        let node = match plain_literal {
            "null" => JsonNode::PlainNull,
            "true" => JsonNode::PlainBoolean(true),
            "false" => JsonNode::PlainBoolean(false),
            s if s.starts_with('"') || s.starts_with('\'') => JsonNode::PlainString(unquote(s)?),
            s if is_json_number(s) => JsonNode::PlainNumber(s.to_string()),
            s => bail!("invalid json literal: {}", s),
        };

        Ok(node)
    }

    fn parse_array(json_tags: &[JsonTag]) -> Result<JsonNode> {
        let items = JsonNode::split_top_level(json_tags)?
            .into_iter()
            .map(JsonNode::parse_single)
            .collect::<Result<Vec<_>>>()?;

        Ok(JsonNode::Array(items))
    }

    fn parse_object(json_tags: &[JsonTag]) -> Result<JsonNode> {
        let mut props = Vec::new();
        for part in JsonNode::split_top_level(json_tags)? {
            let name = match part {
                [JsonTag::Literal(key), JsonTag::Colon, _, ..] if key.starts_with('"') || key.starts_with('\'') => unquote(key)?,
                _ => bail!("malformed object property: {}", JsonTag::join(part)),
            };

            let value = JsonNode::parse_single(&part[2..])?;
            props.push(JsonObjProp { name, value });
        }

        Ok(JsonNode::Object(props))
    }

    /// Looks up a property of an object; `None` for other kinds or a missing name.
    pub fn get(&self, name: &str) -> Option<&JsonNode> {
        match self {
            JsonNode::Object(props) => props.iter().find(|p| p.name == name).map(|p| &p.value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonNode]> {
        match self {
            JsonNode::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonNode::PlainString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonNode::PlainNumber(n) => n.parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonNode::PlainNull)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, JsonNode::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsonNode::Object(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            JsonNode::PlainNull => "null",
            JsonNode::PlainString(_) => "string",
            JsonNode::PlainNumber(_) => "number",
            JsonNode::PlainBoolean(_) => "boolean",
            JsonNode::Array(_) => "array",
            JsonNode::Object(_) => "object",
        }
    }
}

impl FromStr for JsonNode {
    type Err = Error;

    fn from_str(json: &str) -> Result<Self> {
        let json_tags = JsonTag::parse(json.as_bytes())?;
        JsonNode::parse_single(&json_tags).map_err(|e| {
            log::debug!("failed to parse json ({} tags): {}", json_tags.len(), e);
            e
        })
    }
}

/// `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
fn is_json_number(literal: &str) -> bool {
    fn digits(bytes: &[u8], i: &mut usize) -> usize {
        let start = *i;
        while bytes.get(*i).is_some_and(u8::is_ascii_digit) {
            *i += 1;
        }
        *i - start
    }

    let bytes = literal.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }

    let int_start = i;
    let int_len = digits(bytes, &mut i);
    if int_len == 0 || (int_len > 1 && bytes[int_start] == b'0') {
        return false;
    }

    if bytes.get(i) == Some(&b'.') {
        i += 1;
        if digits(bytes, &mut i) == 0 {
            return false;
        }
    }

    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        if digits(bytes, &mut i) == 0 {
            return false;
        }
    }

    i == bytes.len()
}

fn unquote(literal: &str) -> Result<String> {
    let mut chars = literal.chars();
    let quote = chars.next();
    if literal.chars().count() < 2 || literal.chars().last() != quote {
        bail!("unterminated string literal: {}", literal)
    }

    let inner: Vec<char> = chars.collect();
    let inner = &inner[..inner.len() - 1];

    let mut unquoted = String::new();
    let mut i = 0;
    while i < inner.len() {
        let c = inner[i];
        i += 1;
        if c != '\\' {
            unquoted.push(c);
            continue;
        }

        let escaped = match inner.get(i) {
            None => bail!("dangling escape in string literal: {}", literal),
            Some(e) => *e,
        };
        i += 1;
        match escaped {
            'b' => unquoted.push('\u{8}'),
            'f' => unquoted.push('\u{c}'),
            'n' => unquoted.push('\n'),
            'r' => unquoted.push('\r'),
            't' => unquoted.push('\t'),
            'u' => {
                let hex: String = inner.iter().skip(i).take(4).collect();
                let code = Some(&hex)
                    .filter(|h| h.len() == 4 && h.chars().all(|c| c.is_ascii_hexdigit()))
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .and_then(char::from_u32);
                match code {
                    Some(ch) => unquoted.push(ch),
                    _ => bail!("invalid unicode escape in string literal: {}", literal),
                }
                i += 4;
            }
            other => unquoted.push(other),
        }
    }

    Ok(unquoted)
}
