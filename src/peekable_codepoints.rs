use std::io::{
    Bytes,
    Read,
};

use anyhow::{
    Result,
    Error,
};
use unicode_reader::CodePoints;

/// Code points decoded from a reader, with an arbitrary lookahead buffer.
pub struct PeekableCodePoints<R>
    where R: Read
{
    codepoints: CodePoints<Bytes<R>>,
    lookahead: Vec<char>,
}

impl<R: Read> PeekableCodePoints<R> {
    pub fn new(reader: R) -> Self {
        PeekableCodePoints {
            codepoints: CodePoints::from(reader),
            lookahead: Vec::new(),
        }
    }

    /// Makes sure at least `wanted` chars are buffered, unless input ends first.
    fn fill_to(&mut self, wanted: usize) -> Result<()> {
        while self.lookahead.len() < wanted {
            match self.codepoints.next() {
                None => break,
                Some(Err(e)) => return Err(Error::new(e)),
                Some(Ok(c)) => self.lookahead.push(c),
            }
        }

        Ok(())
    }

    pub fn peek_char(&mut self, index: usize) -> Result<Option<char>> {
        self.fill_to(index + 1)?;
        Ok(self.lookahead.get(index).copied())
    }

    pub fn peek(&mut self, count: usize) -> Result<String> {
        self.fill_to(count)?;
        let available = count.min(self.lookahead.len());
        Ok(self.lookahead[..available].iter().collect())
    }

    pub fn skip(&mut self, count: usize) -> Result<usize> {
        self.fill_to(count)?;
        let skipped = count.min(self.lookahead.len());
        self.lookahead.drain(..skipped);

        Ok(skipped)
    }

    pub fn pop(&mut self, count: usize) -> Result<String> {
        let popped = self.peek(count)?;
        self.lookahead.drain(..popped.chars().count());

        Ok(popped)
    }
}
