/// Caller-owned sink for auxiliary match output.
///
/// Nothing is recorded unless the caller asked for it first, so a node can
/// report unconditionally without checking whether anyone is listening.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchDetails {
    array_offset_requested: bool,
    array_offset: Option<usize>,
}

impl MatchDetails {
    pub fn new() -> Self {
        MatchDetails::default()
    }

    pub fn request_array_offset(&mut self) {
        self.array_offset_requested = true;
    }

    pub fn needs_array_offset(&self) -> bool {
        self.array_offset_requested
    }

    /// Records that the element at `offset` of an array took part in the match.
    pub fn record_array_offset(&mut self, offset: usize) {
        if self.array_offset_requested {
            self.array_offset = Some(offset);
        }
    }

    pub fn has_array_offset(&self) -> bool {
        self.array_offset.is_some()
    }

    pub fn array_offset(&self) -> Option<usize> {
        self.array_offset
    }

    pub fn reset_output(&mut self) {
        self.array_offset = None;
    }
}
