/// Maps byte offsets to 1-based line:column positions for a single source text.
pub struct LineIndex<'a> {
    source: &'a str,
    /// Byte offset of the start of each line. line_starts[0] == 0 always.
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { source, line_starts }
    }

    /// Convert a byte offset to a (line, column) pair. Columns count characters, not bytes.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        // Binary search: find the last line_start <= offset
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(ins) => ins.saturating_sub(1),
        };
        let start = self.line_starts[line];
        let column = self.source.get(start..offset).map(|s| s.chars().count()).unwrap_or(offset - start);
        (line + 1, column + 1)
    }
}
