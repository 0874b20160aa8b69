use crate::loc::SourceLoc;

/// Line starts of one source text, for turning a [`SourceLoc`] into the
/// 1-based `line:col` printed in plain diagnostics.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Offset just past each `\n`, preceded by 0.
    starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(at, _)| at as u32 + 1))
            .collect();
        LineIndex { starts, len: source.len() as u32 }
    }

    /// Position of the start of `loc`, or `None` for an invalid location.
    ///
    /// Offsets past the end of the text land on the end. Columns count
    /// bytes.
    pub fn line_col(&self, loc: SourceLoc) -> Option<(u32, u32)> {
        let offset = loc.start()?.min(self.len);
        let line = match self.starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(after) => after - 1,
        };
        Some((line as u32 + 1, offset - self.starts[line] + 1))
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_on_one_line() {
        let index = LineIndex::new("protocol P {}");
        assert_eq!(index.line_col(SourceLoc::at(0)), Some((1, 1)));
        assert_eq!(index.line_col(SourceLoc::new(9, 10)), Some((1, 10)));
    }

    #[test]
    fn positions_across_lines() {
        let index = LineIndex::new("protocol P {\n  associatedtype A\n}");
        assert_eq!(index.line_col(SourceLoc::at(13)), Some((2, 1)));
        assert_eq!(index.line_col(SourceLoc::new(15, 31)), Some((2, 3)));
        assert_eq!(index.line_col(SourceLoc::at(32)), Some((3, 1)));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn newline_ends_its_own_line() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.line_col(SourceLoc::at(2)), Some((1, 3)));
        assert_eq!(index.line_col(SourceLoc::at(3)), Some((2, 1)));
    }

    #[test]
    fn invalid_and_out_of_range_locations() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.line_col(SourceLoc::INVALID), None);
        assert_eq!(index.line_col(SourceLoc::at(40)), Some((2, 3)));
        assert_eq!(LineIndex::new("").line_col(SourceLoc::at(7)), Some((1, 1)));
    }
}
