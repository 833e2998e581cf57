use crate::hid::report::ButtonSet;

/// Rising-edge extractor over successive button snapshots.
///
/// A button held across several reports fires exactly once, on the report
/// where it first appears; it must be released and pressed again to fire
/// another edge.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    previous: ButtonSet,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buttons newly pressed since the last call.
    pub fn rising(&mut self, current: ButtonSet) -> ButtonSet {
        let edges = current.difference(self.previous);
        self.previous = current;
        edges
    }
}
