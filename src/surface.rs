use crate::labels::Point;
use std::path::Path;

/// Opaque handle to one rendered line segment. Minted by the surface,
/// stored and replayed by the session, never inspected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentId(u64);

impl SegmentId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What the session needs from a display: draw a line, take it back,
/// switch the shown image. Keeps the state machine free of any GUI
/// types.
pub trait Surface {
    /// Render a segment between two image-space points.
    fn draw_segment(&mut self, from: Point, to: Point) -> SegmentId;

    /// Remove a previously drawn segment.
    fn erase_segment(&mut self, id: SegmentId);

    /// Display the image at `path` and drop all retained segments.
    /// Decodes eagerly, so a broken file fails at navigation time.
    fn show_image(&mut self, path: &Path) -> anyhow::Result<()>;
}

#[cfg(test)]
pub mod testing {
    use super::{Point, SegmentId, Surface};
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    /// Surface double that records calls instead of rendering.
    #[derive(Default)]
    pub struct RecordingSurface {
        next_raw: u64,
        pub live: BTreeMap<u64, (Point, Point)>,
        pub shown: Vec<PathBuf>,
    }

    impl Surface for RecordingSurface {
        fn draw_segment(&mut self, from: Point, to: Point) -> SegmentId {
            self.next_raw += 1;
            self.live.insert(self.next_raw, (from, to));
            SegmentId::from_raw(self.next_raw)
        }

        fn erase_segment(&mut self, id: SegmentId) {
            self.live.remove(&id.raw());
        }

        fn show_image(&mut self, path: &Path) -> anyhow::Result<()> {
            self.live.clear();
            self.shown.push(path.to_path_buf());
            Ok(())
        }
    }
}
