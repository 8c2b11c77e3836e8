//! The annotation session: a small state machine owning the image set,
//! the cursor, and the in-memory polygons of the displayed image.
//!
//! All rendering goes through the [`Surface`] trait, so the machine has
//! no GUI dependency; the adapter in `app` feeds it pointer and key
//! events as discrete transition calls.

use crate::labels::{self, Point, PolygonMap};
use crate::surface::{SegmentId, Surface};
use anyhow::Result;
use std::collections::BTreeMap;
use std::mem;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How far the skip keys jump.
pub const SKIP_STRIDE: isize = 100;

pub struct Session {
    files: Vec<PathBuf>,
    label_dir: PathBuf,
    cursor: usize,
    drawing: bool,
    last_point: Option<Point>,
    polygons: PolygonMap,
    segments: BTreeMap<u32, Vec<SegmentId>>,
    poly_count: u32,
    save_on_next: bool,
}

impl Session {
    /// `files` must be non-empty; `main` rejects an empty scan before a
    /// session is ever built.
    pub fn new(files: Vec<PathBuf>, label_dir: PathBuf) -> Self {
        debug_assert!(!files.is_empty());
        Self {
            files,
            label_dir,
            cursor: 0,
            drawing: false,
            last_point: None,
            polygons: PolygonMap::new(),
            segments: BTreeMap::new(),
            poly_count: 0,
            save_on_next: true,
        }
    }

    /// Show the image at the cursor and redraw its stored labels. Runs
    /// at startup and as the tail of every navigation event.
    pub fn show_current(&mut self, surface: &mut dyn Surface) -> Result<()> {
        surface.show_image(&self.files[self.cursor])?;
        self.reload_labels(surface)
    }

    /// 1-based position for the status display.
    pub fn position(&self) -> (usize, usize) {
        (self.cursor + 1, self.files.len())
    }

    pub fn current_image(&self) -> &Path {
        &self.files[self.cursor]
    }

    fn current_label_path(&self) -> PathBuf {
        labels::label_path(&self.label_dir, &self.files[self.cursor])
    }

    /// Toggle between idle and drawing. Entering drawing allocates the
    /// next id with an empty point list up front, so a motionless
    /// toggle pair still leaves a persistable empty polygon behind.
    pub fn toggle_draw(&mut self) {
        if self.drawing {
            self.drawing = false;
            return;
        }
        self.drawing = true;
        self.poly_count += 1;
        self.polygons.insert(self.poly_count, Vec::new());
        self.segments.insert(self.poly_count, Vec::new());
        self.last_point = None;
        self.save_on_next = true;
    }

    /// Append a point to the polygon under construction. The first point
    /// after toggle-on is the anchor and gets no leading segment; every
    /// later point is connected back to its predecessor.
    pub fn pointer_moved(&mut self, point: Point, surface: &mut dyn Surface) {
        if !self.drawing || self.poly_count == 0 {
            return;
        }
        if let Some(prev) = self.last_point {
            let handle = surface.draw_segment(prev, point);
            self.segments.entry(self.poly_count).or_default().push(handle);
        }
        self.polygons.entry(self.poly_count).or_default().push(point);
        self.last_point = Some(point);
    }

    /// Delete the most recently created polygon. Removal is strictly
    /// last-in-first-out; ids stay contiguous from 1.
    pub fn remove_last(&mut self, surface: &mut dyn Surface) {
        if self.poly_count == 0 {
            return;
        }
        if let Some(handles) = self.segments.remove(&self.poly_count) {
            for handle in handles {
                surface.erase_segment(handle);
            }
        }
        self.polygons.remove(&self.poly_count);
        self.poly_count -= 1;
    }

    /// Persist pending polygons, advance (a notice instead at the last
    /// image), reset, show, reload.
    pub fn next_image(&mut self, surface: &mut dyn Surface) -> Result<()> {
        self.save_pending()?;
        if self.cursor + 1 < self.files.len() {
            self.cursor += 1;
        } else {
            info!("already at the last image");
        }
        self.reset_polygons(surface);
        self.show_current(surface)
    }

    /// Step back one image, discarding pending polygons. At the first
    /// image nothing changes.
    pub fn prev_image(&mut self, surface: &mut dyn Surface) -> Result<()> {
        if self.cursor == 0 {
            info!("already at the first image");
            return Ok(());
        }
        self.reset_polygons(surface);
        self.cursor -= 1;
        self.show_current(surface)
    }

    /// Jump by `delta` images, clamped to the image set. Persists and
    /// resets like next-image; see DESIGN.md for the policy choice.
    pub fn skip(&mut self, delta: isize, surface: &mut dyn Surface) -> Result<()> {
        self.save_pending()?;
        self.reset_polygons(surface);
        let last = self.files.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
        self.show_current(surface)
    }

    /// Remove the current image's label file. A missing file is a
    /// notice, not an error. Either way the next save attempt is
    /// suppressed so the deleted record isn't immediately rewritten.
    pub fn delete_labels(&mut self) -> Result<()> {
        let path = self.current_label_path();
        if !labels::delete(&path)? {
            warn!("no labels exist for {}", self.files[self.cursor].display());
        }
        self.save_on_next = false;
        Ok(())
    }

    /// Save-on-transition: only when polygons exist, and only when the
    /// last delete-labels request didn't suppress this attempt. The
    /// suppression flag is consumed by the attempt whether it fired or
    /// not.
    fn save_pending(&mut self) -> Result<()> {
        if self.polygons.is_empty() {
            return Ok(());
        }
        let allowed = mem::replace(&mut self.save_on_next, true);
        if allowed {
            labels::save(&self.current_label_path(), &self.polygons)?;
        }
        Ok(())
    }

    fn reset_polygons(&mut self, surface: &mut dyn Surface) {
        for handles in mem::take(&mut self.segments).into_values() {
            for handle in handles {
                surface.erase_segment(handle);
            }
        }
        self.polygons.clear();
        self.poly_count = 0;
        self.drawing = false;
        self.last_point = None;
    }

    /// Rebuild polygon and segment state from the label file, if one
    /// exists. Ids are renumbered 1..n in ascending stored order to keep
    /// the contiguity invariant; each point after a polygon's first gets
    /// a segment back to its predecessor, mirroring forward drawing, so
    /// remove-last works on reloaded data exactly as on drawn data.
    fn reload_labels(&mut self, surface: &mut dyn Surface) -> Result<()> {
        let Some(stored) = labels::load(&self.current_label_path())? else {
            return Ok(());
        };
        for (_, points) in stored {
            self.poly_count += 1;
            let id = self.poly_count;
            let mut handles = Vec::new();
            let mut prev: Option<Point> = None;
            for &point in &points {
                if let Some(prev) = prev {
                    handles.push(surface.draw_segment(prev, point));
                }
                prev = Some(point);
            }
            self.segments.insert(id, handles);
            self.polygons.insert(id, points);
        }
        Ok(())
    }
}
