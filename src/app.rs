//! egui event adapter: translates pointer and keyboard input into
//! session transitions and paints the session's segments over the
//! current image.

use crate::labels::Point;
use crate::session::{Session, SKIP_STRIDE};
use crate::surface::{SegmentId, Surface};
use anyhow::{Context as _, Result};
use eframe::egui;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::error;

const STROKE_WIDTH: f32 = 2.0;
const KEY_LEGEND: &str = "k: next image, j: prev image, h: skip 100 back, \
                          l: skip 100 forward, u: remove polygon, d: delete labels";

// ── Canvas surface ──────────────────────────────────────────────────────────

/// Retained-mode shim over egui's immediate-mode painter: keeps the
/// decoded image and the live segments so they can be repainted every
/// frame and erased by handle.
struct CanvasSurface {
    raw_image: Option<image::DynamicImage>,
    texture: Option<egui::TextureHandle>,
    image_size: (f32, f32),
    segments: BTreeMap<u64, (Point, Point)>,
    next_raw: u64,
}

impl CanvasSurface {
    fn new() -> Self {
        Self {
            raw_image: None,
            texture: None,
            image_size: (0.0, 0.0),
            segments: BTreeMap::new(),
            next_raw: 0,
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        if let Some(ref img) = self.raw_image {
            let rgba = img.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let pixels = rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            self.texture =
                Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
        }
    }
}

impl Surface for CanvasSurface {
    fn draw_segment(&mut self, from: Point, to: Point) -> SegmentId {
        self.next_raw += 1;
        self.segments.insert(self.next_raw, (from, to));
        SegmentId::from_raw(self.next_raw)
    }

    fn erase_segment(&mut self, id: SegmentId) {
        self.segments.remove(&id.raw());
    }

    fn show_image(&mut self, path: &Path) -> Result<()> {
        let img =
            image::open(path).with_context(|| format!("opening image {}", path.display()))?;
        self.image_size = (img.width() as f32, img.height() as f32);
        self.raw_image = Some(img);
        self.texture = None;
        self.segments.clear();
        Ok(())
    }
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct PolymarkApp {
    session: Session,
    canvas: CanvasSurface,

    // last integer image position delivered to the session, so each
    // position is delivered once however often egui repaints
    last_sent: Option<Point>,

    // fatal errors surface here so main can exit non-zero after the
    // window closes
    fatal: Arc<Mutex<Option<anyhow::Error>>>,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,
}

impl PolymarkApp {
    pub fn new(mut session: Session, fatal: Arc<Mutex<Option<anyhow::Error>>>) -> Result<Self> {
        let mut canvas = CanvasSurface::new();
        // a broken first image fails here, before any window opens
        session.show_current(&mut canvas)?;
        Ok(Self {
            session,
            canvas,
            last_sent: None,
            fatal,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
        })
    }

    fn transition(&mut self, ctx: &egui::Context, result: Result<()>) {
        if let Err(err) = result {
            error!("{err:#}");
            *self.fatal.lock().unwrap() = Some(err);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    /// Convert image-space coords to screen-space
    fn image_to_screen(&self, canvas_rect: egui::Rect, img_pos: egui::Pos2) -> egui::Pos2 {
        let center = canvas_rect.center();
        let (w, h) = self.canvas.image_size;
        center + self.pan + (img_pos.to_vec2() - egui::vec2(w, h) * 0.5) * self.zoom
    }

    /// Convert screen-space coords to image-space
    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> egui::Pos2 {
        let center = canvas_rect.center();
        let rel = screen_pos - center - self.pan;
        let (w, h) = self.canvas.image_size;
        egui::pos2(rel.x / self.zoom + w * 0.5, rel.y / self.zoom + h * 0.5)
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> egui::Rect {
        let (w, h) = self.canvas.image_size;
        let top_left = self.image_to_screen(canvas_rect, egui::Pos2::ZERO);
        let bot_right = self.image_to_screen(canvas_rect, egui::pos2(w, h));
        egui::Rect::from_min_max(top_left, bot_right)
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (next, prev, back, forward, remove, delete) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::K),
                i.key_pressed(egui::Key::J),
                i.key_pressed(egui::Key::H),
                i.key_pressed(egui::Key::L),
                i.key_pressed(egui::Key::U),
                i.key_pressed(egui::Key::D),
            )
        });

        if next {
            let result = self.session.next_image(&mut self.canvas);
            self.last_sent = None;
            self.transition(ctx, result);
        }
        if prev {
            let result = self.session.prev_image(&mut self.canvas);
            self.last_sent = None;
            self.transition(ctx, result);
        }
        if back {
            let result = self.session.skip(-SKIP_STRIDE, &mut self.canvas);
            self.last_sent = None;
            self.transition(ctx, result);
        }
        if forward {
            let result = self.session.skip(SKIP_STRIDE, &mut self.canvas);
            self.last_sent = None;
            self.transition(ctx, result);
        }
        if remove {
            self.session.remove_last(&mut self.canvas);
        }
        if delete {
            let result = self.session.delete_labels();
            self.transition(ctx, result);
        }
    }
}

impl eframe::App for PolymarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);
        self.canvas.ensure_texture(ctx);

        let name = self
            .session
            .current_image()
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!("polymark — {name}")));

        // Status bar
        let (pos, total) = self.session.position();
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(KEY_LEGEND);
                ui.separator();
                ui.label(format!("image {pos} of {total}"));
            });
        });

        // Canvas
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            if let Some(ref tex) = self.canvas.texture {
                let img_rect = self.image_rect_on_screen(canvas_rect);
                painter.image(
                    tex.id(),
                    img_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }

            // Draw polygon segments, oldest first
            let stroke = egui::Stroke::new(STROKE_WIDTH * self.zoom, egui::Color32::RED);
            for &(from, to) in self.canvas.segments.values() {
                let a = self.image_to_screen(canvas_rect, egui::pos2(from.0 as f32, from.1 as f32));
                let b = self.image_to_screen(canvas_rect, egui::pos2(to.0 as f32, to.1 as f32));
                painter.line_segment([a, b], stroke);
            }

            // Handle pan (middle mouse button)
            let middle_down = ctx.input(|i| i.pointer.middle_down());
            if middle_down {
                let delta = ctx.input(|i| i.pointer.delta());
                self.pan += delta;
                self.panning = true;
            } else {
                self.panning = false;
            }

            // Handle zoom (scroll wheel)
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let center = canvas_rect.center();
                    let cursor_rel = cursor - center - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }

            // Secondary click toggles polygon drawing
            if response.secondary_clicked() {
                self.session.toggle_draw();
            }

            // Pointer motion feeds the session while not panning; each
            // integer image position is delivered once
            if !self.panning {
                if let Some(screen_pos) = response.hover_pos() {
                    let img = self.screen_to_image(canvas_rect, screen_pos);
                    let point = Point(img.x.round() as i32, img.y.round() as i32);
                    if self.last_sent != Some(point) {
                        self.session.pointer_moved(point, &mut self.canvas);
                        self.last_sent = Some(point);
                    }
                }
            }
        });
    }
}
