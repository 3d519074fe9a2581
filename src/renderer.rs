use std::collections::HashMap;

use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::error::{BatteryError, Result};
use crate::geometry::RectPx;
use crate::scene::{Scene, SceneItem};
use crate::stimulus::{StimulusIndex, StimulusLibrary};

fn background() -> Color {
    Color::from_rgba8(250, 250, 250, 255)
}

fn green() -> Color {
    Color::from_rgba8(0, 255, 0, 255)
}

fn red() -> Color {
    Color::from_rgba8(255, 0, 0, 255)
}

/// Outline width of the target ring.
const RING_WIDTH: f32 = 2.0;

/// Paints a `Scene` into an offscreen premultiplied pixmap and copies it out
/// to the host frame buffer. Stimulus images are decoded once and cached as
/// pixmaps for the rest of the session.
pub struct SceneRenderer {
    width: u32,
    height: u32,
    canvas: Pixmap,
    stimulus_cache: HashMap<StimulusIndex, Pixmap>,
}

impl SceneRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut canvas = Pixmap::new(width, height).ok_or_else(zero_sized)?;
        canvas.fill(background());
        Ok(Self {
            width,
            height,
            canvas,
            stimulus_cache: HashMap::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.canvas = Pixmap::new(width, height).ok_or_else(zero_sized)?;
        self.canvas.fill(background());
        Ok(())
    }

    /// Repaints the whole frame from the scene description.
    pub fn render(
        &mut self,
        scene: &Scene,
        library: &StimulusLibrary,
        frame_buffer: &mut [u8],
    ) -> Result<()> {
        self.canvas.fill(background());

        if !scene.blank {
            for item in &scene.items {
                match item {
                    SceneItem::Wall(rect) => self.fill_rect(*rect, green()),
                    SceneItem::Target { rect, engaged } => {
                        let color = if *engaged { green() } else { red() };
                        self.stroke_circle(*rect, color);
                    }
                    SceneItem::Pointer { rect } => self.fill_circle(*rect, red()),
                    SceneItem::Stimulus { index, rect } => {
                        self.blit_stimulus(*index, *rect, library)?
                    }
                }
            }
        }

        let data = self.canvas.data();
        frame_buffer[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn fill_rect(&mut self, rect: RectPx, color: Color) {
        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color(color);
        if let Some(rect) = Rect::from_xywh(rect.x, rect.y, rect.w, rect.h) {
            self.canvas
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn fill_circle(&mut self, rect: RectPx, color: Color) {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(color);
        let (cx, cy) = rect.center();
        let mut pb = PathBuilder::new();
        pb.push_circle(cx, cy, rect.w / 2.0);
        if let Some(path) = pb.finish() {
            self.canvas
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    /// Rings are drawn as two concentric fills, outer color over background,
    /// matching the historic 2px outline look.
    fn stroke_circle(&mut self, rect: RectPx, color: Color) {
        let (cx, cy) = rect.center();
        let radius = rect.w / 2.0;

        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(color);
        let mut pb = PathBuilder::new();
        pb.push_circle(cx, cy, radius);
        if let Some(path) = pb.finish() {
            self.canvas
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }

        paint.set_color(background());
        let mut pb = PathBuilder::new();
        pb.push_circle(cx, cy, (radius - RING_WIDTH).max(0.0));
        if let Some(path) = pb.finish() {
            self.canvas
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    fn blit_stimulus(
        &mut self,
        index: StimulusIndex,
        rect: RectPx,
        library: &StimulusLibrary,
    ) -> Result<()> {
        if !self.stimulus_cache.contains_key(&index) {
            let pixmap = decode_stimulus(library, index)?;
            self.stimulus_cache.insert(index, pixmap);
        }
        let pixmap = &self.stimulus_cache[&index];

        let scale_x = rect.w / pixmap.width() as f32;
        let scale_y = rect.h / pixmap.height() as f32;
        let transform = Transform::from_scale(scale_x, scale_y)
            .post_translate(rect.x, rect.y);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.canvas
            .draw_pixmap(0, 0, pixmap.as_ref(), &paint, transform, None);
        Ok(())
    }
}

/// Decodes one stimulus asset into a premultiplied pixmap. A decode failure
/// here is the same fatal error as a failed header read.
fn decode_stimulus(library: &StimulusLibrary, index: StimulusIndex) -> Result<Pixmap> {
    let path = library.path(index);
    let image = image::open(path)
        .map_err(|source| BatteryError::InvalidAssetReference {
            path: path.to_owned(),
            source,
        })?
        .to_rgba8();
    let (w, h) = image.dimensions();

    let mut pixmap = Pixmap::new(w, h).ok_or_else(zero_sized)?;
    for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        let alpha = a as u32;
        dst[0] = ((r as u32 * alpha + 127) / 255) as u8;
        dst[1] = ((g as u32 * alpha + 127) / 255) as u8;
        dst[2] = ((b as u32 * alpha + 127) / 255) as u8;
        dst[3] = a;
    }
    Ok(pixmap)
}

fn zero_sized() -> BatteryError {
    BatteryError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        "zero-sized surface",
    ))
}
