//! Renderer service.
//!
//! `spec.md §6` assumes an external renderer capable of drawing textured
//! quads, solid rectangles, and lines, with render-target and global
//! transform/clip state; hardware rendering primitives are out of scope
//! (`spec.md §1`). Shaped the same way as `render::sound::SoundService`:
//! an object-safe trait plus a logging no-op stub, generalized from the
//! teacher's feature-gated `ui/sound.rs` backend-vs-stub split to "always
//! stub, trait is the extension point" since there is no in-pack terminal
//! rendering backend for textured sprites the way there is for tones.

pub type TextureId = u32;

/// Sub-rectangle of a texture atlas, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SrcRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Destination rectangle in screen pixels (post-translation/scale).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DestRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }
}

/// Opaque render-target handle; `None` means the default back buffer.
pub type RenderTargetId = u32;

/// `spec.md §6`: "drawTexture, drawLine, drawRectangle, clear, setClipRect,
/// setGlobalTranslation, setGlobalScale, setOverlayColor,
/// setColorModulation, render-target bind/unbind, scope-guarded state save".
pub trait RendererService {
    fn clear(&mut self, color: Color);
    fn draw_texture(&mut self, texture: TextureId, src: SrcRect, dest: DestRect);
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color);
    fn draw_rectangle(&mut self, rect: DestRect, color: Color, filled: bool);

    fn set_clip_rect(&mut self, rect: Option<DestRect>);
    fn set_global_translation(&mut self, dx: i32, dy: i32);
    fn set_global_scale(&mut self, sx: f32, sy: f32);
    /// Opaque overlay color blended over every subsequent draw (the
    /// mercy-frame/hit-flash white-out). `None` disables it.
    fn set_overlay_color(&mut self, color: Option<Color>);
    /// Per-draw color modulation, used for translucency (cloak, ≈ alpha
    /// 130 per `spec.md §4.8`). `None` disables it.
    fn set_color_modulation(&mut self, color: Option<Color>);

    fn bind_render_target(&mut self, target: RenderTargetId);
    fn unbind_render_target(&mut self);

    fn present(&mut self);
}

/// RAII guard restoring clip/translation/scale/overlay/modulation state on
/// drop, matching the "scope-guarded state save" contract in `spec.md §6`.
/// Generic over any `RendererService` so host renderer backends get the
/// guard for free.
pub struct StateGuard<'a, R: RendererService + ?Sized> {
    renderer: &'a mut R,
    saved_translation: (i32, i32),
    saved_scale: (f32, f32),
}

impl<'a, R: RendererService + ?Sized> StateGuard<'a, R> {
    pub fn new(renderer: &'a mut R, translation: (i32, i32), scale: (f32, f32)) -> Self {
        StateGuard { renderer, saved_translation: translation, saved_scale: scale }
    }

    pub fn renderer(&mut self) -> &mut R {
        self.renderer
    }
}

impl<'a, R: RendererService + ?Sized> Drop for StateGuard<'a, R> {
    fn drop(&mut self) {
        let (dx, dy) = self.saved_translation;
        self.renderer.set_global_translation(dx, dy);
        let (sx, sy) = self.saved_scale;
        self.renderer.set_global_scale(sx, sy);
        self.renderer.set_clip_rect(None);
        self.renderer.set_overlay_color(None);
        self.renderer.set_color_modulation(None);
    }
}

/// Logs draw calls instead of producing pixels; default for headless runs
/// and tests, same role as `LoggingSoundService`.
#[derive(Default)]
pub struct LoggingRenderer {
    pub draw_calls: u64,
}

impl RendererService for LoggingRenderer {
    fn clear(&mut self, color: Color) {
        log::trace!("clear({color:?})");
    }
    fn draw_texture(&mut self, texture: TextureId, src: SrcRect, dest: DestRect) {
        self.draw_calls += 1;
        log::trace!("draw_texture({texture}, {src:?}, {dest:?})");
    }
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        log::trace!("draw_line(({x0},{y0})-({x1},{y1}), {color:?})");
    }
    fn draw_rectangle(&mut self, rect: DestRect, color: Color, filled: bool) {
        log::trace!("draw_rectangle({rect:?}, {color:?}, filled={filled})");
    }
    fn set_clip_rect(&mut self, rect: Option<DestRect>) {
        log::trace!("set_clip_rect({rect:?})");
    }
    fn set_global_translation(&mut self, dx: i32, dy: i32) {
        log::trace!("set_global_translation({dx}, {dy})");
    }
    fn set_global_scale(&mut self, sx: f32, sy: f32) {
        log::trace!("set_global_scale({sx}, {sy})");
    }
    fn set_overlay_color(&mut self, color: Option<Color>) {
        log::trace!("set_overlay_color({color:?})");
    }
    fn set_color_modulation(&mut self, color: Option<Color>) {
        log::trace!("set_color_modulation({color:?})");
    }
    fn bind_render_target(&mut self, target: RenderTargetId) {
        log::trace!("bind_render_target({target})");
    }
    fn unbind_render_target(&mut self) {
        log::trace!("unbind_render_target");
    }
    fn present(&mut self) {
        log::trace!("present");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_renderer_counts_draw_calls() {
        let mut renderer = LoggingRenderer::default();
        renderer.draw_texture(1, SrcRect::default(), DestRect::default());
        renderer.draw_texture(2, SrcRect::default(), DestRect::default());
        assert_eq!(renderer.draw_calls, 2);
    }

    #[test]
    fn state_guard_restores_translation_and_scale_on_drop() {
        let mut renderer = LoggingRenderer::default();
        {
            let mut guard = StateGuard::new(&mut renderer, (0, 0), (1.0, 1.0));
            guard.renderer().set_global_translation(50, 50);
            guard.renderer().set_global_scale(2.0, 2.0);
        }
        // No direct state readback on the logging stub; this just exercises
        // that the guard drops without panicking and issues the restore
        // calls (observable via draw_calls being unaffected by the restore).
        assert_eq!(renderer.draw_calls, 0);
    }
}
