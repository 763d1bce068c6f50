//! Zoom and scroll mathematics.
//!
//! This module contains the coordinate transform between the canvas widget
//! and the image, plus the scroll-area model that zoom and wheel requests
//! drive. Nothing here touches a UI toolkit, so all of it is unit tested.

use crate::config::ZoomConfig;
use crate::constants::zoom::WHEEL_STEP;
use crate::geometry::{Point, Size};

/// Widget <-> image coordinate transform.
///
/// When the canvas widget is larger than the scaled image, the image is
/// centered and `offset` holds the margin in image units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset: Point,
}

impl ViewTransform {
    pub fn new(scale: f32, offset: Point) -> Self {
        Self { scale, offset }
    }

    /// Identity transform (scale 1, no offset).
    pub fn identity() -> Self {
        Self::new(1.0, Point::ZERO)
    }

    /// Transform for an image of `image` size shown at `scale` inside a
    /// widget of `widget` size.
    pub fn centered(scale: f32, widget: Size, image: Size) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let w = image.width * scale;
        let h = image.height * scale;
        let x = if widget.width > w {
            (widget.width - w) / (2.0 * scale)
        } else {
            0.0
        };
        let y = if widget.height > h {
            (widget.height - h) / (2.0 * scale)
        } else {
            0.0
        };
        Self::new(scale, Point::new(x, y))
    }

    /// Widget position to image position.
    pub fn to_image(&self, widget_pos: Point) -> Point {
        widget_pos / self.scale - self.offset
    }

    /// Image position to widget position.
    pub fn to_widget(&self, image_pos: Point) -> Point {
        (image_pos + self.offset) * self.scale
    }

    /// Convert a device-pixel distance to image units.
    pub fn image_distance(&self, device_pixels: f32) -> f32 {
        device_pixels / self.scale
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Convert a raw wheel delta to notch units.
pub fn wheel_units(delta: f32) -> f32 {
    delta / WHEEL_STEP
}

/// Scale that fits the whole image inside the viewport.
///
/// `epsilon` pixels are kept free so that fitting never produces scrollbars.
pub fn fit_window_scale(viewport: Size, image: Size, epsilon: f32) -> f32 {
    if image.is_empty() {
        return 1.0;
    }
    let w1 = viewport.width - epsilon;
    let h1 = viewport.height - epsilon;
    if w1 <= 0.0 || h1 <= 0.0 {
        return 1.0;
    }
    let a1 = w1 / h1;
    let a2 = image.width / image.height;
    if a2 >= a1 { w1 / image.width } else { h1 / image.height }
}

/// Scale that makes the image as wide as the viewport.
pub fn fit_width_scale(viewport: Size, image: Size, epsilon: f32) -> f32 {
    if image.is_empty() {
        return 1.0;
    }
    let w = viewport.width - epsilon;
    if w <= 0.0 { 1.0 } else { w / image.width }
}

/// How the zoom level is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoomMode {
    /// Explicit percentage.
    #[default]
    Manual,
    /// Recomputed to fit the viewport whenever it changes.
    FitWindow,
    /// Recomputed to fit the viewport width whenever it changes.
    FitWidth,
}

/// Scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// One scrollbar of the scroll area.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollBar {
    pub value: f32,
    pub maximum: f32,
    pub single_step: f32,
}

impl ScrollBar {
    fn new(single_step: f32) -> Self {
        Self {
            value: 0.0,
            maximum: 0.0,
            single_step,
        }
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value.clamp(0.0, self.maximum);
    }

    fn set_maximum(&mut self, maximum: f32) {
        self.maximum = maximum.max(0.0);
        self.value = self.value.clamp(0.0, self.maximum);
    }
}

/// The scroll area holding the canvas: zoom level plus scrollbar state.
#[derive(Debug, Clone)]
pub struct Viewport {
    config: ZoomConfig,
    viewport: Size,
    image: Size,
    percent: f32,
    mode: ZoomMode,
    pub horizontal: ScrollBar,
    pub vertical: ScrollBar,
}

impl Viewport {
    pub fn new(config: ZoomConfig) -> Self {
        let step = config.scroll_single_step;
        Self {
            config,
            viewport: Size::default(),
            image: Size::default(),
            percent: 100.0,
            mode: ZoomMode::Manual,
            horizontal: ScrollBar::new(step),
            vertical: ScrollBar::new(step),
        }
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    /// Current scale factor for the canvas.
    pub fn scale(&self) -> f32 {
        self.percent / 100.0
    }

    pub fn mode(&self) -> ZoomMode {
        self.mode
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport
    }

    /// Size the canvas widget takes inside the scroll area.
    pub fn canvas_size(&self) -> Size {
        Size::new(
            self.viewport.width.max(self.image.width * self.scale()),
            self.viewport.height.max(self.image.height * self.scale()),
        )
    }

    /// Set the image being shown. Fit modes are re-applied.
    pub fn set_image_size(&mut self, image: Size) {
        self.image = image;
        self.adjust_scale();
    }

    /// Resize the visible area. Fit modes are re-applied.
    pub fn set_viewport_size(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.adjust_scale();
    }

    pub fn set_mode(&mut self, mode: ZoomMode) {
        self.mode = mode;
        self.adjust_scale();
    }

    /// Set an explicit zoom percentage; switches to manual mode.
    pub fn set_zoom(&mut self, percent: f32) {
        self.mode = ZoomMode::Manual;
        self.apply_percent(percent);
    }

    /// Change the zoom percentage by `increment`; switches to manual mode.
    pub fn add_zoom(&mut self, increment: f32) {
        self.set_zoom(self.percent + increment);
    }

    /// Recompute the scale for the active fit mode.
    pub fn adjust_scale(&mut self) {
        let epsilon = self.config.fit_epsilon;
        let scale = match self.mode {
            ZoomMode::Manual => {
                self.update_ranges();
                return;
            }
            ZoomMode::FitWindow => fit_window_scale(self.viewport, self.image, epsilon),
            ZoomMode::FitWidth => fit_width_scale(self.viewport, self.image, epsilon),
        };
        self.apply_percent(100.0 * scale);
    }

    /// Apply a scroll request in wheel delta units.
    pub fn scroll(&mut self, orientation: Orientation, delta: f32) {
        let units = -wheel_units(delta);
        let bar = self.bar_mut(orientation);
        let value = bar.value + bar.single_step * units;
        bar.set_value(value);
    }

    /// Zoom by a wheel delta, keeping the content under `cursor` in place.
    ///
    /// `cursor` is relative to the viewport. Its fractional position is
    /// clamped to `[margin, 1 - margin]` before the change in scroll range is
    /// redistributed, so zooming near an edge does not jump.
    pub fn zoom_at_cursor(&mut self, delta: f32, cursor: Point) {
        let old_h_max = self.horizontal.maximum;
        let old_v_max = self.vertical.maximum;

        let move_x = self.cursor_fraction(cursor.x, self.viewport.width);
        let move_y = self.cursor_fraction(cursor.y, self.viewport.height);

        let units = wheel_units(delta);
        self.add_zoom(self.config.wheel_increment * units);

        let d_h_max = self.horizontal.maximum - old_h_max;
        let d_v_max = self.vertical.maximum - old_v_max;
        let h_value = self.horizontal.value + move_x * d_h_max;
        let v_value = self.vertical.value + move_y * d_v_max;
        self.horizontal.set_value(h_value);
        self.vertical.set_value(v_value);
        log::trace!(
            "zoom at ({}, {}) -> {}%, scroll ({}, {})",
            cursor.x,
            cursor.y,
            self.percent,
            self.horizontal.value,
            self.vertical.value
        );
    }

    fn cursor_fraction(&self, pos: f32, extent: f32) -> f32 {
        let margin = self.config.cursor_margin;
        let span = extent - 2.0 * margin * extent;
        if span <= 0.0 {
            return 0.5;
        }
        ((pos - margin * extent) / span).clamp(0.0, 1.0)
    }

    fn apply_percent(&mut self, percent: f32) {
        self.percent = percent.clamp(self.config.min_percent, self.config.max_percent);
        self.update_ranges();
    }

    fn update_ranges(&mut self) {
        let scale = self.scale();
        self.horizontal
            .set_maximum(self.image.width * scale - self.viewport.width);
        self.vertical
            .set_maximum(self.image.height * scale - self.viewport.height);
    }

    fn bar_mut(&mut self, orientation: Orientation) -> &mut ScrollBar {
        match orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
        }
    }
}
