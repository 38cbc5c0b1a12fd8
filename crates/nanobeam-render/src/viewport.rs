use nanobeam_core::{BBox, Point};
use serde::{Deserialize, Serialize};

/// Maps layout coordinates (µm, y up) onto a canvas (pixels, y down).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    /// Center X in layout coordinates.
    pub center_x: f64,
    /// Center Y in layout coordinates.
    pub center_y: f64,
    /// Zoom level (pixels per layout unit).
    pub zoom: f64,
    /// Canvas width in pixels.
    pub canvas_width: f64,
    /// Canvas height in pixels.
    pub canvas_height: f64,
}

impl Viewport {
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            zoom: 1.0,
            canvas_width,
            canvas_height,
        }
    }

    /// Zoom to fit a bounding box with a 5% margin on every side.
    pub fn fit_bbox(&mut self, bbox: &BBox) {
        let center = bbox.center();
        self.center_x = center.x;
        self.center_y = center.y;

        let width = bbox.width();
        let height = bbox.height();
        let zoom_x = if width > 0.0 { self.canvas_width / width * 0.9 } else { f64::INFINITY };
        let zoom_y = if height > 0.0 { self.canvas_height / height * 0.9 } else { f64::INFINITY };
        let zoom = zoom_x.min(zoom_y);
        if zoom.is_finite() {
            self.zoom = zoom;
        }
    }

    /// Convert a layout point to canvas coordinates. The y axis is flipped.
    pub fn layout_to_screen(&self, p: &Point) -> (f64, f64) {
        (
            (p.x - self.center_x) * self.zoom + self.canvas_width / 2.0,
            self.canvas_height / 2.0 - (p.y - self.center_y) * self.zoom,
        )
    }

    /// Convert canvas coordinates back to layout.
    pub fn screen_to_layout(&self, screen_x: f64, screen_y: f64) -> Point {
        Point::new(
            (screen_x - self.canvas_width / 2.0) / self.zoom + self.center_x,
            (self.canvas_height / 2.0 - screen_y) / self.zoom + self.center_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_bbox_centers_layout() {
        let mut vp = Viewport::new(1000.0, 500.0);
        vp.fit_bbox(&BBox::new(Point::new(0.0, 0.0), Point::new(100.0, 20.0)));
        assert_relative_eq!(vp.zoom, 9.0);
        let (x, y) = vp.layout_to_screen(&Point::new(50.0, 10.0));
        assert_relative_eq!(x, 500.0);
        assert_relative_eq!(y, 250.0);
    }

    #[test]
    fn test_y_axis_is_flipped() {
        let mut vp = Viewport::new(100.0, 100.0);
        vp.fit_bbox(&BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
        let (_, top) = vp.layout_to_screen(&Point::new(0.0, 10.0));
        let (_, bottom) = vp.layout_to_screen(&Point::new(0.0, 0.0));
        assert!(top < bottom);
        let back = vp.screen_to_layout(25.0, 75.0);
        let (sx, sy) = vp.layout_to_screen(&back);
        assert_relative_eq!(sx, 25.0, epsilon = 1e-9);
        assert_relative_eq!(sy, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_box_keeps_zoom() {
        let mut vp = Viewport::new(100.0, 100.0);
        vp.fit_bbox(&BBox::new(Point::new(3.0, 3.0), Point::new(3.0, 3.0)));
        assert_relative_eq!(vp.zoom, 1.0);
        assert_relative_eq!(vp.center_x, 3.0);
    }
}
