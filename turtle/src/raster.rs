use crate::drawing::{Canvas, Drawing, Point, Stroke};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    #[error("cannot compare a {0}x{1} image with a {2}x{3} image")]
    DimensionMismatch(u32, u32, u32, u32),
}

/// RGBA pixels, row-major, starting fully transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Raster {
            width,
            height,
            pixels: vec![[0; 4]; width as usize * height as usize],
        }
    }

    /// Rasterize every stroke of `drawing`, in drawing order, without anti-aliasing.
    /// A pixel is painted when its centre lies within half the pen width of the
    /// stroke, which gives round caps; pens thinner than a pixel still cover one.
    pub fn render(drawing: &Drawing) -> Self {
        let mut raster = Raster::new(drawing.canvas.width, drawing.canvas.height);
        for stroke in &drawing.strokes {
            let from = drawing.canvas.to_screen(stroke.from);
            let to = drawing.canvas.to_screen(stroke.to);
            let color = [stroke.color.r, stroke.color.g, stroke.color.b, 255];
            raster.paint_segment(from, to, pen_radius(stroke), color);
        }
        raster
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Number of pixels that differ between two rasters of the same size.
    /// Zero exactly when the rasters are identical.
    pub fn difference(&self, other: &Raster) -> Result<u64, RasterError> {
        if self.width != other.width || self.height != other.height {
            return Err(RasterError::DimensionMismatch(
                self.width,
                self.height,
                other.width,
                other.height,
            ));
        }
        let differing = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .filter(|(a, b)| a != b)
            .count();
        Ok(differing as u64)
    }

    fn paint_segment(&mut self, from: Point, to: Point, radius: f64, color: [u8; 4]) {
        let Some(bounds) = Bounds::of(self.width, self.height, from, to, radius) else {
            return;
        };
        for y in bounds.min_y..bounds.max_y {
            for x in bounds.min_x..bounds.max_x {
                let centre = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if distance_to_segment(centre, from, to) <= radius {
                    self.pixels[y as usize * self.width as usize + x as usize] = color;
                }
            }
        }
    }
}

/// Number of pixels `render` examines for `stroke`: its bounding box,
/// widened by the pen and clipped to the canvas.
pub fn stroke_cost(canvas: &Canvas, stroke: &Stroke) -> u64 {
    let from = canvas.to_screen(stroke.from);
    let to = canvas.to_screen(stroke.to);
    Bounds::of(canvas.width, canvas.height, from, to, pen_radius(stroke)).map_or(0, |bounds| {
        u64::from(bounds.max_x - bounds.min_x) * u64::from(bounds.max_y - bounds.min_y)
    })
}

fn pen_radius(stroke: &Stroke) -> f64 {
    (stroke.width / 2.0).max(0.5)
}

/// Half-open pixel rectangle.
struct Bounds {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Bounds {
    fn of(width: u32, height: u32, from: Point, to: Point, radius: f64) -> Option<Bounds> {
        let min_x = (from.x.min(to.x) - radius).floor().max(0.0);
        let min_y = (from.y.min(to.y) - radius).floor().max(0.0);
        let max_x = (from.x.max(to.x) + radius).ceil().min(f64::from(width));
        let max_y = (from.y.max(to.y) + radius).ceil().min(f64::from(height));
        if !(min_x < max_x && min_y < max_y) {
            return None;
        }
        Some(Bounds {
            min_x: min_x as u32,
            min_y: min_y as u32,
            max_x: max_x as u32,
            max_y: max_y as u32,
        })
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_squared = dx * dx + dy * dy;
    let t = if length_squared == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_squared).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}
