use std::fmt::Write as _;

/// Size of the screen the turtle draws on, in pixels.
/// The origin sits at the centre with the y axis pointing up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas {
            width: 1000,
            height: 500,
        }
    }
}

impl Canvas {
    /// Map turtle coordinates to screen coordinates (y axis pointing down).
    pub fn to_screen(&self, point: Point) -> Point {
        Point {
            x: point.x + f64::from(self.width) / 2.0,
            y: f64::from(self.height) / 2.0 - point.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    /// Parse a colour name or a `#rgb` / `#rrggbb` hex code.
    pub fn parse(text: &str) -> Option<Color> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex);
        }
        let (r, g, b) = match text.to_ascii_lowercase().as_str() {
            "black" => (0, 0, 0),
            "white" => (255, 255, 255),
            "red" => (255, 0, 0),
            "green" => (0, 128, 0),
            "lime" => (0, 255, 0),
            "blue" => (0, 0, 255),
            "yellow" => (255, 255, 0),
            "orange" => (255, 165, 0),
            "purple" => (160, 32, 240),
            "pink" => (255, 192, 203),
            "brown" => (165, 42, 42),
            "gray" | "grey" => (190, 190, 190),
            "cyan" => (0, 255, 255),
            "magenta" => (255, 0, 255),
            "navy" => (0, 0, 128),
            "gold" => (255, 215, 0),
            _ => return None,
        };
        Some(Color { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    match digits.as_slice() {
        [r, g, b] => Some(Color {
            r: r * 17,
            g: g * 17,
            b: b * 17,
        }),
        [r1, r2, g1, g2, b1, b2] => Some(Color {
            r: r1 * 16 + r2,
            g: g1 * 16 + g2,
            b: b1 * 16 + b2,
        }),
        _ => None,
    }
}

/// One straight line drawn with the pen down, in turtle coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub from: Point,
    pub to: Point,
    pub color: Color,
    pub width: f64,
}

/// Everything a program drew.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub canvas: Canvas,
    pub strokes: Vec<Stroke>,
}

impl Drawing {
    pub fn new(canvas: Canvas) -> Self {
        Drawing {
            canvas,
            strokes: Vec::new(),
        }
    }

    /// Serialize as an SVG document, one `<line>` per stroke, on a transparent background.
    pub fn to_svg(&self) -> String {
        let Canvas { width, height } = self.canvas;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        for stroke in &self.strokes {
            let from = self.canvas.to_screen(stroke.from);
            let to = self.canvas.to_screen(stroke.to);
            let _ = writeln!(
                svg,
                r#"  <line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}" stroke-linecap="round"/>"#,
                number(from.x),
                number(from.y),
                number(to.x),
                number(to.y),
                stroke.color.to_hex(),
                number(stroke.width),
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

/// Format with at most two decimals and no trailing zeros.
fn number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}
