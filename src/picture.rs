use std::io::{self, BufWriter, Write};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul};

/// Linear RGB radiance. Channels are unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Sum for Color {
    fn sum<I: Iterator<Item=Self>>(iter: I) -> Self {
        iter.fold(Color::BLACK, |acc, color| acc + color)
    }
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, rhs: Self) -> Self::Output {
        Color::new(
            self.r + rhs.r,
            self.g + rhs.g,
            self.b + rhs.b,
        )
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Per-channel product, used for albedo tinting.
impl Mul for Color {
    type Output = Color;

    fn mul(self, rhs: Self) -> Self::Output {
        Color::new(
            self.r * rhs.r,
            self.g * rhs.g,
            self.b * rhs.b,
        )
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, rhs: f32) -> Self::Output {
        Color::new(
            self.r * rhs,
            self.g * rhs,
            self.b * rhs,
        )
    }
}

impl Mul<Color> for f32 {
    type Output = Color;

    fn mul(self, rhs: Color) -> Self::Output {
        rhs * self
    }
}

impl Div<f32> for Color {
    type Output = Color;

    fn div(self, rhs: f32) -> Self::Output {
        Color::new(
            self.r / rhs,
            self.g / rhs,
            self.b / rhs,
        )
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RGB8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<Color> for RGB8 {
    fn from(value: Color) -> Self {
        RGB8::new_norm(value.r, value.g, value.b)
    }
}

/// Saturates to [0, 1], then scales and truncates. NaN maps to 0.
fn normalize(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

impl RGB8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        RGB8 { r, g, b }
    }

    pub fn new_norm(r: f32, g: f32, b: f32) -> Self {
        RGB8::new(normalize(r), normalize(g), normalize(b))
    }
}

/// Row-major pixel buffer, top row first.
pub struct Picture<P> {
    pixels: Vec<P>,
    size: (u32, u32),
}

impl<P> Picture<P> {
    pub fn new(pixels: Vec<P>, size: (u32, u32)) -> Self {
        assert_eq!(pixels.len(), size.0 as usize * size.1 as usize, "pixel count does not match size");
        Picture { pixels, size }
    }

    pub fn width(&self) -> u32 {
        self.size.0
    }

    pub fn height(&self) -> u32 {
        self.size.1
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }
}

impl Picture<RGB8> {
    /// Writes the plain-text `P3` form: header, then one `r g b` line per pixel.
    pub fn write_ppm<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut out = BufWriter::new(writer);
        write!(out, "P3\n{} {}\n255\n", self.width(), self.height())?;
        for pixel in &self.pixels {
            writeln!(out, "{} {} {}", pixel.r, pixel.g, pixel.b)?;
        }
        out.flush()
    }
}
