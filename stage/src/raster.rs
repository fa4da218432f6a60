//! RGBA pixel buffers and the two drawing primitives the compositor needs: nearest-neighbor
//! scaling and source-over blending.

use std::io::Cursor;

use ndarray::{Array2, ArrayView2, s};
use png::{ColorType, Decoder, Transformations};

use crate::{Result, StageError};

pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Borrowed rectangle of a [`Raster`], indexed `(row, column)`.
pub type RasterView<'a> = ArrayView2<'a, Rgba>;

/// Axis-aligned rectangle in pixels. The origin may be negative for drawing purposes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge. Wider than `i32` so it cannot overflow for any rectangle.
    pub const fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub const fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && py >= self.y && (px as i64) < self.right() && (py as i64) < self.bottom()
    }

    /// Whether `self` lies entirely inside `outer`.
    pub const fn fits_in(&self, outer: &Rect) -> bool {
        self.x >= outer.x
            && self.y >= outer.y
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pixels: Array2<Rgba>,
}

impl Raster {
    /// Fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: Array2::from_elem((height as usize, width as usize), TRANSPARENT),
        }
    }

    /// Interprets `bytes` as tightly packed RGBA8 rows.
    pub fn from_rgba(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StageError::Decode(format!(
                "image dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(StageError::Decode(format!(
                "expected {} bytes for a {}x{} RGBA image, got {}",
                expected,
                width,
                height,
                bytes.len()
            )));
        }

        let pixels = bytes
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
            .collect();
        let pixels = Array2::from_shape_vec((height as usize, width as usize), pixels)
            .map_err(|err| StageError::Decode(err.to_string()))?;
        Ok(Self { pixels })
    }

    /// Decodes a PNG file. Palettes, low bit depths and 16-bit channels are normalized to RGBA8.
    pub fn decode_png(bytes: &[u8]) -> Result<Self> {
        let decode_err = |err: png::DecodingError| StageError::Decode(err.to_string());

        let mut decoder = Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(Transformations::normalize_to_color8());
        let mut reader = decoder.read_info().map_err(decode_err)?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).map_err(decode_err)?;
        let data = &buf[..info.buffer_size()];

        let rgba: Vec<u8> = match info.color_type {
            ColorType::Rgba => data.to_vec(),
            ColorType::Rgb => data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            ColorType::GrayscaleAlpha => data
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0], px[1]])
                .collect(),
            ColorType::Grayscale => data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            ColorType::Indexed => {
                return Err(StageError::Decode("palette was not expanded".to_owned()));
            }
        };
        log::debug!("Decoded {}x{} {:?} PNG", info.width, info.height, info.color_type);
        Self::from_rgba(info.width, info.height, &rgba)
    }

    pub fn width(&self) -> u32 {
        self.pixels.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.nrows() as u32
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.pixels[(y as usize, x as usize)]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        self.pixels[(y as usize, x as usize)] = color;
    }

    /// Borrows `rect`, which must lie inside the raster.
    pub fn view(&self, rect: Rect) -> RasterView<'_> {
        assert!(
            !rect.is_empty() && rect.fits_in(&self.bounds()),
            "view {:?} outside of {:?}",
            rect,
            self.bounds()
        );
        let (x, y) = (rect.x as usize, rect.y as usize);
        self.pixels.slice(s![
            y..y + rect.height as usize,
            x..x + rect.width as usize
        ])
    }

    /// Packed RGBA8 rows, the inverse of [`Raster::from_rgba`].
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels.iter().flatten().copied().collect()
    }

    /// Copies `src` into `dst`, stretching or shrinking it without any interpolation.
    ///
    /// Destination pixels outside the raster are skipped.
    pub fn draw_scaled(&mut self, src: RasterView<'_>, dst: Rect) {
        let (src_h, src_w) = src.dim();
        if src_h == 0 || src_w == 0 || dst.is_empty() {
            return;
        }

        for dy in 0..dst.height {
            let ty = dst.y as i64 + dy as i64;
            if ty < 0 || ty >= self.height() as i64 {
                continue;
            }
            let sy = dy as usize * src_h / dst.height as usize;

            for dx in 0..dst.width {
                let tx = dst.x as i64 + dx as i64;
                if tx < 0 || tx >= self.width() as i64 {
                    continue;
                }
                let sx = dx as usize * src_w / dst.width as usize;
                self.pixels[(ty as usize, tx as usize)] = src[(sy, sx)];
            }
        }
    }

    /// Blends `src` on top of this raster with its top-left corner at `(x, y)`.
    pub fn draw_over(&mut self, src: &Raster, x: i32, y: i32) {
        for ((row, col), &color) in src.pixels.indexed_iter() {
            let tx = x as i64 + col as i64;
            let ty = y as i64 + row as i64;
            if tx < 0 || ty < 0 || tx >= self.width() as i64 || ty >= self.height() as i64 {
                continue;
            }
            let target = &mut self.pixels[(ty as usize, tx as usize)];
            *target = blend_over(color, *target);
        }
    }
}

fn blend_over(src: Rgba, dst: Rgba) -> Rgba {
    match src[3] {
        0 => dst,
        255 => src,
        src_a => {
            let src_a = src_a as u32;
            let dst_a = dst[3] as u32 * (255 - src_a) / 255;
            let out_a = src_a + dst_a;
            let channel = |i: usize| ((src[i] as u32 * src_a + dst[i] as u32 * dst_a) / out_a) as u8;
            [channel(0), channel(1), channel(2), out_a as u8]
        }
    }
}
