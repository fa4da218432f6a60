use hashbrown::HashMap;
use serde::Deserialize;

use crate::*;

/// Region entry as written in the layout JSON.
#[derive(Clone, Debug, Deserialize)]
struct RegionSpec {
    name: String,
    x: u32,
    y: u32,
    width: Option<u32>,
    height: Option<u32>,
    widths: Option<Vec<u32>>,
    heights: Option<Vec<u32>>,
    #[serde(default)]
    count: u32,
    #[serde(default)]
    grid: u32,
    #[serde(default)]
    gap: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionShape {
    /// `count` equally sized frames laid out `columns` per row.
    Grid {
        width: u32,
        height: u32,
        count: u32,
        columns: u32,
    },
    /// One frame cut into a 3x3 grid of corner, edge and center pieces.
    NineSlice { widths: [u32; 3], heights: [u32; 3] },
}

/// Named rectangle (or set of rectangles) on the sheet image. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpriteRegion {
    name: String,
    x: u32,
    y: u32,
    gap: u32,
    shape: RegionShape,
}

impl SpriteRegion {
    pub fn grid(name: &str, (x, y): (u32, u32), (width, height): (u32, u32), count: u32, grid: u32, gap: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StageError::layout(name, "frame size must be positive"));
        }
        if count == 0 {
            return Err(StageError::layout(name, "frame count must be positive"));
        }
        let columns = if grid == 0 { count } else { grid };
        Ok(Self {
            name: name.to_owned(),
            x,
            y,
            gap,
            shape: RegionShape::Grid {
                width,
                height,
                count,
                columns,
            },
        })
    }

    pub fn nine_slice(name: &str, (x, y): (u32, u32), widths: [u32; 3], heights: [u32; 3], gap: u32) -> Self {
        Self {
            name: name.to_owned(),
            x,
            y,
            gap,
            shape: RegionShape::NineSlice { widths, heights },
        }
    }

    fn from_spec(spec: RegionSpec) -> Result<Self> {
        let RegionSpec {
            name,
            x,
            y,
            width,
            height,
            widths,
            heights,
            count,
            grid,
            gap,
        } = spec;

        match (width, height, widths, heights) {
            (Some(width), Some(height), None, None) => {
                Self::grid(&name, (x, y), (width, height), count, grid, gap)
            }
            (None, None, Some(widths), Some(heights)) => {
                let widths: [u32; 3] = widths
                    .try_into()
                    .map_err(|_| StageError::layout(&name, "9-slice regions need exactly 3 widths"))?;
                let heights: [u32; 3] = heights
                    .try_into()
                    .map_err(|_| StageError::layout(&name, "9-slice regions need exactly 3 heights"))?;
                Ok(Self::nine_slice(&name, (x, y), widths, heights, gap))
            }
            (None, None, Some(_), None) | (None, None, None, Some(_)) => Err(StageError::layout(
                &name,
                "9-slice regions need both widths and heights",
            )),
            _ => Err(StageError::layout(
                &name,
                "expected either width/height or widths/heights",
            )),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> RegionShape {
        self.shape
    }

    pub fn frame_count(&self) -> usize {
        match self.shape {
            RegionShape::Grid { count, .. } => count as usize,
            RegionShape::NineSlice { .. } => 1,
        }
    }

    /// Source rectangle of grid frame `index`, `None` for 9-slice regions or out of range frames.
    pub fn frame_rect(&self, index: usize) -> Option<Rect> {
        let RegionShape::Grid { count, columns, .. } = self.shape else {
            return None;
        };
        if index >= count as usize {
            return None;
        }
        let index = index as u32;
        self.grid_cell(index % columns, index / columns)
    }

    /// Source rectangle of the 9-slice piece in `column`, `row` (both `0..3`).
    pub fn slice_rect(&self, column: usize, row: usize) -> Option<Rect> {
        let RegionShape::NineSlice { widths, heights } = self.shape else {
            return None;
        };
        let x = offset(self.x, &widths[..column.min(3)], self.gap)?;
        let y = offset(self.y, &heights[..row.min(3)], self.gap)?;
        Some(Rect::new(x, y, *widths.get(column)?, *heights.get(row)?))
    }

    /// Grid frame at `column`, `row`, or `None` when its origin does not fit in `i32`.
    fn grid_cell(&self, column: u32, row: u32) -> Option<Rect> {
        let RegionShape::Grid { width, height, .. } = self.shape else {
            return None;
        };
        let x = column.checked_mul(width.checked_add(self.gap)?)?.checked_add(self.x)?;
        let y = row.checked_mul(height.checked_add(self.gap)?)?.checked_add(self.y)?;
        Some(Rect::new(i32::try_from(x).ok()?, i32::try_from(y).ok()?, width, height))
    }

    /// Rectangles spanning the region: every 9-slice piece, or the grid frames furthest right
    /// and furthest down. Fitting those is enough for every frame to fit.
    fn extreme_rects(&self) -> Option<Vec<Rect>> {
        match self.shape {
            RegionShape::Grid { count, columns, .. } => {
                let last_column = columns.min(count) - 1;
                let last_row = (count - 1) / columns;
                [(0, 0), (last_column, 0), (0, last_row)]
                    .into_iter()
                    .map(|(column, row)| self.grid_cell(column, row))
                    .collect()
            }
            RegionShape::NineSlice { .. } => (0..9)
                .map(|piece| self.slice_rect(piece % 3, piece / 3))
                .collect(),
        }
    }

    fn validate(&self, bounds: Rect) -> Result<()> {
        let rects = self
            .extreme_rects()
            .ok_or_else(|| StageError::layout(&self.name, "region is out of range"))?;
        for rect in rects {
            if !rect.fits_in(&bounds) {
                return Err(StageError::layout(
                    &self.name,
                    format!(
                        "{}x{} at ({}, {}) extends past the {}x{} image",
                        rect.width, rect.height, rect.x, rect.y, bounds.width, bounds.height
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// `start` plus the preceding extents and one gap after each, checked against `i32`.
fn offset(start: u32, extents: &[u32], gap: u32) -> Option<i32> {
    let offset = extents
        .iter()
        .try_fold(start, |acc, &extent| acc.checked_add(extent)?.checked_add(gap))?;
    i32::try_from(offset).ok()
}

/// One decoded image plus the named regions cut from it.
///
/// Regions only describe offsets and extents; the pixels stay owned by the sheet.
#[derive(Clone, Debug)]
pub struct SpriteSheet {
    image: Raster,
    regions: HashMap<String, SpriteRegion>,
}

impl SpriteSheet {
    /// Parses `layout` (a JSON array of regions) against `image`.
    pub fn load(image: Raster, layout: &str) -> Result<Self> {
        let specs: Vec<RegionSpec> = serde_json::from_str(layout)?;
        let regions = specs
            .into_iter()
            .map(SpriteRegion::from_spec)
            .collect::<Result<Vec<_>>>()?;
        Self::from_regions(image, regions)
    }

    /// Decodes a PNG skin and loads `layout` against it.
    pub fn decode(png: &[u8], layout: &str) -> Result<Self> {
        Self::load(Raster::decode_png(png)?, layout)
    }

    pub fn from_regions(image: Raster, regions: Vec<SpriteRegion>) -> Result<Self> {
        let bounds = image.bounds();
        let mut map = HashMap::with_capacity(regions.len());
        for region in regions {
            region.validate(bounds)?;
            if map.contains_key(region.name()) {
                log::warn!("Sprite region '{}' declared twice, keeping the last", region.name());
            }
            map.insert(region.name.clone(), region);
        }
        log::debug!("Loaded {} sprite regions", map.len());
        Ok(Self {
            image,
            regions: map,
        })
    }

    pub fn image(&self) -> &Raster {
        &self.image
    }

    pub fn region(&self, name: &str) -> Option<&SpriteRegion> {
        self.regions.get(name)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Pixels under `rect`. Rectangles from a validated region always fit.
    pub fn view(&self, rect: Rect) -> RasterView<'_> {
        self.image.view(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"[
        {"name":"icons","x":0,"y":0,"width":16,"height":16,"count":17,"grid":9},
        {"name":"digits","x":0,"y":33,"width":11,"height":21,"count":11,"gap":1},
        {"name":"field","x":0,"y":96,"widths":[12,1,12],"heights":[11,1,11],"gap":1}
    ]"#;

    fn sheet() -> SpriteSheet {
        SpriteSheet::load(Raster::new(144, 122), LAYOUT).unwrap()
    }

    #[test]
    fn grid_frames_follow_rows_and_columns() {
        let sheet = sheet();
        let icons = sheet.region("icons").unwrap();
        assert_eq!(icons.frame_count(), 17);

        for i in 0..17 {
            let rect = icons.frame_rect(i).unwrap();
            assert_eq!(rect.x, (i % 9) as i32 * 16);
            assert_eq!(rect.y, (i / 9) as i32 * 16);
        }
        assert_eq!(icons.frame_rect(17), None);
    }

    #[test]
    fn missing_grid_means_single_row_with_gap() {
        let sheet = sheet();
        let digits = sheet.region("digits").unwrap();
        assert_eq!(digits.frame_rect(10), Some(Rect::new(120, 33, 11, 21)));
    }

    #[test]
    fn nine_slice_pieces_skip_gaps() {
        let sheet = sheet();
        let field = sheet.region("field").unwrap();
        assert_eq!(field.frame_count(), 1);
        assert_eq!(field.slice_rect(0, 0), Some(Rect::new(0, 96, 12, 11)));
        assert_eq!(field.slice_rect(1, 1), Some(Rect::new(13, 108, 1, 1)));
        assert_eq!(field.slice_rect(2, 2), Some(Rect::new(15, 110, 12, 11)));
    }

    #[test]
    fn region_past_image_bounds_is_rejected() {
        let layout = r#"[{"name":"wide","x":100,"y":0,"width":16,"height":16,"count":4}]"#;
        let err = SpriteSheet::load(Raster::new(144, 122), layout).unwrap_err();
        assert!(matches!(err, StageError::Layout { ref region, .. } if region == "wide"));
    }

    #[test]
    fn region_at_the_integer_limits_is_rejected() {
        for layout in [
            r#"[{"name":"far","x":2147483647,"y":0,"width":16,"height":16,"count":1}]"#,
            r#"[{"name":"far","x":4294967290,"y":0,"width":16,"height":16,"count":2}]"#,
            r#"[{"name":"far","x":0,"y":0,"width":4294967295,"height":1,"count":3,"gap":4}]"#,
            r#"[{"name":"far","x":4294967295,"y":0,"widths":[4,4,4],"heights":[4,4,4]}]"#,
            r#"[{"name":"far","x":0,"y":0,"widths":[4294967295,1,1],"heights":[4,4,4]}]"#,
        ] {
            let err = SpriteSheet::load(Raster::new(32, 32), layout).unwrap_err();
            assert!(
                matches!(err, StageError::Layout { ref region, .. } if region == "far"),
                "{}",
                layout
            );
        }
    }

    #[test]
    fn last_grid_row_may_be_partial() {
        // 5 frames of 8x8, 4 per row: the second row only holds one frame
        let layout = r#"[{"name":"tiles","x":0,"y":0,"width":8,"height":8,"count":5,"grid":4}]"#;
        let sheet = SpriteSheet::load(Raster::new(32, 16), layout).unwrap();
        let tiles = sheet.region("tiles").unwrap();
        assert_eq!(tiles.frame_rect(4), Some(Rect::new(0, 8, 8, 8)));

        let err = SpriteSheet::load(Raster::new(32, 8), layout).unwrap_err();
        assert!(matches!(err, StageError::Layout { .. }));
    }

    #[test]
    fn nine_slice_needs_three_widths_and_heights() {
        let layout = r#"[{"name":"panel","x":0,"y":0,"widths":[4,4],"heights":[4,4,4]}]"#;
        let err = SpriteSheet::load(Raster::new(32, 32), layout).unwrap_err();
        assert!(matches!(err, StageError::Layout { .. }));

        let layout = r#"[{"name":"panel","x":0,"y":0,"widths":[4,4,4]}]"#;
        let err = SpriteSheet::load(Raster::new(32, 32), layout).unwrap_err();
        assert!(matches!(err, StageError::Layout { .. }));
    }

    #[test]
    fn grid_region_needs_frames() {
        let layout = r#"[{"name":"empty","x":0,"y":0,"width":4,"height":4}]"#;
        let err = SpriteSheet::load(Raster::new(32, 32), layout).unwrap_err();
        assert!(matches!(err, StageError::Layout { .. }));
    }

    #[test]
    fn bad_json_and_bad_pixels_are_reported() {
        assert!(matches!(
            SpriteSheet::load(Raster::new(4, 4), "[{").unwrap_err(),
            StageError::Json(_)
        ));
        assert!(matches!(
            SpriteSheet::decode(&[0x89, b'P', b'N', b'G'], "[]").unwrap_err(),
            StageError::Decode(_)
        ));
    }
}
