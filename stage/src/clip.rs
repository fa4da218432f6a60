use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::*;

/// Callback for pointer events that carry button and modifier state.
pub type PointerHandler = Box<dyn FnMut(PointerInput)>;

/// Callback for the pointer leaving a clip.
pub type LeaveHandler = Box<dyn FnMut()>;

/// Redraw request counter shared between a layer and its clips.
#[derive(Clone, Debug, Default)]
pub struct RedrawSignal(Rc<Cell<u64>>);

impl RedrawSignal {
    pub fn request(&self) {
        self.0.set(self.0.get() + 1);
    }

    /// How many redraws were requested so far.
    pub fn requests(&self) -> u64 {
        self.0.get()
    }
}

#[derive(Default)]
struct Slots {
    press: Option<PointerHandler>,
    long_press: Option<PointerHandler>,
    release: Option<PointerHandler>,
    release_outside: Option<PointerHandler>,
    enter: Option<PointerHandler>,
    leave: Option<LeaveHandler>,
    hover: Option<PointerHandler>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Frame {
    image: Raster,
    visible: bool,
}

/// A positioned, scaled sprite with a set of interchangeable frames.
///
/// Position and size are logical (unscaled) units; [`Clip::bounds`] gives the on-screen
/// rectangle after applying the scale.
pub struct Clip {
    name: String,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    scale: u32,
    current: usize,
    frames: Vec<Frame>,
    slots: Slots,
    redraw: Option<RedrawSignal>,
}

impl Clip {
    /// One frame per grid cell of `region`, each scaled up by `scale`.
    pub fn from_grid(
        sheet: &SpriteSheet,
        region: &str,
        name: &str,
        (x, y): (i32, i32),
        scale: u32,
    ) -> Result<Self> {
        let region = find_region(sheet, region, name)?;
        let RegionShape::Grid { width, height, .. } = region.shape() else {
            return Err(StageError::layout(
                region.name(),
                format!("clip '{}' needs a grid region, not a 9-slice one", name),
            ));
        };

        let scale = scale.max(1);
        if scaled_rect((x, y), (width, height), scale).is_none() {
            return Err(too_large(region.name(), name, scale));
        }
        let frames = (0..region.frame_count())
            .filter_map(|index| region.frame_rect(index))
            .map(|rect| {
                let mut image = Raster::new(width * scale, height * scale);
                let bounds = image.bounds();
                image.draw_scaled(sheet.view(rect), bounds);
                image
            })
            .collect();

        Ok(Self::with_frames(name, (x, y), (width, height), scale, frames))
    }

    /// A single frame stretched to `width` x `height` with the 9-slice technique.
    ///
    /// Corners keep their source size, edges stretch along one axis and the center along both.
    pub fn nine_slice(
        sheet: &SpriteSheet,
        region: &str,
        name: &str,
        (x, y): (i32, i32),
        (width, height): (u32, u32),
        scale: u32,
    ) -> Result<Self> {
        let region = find_region(sheet, region, name)?;
        let RegionShape::NineSlice { widths, heights } = region.shape() else {
            return Err(StageError::layout(
                region.name(),
                format!("clip '{}' needs a 9-slice region, not a grid one", name),
            ));
        };

        let scale = scale.max(1);
        let corners = (
            widths[0].saturating_add(widths[2]),
            heights[0].saturating_add(heights[2]),
        );
        if scaled_rect((x, y), (width.max(corners.0), height.max(corners.1)), scale).is_none() {
            return Err(too_large(region.name(), name, scale));
        }
        let columns = [
            widths[0],
            width.saturating_sub(corners.0),
            widths[2],
        ];
        let rows = [
            heights[0],
            height.saturating_sub(corners.1),
            heights[2],
        ];

        let mut image = Raster::new(width * scale, height * scale);
        let mut dst_y = 0;
        for (row, &row_height) in rows.iter().enumerate() {
            let mut dst_x = 0;
            for (column, &column_width) in columns.iter().enumerate() {
                if let Some(src) = region.slice_rect(column, row) {
                    if !src.is_empty() {
                        let dst = Rect::new(
                            (dst_x * scale) as i32,
                            (dst_y * scale) as i32,
                            column_width * scale,
                            row_height * scale,
                        );
                        image.draw_scaled(sheet.view(src), dst);
                    }
                }
                dst_x += column_width;
            }
            dst_y += row_height;
        }

        Ok(Self::with_frames(
            name,
            (x, y),
            (width, height),
            scale,
            vec![image],
        ))
    }

    fn with_frames(
        name: &str,
        (x, y): (i32, i32),
        (width, height): (u32, u32),
        scale: u32,
        frames: Vec<Raster>,
    ) -> Self {
        let frames = frames
            .into_iter()
            .enumerate()
            .map(|(index, image)| Frame {
                image,
                visible: index == 0,
            })
            .collect();
        Self {
            name: name.to_owned(),
            x,
            y,
            width,
            height,
            scale,
            current: 0,
            frames,
            slots: Slots::default(),
            redraw: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical position.
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Logical size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// On-screen rectangle: position and size multiplied by the scale.
    pub fn bounds(&self) -> Rect {
        // constructors reject geometry that does not scale
        scaled_rect((self.x, self.y), (self.width, self.height), self.scale).unwrap_or_default()
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        self.bounds().contains(px, py)
    }

    pub fn frame_index(&self) -> usize {
        self.current
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_frame_visible(&self, index: usize) -> bool {
        self.frames.get(index).is_some_and(|frame| frame.visible)
    }

    /// Image of the current frame.
    pub fn frame(&self) -> &Raster {
        assert!(
            !self.frames.is_empty(),
            "clip '{}' has no frames",
            self.name
        );
        &self.frames[self.current].image
    }

    /// Switches to frame `index`, showing only that frame.
    ///
    /// Does nothing for the current frame or an out-of-range index. When `request_redraw` is set
    /// and any frame visibility changed, the owning layer is asked to recomposite. Returns whether
    /// the frame changed.
    pub fn set_frame(&mut self, index: usize, request_redraw: bool) -> bool {
        if index == self.current || index >= self.frames.len() {
            return false;
        }

        self.current = index;
        let mut dirty = false;
        for (i, frame) in self.frames.iter_mut().enumerate() {
            let visible = i == index;
            if frame.visible != visible {
                frame.visible = visible;
                dirty = true;
            }
        }

        if dirty && request_redraw {
            if let Some(redraw) = &self.redraw {
                redraw.request();
            }
        }
        true
    }

    pub(crate) fn attach(&mut self, redraw: RedrawSignal) {
        self.redraw = Some(redraw);
    }

    pub fn on_press(&mut self, handler: impl FnMut(PointerInput) + 'static) {
        self.slots.press = Some(Box::new(handler));
    }

    pub fn on_long_press(&mut self, handler: impl FnMut(PointerInput) + 'static) {
        self.slots.long_press = Some(Box::new(handler));
    }

    pub fn on_release(&mut self, handler: impl FnMut(PointerInput) + 'static) {
        self.slots.release = Some(Box::new(handler));
    }

    pub fn on_release_outside(&mut self, handler: impl FnMut(PointerInput) + 'static) {
        self.slots.release_outside = Some(Box::new(handler));
    }

    pub fn on_enter(&mut self, handler: impl FnMut(PointerInput) + 'static) {
        self.slots.enter = Some(Box::new(handler));
    }

    pub fn on_leave(&mut self, handler: impl FnMut() + 'static) {
        self.slots.leave = Some(Box::new(handler));
    }

    pub fn on_hover(&mut self, handler: impl FnMut(PointerInput) + 'static) {
        self.slots.hover = Some(Box::new(handler));
    }

    pub fn press(&mut self, input: PointerInput) {
        log::trace!("press {}: {:?}", self.name, input);
        if let Some(handler) = &mut self.slots.press {
            handler(input);
        }
    }

    pub fn long_press(&mut self, input: PointerInput) {
        log::trace!("long press {}: {:?}", self.name, input);
        if let Some(handler) = &mut self.slots.long_press {
            handler(input);
        }
    }

    pub fn release(&mut self, input: PointerInput) {
        log::trace!("release {}: {:?}", self.name, input);
        if let Some(handler) = &mut self.slots.release {
            handler(input);
        }
    }

    pub fn release_outside(&mut self, input: PointerInput) {
        log::trace!("release outside {}: {:?}", self.name, input);
        if let Some(handler) = &mut self.slots.release_outside {
            handler(input);
        }
    }

    pub fn enter(&mut self, input: PointerInput) {
        if let Some(handler) = &mut self.slots.enter {
            handler(input);
        }
    }

    pub fn leave(&mut self) {
        if let Some(handler) = &mut self.slots.leave {
            handler();
        }
    }

    pub fn hover(&mut self, input: PointerInput) {
        if let Some(handler) = &mut self.slots.hover {
            handler(input);
        }
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("name", &self.name)
            .field("bounds", &self.bounds())
            .field("frame", &self.current)
            .field("frames", &self.frames.len())
            .finish_non_exhaustive()
    }
}

fn find_region<'a>(sheet: &'a SpriteSheet, region: &str, clip: &str) -> Result<&'a SpriteRegion> {
    sheet.region(region).ok_or_else(|| StageError::SpriteNotFound {
        sprite: region.to_owned(),
        clip: clip.to_owned(),
    })
}

/// Screen rectangle of a clip at `scale`, `None` when it overflows the pixel coordinate types.
pub(crate) fn scaled_rect((x, y): (i32, i32), (width, height): (u32, u32), scale: u32) -> Option<Rect> {
    let factor = i32::try_from(scale).ok()?;
    Some(Rect::new(
        x.checked_mul(factor)?,
        y.checked_mul(factor)?,
        width.checked_mul(scale)?,
        height.checked_mul(scale)?,
    ))
}

fn too_large(region: &str, clip: &str, scale: u32) -> StageError {
    StageError::layout(
        region,
        format!("clip '{}' does not fit the screen at scale {}", clip, scale),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// 8x5 image where every pixel encodes its own coordinates.
    fn coded_sheet(layout: &str) -> SpriteSheet {
        let mut image = Raster::new(8, 5);
        for y in 0..5 {
            for x in 0..8 {
                image.set_pixel(x, y, [x as u8, y as u8, 0, 255]);
            }
        }
        SpriteSheet::load(image, layout).unwrap()
    }

    fn digits_sheet() -> SpriteSheet {
        coded_sheet(r#"[{"name":"digits","x":0,"y":0,"width":2,"height":2,"count":3,"gap":1}]"#)
    }

    #[test]
    fn grid_clip_scales_every_frame() {
        let sheet = digits_sheet();
        let clip = Clip::from_grid(&sheet, "digits", "time", (1, 2), 3).unwrap();

        assert_eq!(clip.frame_count(), 3);
        assert_eq!(clip.bounds(), Rect::new(3, 6, 6, 6));
        assert_eq!(clip.frame().width(), 6);
        assert_eq!(clip.frame().pixel(5, 5), [1, 1, 0, 255]);
        assert!(clip.is_frame_visible(0));
        assert!(!clip.is_frame_visible(1));
    }

    #[test]
    fn grid_frames_come_from_their_cells() {
        let sheet = digits_sheet();
        let mut clip = Clip::from_grid(&sheet, "digits", "time", (0, 0), 1).unwrap();

        clip.set_frame(2, false);
        // frame 2 starts at x = 2 * (2 + 1)
        assert_eq!(clip.frame().pixel(0, 0), [6, 0, 0, 255]);
    }

    #[test]
    fn geometry_that_overflows_when_scaled_is_rejected() {
        let sheet = digits_sheet();
        let err = Clip::from_grid(&sheet, "digits", "time", (2_000_000_000, 0), 2).unwrap_err();
        assert!(matches!(err, StageError::Layout { ref region, .. } if region == "digits"));

        let clip = Clip::from_grid(&sheet, "digits", "time", (1_000_000_000, -3), 2).unwrap();
        assert_eq!(clip.bounds(), Rect::new(2_000_000_000, -6, 4, 4));
        assert!(!clip.contains(0, 0));
    }

    #[test]
    fn unknown_region_is_reported_with_clip_name() {
        let sheet = digits_sheet();
        let err = Clip::from_grid(&sheet, "nope", "bombs", (0, 0), 1).unwrap_err();
        assert!(matches!(
            err,
            StageError::SpriteNotFound { ref sprite, ref clip } if sprite == "nope" && clip == "bombs"
        ));
    }

    #[test]
    fn set_frame_is_idempotent() {
        let sheet = digits_sheet();
        let mut clip = Clip::from_grid(&sheet, "digits", "time", (0, 0), 1).unwrap();
        let redraw = RedrawSignal::default();
        clip.attach(redraw.clone());

        assert!(clip.set_frame(1, true));
        assert!(!clip.set_frame(1, true));
        assert_eq!(redraw.requests(), 1);
        assert!(clip.is_frame_visible(1));
        assert!(!clip.is_frame_visible(0));
    }

    #[test]
    fn set_frame_ignores_out_of_range_and_quiet_updates() {
        let sheet = digits_sheet();
        let mut clip = Clip::from_grid(&sheet, "digits", "time", (0, 0), 1).unwrap();
        let redraw = RedrawSignal::default();
        clip.attach(redraw.clone());

        assert!(!clip.set_frame(3, true));
        assert_eq!(clip.frame_index(), 0);
        assert!(clip.set_frame(2, false));
        assert_eq!(redraw.requests(), 0);
    }

    #[test]
    fn nine_slice_keeps_corners_and_fills_middle() {
        // 3x3 region of 1px pieces, no gap
        let sheet = coded_sheet(r#"[{"name":"panel","x":1,"y":1,"widths":[1,1,1],"heights":[1,1,1]}]"#);
        let clip = Clip::nine_slice(&sheet, "panel", "panel", (0, 0), (5, 4), 2).unwrap();
        let image = clip.frame();
        assert_eq!((image.width(), image.height()), (10, 8));

        // corners are the source corner pixels, scaled 2x
        for (dx, dy) in [(0, 0), (1, 1)] {
            assert_eq!(image.pixel(dx, dy), [1, 1, 0, 255]);
            assert_eq!(image.pixel(8 + dx, dy), [3, 1, 0, 255]);
            assert_eq!(image.pixel(dx, 6 + dy), [1, 3, 0, 255]);
            assert_eq!(image.pixel(8 + dx, 6 + dy), [3, 3, 0, 255]);
        }

        // every pixel is covered: top edge, left edge and center stretch
        for y in 0..8 {
            for x in 0..10 {
                assert_eq!(image.pixel(x, y)[3], 255, "hole at ({}, {})", x, y);
            }
        }
        assert_eq!(image.pixel(4, 0), [2, 1, 0, 255]);
        assert_eq!(image.pixel(0, 4), [1, 2, 0, 255]);
        assert_eq!(image.pixel(5, 4), [2, 2, 0, 255]);
    }

    #[test]
    fn nine_slice_rejects_grid_region() {
        let sheet = digits_sheet();
        let err = Clip::nine_slice(&sheet, "digits", "panel", (0, 0), (4, 4), 1).unwrap_err();
        assert!(matches!(err, StageError::Layout { .. }));
    }

    #[test]
    fn registering_again_replaces_handler() {
        let sheet = digits_sheet();
        let mut clip = Clip::from_grid(&sheet, "digits", "time", (0, 0), 1).unwrap();
        let calls = Rc::new(RefCell::new(Vec::new()));

        let log = calls.clone();
        clip.on_press(move |_| log.borrow_mut().push("first"));
        let log = calls.clone();
        clip.on_press(move |input| {
            assert!(input.right_button());
            log.borrow_mut().push("second")
        });

        clip.press(PointerInput::RIGHT);
        clip.release(PointerInput::empty());

        assert_eq!(*calls.borrow(), ["second"]);
    }

    #[test]
    fn leave_has_no_payload() {
        let sheet = digits_sheet();
        let mut clip = Clip::from_grid(&sheet, "digits", "time", (0, 0), 1).unwrap();
        let left = Rc::new(Cell::new(false));

        let flag = left.clone();
        clip.on_leave(move || flag.set(true));
        clip.leave();

        assert!(left.get());
    }
}
