use crate::*;

/// Ordered group of clips composited back to front.
///
/// Clips share the layer's redraw signal, so a visibility change in any of them marks the whole
/// layer for recompositing.
#[derive(Debug)]
pub struct Layer {
    name: String,
    clips: Vec<Clip>,
    redraw: RedrawSignal,
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            clips: Vec::new(),
            redraw: RedrawSignal::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `clip` on top of the existing ones and returns its index.
    pub fn add(&mut self, mut clip: Clip) -> usize {
        clip.attach(self.redraw.clone());
        self.clips.push(clip);
        self.redraw.request();
        self.clips.len() - 1
    }

    /// Index of the `occurrence`-th clip (0-based, in insertion order) named `name`.
    pub fn lookup_index(&self, name: &str, occurrence: usize) -> Option<usize> {
        self.clips
            .iter()
            .enumerate()
            .filter(|(_, clip)| clip.name() == name)
            .nth(occurrence)
            .map(|(index, _)| index)
    }

    pub fn lookup(&self, name: &str, occurrence: usize) -> Option<&Clip> {
        self.lookup_index(name, occurrence).map(|index| &self.clips[index])
    }

    pub fn lookup_mut(&mut self, name: &str, occurrence: usize) -> Option<&mut Clip> {
        self.lookup_index(name, occurrence)
            .map(move |index| &mut self.clips[index])
    }

    pub fn clip(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn clip_mut(&mut self, index: usize) -> Option<&mut Clip> {
        self.clips.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Clip> {
        self.clips.iter()
    }

    /// Redraws requested by this layer's clips since it was created.
    pub fn redraw_requests(&self) -> u64 {
        self.redraw.requests()
    }

    /// Draws every clip's current frame, later clips over earlier ones.
    pub fn render_into(&self, target: &mut Raster) {
        for clip in &self.clips {
            if clip.frame_count() == 0 {
                continue;
            }
            let bounds = clip.bounds();
            target.draw_over(clip.frame(), bounds.x, bounds.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SpriteSheet {
        let mut image = Raster::new(4, 2);
        for x in 0..4 {
            for y in 0..2 {
                image.set_pixel(x, y, [x as u8 * 50, 0, 0, 255]);
            }
        }
        SpriteSheet::load(
            image,
            r#"[{"name":"tile","x":0,"y":0,"width":2,"height":2,"count":2}]"#,
        )
        .unwrap()
    }

    #[test]
    fn lookup_counts_occurrences_in_insertion_order() {
        let sheet = sheet();
        let mut layer = Layer::new("field");
        for x in 0..3 {
            layer.add(Clip::from_grid(&sheet, "tile", "tile", (x * 2, 0), 1).unwrap());
        }
        layer.add(Clip::from_grid(&sheet, "tile", "other", (0, 2), 1).unwrap());

        assert_eq!(layer.lookup_index("tile", 0), Some(0));
        assert_eq!(layer.lookup_index("tile", 2), Some(2));
        assert_eq!(layer.lookup_index("tile", 3), None);
        assert_eq!(layer.lookup("other", 0).unwrap().position(), (0, 2));
    }

    #[test]
    fn clips_share_the_layer_signal() {
        let sheet = sheet();
        let mut layer = Layer::new("field");
        layer.add(Clip::from_grid(&sheet, "tile", "a", (0, 0), 1).unwrap());
        layer.add(Clip::from_grid(&sheet, "tile", "b", (2, 0), 1).unwrap());
        let before = layer.redraw_requests();

        layer.lookup_mut("a", 0).unwrap().set_frame(1, true);
        layer.lookup_mut("b", 0).unwrap().set_frame(1, true);
        layer.lookup_mut("b", 0).unwrap().set_frame(1, true);

        assert_eq!(layer.redraw_requests(), before + 2);
    }

    #[test]
    fn later_clips_draw_on_top() {
        let sheet = sheet();
        let mut layer = Layer::new("field");
        layer.add(Clip::from_grid(&sheet, "tile", "under", (0, 0), 1).unwrap());
        let mut over = Clip::from_grid(&sheet, "tile", "over", (1, 0), 1).unwrap();
        over.set_frame(1, false);
        layer.add(over);

        let mut target = Raster::new(3, 2);
        layer.render_into(&mut target);

        assert_eq!(target.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(target.pixel(1, 0), [100, 0, 0, 255]);
        assert_eq!(target.pixel(2, 1), [150, 0, 0, 255]);
    }
}
