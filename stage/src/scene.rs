use hashbrown::HashMap;

use crate::*;

/// Named set of layers drawn in insertion order.
#[derive(Debug)]
pub struct Scene {
    name: String,
    layers: HashMap<String, Layer>,
    order: Vec<String>,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            layers: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds `layer` above the existing ones. A layer with the same name is replaced in place.
    pub fn add(&mut self, layer: Layer) {
        let name = layer.name().to_owned();
        if self.layers.insert(name.clone(), layer).is_some() {
            log::warn!("Layer '{}' replaced in scene '{}'", name, self.name);
        } else {
            self.order.push(name);
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.get_mut(name)
    }

    /// Layers from bottom to top.
    pub fn layers(&self) -> impl DoubleEndedIterator<Item = &Layer> {
        self.order.iter().filter_map(|name| self.layers.get(name))
    }

    /// Index of the `occurrence`-th clip named `clip` in `layer`.
    ///
    /// Fails if the layer does not exist; a missing clip is `Ok(None)`.
    pub fn locate(&self, layer: &str, clip: &str, occurrence: usize) -> Result<Option<usize>> {
        let layer = self
            .layers
            .get(layer)
            .ok_or_else(|| StageError::LayerNotFound(layer.to_owned()))?;
        Ok(layer.lookup_index(clip, occurrence))
    }

    pub fn lookup(&self, layer: &str, clip: &str, occurrence: usize) -> Result<Option<&Clip>> {
        let index = self.locate(layer, clip, occurrence)?;
        Ok(index.and_then(|index| self.layers.get(layer)?.clip(index)))
    }

    pub fn render_into(&self, target: &mut Raster) {
        for layer in self.layers() {
            layer.render_into(target);
        }
    }

    /// Union of the on-screen bounds of every clip.
    pub fn extent(&self) -> Rect {
        let mut right = 0;
        let mut bottom = 0;
        for clip in self.layers().flat_map(Layer::iter) {
            let bounds = clip.bounds();
            right = right.max(bounds.right());
            bottom = bottom.max(bounds.bottom());
        }
        let clamp = |edge: i64| edge.clamp(0, u32::MAX.into()) as u32;
        Rect::new(0, 0, clamp(right), clamp(bottom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SpriteSheet {
        SpriteSheet::load(
            Raster::new(4, 4),
            r#"[{"name":"tile","x":0,"y":0,"width":4,"height":4,"count":1}]"#,
        )
        .unwrap()
    }

    #[test]
    fn missing_layer_is_an_error_but_missing_clip_is_not() {
        let sheet = sheet();
        let mut layer = Layer::new("field");
        layer.add(Clip::from_grid(&sheet, "tile", "tile", (0, 0), 1).unwrap());
        let mut scene = Scene::new("game");
        scene.add(layer);

        assert_eq!(scene.locate("field", "tile", 0).unwrap(), Some(0));
        assert_eq!(scene.locate("field", "tile", 1).unwrap(), None);
        assert!(matches!(
            scene.locate("hud", "tile", 0),
            Err(StageError::LayerNotFound(ref name)) if name == "hud"
        ));
    }

    #[test]
    fn layers_keep_insertion_order() {
        let mut scene = Scene::new("game");
        for name in ["bg", "field", "hud"] {
            scene.add(Layer::new(name));
        }
        scene.add(Layer::new("field"));

        let names: Vec<_> = scene.layers().map(Layer::name).collect();
        assert_eq!(names, ["bg", "field", "hud"]);
    }

    #[test]
    fn extent_covers_scaled_clips() {
        let sheet = sheet();
        let mut layer = Layer::new("field");
        layer.add(Clip::from_grid(&sheet, "tile", "a", (0, 0), 2).unwrap());
        layer.add(Clip::from_grid(&sheet, "tile", "b", (3, 1), 2).unwrap());
        let mut scene = Scene::new("game");
        scene.add(layer);

        assert_eq!(scene.extent(), Rect::new(0, 0, 14, 10));
    }
}
