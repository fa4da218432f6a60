use hashbrown::HashMap;

use crate::*;

/// Stable address of a clip inside a [`Movie`].
///
/// Handles stay valid for the lifetime of the movie since clips are never removed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClipHandle {
    pub scene: String,
    pub layer: String,
    pub index: usize,
}

/// Root of the presentation tree: named scenes with exactly one current.
#[derive(Debug, Default)]
pub struct Movie {
    scenes: HashMap<String, Scene>,
    current: Option<String>,
    size: Option<(u32, u32)>,
}

impl Movie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every scene described by the JSON array `text`.
    pub fn from_json(sheet: &SpriteSheet, text: &str, params: &Params) -> Result<Self> {
        let scenes: Vec<SceneDesc> = serde_json::from_str(text)?;
        let builder = SceneBuilder::new(sheet, params.clone());
        let mut movie = Self::new();
        for desc in &scenes {
            movie.add(builder.build_scene(desc)?);
        }
        Ok(movie)
    }

    /// Adds `scene`. The first scene added becomes the current one.
    pub fn add(&mut self, scene: Scene) {
        let name = scene.name().to_owned();
        log::debug!("Adding scene '{}'", name);
        self.scenes.insert(name.clone(), scene);
        if self.current.is_none() {
            self.current = Some(name);
        }
    }

    pub fn set_current(&mut self, name: &str) -> Result<()> {
        if !self.scenes.contains_key(name) {
            return Err(StageError::SceneNotFound(name.to_owned()));
        }
        self.current = Some(name.to_owned());
        Ok(())
    }

    pub fn current(&self) -> Option<&Scene> {
        self.current.as_ref().and_then(|name| self.scenes.get(name))
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    /// Handle of the `occurrence`-th clip named `clip` in `scene`/`layer`.
    pub fn locate(&self, scene: &str, layer: &str, clip: &str, occurrence: usize) -> Result<ClipHandle> {
        let index = self
            .scenes
            .get(scene)
            .ok_or_else(|| StageError::SceneNotFound(scene.to_owned()))?
            .locate(layer, clip, occurrence)?
            .ok_or_else(|| StageError::ClipNotFound {
                clip: clip.to_owned(),
                occurrence,
            })?;
        Ok(ClipHandle {
            scene: scene.to_owned(),
            layer: layer.to_owned(),
            index,
        })
    }

    /// Handles of every clip named `clip`, in insertion order.
    ///
    /// Only a failure on the first occurrence is reported; afterwards the sequence simply ends.
    pub fn locate_all(&self, scene: &str, layer: &str, clip: &str) -> Result<Vec<ClipHandle>> {
        let mut handles = Vec::new();
        for occurrence in 0.. {
            match self.locate(scene, layer, clip, occurrence) {
                Ok(handle) => handles.push(handle),
                Err(err) if occurrence == 0 => return Err(err),
                Err(_) => break,
            }
        }
        Ok(handles)
    }

    pub fn lookup(&self, scene: &str, layer: &str, clip: &str, occurrence: usize) -> Result<&Clip> {
        let handle = self.locate(scene, layer, clip, occurrence)?;
        self.clip(&handle).ok_or_else(|| StageError::ClipNotFound {
            clip: clip.to_owned(),
            occurrence,
        })
    }

    pub fn lookup_all(&self, scene: &str, layer: &str, clip: &str) -> Result<Vec<&Clip>> {
        Ok(self
            .locate_all(scene, layer, clip)?
            .iter()
            .filter_map(|handle| self.clip(handle))
            .collect())
    }

    pub fn clip(&self, handle: &ClipHandle) -> Option<&Clip> {
        self.scenes
            .get(&handle.scene)?
            .layer(&handle.layer)?
            .clip(handle.index)
    }

    pub fn clip_mut(&mut self, handle: &ClipHandle) -> Option<&mut Clip> {
        self.scenes
            .get_mut(&handle.scene)?
            .layer_mut(&handle.layer)?
            .clip_mut(handle.index)
    }

    /// Forces the rendered surface size instead of fitting the clips.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
    }

    /// Surface size: the forced one, or the extent of the current scene.
    pub fn size(&self) -> (u32, u32) {
        self.size.unwrap_or_else(|| {
            let extent = self.current().map(Scene::extent).unwrap_or_default();
            (extent.width, extent.height)
        })
    }

    /// Composites the current scene onto a fresh transparent raster.
    pub fn render(&self) -> Raster {
        let (width, height) = self.size();
        let mut target = Raster::new(width, height);
        if let Some(scene) = self.current() {
            scene.render_into(&mut target);
        }
        target
    }

    /// Topmost clip of the current scene under the screen point `(px, py)`.
    pub fn hit_test(&self, px: i32, py: i32) -> Option<ClipHandle> {
        let scene = self.current()?;
        scene.layers().rev().find_map(|layer| {
            let index = layer
                .iter()
                .enumerate()
                .rev()
                .find(|(_, clip)| clip.contains(px, py))
                .map(|(index, _)| index)?;
            Some(ClipHandle {
                scene: scene.name().to_owned(),
                layer: layer.name().to_owned(),
                index,
            })
        })
    }
}
