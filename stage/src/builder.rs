use serde::Deserialize;

use crate::*;

/// Scene entry of the scene description JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SceneDesc {
    pub name: String,
    pub layers: Vec<LayerDesc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayerDesc {
    pub name: String,
    pub clips: Vec<ClipDesc>,
}

/// Clip template. Geometry fields are integer expressions over the builder parameters plus the
/// repeat index `i`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClipDesc {
    pub name: Option<String>,
    pub sprite: String,
    pub repeat: String,
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
}

/// Instantiates scene descriptions against one sprite sheet.
///
/// `params` usually holds the board width `w`, height `h` and scale `s`.
#[derive(Debug)]
pub struct SceneBuilder<'a> {
    sheet: &'a SpriteSheet,
    params: Params,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(sheet: &'a SpriteSheet, params: Params) -> Self {
        Self { sheet, params }
    }

    pub fn build_scene(&self, desc: &SceneDesc) -> Result<Scene> {
        let mut scene = Scene::new(&desc.name);
        for layer in &desc.layers {
            scene.add(self.build_layer(layer)?);
        }
        log::debug!(
            "Built scene '{}' with {} layers",
            desc.name,
            desc.layers.len()
        );
        Ok(scene)
    }

    pub fn build_layer(&self, desc: &LayerDesc) -> Result<Layer> {
        let mut layer = Layer::new(&desc.name);
        let mut params = self.params.clone();

        for clip in &desc.clips {
            let name = clip.name.as_deref().unwrap_or(&clip.sprite);
            if self.sheet.region(&clip.sprite).is_none() {
                return Err(StageError::SpriteNotFound {
                    sprite: clip.sprite.clone(),
                    clip: name.to_owned(),
                });
            }

            let repeat = match eval("repeat", &clip.repeat, &params)? {
                0 => 1,
                count => usize::try_from(count).map_err(|_| {
                    expression_error("repeat", &clip.repeat, ExprError::OutOfRange(count))
                })?,
            };

            for i in 0..repeat {
                params.set("i", i as i64);
                let scale = eval_extent("scale", "s", &params, 1)?;
                let x = eval_coord("x", &clip.x, &params, scale)?;
                let y = eval_coord("y", &clip.y, &params, scale)?;
                let width = eval_extent("width", &clip.width, &params, scale)?;
                let height = eval_extent("height", &clip.height, &params, scale)?;

                let built = if width == 0 {
                    Clip::from_grid(self.sheet, &clip.sprite, name, (x, y), scale)?
                } else {
                    Clip::nine_slice(
                        self.sheet,
                        &clip.sprite,
                        name,
                        (x, y),
                        (width, height),
                        scale,
                    )?
                };
                layer.add(built);
            }
            log::trace!("Layer '{}': {} x '{}'", desc.name, repeat, name);
        }

        Ok(layer)
    }
}

fn expression_error(field: &'static str, expr: &str, source: ExprError) -> StageError {
    StageError::Expression {
        field,
        expr: expr.to_owned(),
        source,
    }
}

fn eval(field: &'static str, expr: &str, params: &Params) -> Result<i64> {
    eval_int(expr, params).map_err(|err| expression_error(field, expr, err))
}

/// Logical coordinate whose on-screen value at `scale` still fits an `i32`.
fn eval_coord(field: &'static str, expr: &str, params: &Params, scale: u32) -> Result<i32> {
    let value = eval(field, expr, params)?;
    value
        .checked_mul(scale.max(1).into())
        .and_then(|scaled| i32::try_from(scaled).ok())
        .and_then(|_| i32::try_from(value).ok())
        .ok_or_else(|| expression_error(field, expr, ExprError::OutOfRange(value)))
}

/// Logical extent whose on-screen value at `scale` still fits a `u32`.
fn eval_extent(field: &'static str, expr: &str, params: &Params, scale: u32) -> Result<u32> {
    let value = eval(field, expr, params)?;
    value
        .checked_mul(scale.max(1).into())
        .and_then(|scaled| u32::try_from(scaled).ok())
        .and_then(|_| u32::try_from(value).ok())
        .ok_or_else(|| expression_error(field, expr, ExprError::OutOfRange(value)))
}
