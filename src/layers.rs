//! Named drawing layers
//!
//! `Layers` keeps a stack of equally sized layers keyed by name, the last one
//! in front. Creating the actual surface is left to a creator closure, so the
//! same bookkeeping works for any backend.

use tracing::warn;

/// Builds the surface for a layer from its name and dimensions
pub type LayerCreator<L> = Box<dyn Fn(&str, u32, u32) -> L + Send + Sync>;

pub const DEFAULT_WIDTH: u32 = 360;
pub const DEFAULT_HEIGHT: u32 = 240;
pub const DEFAULT_LAYER: &str = "main";

/// Plain description of a layer, produced by the default creator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Startup parameters of a `Layers` stack
pub struct LayersConfig<L> {
    width: u32,
    height: u32,
    layers: Vec<String>,
    creator: LayerCreator<L>,
}

impl Default for LayersConfig<LayerSpec> {
    fn default() -> Self {
        Self::new(|name, width, height| LayerSpec {
            name: name.to_string(),
            width,
            height,
        })
    }
}

impl<L> LayersConfig<L> {
    /// 360x240 layers with a single `main` layer, built by `creator`
    pub fn new<C>(creator: C) -> Self
    where
        C: Fn(&str, u32, u32) -> L + Send + Sync + 'static,
    {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            layers: vec![DEFAULT_LAYER.to_string()],
            creator: Box::new(creator),
        }
    }

    /// Size of every layer in pixels
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Initial layers, back to front
    pub fn layers<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.layers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the creator, possibly with one building another layer type
    pub fn layer_creator<M, C>(self, creator: C) -> LayersConfig<M>
    where
        C: Fn(&str, u32, u32) -> M + Send + Sync + 'static,
    {
        LayersConfig {
            width: self.width,
            height: self.height,
            layers: self.layers,
            creator: Box::new(creator),
        }
    }
}

/// Stack of named layers
pub struct Layers<L> {
    width: u32,
    height: u32,
    stack: Vec<(String, L)>,
    creator: LayerCreator<L>,
}

impl<L> Layers<L> {
    /// Builds the stack and creates every configured layer in order
    pub fn new(config: LayersConfig<L>) -> Self {
        let mut layers = Self {
            width: config.width,
            height: config.height,
            stack: Vec::new(),
            creator: config.creator,
        };
        for name in &config.layers {
            layers.add(name);
        }
        layers
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Adds a layer in front of the others.
    ///
    /// A name already in use is logged and left untouched.
    pub fn add(&mut self, name: &str) -> bool {
        if self.position(name).is_some() {
            warn!("Layers '{}' already exists", name);
            return false;
        }
        let layer = (self.creator)(name, self.width, self.height);
        self.stack.push((name.to_string(), layer));
        true
    }

    /// Removes a layer, handing it back so the caller can detach it
    pub fn remove(&mut self, name: &str) -> Option<L> {
        let index = self.position(name)?;
        Some(self.stack.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Option<&L> {
        self.stack
            .iter()
            .find(|(layer_name, _)| layer_name == name)
            .map(|(_, layer)| layer)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut L> {
        self.stack
            .iter_mut()
            .find(|(layer_name, _)| layer_name == name)
            .map(|(_, layer)| layer)
    }

    /// Layer names, back to front
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stack.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.stack.iter().position(|(layer_name, _)| layer_name == name)
    }
}
