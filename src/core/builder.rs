//! Map builder for fluent API configuration
//!
//! Collects options, a tile source, a loader and a viewer transform, fills
//! in defaults for whatever was not given and validates the result.

use crate::{
    core::{
        config::{MapOptions, TileLoadingConfig},
        geo::{Location, Point},
        map::Map,
        viewport::{SimilarityTransform, ViewerTransform},
    },
    layers::tile::{TileLayer, TileLoader, TileSource, UrlTemplate},
    Result,
};

/// Builder for creating and configuring Map instances
pub struct MapBuilder {
    options: MapOptions,
    tile_source: Option<Box<dyn TileSource>>,
    loader: Option<Box<dyn TileLoader>>,
    transform: Option<Box<dyn ViewerTransform>>,
    size: Point,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self {
            options: MapOptions::default(),
            tile_source: None,
            loader: None,
            transform: None,
            size: Point::new(256.0, 256.0),
        }
    }

    /// Replace all options, e.g. ones read with [`MapOptions::from_json`]
    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    /// Configure tile loading behavior
    pub fn with_tile_config(mut self, config: TileLoadingConfig) -> Self {
        self.options.tile_loading = config;
        self
    }

    /// Set the tile source; takes precedence over a URL template
    pub fn with_tile_source(mut self, source: impl TileSource + 'static) -> Self {
        self.tile_source = Some(Box::new(source));
        self
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.options.url_template = Some(template.into());
        self
    }

    pub fn with_loader(mut self, loader: impl TileLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn with_transform(mut self, transform: impl ViewerTransform + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Canvas size in pixels
    pub fn with_size(mut self, size: Point) -> Self {
        self.size = size;
        self
    }

    pub fn with_initial_location(mut self, location: Location) -> Self {
        self.options.initial_location = Some(location);
        self
    }

    /// Build the map and move the camera to the initial location
    pub fn build(self) -> Result<Map> {
        self.options.validate()?;

        let source: Box<dyn TileSource> = match (self.tile_source, &self.options.url_template) {
            (Some(source), _) => source,
            (None, Some(template)) => Box::new(template_source(template)),
            (None, None) => Box::new(UrlTemplate::openstreetmap()),
        };
        let loader = match self.loader {
            Some(loader) => loader,
            None => default_loader()?,
        };
        let transform = self
            .transform
            .unwrap_or_else(|| Box::new(SimilarityTransform::identity()));

        let layer = TileLayer::new(self.options.tile_loading.clone(), source, loader)?;
        let mut map = Map::new(layer, transform, self.size);
        map.set_location(self.options.initial_location.unwrap_or_default())?;
        Ok(map)
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn template_source(template: &str) -> UrlTemplate {
    let source = UrlTemplate::new(template);
    if template.contains("{s}") {
        source.with_subdomains(["a", "b", "c"])
    } else {
        source
    }
}

#[cfg(all(feature = "render", feature = "tokio-runtime"))]
fn default_loader() -> Result<Box<dyn TileLoader>> {
    use crate::layers::tile::{AsyncTileLoader, HttpImageFetcher};
    Ok(Box::new(AsyncTileLoader::new(HttpImageFetcher::new()?)))
}

#[cfg(not(all(feature = "render", feature = "tokio-runtime")))]
fn default_loader() -> Result<Box<dyn TileLoader>> {
    Err(crate::MapError::InvalidConfig(
        "no tile loader given and the built-in HTTP loader needs the `render` and `tokio-runtime` features"
            .into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::tile::{ManualTileLoader, TileKey};
    use crate::rendering::context::RenderContext;
    use crate::MapError;

    #[test]
    fn test_build_applies_initial_location() {
        let map = MapBuilder::new()
            .with_loader(ManualTileLoader::new())
            .with_size(Point::new(512.0, 256.0))
            .with_initial_location(Location::new(0.25, 0.5, 0.5))
            .build()
            .unwrap();
        let location = map.location();
        assert!((location.x - 0.25).abs() < 1e-9);
        assert!((location.scale - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_default_location_shows_whole_world() {
        let loader = ManualTileLoader::new();
        let mut map = MapBuilder::new()
            .with_loader(loader.clone())
            .build()
            .unwrap();
        assert_eq!(map.location(), Location::default());

        map.draw(&mut RenderContext::new(256, 256));
        assert_eq!(loader.started_keys(), vec![TileKey::new(0, 0, 0)]);
    }

    #[test]
    fn test_url_template_option() {
        let source = template_source("https://{s}.example.com/{z}/{x}/{y}.png");
        assert_eq!(
            source.url(TileKey::new(1, 1, 0)),
            "https://b.example.com/1/1/0.png"
        );
    }

    #[test]
    fn test_invalid_options_fail_build() {
        let result = MapBuilder::new()
            .with_loader(ManualTileLoader::new())
            .with_tile_config(TileLoadingConfig {
                tile_size: 0,
                ..TileLoadingConfig::default()
            })
            .build();
        assert!(matches!(result, Err(MapError::InvalidConfig(_))));
    }
}
