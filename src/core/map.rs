use crate::{
    core::{
        bounds::{Bounds, Margin},
        geo::{Location, Point},
        guard::DrawGuard,
        viewport::{visible_area, Constraint, ViewerTransform},
    },
    layers::tile::TileLayer,
    rendering::context::DrawingBackend,
    MapError, Result,
};

/// Result of a render pass request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Another pass held the draw guard; nothing was drawn
    Skipped,
    Drawn(DrawStats),
}

impl DrawOutcome {
    pub fn stats(&self) -> Option<&DrawStats> {
        match self {
            DrawOutcome::Drawn(stats) => Some(stats),
            DrawOutcome::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Frame number of the pass
    pub frame: u64,
    pub zoom: u8,
    /// In-grid tiles looked up
    pub requested: usize,
    /// Tiles with a complete image that were drawn
    pub drawn: usize,
    /// Tiles evicted after the pass
    pub evicted: usize,
}

type LocationListener = Box<dyn FnMut(Location) + Send>;

/// A tiled raster view: one tile layer seen through a viewer transform
pub struct Map {
    layer: TileLayer,
    transform: Box<dyn ViewerTransform>,
    size: Point,
    draw_guard: DrawGuard,
    needs_redraw: bool,
    location_listener: Option<LocationListener>,
}

impl Map {
    pub fn new(layer: TileLayer, transform: Box<dyn ViewerTransform>, size: Point) -> Self {
        Self {
            layer,
            transform,
            size,
            draw_guard: DrawGuard::new(),
            needs_redraw: true,
            location_listener: None,
        }
    }

    /// Run one render pass.
    ///
    /// Clears the canvas, draws every loaded tile of the visible range at
    /// its world rectangle and requests the missing ones, then closes the
    /// frame (which may evict tiles). A call made while another pass holds
    /// the draw guard is dropped.
    pub fn draw(&mut self, canvas: &mut dyn DrawingBackend) -> DrawOutcome {
        let guard = self.draw_guard.clone();
        let Some(_token) = guard.try_enter() else {
            log::trace!("draw skipped, pass already in progress");
            return DrawOutcome::Skipped;
        };

        let (width, height) = canvas.size();
        self.size = Point::new(width as f64, height as f64);

        canvas.reset_transform();
        canvas.clear(0.0, 0.0, self.size.x, self.size.y);
        canvas.set_transform(self.transform.canvas_matrix());

        let area = visible_area(
            self.transform.as_ref(),
            self.size,
            self.layer.config().tile_size,
        );

        let mut requested = 0;
        let mut drawn = 0;
        if let Some(range) = area.tiles.clamp_to_grid() {
            for key in range.keys() {
                requested += 1;
                let image = self
                    .layer
                    .get_tile(key)
                    .and_then(|record| record.image())
                    .filter(|image| image.is_complete());
                if let Some(image) = image {
                    let rect = key.world_rect();
                    canvas.draw_image(image, rect.min.x, rect.min.y, rect.width(), rect.height());
                    drawn += 1;
                }
            }
        }

        canvas.reset_transform();

        let frame = self.layer.frame();
        let evicted = self.layer.finish_frame();
        self.needs_redraw = false;

        DrawOutcome::Drawn(DrawStats {
            frame,
            zoom: area.zoom,
            requested,
            drawn,
            evicted,
        })
    }

    /// Pump finished loads and redraw if anything changed.
    ///
    /// A newly loaded tile, a transform change or [`Map::request_redraw`]
    /// triggers a pass. Returns `None` when no pass was needed.
    pub fn update(&mut self, canvas: &mut dyn DrawingBackend) -> Option<DrawOutcome> {
        let summary = self.layer.process_completions();
        if summary.loaded > 0 {
            self.needs_redraw = true;
        }

        if self.transform.take_changed() {
            self.needs_redraw = true;
            self.notify_location();
        }

        if !self.needs_redraw {
            return None;
        }
        Some(self.draw(canvas))
    }

    /// Ask for a pass on the next [`Map::update`]
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Current camera: world midpoint of the canvas' horizontal center line
    /// and the world length of that line
    pub fn location(&self) -> Location {
        let (left, right) = self.center_line();
        let left = self.transform.world_pos_from_viewer_pos(left);
        let right = self.transform.world_pos_from_viewer_pos(right);
        let center = (left + right).scale(0.5);
        Location::new(center.x, center.y, left.distance_to(&right))
    }

    /// Move the camera so the canvas' horizontal center line spans
    /// `location.scale` world units around `location`
    pub fn set_location(&mut self, location: Location) -> Result<()> {
        if !location.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "location must be finite with a positive scale: {:?}",
                location
            )));
        }

        let (left, right) = self.center_line();
        let half = location.scale / 2.0;
        self.transform.process_constraints(&[
            Constraint::new(left, Point::new(location.x - half, location.y)),
            Constraint::new(right, Point::new(location.x + half, location.y)),
        ]);
        self.needs_redraw = true;
        Ok(())
    }

    /// Frame a set of world points with the canvas aspect ratio
    pub fn fit_points<I>(&mut self, points: I, margin: impl Into<Margin>) -> Result<()>
    where
        I: IntoIterator<Item = Point>,
    {
        let bounds = Bounds::from_points(points)
            .ok_or_else(|| MapError::InvalidCoordinates("no points to fit".into()))?;
        let aspect_ratio = Some(self.size.x / self.size.y).filter(|r| r.is_finite() && *r > 0.0);
        self.set_location(bounds.location(aspect_ratio, margin))
    }

    /// Change the canvas size used for location math before the next pass
    pub fn resize(&mut self, size: Point) {
        if self.size != size {
            self.size = size;
            self.needs_redraw = true;
        }
    }

    pub fn size(&self) -> Point {
        self.size
    }

    /// Called with the new location whenever [`Map::update`] sees a
    /// transform change
    pub fn set_location_listener<F>(&mut self, listener: F)
    where
        F: FnMut(Location) + Send + 'static,
    {
        self.location_listener = Some(Box::new(listener));
    }

    /// Shared handle to the re-entrancy guard
    pub fn draw_guard(&self) -> &DrawGuard {
        &self.draw_guard
    }

    pub fn tile_layer(&self) -> &TileLayer {
        &self.layer
    }

    pub fn transform(&self) -> &dyn ViewerTransform {
        self.transform.as_ref()
    }

    /// Feed gesture constraints to the transform
    pub fn process_constraints(&mut self, constraints: &[Constraint]) {
        self.transform.process_constraints(constraints);
    }

    /// Number of completed render passes
    pub fn frame_count(&self) -> u64 {
        self.layer.frame()
    }

    fn center_line(&self) -> (Point, Point) {
        let mid_y = self.size.y / 2.0;
        (Point::new(0.0, mid_y), Point::new(self.size.x, mid_y))
    }

    fn notify_location(&mut self) {
        let location = self.location();
        if let Some(listener) = self.location_listener.as_mut() {
            listener(location);
        }
    }
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("layer", &self.layer)
            .field("size", &self.size)
            .field("needs_redraw", &self.needs_redraw)
            .finish()
    }
}
