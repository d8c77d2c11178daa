use crate::layers::tile::types::TileImage;
use crate::traits::IDENTITY_MATRIX;

/// 2D canvas the render loop draws into.
///
/// Coordinates passed to [`DrawingBackend::clear`] are canvas pixels;
/// image rectangles are in whatever space the installed transform maps
/// from, which during a render pass is world space.
pub trait DrawingBackend {
    /// Canvas size in pixels
    fn size(&self) -> (u32, u32);

    fn clear(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Install an affine `[a, b, c, d, e, f]` matrix, replacing the current one
    fn set_transform(&mut self, matrix: [f64; 6]);

    fn draw_image(&mut self, image: &TileImage, x: f64, y: f64, width: f64, height: f64);

    fn reset_transform(&mut self) {
        self.set_transform(IDENTITY_MATRIX);
    }
}

/// Commands that can be issued to the render context
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    SetTransform([f64; 6]),
    DrawImage {
        image: TileImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// Backend that records commands instead of rasterizing them.
///
/// Hosts can replay the queue onto their own surface; tests inspect it.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    pub drawing_queue: Vec<DrawCommand>,
}

impl RenderContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            drawing_queue: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Get the current drawing queue
    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }

    /// Number of images drawn since the queue was last cleared
    pub fn images_drawn(&self) -> usize {
        self.drawing_queue
            .iter()
            .filter(|command| matches!(command, DrawCommand::DrawImage { .. }))
            .count()
    }

    /// Take the recorded commands, leaving the queue empty
    pub fn take_queue(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.drawing_queue)
    }

    /// Clear the drawing queue
    pub fn clear_queue(&mut self) {
        self.drawing_queue.clear();
    }
}

impl DrawingBackend for RenderContext {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.drawing_queue.push(DrawCommand::Clear {
            x,
            y,
            width,
            height,
        });
    }

    fn set_transform(&mut self, matrix: [f64; 6]) {
        self.drawing_queue.push(DrawCommand::SetTransform(matrix));
    }

    fn draw_image(&mut self, image: &TileImage, x: f64, y: f64, width: f64, height: f64) {
        self.drawing_queue.push(DrawCommand::DrawImage {
            image: image.clone(),
            x,
            y,
            width,
            height,
        });
    }
}
