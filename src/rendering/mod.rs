pub mod context;

// Re-export main types
pub use context::{DrawCommand, DrawingBackend, RenderContext};
