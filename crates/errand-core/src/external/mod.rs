//! External service execution: image generation, generic HTTP, blockchain
//! stubs, and MCP actions, behind one dispatching handler.

pub mod handler;
pub mod http;
pub mod image;

pub use handler::{DefaultServiceHandler, ExternalServiceHandler};
pub use http::{HttpDispatcher, HttpRequestSpec};
pub use image::{ImageGenerator, is_image_url};
