//! Image generation port and URL validation.

use errand_types::error::ServiceError;

/// Port for the image generation backend. The live implementation calls
/// the OpenAI images API with a fixed model and size.
pub trait ImageGenerator: Send + Sync {
    /// Generate a single image for `prompt` and return its URL.
    fn generate(
        &self,
        prompt: &str,
        api_key: &str,
    ) -> impl std::future::Future<Output = Result<String, ServiceError>> + Send;
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Whether a URL plausibly points at an image: http(s) scheme and an image
/// file extension on the path. Query string and fragment are ignored.
pub fn is_image_url(url: &str) -> bool {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return false;
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or("");
    match file.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}
