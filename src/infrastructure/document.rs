//! Fixed document built from a list of image URLs.

use crate::domain::entities::ImageElement;
use crate::domain::ports::DocumentPort;

/// A document whose images are known up front; ids follow list order from 1.
#[derive(Debug, Default)]
pub struct StaticDocument {
    images: Vec<ImageElement>,
}

impl StaticDocument {
    /// Creates a document holding one image element per URL.
    #[must_use]
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let images = urls
            .into_iter()
            .zip(1u64..)
            .map(|(src, id)| ImageElement::new(id, src))
            .collect();
        Self { images }
    }
}

impl DocumentPort for StaticDocument {
    fn visible_images(&self) -> Vec<ImageElement> {
        self.images.clone()
    }
}
