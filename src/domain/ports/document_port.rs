//! Observed document port definition.

use crate::domain::entities::ImageElement;

/// Port for enumerating the images currently in the document.
pub trait DocumentPort: Send + Sync {
    /// Returns the images a rescan should revisit.
    fn visible_images(&self) -> Vec<ImageElement>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Document whose image list tests can mutate.
    #[derive(Default)]
    pub struct MockDocument {
        images: Mutex<Vec<ImageElement>>,
        scans: AtomicUsize,
    }

    impl MockDocument {
        pub fn new(images: Vec<ImageElement>) -> Self {
            Self {
                images: Mutex::new(images),
                scans: AtomicUsize::new(0),
            }
        }

        pub fn push(&self, image: ImageElement) {
            self.images.lock().push(image);
        }

        /// Number of times the image list was enumerated.
        pub fn scan_count(&self) -> usize {
            self.scans.load(Ordering::SeqCst)
        }
    }

    impl DocumentPort for MockDocument {
        fn visible_images(&self) -> Vec<ImageElement> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.images.lock().clone()
        }
    }
}
