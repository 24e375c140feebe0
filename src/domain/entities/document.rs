//! Document tree model observed by the watcher.

/// Stable identity of an element for the lifetime of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ElementId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Where an image's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSourceKind {
    /// An `http`/`https` resource that can be fetched and fingerprinted.
    Remote,
    /// Inline or embedded data (`data:`, `blob:`, ...).
    Inline,
    /// No usable source.
    Missing,
}

/// An image element in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageElement {
    /// Element identity.
    pub id: ElementId,
    /// Value of the `src` attribute.
    pub src: String,
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
}

impl ImageElement {
    /// Creates an image element with unknown dimensions.
    #[must_use]
    pub fn new(id: impl Into<ElementId>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            width: 0,
            height: 0,
        }
    }

    /// Sets the rendered dimensions.
    #[must_use]
    pub const fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Classifies the `src` attribute.
    #[must_use]
    pub fn source_kind(&self) -> ImageSourceKind {
        let src = self.src.trim();
        if src.is_empty() {
            return ImageSourceKind::Missing;
        }
        match reqwest::Url::parse(src) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => ImageSourceKind::Remote,
            Ok(_) => ImageSourceKind::Inline,
            Err(_) => ImageSourceKind::Missing,
        }
    }
}

/// A node inserted into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    /// An image element.
    Image(ImageElement),
    /// Any other element, possibly containing images.
    Element {
        /// Tag name.
        tag: String,
        /// Child nodes in document order.
        children: Vec<DomNode>,
    },
    /// Text content.
    Text(String),
}

impl DomNode {
    /// Creates a container element.
    #[must_use]
    pub fn element(tag: impl Into<String>, children: Vec<DomNode>) -> Self {
        Self::Element {
            tag: tag.into(),
            children,
        }
    }

    /// Returns every image in this subtree, the node itself included, in
    /// document order.
    #[must_use]
    pub fn images(&self) -> Vec<&ImageElement> {
        let mut found = Vec::new();
        self.collect_images(&mut found);
        found
    }

    fn collect_images<'a>(&'a self, found: &mut Vec<&'a ImageElement>) {
        match self {
            Self::Image(image) => found.push(image),
            Self::Element { children, .. } => {
                for child in children {
                    child.collect_images(found);
                }
            }
            Self::Text(_) => {}
        }
    }
}

/// A change notification from the observed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A batch of subtrees was inserted.
    Inserted(Vec<DomNode>),
    /// The viewport scrolled.
    Scrolled,
}
