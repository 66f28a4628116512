//! Free-form metadata carried by op-data for file-format round trips.
//!
//! Reference: OCIO FormatMetadataImpl
//!
//! The renderer never reads this; readers populate it and writers serialize
//! it back, so it must survive read -> write -> read unchanged.

/// A free-form id/name/attribute tree attached to each op-data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatMetadata {
    /// Element id (CLF/CTF `id` attribute).
    pub id: String,
    /// Element name.
    pub name: String,
    /// Attribute key/value pairs, in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Child elements (e.g. `Description` entries), in document order.
    pub children: Vec<FormatMetadata>,
}

impl FormatMetadata {
    /// An empty metadata bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata with an id only.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Appends an attribute, preserving insertion order.
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    /// Appends a named child element carrying a text value as its id.
    pub fn add_child(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.children.push(FormatMetadata {
            id: text.into(),
            name: name.into(),
            ..Self::default()
        });
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
            && self.name.is_empty()
            && self.attributes.is_empty()
            && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_structurally() {
        let mut md = FormatMetadata::with_id("cc0001");
        md.add_attribute("inBitDepth", "32f");
        md.add_child("Description", "scene grade");

        let copy = md.clone();
        assert_eq!(md, copy);
        assert!(!md.is_empty());
    }

    #[test]
    fn default_is_empty() {
        assert!(FormatMetadata::new().is_empty());
    }
}
