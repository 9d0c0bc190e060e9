use std::collections::HashMap;

pub const DEFAULT_DESCRIPTION: &str = "Detected object.";

const BUILTIN: &[(&str, &str)] = &[
    ("person", "A human being."),
    ("dog", "A loyal domesticated animal."),
    ("cat", "A small domesticated mammal."),
    ("car", "A motor vehicle used for transportation."),
    ("bicycle", "A human-powered two-wheeled vehicle."),
    ("motorcycle", "A two-wheeled motor vehicle."),
    ("bus", "A large passenger vehicle."),
    ("truck", "A vehicle for transporting goods."),
    ("laptop", "A portable computer."),
    ("cell phone", "A handheld communication device."),
];

/// Class name to one-sentence description. Built once at startup and shared
/// read-only between requests.
#[derive(Debug, Clone)]
pub struct DescriptionLookup {
    entries: HashMap<String, String>,
}

impl DescriptionLookup {
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN.iter().copied())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(name, description)| (name.to_string(), description.to_string()))
            .collect();
        Self { entries }
    }

    pub fn describe(&self, class_name: &str) -> &str {
        self.entries
            .get(class_name)
            .map(String::as_str)
            .unwrap_or(DEFAULT_DESCRIPTION)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_classes_have_descriptions() {
        let lookup = DescriptionLookup::builtin();
        assert_eq!(lookup.len(), 10);
        assert_eq!(lookup.describe("person"), "A human being.");
        assert_eq!(lookup.describe("cell phone"), "A handheld communication device.");
    }

    #[test]
    fn unknown_class_falls_back() {
        let lookup = DescriptionLookup::builtin();
        assert_eq!(lookup.describe("giraffe"), DEFAULT_DESCRIPTION);
        assert_eq!(lookup.describe(""), "Detected object.");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let lookup = DescriptionLookup::builtin();
        assert_eq!(lookup.describe("Person"), DEFAULT_DESCRIPTION);
    }
}
