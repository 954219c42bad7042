//! Name/value attribute sets (`instance_attributes`, `meta_attributes`, ...).

use crate::xml::Element;

/// An ordered set of unique name/value pairs.
///
/// Order is kept for stable rendering but ignored by equality, since the
/// CIB treats nvpairs within a set as unordered.
#[derive(Debug, Clone, Default, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs; a repeated name overwrites the earlier value.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut attrs = Self::new();
        for (name, value) in pairs {
            attrs.set(name, value);
        }
        attrs
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(pos).1)
    }

    /// Overlay `other` onto `self`.
    pub fn merge(&mut self, other: &Attributes) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Render as `<tag id="set_id">` with one nvpair per entry.
    pub fn to_set_element(&self, tag: &str, set_id: &str) -> Element {
        let mut set = Element::new(tag).with_attr("id", set_id);
        for (name, value) in self.iter() {
            set.push(
                Element::new("nvpair")
                    .with_attr("id", format!("{set_id}-{name}"))
                    .with_attr("name", name)
                    .with_attr("value", value),
            );
        }
        set
    }

    /// Read the nvpairs of an attribute set element.
    pub fn from_set_element(set: &Element) -> Self {
        Self::from_pairs(set.children_named("nvpair").filter_map(|nv| {
            let name = nv.attr("name")?;
            Some((name.to_string(), nv.attr("value").unwrap_or_default().to_string()))
        }))
    }

    /// Merge every `tag` set directly under `parent`, later sets winning.
    pub fn from_children(parent: &Element, tag: &str) -> Self {
        let mut attrs = Self::new();
        for set in parent.children_named(tag) {
            attrs.merge(&Self::from_set_element(set));
        }
        attrs
    }

    /// Render the attributes as element attributes of `element`.
    pub fn apply_to(&self, element: &mut Element) {
        for (name, value) in self.iter() {
            element.set_attr(name, value);
        }
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(n, v)| other.get(n) == Some(v))
    }
}

impl FromIterator<(String, String)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_equality_ignores_order() {
        assert_eq!(attrs(&[("a", "1"), ("b", "2")]), attrs(&[("b", "2"), ("a", "1")]));
        assert_ne!(attrs(&[("a", "1")]), attrs(&[("a", "2")]));
        assert_ne!(attrs(&[("a", "1")]), attrs(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_set_element_ids() {
        let set = attrs(&[("ip", "10.0.0.1")])
            .to_set_element("instance_attributes", "vip-instance_attributes");
        let nvpair = &set.children[0];
        assert_eq!(nvpair.id(), Some("vip-instance_attributes-ip"));
        assert_eq!(nvpair.attr("value"), Some("10.0.0.1"));
        assert_eq!(Attributes::from_set_element(&set), attrs(&[("ip", "10.0.0.1")]));
    }

    #[test]
    fn test_merge_overlays() {
        let mut base = attrs(&[("a", "1"), ("b", "2")]);
        base.merge(&attrs(&[("b", "3"), ("c", "4")]));
        assert_eq!(base, attrs(&[("a", "1"), ("b", "3"), ("c", "4")]));
    }
}
