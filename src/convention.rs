//! Key naming rules shared by the serializer and the reader.
//!
//! `<x:item id="1">` with `x` mapped to `ns` becomes `"ns.item": {"@id": "1"}`.
use crate::settings::WriterSettings;

use hashbrown::HashMap as FastMap;
use std::borrow::Cow;

const JSON_NAMESPACE_SEPARATOR: char = '.';
const XML_NAMESPACE_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyKind<'a> {
    Text,
    Attribute(Cow<'a, str>),
    Element(Cow<'a, str>),
}

#[derive(Debug, Clone)]
pub(crate) struct Convention {
    attribute_prefix: String,
    text_key: String,
    ignore_namespaces: bool,
    to_json: FastMap<String, String, ahash::RandomState>,
    to_xml: FastMap<String, String, ahash::RandomState>,
}

impl Convention {
    pub fn new(settings: &WriterSettings) -> Self {
        let hasher = ahash::RandomState::new();
        let mut to_json = FastMap::with_hasher(hasher.clone());
        let mut to_xml = FastMap::with_hasher(hasher);

        for (xml, json) in settings.namespaces() {
            to_json.insert(xml.clone(), json.clone());
            to_xml.insert(json.clone(), xml.clone());
        }

        Convention {
            attribute_prefix: settings.get_attribute_prefix().to_owned(),
            text_key: settings.get_text_key().to_owned(),
            ignore_namespaces: settings.should_ignore_namespaces(),
            to_json,
            to_xml,
        }
    }

    pub fn text_key(&self) -> &str {
        &self.text_key
    }

    pub fn element_key<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match name.split_once(XML_NAMESPACE_SEPARATOR) {
            Some((_, local)) if self.ignore_namespaces => Cow::Borrowed(local),
            Some((prefix, local)) => match self.to_json.get(prefix) {
                Some(json) => Cow::Owned(format!("{}{}{}", json, JSON_NAMESPACE_SEPARATOR, local)),
                None => Cow::Borrowed(name),
            },
            None => Cow::Borrowed(name),
        }
    }

    pub fn attribute_key(&self, name: &str) -> String {
        let key = self.element_key(name);
        let mut out = String::with_capacity(self.attribute_prefix.len() + key.len());
        out.push_str(&self.attribute_prefix);
        out.push_str(&key);
        out
    }

    /// Inverse of [`Convention::element_key`].
    pub fn element_name<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match key.split_once(JSON_NAMESPACE_SEPARATOR) {
            Some((prefix, local)) => match self.to_xml.get(prefix) {
                Some(xml) => Cow::Owned(format!("{}{}{}", xml, XML_NAMESPACE_SEPARATOR, local)),
                None => Cow::Borrowed(key),
            },
            None => Cow::Borrowed(key),
        }
    }

    /// Whether an element key would read back as the text key or an attribute.
    pub fn is_reserved(&self, key: &str) -> bool {
        !matches!(self.classify(key), KeyKind::Element(_))
    }

    /// With an empty attribute prefix attributes are indistinguishable from
    /// children, and every non-text key reads back as an element.
    pub fn classify<'a>(&self, key: &'a str) -> KeyKind<'a> {
        if key == self.text_key {
            return KeyKind::Text;
        }
        if !self.attribute_prefix.is_empty() {
            if let Some(name) = key.strip_prefix(self.attribute_prefix.as_str()) {
                return KeyKind::Attribute(self.element_name(name));
            }
        }
        KeyKind::Element(self.element_name(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convention() -> Convention {
        Convention::new(&WriterSettings::new().namespace("xs", "schema"))
    }

    #[test]
    fn test_mapped_namespace_round_trips() {
        let c = convention();

        assert_eq!(c.element_key("xs:element"), "schema.element");
        assert_eq!(c.element_name("schema.element"), "xs:element");
        assert_eq!(c.attribute_key("xs:type"), "@schema.type");
    }

    #[test]
    fn test_unmapped_names_pass_through() {
        let c = convention();

        assert_eq!(c.element_key("other:element"), "other:element");
        assert_eq!(c.element_key("plain"), "plain");
        assert_eq!(c.element_name("a.b"), "a.b");
    }

    #[test]
    fn test_ignored_namespaces_are_stripped() {
        let c = Convention::new(&WriterSettings::new().ignore_namespaces(true));

        assert_eq!(c.element_key("soap:Envelope"), "Envelope");
        assert_eq!(c.attribute_key("xsi:nil"), "@nil");
    }

    #[test]
    fn test_classify() {
        let c = convention();

        assert_eq!(c.classify("$"), KeyKind::Text);
        assert_eq!(c.classify("@id"), KeyKind::Attribute(Cow::Borrowed("id")));
        assert_eq!(
            c.classify("@schema.type"),
            KeyKind::Attribute(Cow::Owned("xs:type".to_owned()))
        );
        assert_eq!(c.classify("item"), KeyKind::Element(Cow::Borrowed("item")));
    }

    #[test]
    fn test_reserved_keys() {
        let c = convention();

        assert!(c.is_reserved("$"));
        assert!(c.is_reserved("@id"));
        assert!(!c.is_reserved("id"));
        assert!(!c.is_reserved("schema.element"));
        assert!(!Convention::new(&WriterSettings::new().attribute_prefix("")).is_reserved("@id"));
    }
}
