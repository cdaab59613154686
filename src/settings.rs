use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// What to do with a node that holds both children and a scalar value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedContentPolicy {
    /// Keep the value, drop the children and log a warning.
    #[default]
    PreferValue,
    /// Fail with an encoding error.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    /// Hint-driven array detection when set, legacy overwrite semantics otherwise.
    use_array_hints: bool,
    /// WHATWG label of the text encoding used for output and reader input.
    default_encoding: String,
    attribute_prefix: String,
    text_key: String,
    drop_root_element: bool,
    ignore_namespaces: bool,
    /// XML prefix -> JSON prefix.
    namespaces: BTreeMap<String, String>,
    /// Element names reported as collection members when reading XML.
    serialize_as_array: Vec<String>,
    mixed_content: MixedContentPolicy,
    indent: bool,
}

impl Default for WriterSettings {
    fn default() -> Self {
        WriterSettings {
            use_array_hints: true,
            default_encoding: "utf-8".to_owned(),
            attribute_prefix: "@".to_owned(),
            text_key: "$".to_owned(),
            drop_root_element: false,
            ignore_namespaces: false,
            namespaces: BTreeMap::new(),
            serialize_as_array: Vec::new(),
            mixed_content: MixedContentPolicy::default(),
            indent: false,
        }
    }
}

impl WriterSettings {
    pub fn new() -> Self {
        WriterSettings::default()
    }

    /// Loads settings from a JSON object; missing keys keep their defaults.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn use_array_hints(mut self, use_array_hints: bool) -> Self {
        self.use_array_hints = use_array_hints;
        self
    }

    pub fn default_encoding(mut self, label: impl Into<String>) -> Self {
        self.default_encoding = label.into();
        self
    }

    pub fn attribute_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.attribute_prefix = prefix.into();
        self
    }

    pub fn text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    pub fn drop_root_element(mut self, drop_root_element: bool) -> Self {
        self.drop_root_element = drop_root_element;
        self
    }

    pub fn ignore_namespaces(mut self, ignore_namespaces: bool) -> Self {
        self.ignore_namespaces = ignore_namespaces;
        self
    }

    /// Maps the XML namespace prefix `xml_prefix` to `json_prefix`, so that
    /// `xml_prefix:name` is keyed as `json_prefix.name`.
    pub fn namespace(
        mut self,
        xml_prefix: impl Into<String>,
        json_prefix: impl Into<String>,
    ) -> Self {
        self.namespaces.insert(xml_prefix.into(), json_prefix.into());
        self
    }

    pub fn serialize_as_array(mut self, name: impl Into<String>) -> Self {
        self.serialize_as_array.push(name.into());
        self
    }

    pub fn mixed_content(mut self, policy: MixedContentPolicy) -> Self {
        self.mixed_content = policy;
        self
    }

    pub fn indent(mut self, pretty: bool) -> Self {
        self.indent = pretty;
        self
    }

    pub fn should_use_array_hints(&self) -> bool {
        self.use_array_hints
    }

    pub fn encoding_label(&self) -> &str {
        &self.default_encoding
    }

    pub fn get_attribute_prefix(&self) -> &str {
        &self.attribute_prefix
    }

    pub fn get_text_key(&self) -> &str {
        &self.text_key
    }

    pub fn should_drop_root_element(&self) -> bool {
        self.drop_root_element
    }

    pub fn should_ignore_namespaces(&self) -> bool {
        self.ignore_namespaces
    }

    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    pub fn collection_names(&self) -> &[String] {
        &self.serialize_as_array
    }

    pub fn get_mixed_content(&self) -> MixedContentPolicy {
        self.mixed_content
    }

    pub fn should_indent(&self) -> bool {
        self.indent
    }

    /// Checks the settings that would make the output ambiguous.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.text_key.is_empty() {
            return Err("`text_key` must not be empty".to_owned());
        }
        if self.text_key == self.attribute_prefix {
            return Err(format!(
                "`text_key` and `attribute_prefix` are both `{}`",
                self.text_key
            ));
        }
        if let Some((xml, json)) = self
            .namespaces
            .iter()
            .find(|(xml, json)| xml.is_empty() || json.is_empty() || json.contains('.'))
        {
            return Err(format!(
                "invalid namespace mapping `{}` -> `{}`",
                xml, json
            ));
        }
        Ok(())
    }
}
