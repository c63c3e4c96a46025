use crate::normalize::StreetRules;

/// Attributes projected into the `nodes` table, in column order
pub const NODE_FIELDS: &[&str] = &["id", "lat", "lon", "user", "uid", "version", "changeset", "timestamp"];

/// Attributes projected into the `ways` table, in column order
pub const WAY_FIELDS: &[&str] = &["id", "user", "uid", "version", "changeset", "timestamp"];

/// Columns of the `nodes_tags` and `ways_tags` tables
pub const TAG_FIELDS: &[&str] = &["id", "key", "value", "type"];

/// Columns of the `ways_nodes` table
pub const WAY_NODE_FIELDS: &[&str] = &["id", "node_id", "position"];

/// Kind of a top-level document element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Node,
    Way,
}

impl ElementKind {
    /// Map an XML tag name to an element kind
    pub fn from_tag_name(name: &[u8]) -> Option<Self> {
        match name {
            b"node" => Some(ElementKind::Node),
            b"way" => Some(ElementKind::Way),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
        }
    }
}

/// Child entry of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    /// `<tag k=".." v=".."/>`; `key` is `None` when the `k` attribute is missing
    Tag { key: Option<String>, value: String },
    /// `<nd ref=".."/>`
    NodeRef { node_id: String },
}

/// Owned snapshot of one document element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,

    /// Attributes in document order
    pub attributes: Vec<(String, String)>,

    /// `tag` and `nd` descendants in document order
    pub children: Vec<Child>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Element {
            kind,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.children.push(Child::Tag {
            key: Some(key.into()),
            value: value.into(),
        });
        self
    }

    pub fn with_node_ref(mut self, node_id: impl Into<String>) -> Self {
        self.children.push(Child::NodeRef { node_id: node_id.into() });
        self
    }

    /// Look up an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }
}

/// Projected attributes in schema order; absent attributes are omitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeRow(pub Vec<(String, String)>);

impl AttributeRow {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Values in schema order, as written to the sink
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One row of the `*_tags` tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    pub owner_id: String,
    pub key: String,
    pub value: String,
    pub tag_type: String,
}

impl TagRow {
    /// Fields in `id, key, value, type` order
    pub fn fields(&self) -> [&str; 4] {
        [
            self.owner_id.as_str(),
            self.key.as_str(),
            self.value.as_str(),
            self.tag_type.as_str(),
        ]
    }
}

/// One row of the `ways_nodes` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRefRow {
    pub owner_id: String,
    pub node_id: String,
    /// Zero-based index of the reference within its way
    pub position: usize,
}

impl NodeRefRow {
    /// Fields in `id, node_id, position` order
    pub fn fields(&self) -> [String; 3] {
        [self.owner_id.clone(), self.node_id.clone(), self.position.to_string()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub attributes: AttributeRow,
    pub tags: Vec<TagRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WayRecord {
    pub attributes: AttributeRow,
    pub node_refs: Vec<NodeRefRow>,
    pub tags: Vec<TagRow>,
}

/// The normalized rows of one element, ready for the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapedRecord {
    Node(NodeRecord),
    Way(WayRecord),
}

impl ShapedRecord {
    pub fn kind(&self) -> ElementKind {
        match self {
            ShapedRecord::Node(_) => ElementKind::Node,
            ShapedRecord::Way(_) => ElementKind::Way,
        }
    }

    pub fn tags(&self) -> &[TagRow] {
        match self {
            ShapedRecord::Node(node) => &node.tags,
            ShapedRecord::Way(way) => &way.tags,
        }
    }
}

/// Configuration for the melting process
#[derive(Debug, Clone)]
pub struct MeltConfig {
    /// Attributes projected for nodes, in column order
    pub node_fields: Vec<String>,

    /// Attributes projected for ways, in column order
    pub way_fields: Vec<String>,

    /// Header of the tag tables
    pub tag_fields: Vec<String>,

    /// Header of the way-node table
    pub way_node_fields: Vec<String>,

    /// Element kinds pulled from the document
    pub kinds: Vec<ElementKind>,

    /// Column delimiter for the CSV output
    pub delimiter: u8,

    /// Prefix each output file with a UTF-8 byte order mark
    pub write_bom: bool,

    /// Street vocabulary used for `street` tags
    pub street_rules: StreetRules,
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

impl Default for MeltConfig {
    fn default() -> Self {
        MeltConfig {
            node_fields: owned(NODE_FIELDS),
            way_fields: owned(WAY_FIELDS),
            tag_fields: owned(TAG_FIELDS),
            way_node_fields: owned(WAY_NODE_FIELDS),
            kinds: vec![ElementKind::Node, ElementKind::Way],
            delimiter: b';',
            write_bom: true,
            street_rules: StreetRules::default(),
        }
    }
}
