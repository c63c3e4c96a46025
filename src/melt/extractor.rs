use crate::melt::types::{
    AttributeRow, Child, Element, ElementKind, MeltConfig, NodeRecord, NodeRefRow, ShapedRecord,
    TagRow, WayRecord,
};
use crate::normalize::{normalize_postal_code, Normalization, StreetLedger};
use log::{debug, warn};

/// Type assigned to tags whose key carries no `type:` prefix
pub const REGULAR_TYPE: &str = "regular";

const KEY_SEPARATOR: char = ':';

/// Shapes document elements into normalized table rows
pub struct OsmMelter {
    config: MeltConfig,
}

impl OsmMelter {
    pub fn new(config: MeltConfig) -> Self {
        OsmMelter { config }
    }

    pub fn config(&self) -> &MeltConfig {
        &self.config
    }

    /// Shape one element into the rows for its tables
    ///
    /// `ledger` collects street prefixes that could not be normalized.
    pub fn shape(&self, element: &Element, ledger: &mut StreetLedger) -> ShapedRecord {
        if element.id().is_none() {
            warn!("<{}> element without an id attribute", element.kind.as_str());
        }

        match element.kind {
            ElementKind::Node => ShapedRecord::Node(NodeRecord {
                attributes: project_attributes(element, &self.config.node_fields),
                tags: self.extract_tags(element, ledger),
            }),
            ElementKind::Way => ShapedRecord::Way(WayRecord {
                attributes: project_attributes(element, &self.config.way_fields),
                node_refs: extract_node_refs(element),
                tags: self.extract_tags(element, ledger),
            }),
        }
    }

    /// Turn the element's `tag` children into tag rows
    ///
    /// Tags without a key are skipped and postcodes that cannot be repaired
    /// are dropped.
    pub fn extract_tags(&self, element: &Element, ledger: &mut StreetLedger) -> Vec<TagRow> {
        let owner_id = element.id().unwrap_or_default();
        let mut rows = Vec::new();

        for child in &element.children {
            let (raw_key, value) = match child {
                Child::Tag { key: Some(key), value } => (key, value),
                Child::Tag { key: None, .. } => {
                    debug!("skipping tag without key on {}", owner_id);
                    continue;
                }
                Child::NodeRef { .. } => continue,
            };

            let (tag_type, key) = split_key(raw_key);

            let normalization = match key {
                "street" => self.config.street_rules.normalize(value, ledger),
                "postcode" => normalize_postal_code(value),
                _ => Normalization::Unchanged,
            };
            let Some(value) = normalization.apply(value.clone()) else {
                debug!("dropping unrepairable postcode {:?} on {}", value, owner_id);
                continue;
            };

            let tag_type = match tag_type {
                "address" => "addr",
                other => other,
            };

            rows.push(TagRow {
                owner_id: owner_id.to_string(),
                key: key.to_string(),
                value,
                tag_type: tag_type.to_string(),
            });
        }

        rows
    }
}

/// Pick the declared attributes present on the element, in field order
pub fn project_attributes(element: &Element, fields: &[String]) -> AttributeRow {
    AttributeRow(
        fields
            .iter()
            .filter_map(|field| {
                element
                    .attribute(field)
                    .map(|value| (field.clone(), value.to_string()))
            })
            .collect(),
    )
}

/// Split `type:key` on the first separator; keys without one are `regular`
pub fn split_key(raw_key: &str) -> (&str, &str) {
    match raw_key.split_once(KEY_SEPARATOR) {
        Some((tag_type, key)) => (tag_type, key),
        None => (REGULAR_TYPE, raw_key),
    }
}

/// The way's node references with their zero-based positions
pub fn extract_node_refs(element: &Element) -> Vec<NodeRefRow> {
    let owner_id = element.id().unwrap_or_default();
    element
        .children
        .iter()
        .filter_map(|child| match child {
            Child::NodeRef { node_id } => Some(node_id),
            Child::Tag { .. } => None,
        })
        .enumerate()
        .map(|(position, node_id)| NodeRefRow {
            owner_id: owner_id.to_string(),
            node_id: node_id.clone(),
            position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melter() -> OsmMelter {
        OsmMelter::new(MeltConfig::default())
    }

    fn node(id: &str) -> Element {
        Element::new(ElementKind::Node).with_attribute("id", id)
    }

    fn tag(owner: &str, key: &str, value: &str, tag_type: &str) -> TagRow {
        TagRow {
            owner_id: owner.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            tag_type: tag_type.to_string(),
        }
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("name"), ("regular", "name"));
        assert_eq!(split_key("addr:street"), ("addr", "street"));
        assert_eq!(split_key("name:pt:BR"), ("name", "pt:BR"));
        assert_eq!(split_key(":x"), ("", "x"));
    }

    #[test]
    fn test_project_attributes_keeps_schema_order() {
        let element = Element::new(ElementKind::Node)
            .with_attribute("lon", "-46.6")
            .with_attribute("visible", "true")
            .with_attribute("id", "1")
            .with_attribute("lat", "-23.5");
        let config = MeltConfig::default();

        let row = project_attributes(&element, &config.node_fields);
        let values: Vec<_> = row.values().collect();

        assert_eq!(values, vec!["1", "-23.5", "-46.6"]);
        assert_eq!(row.get("visible"), None);
        assert_eq!(row.get("user"), None);
    }

    #[test]
    fn test_compound_keys() {
        let element = node("1")
            .with_tag("name", "Padaria")
            .with_tag("addr:city", "São Paulo")
            .with_tag("address:housenumber", "100")
            .with_tag("name:pt:BR", "Padaria");
        let mut ledger = StreetLedger::new();

        let rows = melter().extract_tags(&element, &mut ledger);

        assert_eq!(
            rows,
            vec![
                tag("1", "name", "Padaria", "regular"),
                tag("1", "city", "São Paulo", "addr"),
                tag("1", "housenumber", "100", "addr"),
                tag("1", "pt:BR", "Padaria", "name"),
            ]
        );
        assert!(rows.iter().all(|r| !r.key.is_empty()));
    }

    #[test]
    fn test_street_values_are_normalized() {
        let element = node("1")
            .with_tag("addr:street", "Av. Paulista")
            .with_tag("address:street", "Rua XV de Novembro")
            .with_tag("addr:street", "caminho do Sol");
        let mut ledger = StreetLedger::new();

        let rows = melter().extract_tags(&element, &mut ledger);

        assert_eq!(rows[0], tag("1", "street", "Avenida Paulista", "addr"));
        assert_eq!(rows[1], tag("1", "street", "Rua XV de Novembro", "addr"));
        assert_eq!(rows[2], tag("1", "street", "Caminho do Sol", "addr"));
        assert_eq!(ledger.count("Caminho"), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_postcodes_are_repaired_or_dropped() {
        let element = node("1")
            .with_tag("addr:postcode", "01310930")
            .with_tag("addr:postcode", "013109301")
            .with_tag("addr:postcode", "01310")
            .with_tag("addr:postcode", "01310-930")
            .with_tag("name", "after");
        let mut ledger = StreetLedger::new();

        let rows = melter().extract_tags(&element, &mut ledger);

        assert_eq!(
            rows,
            vec![
                tag("1", "postcode", "01310-930", "addr"),
                tag("1", "postcode", "01310-000", "addr"),
                tag("1", "postcode", "01310-930", "addr"),
                tag("1", "name", "after", "regular"),
            ]
        );
    }

    #[test]
    fn test_tags_without_key_are_skipped() {
        let mut element = node("1").with_tag("a", "1");
        element.children.push(Child::Tag {
            key: None,
            value: "orphan".to_string(),
        });
        let element = element.with_tag("b", "2");
        let mut ledger = StreetLedger::new();

        let rows = melter().extract_tags(&element, &mut ledger);
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();

        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_node_refs_positions() {
        let way = Element::new(ElementKind::Way)
            .with_attribute("id", "10")
            .with_node_ref("5")
            .with_tag("highway", "residential")
            .with_node_ref("6")
            .with_node_ref("7")
            .with_node_ref("5");

        let refs = extract_node_refs(&way);
        let positions: Vec<_> = refs.iter().map(|r| r.position).collect();
        let ids: Vec<_> = refs.iter().map(|r| r.node_id.as_str()).collect();

        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert_eq!(ids, vec!["5", "6", "7", "5"]);
        assert!(refs.iter().all(|r| r.owner_id == "10"));
    }

    #[test]
    fn test_shape_node() {
        let element = node("1")
            .with_attribute("lat", "-23.5")
            .with_attribute("lon", "-46.6")
            .with_tag("addr:postcode", "01310930");
        let mut ledger = StreetLedger::new();

        let record = melter().shape(&element, &mut ledger);

        assert_eq!(record.kind(), ElementKind::Node);
        let ShapedRecord::Node(node) = record else {
            panic!("expected node record");
        };
        assert_eq!(node.attributes.values().collect::<Vec<_>>(), vec!["1", "-23.5", "-46.6"]);
        assert_eq!(node.tags, vec![tag("1", "postcode", "01310-930", "addr")]);
    }

    #[test]
    fn test_shape_way() {
        let element = Element::new(ElementKind::Way)
            .with_attribute("id", "10")
            .with_attribute("lat", "0.0")
            .with_attribute("user", "ana")
            .with_node_ref("1")
            .with_node_ref("2")
            .with_tag("addr:street", "R. Augusta");
        let mut ledger = StreetLedger::new();

        let record = melter().shape(&element, &mut ledger);

        let ShapedRecord::Way(way) = record else {
            panic!("expected way record");
        };
        // `lat` is not a way field
        assert_eq!(way.attributes.values().collect::<Vec<_>>(), vec!["10", "ana"]);
        assert_eq!(way.node_refs.len(), 2);
        assert_eq!(way.tags, vec![tag("10", "street", "Rua Augusta", "addr")]);
    }
}
