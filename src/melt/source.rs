//! Forward-only streaming over the elements of an OSM XML document
//!
//! `ElementSource` pulls events from `quick_xml` through a single reusable
//! buffer and materializes only the element currently being captured. Each
//! element is handed out as an owned snapshot as soon as its end tag is read,
//! so memory stays bounded by the largest single element.

use crate::melt::types::{Child, Element, ElementKind};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use thiserror::Error;

/// Fatal errors raised while streaming the source document
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("malformed XML near byte {position}")]
    Xml {
        #[source]
        source: quick_xml::Error,
        position: usize,
    },
    #[error("<{element}> near byte {position} has no `{attribute}` attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        position: usize,
    },
    #[error("document ended inside an open <{kind}> element")]
    UnexpectedEof { kind: &'static str },
    #[error("document ended with {open} unclosed element(s)")]
    UnclosedElements { open: usize },
    #[error("document has no root element")]
    NoRootElement,
}

enum Step {
    Continue,
    Yield(Element),
    End,
}

/// Capture state, kept apart from the reader so events can borrow the buffer
struct Capture {
    kinds: Vec<ElementKind>,
    current: Option<Element>,
    /// Nesting depth below the captured element
    depth: usize,
    /// Elements open anywhere in the document
    open: usize,
    seen_root: bool,
}

impl Capture {
    fn wanted(&self, name: &[u8]) -> Option<ElementKind> {
        ElementKind::from_tag_name(name).filter(|kind| self.kinds.contains(kind))
    }

    fn handle(&mut self, event: Event<'_>, position: usize) -> Result<Step, SourceError> {
        match &event {
            Event::Start(_) => {
                self.open += 1;
                self.seen_root = true;
            }
            Event::Empty(_) => self.seen_root = true,
            Event::End(_) => self.open = self.open.saturating_sub(1),
            _ => {}
        }

        match event {
            Event::Start(start) => {
                if self.current.is_some() {
                    self.depth += 1;
                    self.push_child(&start, position)?;
                } else if let Some(kind) = self.wanted(start.name().as_ref()) {
                    self.current = Some(open_element(kind, &start, position)?);
                    self.depth = 0;
                }
                Ok(Step::Continue)
            }
            Event::Empty(start) => {
                if self.current.is_some() {
                    self.push_child(&start, position)?;
                    Ok(Step::Continue)
                } else if let Some(kind) = self.wanted(start.name().as_ref()) {
                    Ok(Step::Yield(open_element(kind, &start, position)?))
                } else {
                    Ok(Step::Continue)
                }
            }
            Event::End(_) if self.depth > 0 => {
                self.depth -= 1;
                Ok(Step::Continue)
            }
            Event::End(_) => Ok(self.current.take().map_or(Step::Continue, Step::Yield)),
            Event::Eof => match self.current.take() {
                Some(element) => Err(SourceError::UnexpectedEof {
                    kind: element.kind.as_str(),
                }),
                None if self.open > 0 => Err(SourceError::UnclosedElements { open: self.open }),
                None if !self.seen_root => Err(SourceError::NoRootElement),
                None => Ok(Step::End),
            },
            _ => Ok(Step::Continue),
        }
    }

    fn push_child(&mut self, start: &BytesStart<'_>, position: usize) -> Result<(), SourceError> {
        let Some(element) = self.current.as_mut() else {
            return Ok(());
        };

        match start.name().as_ref() {
            b"tag" => {
                let key = find_attribute(start, b"k", position)?;
                let value = find_attribute(start, b"v", position)?.unwrap_or_default();
                element.children.push(Child::Tag { key, value });
            }
            b"nd" => {
                let node_id = find_attribute(start, b"ref", position)?.ok_or(
                    SourceError::MissingAttribute {
                        element: "nd",
                        attribute: "ref",
                        position,
                    },
                )?;
                element.children.push(Child::NodeRef { node_id });
            }
            _ => {}
        }
        Ok(())
    }
}

fn open_element(
    kind: ElementKind,
    start: &BytesStart<'_>,
    position: usize,
) -> Result<Element, SourceError> {
    let mut element = Element::new(kind);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_error(e.into(), position))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| xml_error(e, position))?
            .into_owned();
        element.attributes.push((name, value));
    }
    Ok(element)
}

fn find_attribute(
    start: &BytesStart<'_>,
    name: &[u8],
    position: usize,
) -> Result<Option<String>, SourceError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_error(e.into(), position))?;
        if attr.key.as_ref() == name {
            let value = attr.unescape_value().map_err(|e| xml_error(e, position))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn xml_error(source: quick_xml::Error, position: usize) -> SourceError {
    SourceError::Xml { source, position }
}

/// Lazy, single-pass sequence of the document's elements of interest
///
/// ```rust
/// use osm_melt::melt::{ElementKind, ElementSource};
///
/// let xml = r#"<osm><node id="1"/><relation id="9"/><way id="2"><nd ref="1"/></way></osm>"#;
/// let kinds: Vec<_> = ElementSource::new(xml.as_bytes(), &[ElementKind::Node, ElementKind::Way])
///     .map(|element| element.map(|e| e.kind))
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(kinds, vec![ElementKind::Node, ElementKind::Way]);
/// ```
pub struct ElementSource<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    capture: Capture,
    done: bool,
}

impl<R: BufRead> ElementSource<R> {
    pub fn new(reader: R, kinds: &[ElementKind]) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.trim_text(true);

        ElementSource {
            reader,
            buf: Vec::new(),
            capture: Capture {
                kinds: kinds.to_vec(),
                current: None,
                depth: 0,
                open: 0,
                seen_root: false,
            },
            done: false,
        }
    }

    fn next_element(&mut self) -> Result<Option<Element>, SourceError> {
        loop {
            let position = self.reader.buffer_position();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|source| SourceError::Xml { source, position })?;
            let step = self.capture.handle(event, position)?;
            self.buf.clear();

            match step {
                Step::Continue => continue,
                Step::Yield(element) => return Ok(Some(element)),
                Step::End => return Ok(None),
            }
        }
    }
}

impl<R: BufRead> Iterator for ElementSource<R> {
    type Item = Result<Element, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_element() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
