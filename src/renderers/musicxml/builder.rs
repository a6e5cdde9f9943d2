//! Arena-backed XML document
//!
//! Nodes live in one `Vec` and are addressed by `NodeId`, so parts can be
//! built detached, spliced between parents, and rewritten in place by the
//! part-staff merge without fighting the borrow checker. Serialization goes
//! through `quick_xml::Writer`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::errors::{ExportError, ExportErrorKind, ExportResult};

/// Index of a node inside its `XmlDocument`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        text: Option<String>,
        children: Vec<NodeId>,
    },
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
}

/// Ordered XML tree with a single root
#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    doctype: Option<String>,
}

impl XmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document whose root element is `tag`
    pub fn with_root(tag: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.create_element(tag);
        doc.root = Some(root);
        doc
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make a detached element the document root
    pub fn set_root(&mut self, node: NodeId) {
        self.root = Some(node);
    }

    pub fn set_doctype(&mut self, doctype: &str) {
        self.doctype = Some(doctype.to_string());
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        })
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { data, parent: None });
        id
    }

    /// Append a new empty child element
    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let child = self.create_element(tag);
        self.append(parent, child);
        child
    }

    /// Append a new child element holding text
    pub fn text_element(&mut self, parent: NodeId, tag: &str, text: &str) -> NodeId {
        let child = self.element(parent, tag);
        self.set_text(child, text);
        child
    }

    /// Append a new child element with attributes and no content
    pub fn empty_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let child = self.element(parent, tag);
        for (name, value) in attrs {
            self.set_attr(child, name, value);
        }
        child
    }

    // ------------------------------------------------------------------
    // Node data
    // ------------------------------------------------------------------

    /// Element tag, `None` for comments
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Comment(_) => None,
        }
    }

    pub fn is_element(&self, node: NodeId, name: &str) -> bool {
        self.tag(node) == Some(name)
    }

    /// Set an attribute, replacing the value in place if it already exists
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeData::Comment(_) => None,
        }
    }

    /// Set text content; an element never holds both text and children
    pub fn set_text(&mut self, node: NodeId, value: &str) {
        if let NodeData::Element { text, children, .. } = &mut self.nodes[node.0].data {
            if children.is_empty() {
                *text = Some(value.to_string());
            }
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { text, .. } => text.as_deref(),
            NodeData::Comment(_) => None,
        }
    }

    // ------------------------------------------------------------------
    // Tree structure
    // ------------------------------------------------------------------

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match &self.nodes[node.0].data {
            NodeData::Element { children, .. } => children,
            NodeData::Comment(_) => &[],
        }
    }

    /// First child element with the given tag
    pub fn find_child(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|&child| self.is_element(child, tag))
    }

    /// All child elements with the given tag, in order
    pub fn find_children(&self, node: NodeId, tag: &str) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child, tag))
            .collect()
    }

    /// Text of the first child element with the given tag
    pub fn child_text(&self, node: NodeId, tag: &str) -> Option<&str> {
        self.find_child(node, tag).and_then(|child| self.text(child))
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_at(parent, len, child);
    }

    /// Insert `child` at `index` among the children of `parent`, detaching it first
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        if let NodeData::Element { children, text, .. } = &mut self.nodes[parent.0].data {
            *text = None;
            let index = index.min(children.len());
            children.insert(index, child);
            self.nodes[child.0].parent = Some(parent);
        }
    }

    /// Insert `child` before the first existing child whose tag is in `before`,
    /// or append it when none is present
    pub fn insert_before_first_of(&mut self, parent: NodeId, child: NodeId, before: &[&str]) {
        let position = self.children(parent).iter().position(|&c| {
            self.tag(c)
                .map(|tag| before.contains(&tag))
                .unwrap_or(false)
        });
        match position {
            Some(index) => self.insert_at(parent, index, child),
            None => self.append(parent, child),
        }
    }

    /// Remove `node` from its parent; the node stays in the arena
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            if let NodeData::Element { children, .. } = &mut self.nodes[parent.0].data {
                children.retain(|&c| c != node);
            }
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize with declaration, doctype, and `indent` spaces per level
    pub fn to_xml_string(&self, indent: usize) -> ExportResult<String> {
        let root = self.root.ok_or_else(|| {
            ExportError::new(ExportErrorKind::Serialization("document has no root".to_string()))
        })?;

        let mut writer = if indent > 0 {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', indent)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        if let Some(doctype) = &self.doctype {
            writer.write_event(Event::DocType(BytesText::from_escaped(doctype.as_str())))?;
        }
        self.write_node(&mut writer, root)?;

        let bytes = writer.into_inner().into_inner();
        let mut xml = String::from_utf8(bytes)
            .map_err(|e| ExportError::new(ExportErrorKind::Serialization(e.to_string())))?;
        xml.push('\n');
        Ok(xml)
    }

    fn write_node<W: std::io::Write>(&self, writer: &mut Writer<W>, node: NodeId) -> ExportResult<()> {
        match &self.nodes[node.0].data {
            NodeData::Comment(text) => {
                let padded = format!(" {} ", text.replace("--", "- -"));
                writer.write_event(Event::Comment(BytesText::from_escaped(padded)))?;
            }
            NodeData::Element { tag, attrs, text, children } => {
                let mut start = BytesStart::new(tag.as_str());
                for (name, value) in attrs {
                    start.push_attribute((name.as_str(), value.as_str()));
                }

                if let Some(text) = text {
                    writer.write_event(Event::Start(start))?;
                    writer.write_event(Event::Text(BytesText::new(text)))?;
                    writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
                } else if children.is_empty() {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    for &child in children {
                        self.write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
                }
            }
        }
        Ok(())
    }
}
