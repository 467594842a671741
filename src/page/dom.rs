// src/page/dom.rs

//! Arena-backed document tree the slots render into.
//!
//! Nodes are never freed; a detached node simply has no parent. A page
//! session is short-lived, so the arena only grows by what the ad scripts
//! write.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        style: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            body: NodeId(0),
        };
        doc.body = doc.create_element("body");
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            style: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].data, NodeData::Element { .. })
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    pub fn child_element_count(&self, node: NodeId) -> usize {
        self.children(node).iter().filter(|c| self.is_element(**c)).count()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == node)?;
        siblings.get(pos + 1).copied()
    }

    /// True when the node is reachable from `<body>`.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == self.body {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `child` before `reference`; appends when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|c| *c == reference) {
            Some(pos) => children.insert(pos, child),
            None => children.push(child),
        }
    }

    pub fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// `textContent =` semantics: replaces all children with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.clear_children(node);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node);
        }
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for child in &self.nodes[node.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { style, .. } => style.get(property).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let NodeData::Element { style, .. } = &mut self.nodes[node.0].data {
            style.insert(property.to_string(), value.to_string());
        }
    }

    pub fn is_display_none(&self, node: NodeId) -> bool {
        self.style(node, "display") == Some("none")
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let list = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &list);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(existing) = self.attribute(node, "class") else {
            return;
        };
        let list = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &list);
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut stack = vec![self.body];
        while let Some(node) = stack.pop() {
            if self.attribute(node, "id") == Some(id) {
                return Some(node);
            }
            stack.extend(self.children(node).iter().rev());
        }
        None
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.serialize(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize(node, &mut out);
        out
    }

    fn serialize(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => {
                let raw = self
                    .parent(node)
                    .and_then(|p| self.tag(p))
                    .is_some_and(|t| t == "script" || t == "style");
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeData::Element { tag, attrs, style } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
                }
                if !style.is_empty() {
                    let inline = style
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, v))
                        .collect::<Vec<_>>()
                        .join("; ");
                    out.push_str(&format!(" style=\"{}\"", escape_attr(&inline)));
                }
                out.push('>');
                for child in &self.nodes[node.0].children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_reparents_and_siblings_follow_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.create_element("div");
        let b = doc.create_element("span");
        let container = doc.create_element("section");
        doc.append_child(body, a);
        doc.append_child(body, b);
        doc.append_child(body, container);
        assert_eq!(doc.next_sibling(a), Some(b));

        doc.append_child(container, b);
        assert_eq!(doc.next_sibling(a), Some(container));
        assert_eq!(doc.parent(b), Some(container));
        assert_eq!(doc.children(body), &[a, container]);
    }

    #[test]
    fn insert_before_places_node_ahead_of_reference() {
        let mut doc = Document::new();
        let body = doc.body();
        let marker = doc.create_element("div");
        let script = doc.create_element("script");
        doc.append_child(body, marker);
        doc.append_child(body, script);
        let written = doc.create_element("ins");
        doc.insert_before(body, written, script);
        assert_eq!(doc.children(body), &[marker, written, script]);
    }

    #[test]
    fn serializes_text_and_attributes() {
        let mut doc = Document::new();
        let div = doc.create_element("DIV");
        doc.set_attribute(div, "id", "top-ad-content");
        doc.set_text(div, "Fish & <chips>");
        assert_eq!(doc.tag(div), Some("div"));
        assert_eq!(doc.text_content(div), "Fish & <chips>");
        assert_eq!(
            doc.outer_html(div),
            "<div id=\"top-ad-content\">Fish &amp; &lt;chips&gt;</div>"
        );
    }

    #[test]
    fn connected_and_lookup_follow_the_live_tree() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.create_element("div");
        doc.set_attribute(div, "id", "ad-marker-top-1");
        assert!(!doc.is_connected(div));
        assert_eq!(doc.get_element_by_id("ad-marker-top-1"), None);
        doc.append_child(body, div);
        assert!(doc.is_connected(div));
        assert_eq!(doc.get_element_by_id("ad-marker-top-1"), Some(div));
        doc.detach(div);
        assert!(!doc.is_connected(div));
    }

    #[test]
    fn class_list_helpers() {
        let mut doc = Document::new();
        let overlay = doc.create_element("div");
        doc.add_class(overlay, "overlay");
        doc.add_class(overlay, "hidden");
        assert!(doc.has_class(overlay, "hidden"));
        doc.remove_class(overlay, "hidden");
        assert!(!doc.has_class(overlay, "hidden"));
        assert_eq!(doc.attribute(overlay, "class"), Some("overlay"));
    }
}
