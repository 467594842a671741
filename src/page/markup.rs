// src/page/markup.rs

use scraper::{ElementRef, Html, Node};

use crate::page::dom::{Document, NodeId};

/// Parses an HTML fragment and imports it into `doc` as detached top-level nodes.
pub fn parse_fragment(doc: &mut Document, markup: &str) -> Vec<NodeId> {
    let fragment = Html::parse_fragment(markup);
    import_children(doc, fragment.root_element())
}

fn import_children(doc: &mut Document, element: ElementRef<'_>) -> Vec<NodeId> {
    let mut imported = Vec::new();
    for child in element.children() {
        let id = match child.value() {
            Node::Text(text) => doc.create_text(&text.text),
            Node::Element(el) => {
                let id = doc.create_element(el.name());
                for (name, value) in el.attrs() {
                    doc.set_attribute(id, name, value);
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    for grandchild in import_children(doc, child_ref) {
                        doc.append_child(id, grandchild);
                    }
                }
                id
            }
            _ => continue,
        };
        imported.push(id);
    }
    imported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_nested_elements_and_text() {
        let mut doc = Document::new();
        let nodes = parse_fragment(
            &mut doc,
            r#"<div class="ad"><a href="https://shop.example">Spring sale</a></div>tail"#,
        );
        assert_eq!(nodes.len(), 2);
        assert_eq!(doc.tag(nodes[0]), Some("div"));
        assert_eq!(doc.attribute(nodes[0], "class"), Some("ad"));
        assert_eq!(doc.text_content(nodes[0]), "Spring sale");
        assert!(!doc.is_element(nodes[1]));
        assert!(nodes.iter().all(|n| doc.parent(*n).is_none()));
    }

    #[test]
    fn empty_markup_yields_nothing() {
        let mut doc = Document::new();
        assert!(parse_fragment(&mut doc, "").is_empty());
    }
}
