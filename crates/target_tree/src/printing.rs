use core::fmt;
use core::fmt::Write as _;

use crate::document::{Document, DomNode, NodeKind};
use crate::NodeKey;
use indextree::NodeId;
use serde_json::{Map, Value, json};

fn sorted_attrs(node: &DomNode) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = node.attrs.iter().cloned().collect();
    pairs.sort_by(|left, right| left.0.cmp(&right.0));
    pairs
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn node_to_json(doc: &Document, id: NodeId) -> Value {
    let Some(node) = doc.arena.get(id).map(|entry| entry.get()) else {
        return Value::Null;
    };
    let children: Vec<Value> = id
        .children(&doc.arena)
        .map(|child| node_to_json(doc, child))
        .filter(|value| !value.is_null())
        .collect();
    match &node.kind {
        NodeKind::Document => json!({ "type": "document", "children": children }),
        NodeKind::Element { tag, svg } => {
            let mut attrs = Map::new();
            for (name, value) in sorted_attrs(node) {
                attrs.insert(name, Value::String(value));
            }
            let mut element = json!({
                "type": "element",
                "key": node.key.0,
                "tag": tag,
                "attrs": Value::Object(attrs),
                "children": children,
            });
            if *svg {
                element["svg"] = Value::Bool(true);
            }
            element
        }
        NodeKind::Text { text } => json!({ "type": "text", "key": node.key.0, "text": text }),
        NodeKind::Raw { markup } => json!({ "type": "raw", "markup": markup }),
    }
}

fn write_html(doc: &Document, id: NodeId, out: &mut String) -> fmt::Result {
    let Some(node) = doc.arena.get(id).map(|entry| entry.get()) else {
        return Ok(());
    };
    match &node.kind {
        NodeKind::Document => write_children(doc, id, out)?,
        NodeKind::Element { tag, .. } => {
            write!(out, "<{tag}")?;
            for (name, value) in sorted_attrs(node) {
                write!(out, " {name}=\"{}\"", escape(&value))?;
            }
            out.push('>');
            write_children(doc, id, out)?;
            write!(out, "</{tag}>")?;
        }
        NodeKind::Text { text } => out.push_str(&escape(text)),
        NodeKind::Raw { markup } => out.push_str(markup),
    }
    Ok(())
}

fn write_children(doc: &Document, id: NodeId, out: &mut String) -> fmt::Result {
    for child in id.children(&doc.arena) {
        write_html(doc, child, out)?;
    }
    Ok(())
}

impl Document {
    /// Deterministic JSON representation of the subtree at `key`.
    ///
    /// Schema:
    /// - Document: `{ "type":"document", "children":[ ... ] }`
    /// - Element: `{ "type":"element", "key": 3, "tag":"div", "attrs":{..}, "children":[ ... ] }`
    /// - Text: `{ "type":"text", "key": 4, "text":"..." }`
    /// - Raw markup: `{ "type":"raw", "markup":"..." }`
    pub fn to_json_value(&self, key: NodeKey) -> Value {
        self.ids_lookup(key)
            .map_or(Value::Null, |id| node_to_json(self, id))
    }

    /// Pretty JSON of the whole document, for snapshots.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&node_to_json(self, self.root))
            .unwrap_or_else(|_| String::from("{}"))
    }

    /// Serialized markup of the children of `key`.
    pub fn inner_html(&self, key: NodeKey) -> String {
        let mut out = String::new();
        let Some(id) = self.ids_lookup(key) else {
            return out;
        };
        if write_children(self, id, &mut out).is_err() {
            out.clear();
        }
        out
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "Document")?;
        formatter.write_str(&self.inner_html(NodeKey::ROOT))
    }
}
