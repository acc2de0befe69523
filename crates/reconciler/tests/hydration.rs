mod common;

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use reconciler::{Props, VNode};
    use serde_json::json;
    use target_tree::{Document, DomUpdate, NodeKey, TargetTree as _};

    use super::common::{init_logger, renderer};

    /// `<div class="old">hello</div><span></span>` under the root.
    fn server_markup(doc: &mut Document) -> (NodeKey, NodeKey, NodeKey) {
        let root = doc.root();
        let div = doc.create_element("div", false);
        doc.set_attribute(div, "class", "old");
        let text = doc.create_text("hello");
        doc.insert_before(div, text, None);
        doc.insert_before(root, div, None);
        let span = doc.create_element("span", false);
        doc.insert_before(root, span, None);
        (div, text, span)
    }

    /// Matching nodes are adopted in place; unclaimed ones are removed.
    ///
    /// # Errors
    /// Returns an error if hydration fails.
    #[test]
    fn hydrate_adopts_existing_nodes() -> Result<()> {
        init_logger();
        let mut renderer = renderer();
        let (div, text, span) = server_markup(renderer.target_mut());
        renderer.target_mut().take_updates();
        let root = renderer.target().root();

        let tree = VNode::element(
            "div",
            Props::new().with("className", "new").with_child(VNode::text("hello")),
        );
        renderer.hydrate(tree, root)?;

        let updates = renderer.target().updates();
        assert!(!updates.iter().any(DomUpdate::is_creation), "created nodes: {updates:?}");
        assert_eq!(renderer.target().child_nodes(root), vec![div]);
        assert_eq!(renderer.target().child_nodes(div), vec![text]);
        assert!(!renderer.target().is_connected(span));
        assert_eq!(renderer.target().inner_html(root), "<div class=\"new\">hello</div>");
        Ok(())
    }

    /// A plain render never adopts: existing markup is left alone.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn render_does_not_adopt() -> Result<()> {
        init_logger();
        let mut renderer = renderer();
        let (div, _text, span) = server_markup(renderer.target_mut());
        let root = renderer.target().root();

        renderer.render(VNode::element("p", Props::new()), root)?;
        let children = renderer.target().child_nodes(root);
        assert_eq!(children.len(), 3);
        assert_eq!(children.first(), Some(&div));
        assert_eq!(children.get(1), Some(&span));
        Ok(())
    }

    /// Nodes built from JSON are refused outright, at the top and below.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn untrusted_nodes_are_rejected() -> Result<()> {
        init_logger();
        let mut renderer = renderer();
        let root = renderer.target().root();
        let injected = VNode::from_json(&json!({ "tag": "script", "children": ["alert(1)"] }))?;

        renderer.render(injected.clone(), root)?;
        assert!(renderer.target().updates().is_empty());

        let tree = VNode::element(
            "div",
            Props::new()
                .with_child(VNode::text("safe"))
                .with_child(injected),
        );
        renderer.render(tree, root)?;
        assert_eq!(renderer.target().inner_html(root), "<div>safe</div>");
        Ok(())
    }

    /// Raw markup replaces children wholesale and gives way to them again.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn raw_markup_switches_with_children() -> Result<()> {
        init_logger();
        let mut renderer = renderer();
        let root = renderer.target().root();

        renderer.render(VNode::element("div", Props::new().with_raw_html("<b>bold</b>")), root)?;
        assert_eq!(renderer.target().inner_html(root), "<div><b>bold</b></div>");

        renderer.render(
            VNode::element("div", Props::new().with_child(VNode::text("plain"))),
            root,
        )?;
        assert_eq!(renderer.target().inner_html(root), "<div>plain</div>");

        renderer.render(VNode::element("div", Props::new().with_raw_html("<i>again</i>")), root)?;
        assert_eq!(renderer.target().inner_html(root), "<div><i>again</i></div>");
        Ok(())
    }

    /// `multiple` is a property set before the options are reconciled.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn multiple_is_a_property() -> Result<()> {
        init_logger();
        let mut renderer = renderer();
        let root = renderer.target().root();
        let select = |multiple: Option<bool>| {
            let props = Props::new().with_child(VNode::element("option", Props::new().with("selected", true)));
            let props = match multiple {
                Some(flag) => props.with("multiple", flag),
                None => props,
            };
            VNode::element("select", props)
        };

        renderer.render(select(Some(true)), root)?;
        let node = renderer
            .target()
            .first_child(root)
            .ok_or_else(|| anyhow!("select missing"))?;
        assert_eq!(renderer.target().property(node, "multiple"), Some(true));
        assert_eq!(renderer.target().attribute(node, "multiple"), None);
        let position = |updates: &[DomUpdate], wanted: fn(&DomUpdate) -> bool| updates.iter().position(wanted);
        let updates = renderer.target().updates();
        let property = position(updates, |update| matches!(update, DomUpdate::SetProperty { .. }));
        let option = position(updates, |update| {
            matches!(update, DomUpdate::CreateElement { tag, .. } if tag == "option")
        });
        assert!(property < option, "multiple must be set before options: {updates:?}");

        renderer.render(select(None), root)?;
        assert_eq!(renderer.target().property(node, "multiple"), Some(false));
        Ok(())
    }

    /// `svg` switches to the SVG namespace and `foreignObject` switches its
    /// children back.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn svg_namespace_ends_inside_foreign_object() -> Result<()> {
        init_logger();
        let mut renderer = renderer();
        let root = renderer.target().root();
        let tree = VNode::element(
            "svg",
            Props::new().with_child(VNode::element(
                "foreignObject",
                Props::new().with_child(VNode::element("div", Props::new())),
            )),
        );
        renderer.render(tree, root)?;

        let created: Vec<(&str, bool)> = renderer
            .target()
            .updates()
            .iter()
            .filter_map(|update| match update {
                DomUpdate::CreateElement { tag, svg, .. } => Some((tag.as_str(), *svg)),
                _ => None,
            })
            .collect();
        assert_eq!(created, [("svg", true), ("foreignObject", true), ("div", false)]);
        Ok(())
    }
}
