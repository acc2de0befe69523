mod common;

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::Result;
    use reconciler::{ComponentType, Handler, NodeRef, Props, RefTarget, VNode};
    use target_tree::{DomUpdate, NodeKey, TargetTree as _};

    use super::common::{first_child, init_logger, renderer};

    fn list(keys: &[&str]) -> VNode {
        let items = keys.iter().map(|key| {
            VNode::element("li", Props::new().with_child(VNode::text(*key))).with_key(*key)
        });
        VNode::element("ul", Props::new().with_children(items))
    }

    /// Keyed children keep their nodes and end up in the new order.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn keyed_children_are_moved_not_recreated() -> Result<()> {
        init_logger();
        let mut renderer = renderer();
        let root = renderer.target().root();
        renderer.render(list(&["a", "b", "c", "d"]), root)?;
        let ul = first_child(renderer.target(), root)?;
        let before = renderer.target().child_nodes(ul);
        renderer.target_mut().take_updates();

        renderer.render(list(&["d", "a", "c"]), root)?;
        let after = renderer.target().child_nodes(ul);
        let expected: Vec<NodeKey> = [3, 0, 2].iter().filter_map(|index| before.get(*index).copied()).collect();
        assert_eq!(after, expected);
        assert_eq!(renderer.target().text_content(ul), "dac");

        let updates = renderer.target_mut().take_updates();
        assert!(!updates.iter().any(DomUpdate::is_creation), "recreated: {updates:?}");
        let removed: Vec<NodeKey> = updates
            .iter()
            .filter_map(|update| match update {
                DomUpdate::Remove { node } => Some(*node),
                _ => None,
            })
            .collect();
        assert_eq!(removed, before.get(1).copied().into_iter().collect::<Vec<_>>());
        Ok(())
    }

    /// A changed tag gets a fresh node and the old one leaves the tree.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn type_change_replaces_the_node() -> Result<()> {
        init_logger();
        let mut renderer = renderer();
        let root = renderer.target().root();
        let tree = |tag: &str| {
            VNode::element(
                "div",
                Props::new()
                    .with_child(VNode::element(tag, Props::new()))
                    .with_child(VNode::text("tail")),
            )
        };
        renderer.render(tree("span"), root)?;
        let div = first_child(renderer.target(), root)?;
        let span = first_child(renderer.target(), div)?;

        renderer.render(tree("em"), root)?;
        assert_eq!(renderer.target().inner_html(root), "<div><em></em>tail</div>");
        assert!(!renderer.target().is_connected(span));
        Ok(())
    }

    /// Components rendering several nodes are placed as a unit.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn fragments_keep_sibling_order() -> Result<()> {
        init_logger();
        let pair = ComponentType::function("Pair", |props, _context| {
            let label = props.text("label").unwrap_or_default();
            Ok(Some(VNode::fragment([
                VNode::text(format!("{label}1")),
                VNode::text(format!("{label}2")),
            ])))
        });
        let tree = |order: &[&str]| {
            let items = order.iter().map(|label| {
                VNode::component(&pair, Props::new().with("label", *label)).with_key(*label)
            });
            VNode::element("p", Props::new().with_children(items))
        };
        let mut renderer = renderer();
        let root = renderer.target().root();
        renderer.render(tree(&["x", "y"]), root)?;
        assert_eq!(renderer.target().text_content(root), "x1x2y1y2");

        renderer.render(tree(&["y", "x"]), root)?;
        assert_eq!(renderer.target().text_content(root), "y1y2x1x2");

        renderer.render(tree(&["z", "y", "x"]), root)?;
        assert_eq!(renderer.target().text_content(root), "z1z2y1y2x1x2");
        Ok(())
    }

    /// Swapping refs clears the old one and fills the new one.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn refs_follow_the_node() -> Result<()> {
        init_logger();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let first = {
            let seen = Rc::clone(&seen);
            NodeRef::callback(move |value| {
                seen.borrow_mut().push(value.is_some());
                Ok(())
            })
        };
        let second = NodeRef::cell();
        let mut renderer = renderer();
        let root = renderer.target().root();

        renderer.render(VNode::element("input", Props::new()).with_ref(&first), root)?;
        let input = first_child(renderer.target(), root)?;
        renderer.render(VNode::element("input", Props::new()).with_ref(&second), root)?;

        assert_eq!(*seen.borrow(), [true, false]);
        assert_eq!(second.current(), Some(RefTarget::Node(input)));
        renderer.unmount(root)?;
        assert_eq!(second.current(), None);
        Ok(())
    }

    /// Handlers are wired as listeners and swapped on update.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn handlers_are_rebound() -> Result<()> {
        init_logger();
        let clicks = Rc::new(RefCell::new(Vec::new()));
        let button = |label: &'static str| {
            let clicks = Rc::clone(&clicks);
            let handler = Handler::new(move || clicks.borrow_mut().push(label));
            VNode::element("button", Props::new().with("onClick", handler))
        };
        let mut renderer = renderer();
        let root = renderer.target().root();
        renderer.render(button("first"), root)?;
        let node = first_child(renderer.target(), root)?;
        assert!(renderer.target().dispatch(node, "click"));

        renderer.render(button("second"), root)?;
        assert!(renderer.target().dispatch(node, "click"));
        assert_eq!(*clicks.borrow(), ["first", "second"]);

        renderer.render(VNode::element("button", Props::new()), root)?;
        assert!(!renderer.target().dispatch(node, "click"));
        Ok(())
    }
}
