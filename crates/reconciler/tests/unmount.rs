mod common;

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use anyhow::{Result, anyhow};
    use reconciler::{Component, ComponentDef, ComponentType, NodeRef, Props, Scope, VNode};
    use serde_json::json;
    use target_tree::{DomSubscriber, DomUpdate, TargetTree as _};

    use super::common::{Journal, entries, first_child, init_logger, journal, note, renderer, state};

    /// Mirrors node removals into the journal.
    struct Removals(Journal);

    impl DomSubscriber for Removals {
        fn apply_update(&mut self, update: &DomUpdate) -> Result<()> {
            if let DomUpdate::Remove { node } = update {
                note(&self.0, format!("remove {node}"));
            }
            Ok(())
        }
    }

    /// Wraps its children in a `div` and reports its own teardown.
    struct Level {
        name: String,
        journal: Journal,
    }

    impl Component for Level {
        fn render(&mut self, scope: &mut Scope<'_>) -> Result<Option<VNode>> {
            Ok(Some(VNode::element(
                "div",
                Props::new().with_children(scope.props().children().iter().cloned()),
            )))
        }

        fn will_unmount(&mut self) -> Result<()> {
            note(&self.journal, format!("unmount {}", self.name));
            Ok(())
        }
    }

    fn level_type(log: &Journal) -> ComponentType {
        let log = Rc::clone(log);
        ComponentType::class("Level", move |props, _context| {
            Box::new(Level {
                name: props.text("name").unwrap_or_default().to_owned(),
                journal: Rc::clone(&log),
            })
        })
    }

    fn level(ty: &ComponentType, log: &Journal, name: &str, children: Vec<VNode>) -> VNode {
        let ref_log = Rc::clone(log);
        let label = name.to_owned();
        let node_ref = NodeRef::callback(move |value| {
            let held = if value.is_some() { "set" } else { "null" };
            note(&ref_log, format!("ref {label} {held}"));
            Ok(())
        });
        VNode::component(ty, Props::new().with("name", name).with_children(children)).with_ref(&node_ref)
    }

    /// Every instance is told and every ref cleared, parents first, before
    /// the single top node leaves the tree.
    ///
    /// # Errors
    /// Returns an error if rendering or teardown fails.
    #[test]
    fn three_levels_unmount_before_detach() -> Result<()> {
        init_logger();
        let log = journal();
        let ty = level_type(&log);
        let tree = level(
            &ty,
            &log,
            "a",
            vec![level(&ty, &log, "b", vec![level(&ty, &log, "c", vec![VNode::text("leaf")])])],
        );

        let mut renderer = renderer();
        renderer
            .target_mut()
            .subscribe(Box::new(Removals(Rc::clone(&log))));
        let root = renderer.target().root();
        renderer.render(tree, root)?;
        let top = first_child(renderer.target(), root)?;
        assert_eq!(renderer.target().text_content(root), "leaf");
        log.borrow_mut().clear();

        renderer.unmount(root)?;
        assert_eq!(
            entries(&log),
            [
                "ref a null".to_owned(),
                "unmount a".to_owned(),
                "ref b null".to_owned(),
                "unmount b".to_owned(),
                "ref c null".to_owned(),
                "unmount c".to_owned(),
                format!("remove {top}"),
            ]
        );
        assert!(!renderer.target().is_connected(top));
        assert_eq!(renderer.target().inner_html(root), "");
        Ok(())
    }

    /// Fails to tear down.
    struct Stubborn;

    impl Component for Stubborn {
        fn render(&mut self, _scope: &mut Scope<'_>) -> Result<Option<VNode>> {
            Ok(Some(VNode::text("stubborn")))
        }

        fn will_unmount(&mut self) -> Result<()> {
            Err(anyhow!("cannot let go"))
        }
    }

    /// Renders its children, or a notice once it holds an error.
    struct Guard;

    impl Component for Guard {
        fn render(&mut self, scope: &mut Scope<'_>) -> Result<Option<VNode>> {
            if scope.state().contains_key("hasError") {
                return Ok(Some(VNode::text("recovered")));
            }
            Ok(Some(VNode::fragment(scope.props().children().iter().cloned())))
        }
    }

    /// A failing `will_unmount` goes to the boundary and the siblings still
    /// tear down.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[test]
    fn will_unmount_errors_do_not_stop_teardown() -> Result<()> {
        init_logger();
        let log = journal();
        let ty = level_type(&log);
        let stubborn = ComponentType::class("Stubborn", |_props, _context| Box::new(Stubborn));
        let guard = ComponentDef::class("Guard", |_props, _context| Box::new(Guard))
            .derive_state_from_error(|_error| Ok(Some(state(json!({ "hasError": true })))))
            .build();

        let mut renderer = renderer();
        let root = renderer.target().root();
        let full = VNode::component(
            &guard,
            Props::new()
                .with_child(VNode::component(&stubborn, Props::new()))
                .with_child(level(&ty, &log, "sibling", Vec::new())),
        );
        renderer.render(full, root)?;
        assert_eq!(renderer.target().text_content(root), "stubborn");
        log.borrow_mut().clear();

        renderer.render(VNode::component(&guard, Props::new()), root)?;
        assert_eq!(entries(&log), ["ref sibling null", "unmount sibling"]);
        assert_eq!(renderer.target().text_content(root), "");

        renderer.flush()?;
        assert_eq!(renderer.target().text_content(root), "recovered");
        Ok(())
    }
}
