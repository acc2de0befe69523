#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::anyhow;
    use serde_json::json;
    use target_tree::{Document, DomSubscriber, DomUpdate, NodeKey, TargetTree};

    fn init_logger() {
        let _ignored = env_logger::builder().is_test(true).try_init();
    }

    /// Subscriber mirroring every update into a shared log.
    struct Recorder(Rc<RefCell<Vec<DomUpdate>>>);

    impl DomSubscriber for Recorder {
        fn apply_update(&mut self, update: &DomUpdate) -> anyhow::Result<()> {
            self.0.borrow_mut().push(update.clone());
            Ok(())
        }
    }

    struct Failing;

    impl DomSubscriber for Failing {
        fn apply_update(&mut self, _update: &DomUpdate) -> anyhow::Result<()> {
            Err(anyhow!("subscriber offline"))
        }
    }

    /// Subscribers see the same stream as the update log, and a failing
    /// subscriber does not interrupt the others.
    ///
    /// # Panics
    /// Panics if the mirrored stream differs from the recorded one.
    #[test]
    fn subscribers_mirror_updates() {
        init_logger();
        let mut doc = Document::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.subscribe(Box::new(Failing));
        doc.subscribe(Box::new(Recorder(Rc::clone(&log))));

        let root = doc.root();
        let div = doc.create_element("div", false);
        doc.set_attribute(div, "id", "main");
        doc.insert_before(root, div, None);

        assert_eq!(log.borrow().as_slice(), doc.updates());
        assert_eq!(doc.updates().len(), 3);
        assert!(doc.updates()[0].is_creation());
        assert_eq!(doc.updates()[1].node(), div);
    }

    /// # Panics
    /// Panics if the snapshot shape changes.
    #[test]
    fn json_snapshot_is_deterministic() {
        init_logger();
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.create_element("div", false);
        doc.set_attribute(div, "title", "t");
        doc.set_attribute(div, "class", "c");
        let text = doc.create_text("hello");
        doc.insert_before(root, div, None);
        doc.insert_before(div, text, None);

        assert_eq!(
            doc.to_json_value(root),
            json!({
                "type": "document",
                "children": [{
                    "type": "element",
                    "key": div.0,
                    "tag": "div",
                    "attrs": { "class": "c", "title": "t" },
                    "children": [{ "type": "text", "key": text.0, "text": "hello" }],
                }],
            })
        );
        assert_eq!(
            doc.inner_html(root),
            "<div class=\"c\" title=\"t\">hello</div>"
        );
        assert_eq!(doc.to_json_value(NodeKey(999)), serde_json::Value::Null);
    }

    /// # Panics
    /// Panics if listeners are not attached, replaced, or detached.
    #[test]
    fn listeners_dispatch_until_detached() {
        init_logger();
        let mut doc = Document::new();
        let button = doc.create_element("button", false);
        let clicks = Rc::new(RefCell::new(0_u32));
        let counter = Rc::clone(&clicks);
        doc.set_listener(
            button,
            "click",
            Some(Rc::new(move || *counter.borrow_mut() += 1)),
        );

        assert!(doc.dispatch(button, "click"));
        assert!(doc.dispatch(button, "click"));
        doc.set_listener(button, "click", None);
        assert!(!doc.dispatch(button, "click"));
        assert_eq!(*clicks.borrow(), 2);
    }

    /// # Panics
    /// Panics if the update log keeps recording while disabled.
    #[test]
    fn record_updates_can_be_disabled() {
        init_logger();
        let mut doc = Document::new();
        doc.set_record_updates(false);
        let text = doc.create_text("a");
        doc.set_text(text, "b");
        doc.set_property(text, "checked", true);

        assert!(doc.updates().is_empty());
        assert_eq!(doc.text_content(text), "b");
        assert_eq!(doc.property(text, "checked"), Some(true));
        assert_eq!(doc.attribute(text, "missing"), None);
    }
}
