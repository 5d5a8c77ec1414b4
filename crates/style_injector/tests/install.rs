//! Installing stylesheets: ordering, deduplication, adoption of existing
//! nodes, transforms and per-root independence.

use core::cell::{Cell, RefCell};
use css::{ActiveStyleSheets, StyleSheetList};
use dom::{DOMMirror, Document, NodeKey, SharedDocument, WindowId};
use std::rc::Rc;
use style_injector::{InjectorConfig, InstallError, StyleInserter, StyleKey, StyleRequest, StyleRoot};

struct Harness {
    document: SharedDocument,
    sheets: Rc<RefCell<DOMMirror<StyleSheetList>>>,
    inserter: StyleInserter,
}

fn harness() -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let document = Document::new_shared(Some(WindowId(1)));
    let mirror = document.borrow().mirror(StyleSheetList::new()).unwrap();
    let sheets = Rc::new(RefCell::new(mirror));
    let active = Rc::clone(&sheets) as Rc<dyn ActiveStyleSheets>;
    let inserter = StyleInserter::new(active, &InjectorConfig::default());
    Harness {
        document,
        sheets,
        inserter,
    }
}

impl Harness {
    fn head(&self) -> StyleRoot {
        StyleRoot::head(&self.document.borrow())
    }

    fn children(&self, root: StyleRoot) -> Vec<NodeKey> {
        self.document.borrow().children(root.insertion)
    }

    fn install(&mut self, root: StyleRoot, request: StyleRequest) -> Result<NodeKey, InstallError> {
        self.inserter.install(&self.document, root, request)
    }
}

#[test]
fn runtime_then_extension_then_reinstall() {
    let mut harness = harness();
    let head = harness.head();

    let runtime = harness
        .install(head, StyleRequest::new("body{color:red}").runtime())
        .unwrap();
    {
        let doc = harness.document.borrow();
        assert_eq!(doc.first_child(head.insertion), Some(runtime));
        assert!(doc.has_attribute(runtime, "runtime"));
        assert_eq!(doc.text_content(runtime), "body{color:red}");
    }

    let foo = harness
        .install(head, StyleRequest::new(".foo{}").extension("foo"))
        .unwrap();
    assert_eq!(harness.children(head), vec![runtime, foo]);
    assert_eq!(harness.document.borrow().attribute(foo, "extension"), Some("foo"));

    let again = harness
        .install(head, StyleRequest::new(".foo{color:blue}").extension("foo"))
        .unwrap();
    assert_eq!(again, foo);
    assert_eq!(harness.children(head).len(), 2);
    // The original content is kept.
    assert_eq!(harness.document.borrow().text_content(foo), ".foo{}");
}

#[test]
fn reinstall_still_reports_readiness_of_the_existing_node() {
    let mut harness = harness();
    let head = harness.head();
    let runtime = harness.install(head, StyleRequest::new("a{}").runtime()).unwrap();
    harness.sheets.borrow_mut().try_update_sync().unwrap();

    let seen = Rc::new(Cell::new(None));
    let sink = Rc::clone(&seen);
    let again = harness
        .install(
            head,
            StyleRequest::new("b{}")
                .runtime()
                .on_ready(move |node| sink.set(Some(node))),
        )
        .unwrap();

    assert_eq!(again, runtime);
    assert_eq!(seen.get(), Some(runtime));
    assert_eq!(harness.children(head), vec![runtime]);
}

#[test]
fn empty_extension_name_is_not_deduplicated() {
    let mut harness = harness();
    let head = harness.head();
    harness.install(head, StyleRequest::new("html{}").runtime()).unwrap();

    let first = harness.install(head, StyleRequest::new("a{}").extension("")).unwrap();
    let second = harness.install(head, StyleRequest::new("b{}").extension("")).unwrap();

    assert_ne!(first, second);
    assert_eq!(harness.children(head).len(), 3);
    let doc = harness.document.borrow();
    assert!(!doc.has_attribute(first, "extension"));
    assert!(!doc.has_attribute(first, ""));
    assert_eq!(harness.inserter.registry(head).map(|registry| registry.len()), Some(1));
}

#[test]
fn runtime_is_installed_first_even_when_late() {
    let mut harness = harness();
    let head = harness.head();

    let plain = harness.install(head, StyleRequest::new("p{}")).unwrap();
    let runtime = harness.install(head, StyleRequest::new("html{}").runtime()).unwrap();
    let ext_a = harness.install(head, StyleRequest::new(".a{}").extension("a")).unwrap();
    let ext_b = harness.install(head, StyleRequest::new(".b{}").extension("b")).unwrap();
    let tail = harness.install(head, StyleRequest::new("div{}")).unwrap();

    // Each extension lands right after the runtime node, ahead of earlier ones.
    assert_eq!(harness.children(head), vec![runtime, ext_b, ext_a, plain, tail]);
}

#[test]
fn uncached_styles_create_a_node_per_call() {
    let mut harness = harness();
    let head = harness.head();
    harness.install(head, StyleRequest::new("html{}").runtime()).unwrap();

    let nodes: Vec<NodeKey> = (0..3)
        .map(|index| {
            harness
                .install(head, StyleRequest::new(format!("@keyframes k{index} {{}}")).extension("keyframes"))
                .unwrap()
        })
        .collect();
    let anonymous = harness.install(head, StyleRequest::new("a{}")).unwrap();

    assert_eq!(harness.children(head).len(), 5);
    assert_eq!(harness.children(head)[1..4], nodes[..]);
    assert_eq!(harness.children(head).last(), Some(&anonymous));
    let doc = harness.document.borrow();
    assert!(nodes.iter().all(|&node| doc.has_attribute(node, "keyframes")));
    assert!(!doc.has_attribute(nodes[0], "extension"));
    assert_eq!(harness.inserter.registry(head).map(|registry| registry.len()), Some(1));
}

#[test]
fn existing_marked_nodes_are_adopted() {
    let mut harness = harness();
    let head = harness.head();
    let server_rendered = {
        let mut doc = harness.document.borrow_mut();
        let style = doc.create_element("style");
        doc.set_attribute(style, "runtime", "").unwrap();
        doc.set_text_content(style, "html{}").unwrap();
        doc.append_child(head.insertion, style).unwrap();
        style
    };

    let runtime = harness
        .install(head, StyleRequest::new("body{}").runtime())
        .unwrap();
    assert_eq!(runtime, server_rendered);
    assert_eq!(harness.children(head), vec![server_rendered]);
    assert_eq!(
        harness
            .inserter
            .registry(head)
            .and_then(|registry| registry.get(&StyleKey::Runtime)),
        Some(server_rendered)
    );
}

#[test]
fn transformer_rewrites_css_installed_afterwards() {
    let mut harness = harness();
    let head = harness.head();
    let before = harness.install(head, StyleRequest::new("a{}").runtime()).unwrap();
    harness
        .inserter
        .install_css_transformer(head, |css| css.replace("red", "blue"));
    let after = harness.install(head, StyleRequest::new("p{color:red}")).unwrap();

    let doc = harness.document.borrow();
    assert_eq!(doc.text_content(before), "a{}");
    assert_eq!(doc.text_content(after), "p{color:blue}");
}

#[test]
fn extension_before_runtime_is_rejected() {
    let mut harness = harness();
    let head = harness.head();
    let err = harness
        .install(head, StyleRequest::new(".foo{}").extension("foo"))
        .unwrap_err();
    assert!(matches!(err, InstallError::RuntimeStyleMissing { ref extension } if extension == "foo"));
    assert!(harness.children(head).is_empty());
}

#[test]
fn shadow_roots_have_independent_registries_and_transforms() {
    let mut harness = harness();
    let head = harness.head();
    let shadow = {
        let mut doc = harness.document.borrow_mut();
        let body = doc.create_body().unwrap();
        let host = doc.create_element("div");
        doc.append_child(body, host).unwrap();
        let shadow_root = doc.attach_shadow(host).unwrap();
        StyleRoot::shadow(&doc, shadow_root).unwrap()
    };
    harness.inserter.install_css_transformer(shadow, |css| format!(":host {css}"));

    let main = harness.install(head, StyleRequest::new("x{}").runtime()).unwrap();
    let isolated = harness.install(shadow, StyleRequest::new("x{}").runtime()).unwrap();

    assert_ne!(main, isolated);
    assert_eq!(harness.children(shadow), vec![isolated]);
    let doc = harness.document.borrow();
    assert_eq!(doc.text_content(main), "x{}");
    assert_eq!(doc.text_content(isolated), ":host x{}");
    assert_eq!(doc.tree_scope(isolated), Ok(shadow.scope));

    drop(doc);
    harness.sheets.borrow_mut().try_update_sync().unwrap();
    let sheets = harness.sheets.borrow();
    assert!(sheets.owns_sheet(NodeKey::ROOT, main));
    assert!(sheets.owns_sheet(shadow.scope, isolated));
    assert!(!sheets.owns_sheet(NodeKey::ROOT, isolated));
}

#[test]
fn install_fails_while_document_is_borrowed() {
    let mut harness = harness();
    let head = harness.head();
    let document = Rc::clone(&harness.document);
    let _guard = document.borrow_mut();
    let err = harness.install(head, StyleRequest::new("a{}")).unwrap_err();
    assert!(matches!(err, InstallError::Busy(_)));
}

#[test]
fn shadow_root_constructor_rejects_plain_elements() {
    let harness = harness();
    let mut doc = harness.document.borrow_mut();
    let div = doc.create_element("div");
    assert!(StyleRoot::shadow(&doc, div).is_err());
}
