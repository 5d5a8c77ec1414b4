use css::{ActiveStyleSheets as _, StyleSheetList};
use dom::{DOMSubscriber as _, DOMUpdate, Document, NodeKey};
use std::cell::RefCell;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn style_removal_retracts_sheet() {
    init_logging();
    let mut list = StyleSheetList::new();
    let head = NodeKey(2);
    let style1 = NodeKey(100);

    list.apply_update(DOMUpdate::InsertElement { parent: NodeKey::ROOT, node: NodeKey(1), tag: "html".into(), pos: 0 }).unwrap();
    list.apply_update(DOMUpdate::InsertElement { parent: NodeKey(1), node: head, tag: "head".into(), pos: 0 }).unwrap();
    list.apply_update(DOMUpdate::InsertElement { parent: head, node: style1, tag: "style".into(), pos: 0 }).unwrap();
    list.apply_update(DOMUpdate::InsertText { parent: style1, node: NodeKey(101), text: "div { color: red }".into(), pos: 0 }).unwrap();

    assert!(list.owns_sheet(NodeKey::ROOT, style1));
    assert_eq!(list.sheet_text(style1).as_deref(), Some("div { color: red }"));

    list.apply_update(DOMUpdate::RemoveNode { node: NodeKey(101) }).unwrap();
    list.apply_update(DOMUpdate::RemoveNode { node: style1 }).unwrap();
    assert!(!list.owns_sheet(NodeKey::ROOT, style1));
    assert!(list.is_empty());
}

#[test]
fn sheets_keep_registration_order_per_scope() {
    let mut doc = Document::new(None);
    let mut mirror = doc.mirror(StyleSheetList::new()).unwrap();
    let head = doc.head();

    let first = doc.create_element("style");
    doc.set_text_content(first, "div{color:red}").unwrap();
    doc.append_child(head, first).unwrap();
    let second = doc.create_element("style");
    doc.set_text_content(second, "p{color:blue}").unwrap();
    doc.append_child(head, second).unwrap();

    // Nothing is active until the engine drains the pending batches.
    assert!(!mirror.owns_sheet(NodeKey::ROOT, first));
    mirror.try_update_sync().unwrap();

    let order: Vec<NodeKey> = mirror.mirror().sheets(NodeKey::ROOT).map(|sheet| sheet.node).collect();
    assert_eq!(order, vec![first, second]);
}

#[test]
fn detached_styles_are_not_active_until_connected() {
    let mut doc = Document::new(None);
    let mut mirror = doc.mirror(StyleSheetList::new()).unwrap();

    let wrapper = doc.create_element("div");
    let style = doc.create_element("style");
    doc.append_child(wrapper, style).unwrap();
    mirror.try_update_sync().unwrap();
    assert!(mirror.mirror().is_empty());

    doc.append_child(doc.head(), wrapper).unwrap();
    mirror.try_update_sync().unwrap();
    assert!(mirror.owns_sheet(NodeKey::ROOT, style));
}

#[test]
fn shadow_root_sheets_are_scoped_to_the_shadow_root() {
    let mut doc = Document::new(None);
    let body = doc.create_body().unwrap();
    let host = doc.create_element("div");
    doc.append_child(body, host).unwrap();
    let shadow = doc.attach_shadow(host).unwrap();

    // Seeded mirrors see the existing tree, including the shadow root.
    let mirror = RefCell::new(doc.mirror(StyleSheetList::new()).unwrap());

    let style = doc.create_element("style");
    doc.set_text_content(style, ":host{display:block}").unwrap();
    doc.append_child(shadow, style).unwrap();
    mirror.borrow_mut().try_update_sync().unwrap();

    assert!(mirror.owns_sheet(shadow, style));
    assert!(!mirror.owns_sheet(NodeKey::ROOT, style));
}

#[test]
fn text_updates_replace_mirrored_sheet_text() {
    let mut doc = Document::new(None);
    let mut mirror = doc.mirror(StyleSheetList::new()).unwrap();
    let style = doc.create_element("style");
    doc.append_child(doc.head(), style).unwrap();
    doc.set_text_content(style, "a{}").unwrap();
    doc.set_text_content(style, "b{}").unwrap();
    mirror.try_update_sync().unwrap();

    assert_eq!(mirror.mirror().sheet_text(style).as_deref(), Some("b{}"));
}

#[test]
fn busy_sheet_list_reports_nothing_active() {
    let list = RefCell::new(StyleSheetList::new());
    let _guard = list.borrow_mut();
    assert!(!list.owns_sheet(NodeKey::ROOT, NodeKey(5)));
}
