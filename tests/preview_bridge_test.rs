use site_preview::protocol::{ElementPath, StyleProperty};
use site_preview::render::{MouseButton, RenderDocument};
use site_preview::reserved::{
    INJECTED_IDS, INSTRUMENTATION_SCRIPT_ID, RESET_STYLE_ID, RUNTIME_SCRIPT_ID,
    SELECTED_ATTRIBUTE, SELECTED_CLASS,
};
use site_preview::{normalize, serialize, Dispatch, ElementUpdate, HostBridge, PreviewState};

const LANDING: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Landing</title></head>
<body>
<header class="p-4"><h1 class="text-3xl">Acme</h1><a href="/signup" class="btn">Sign up</a></header>
<main><p style="color: gray">Fast and simple.</p></main>
</body>
</html>"#;

fn assert_clean(html: &str) {
    assert!(!html.contains(SELECTED_CLASS), "selection class left in {html}");
    assert!(!html.contains(SELECTED_ATTRIBUTE), "selection attribute left in {html}");
    assert!(!html.contains("outline"), "outline left in {html}");
    for id in INJECTED_IDS {
        assert!(!html.contains(id), "{id} left in {html}");
    }
}

fn select(bridge: &mut HostBridge, selector: &str) {
    bridge
        .render_mut()
        .expect("render mounted")
        .click_selector(selector, MouseButton::Main);
    bridge.tick();
}

fn marked_count(bridge: &mut HostBridge) -> usize {
    bridge
        .render_mut()
        .expect("render mounted")
        .document()
        .select_all(&site_preview::reserved::marker_selector())
        .len()
}

#[test]
fn normalize_then_serialize_is_clean_and_stable() {
    let mut bridge = HostBridge::default();
    assert_eq!(bridge.mount(LANDING), PreviewState::Mounted);
    let first = bridge.get_snapshot().expect("snapshot");
    assert_clean(&first);
    assert!(first.contains(r#"<h1 class="text-3xl">Acme</h1>"#));
    assert!(first.contains("<title>Landing</title>"));
    assert!(first.contains("Fast and simple."));

    bridge.mount(&first);
    let second = bridge.get_snapshot().expect("snapshot");
    assert_eq!(first, second);
}

#[test]
fn selecting_twice_keeps_one_marked_element() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);

    select(&mut bridge, "h1");
    select(&mut bridge, "main p");

    assert_eq!(marked_count(&mut bridge), 1);
    let render = bridge.render_mut().unwrap();
    let heading = render.document().select_first("h1").unwrap();
    let paragraph = render.document().select_first("main p").unwrap();
    assert!(heading.to_string().starts_with(r#"<h1 class="text-3xl">"#));
    assert!(paragraph.to_string().contains(SELECTED_CLASS));

    assert_eq!(bridge.selection().unwrap().tag_name, "p");
    assert_eq!(
        bridge.selection().unwrap().styles.color.as_deref(),
        Some("gray")
    );
}

#[test]
fn clear_request_then_snapshot_is_clean() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);
    select(&mut bridge, "h1");

    assert_eq!(bridge.request_clear_selection(), Dispatch::Sent);
    assert!(bridge.selection().is_none());
    bridge.tick();
    assert_eq!(marked_count(&mut bridge), 0);

    assert_clean(&bridge.get_snapshot().unwrap());
}

#[test]
fn snapshot_with_live_selection_is_clean() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);
    select(&mut bridge, "header a");
    assert!(bridge.selection().is_some());

    let snapshot = bridge.get_snapshot().unwrap();
    assert_clean(&snapshot);
    assert!(snapshot.contains(r#"<a class="btn" href="/signup">Sign up</a>"#));
    assert!(bridge.selection().is_none());

    // the render forgot its selection as well
    bridge.request_update(ElementUpdate::default().with_text("changed"));
    bridge.tick();
    assert_eq!(bridge.get_snapshot().unwrap(), snapshot);
}

#[test]
fn commands_without_render_are_noops() {
    let mut bridge = HostBridge::default();
    assert_eq!(
        bridge.request_update(ElementUpdate::default().with_text("x")),
        Dispatch::Unavailable
    );
    assert_eq!(bridge.request_clear_selection(), Dispatch::Unavailable);
    assert_eq!(bridge.messages_sent(), 0);
    assert_eq!(bridge.get_snapshot(), None);
    assert_eq!(serialize(None), None);
    assert_eq!(bridge.tick(), 0);
}

#[test]
fn commands_after_unmount_are_noops() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);
    select(&mut bridge, "h1");
    bridge.unmount();

    assert!(bridge.selection().is_none());
    assert!(bridge.editor_panel().is_none());
    assert_eq!(bridge.request_clear_selection(), Dispatch::Unavailable);
    assert_eq!(bridge.messages_sent(), 0);
}

#[test]
fn fragments_become_documents() {
    let document = normalize("<h1>Hi</h1>");
    let parsed = RenderDocument::parse(&document);

    let body = parsed.body().unwrap();
    assert!(body.to_string().contains("<h1>Hi</h1>"));

    let runtime = parsed.element_by_id(RUNTIME_SCRIPT_ID).unwrap();
    let head = parsed.select_first("head").unwrap();
    assert!(runtime.parent().unwrap() == head);
    assert!(parsed.element_by_id(RESET_STYLE_ID).unwrap().parent().unwrap() == head);

    let script = parsed.element_by_id(INSTRUMENTATION_SCRIPT_ID).unwrap();
    assert!(script.parent().unwrap() == body);
}

#[test]
fn full_documents_keep_their_content() {
    let document = normalize(LANDING);
    assert!(document.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
    assert!(document.contains(r#"<a href="/signup" class="btn">Sign up</a>"#));
    assert!(document.contains(r#"<p style="color: gray">Fast and simple.</p>"#));
    assert_eq!(document.matches(RUNTIME_SCRIPT_ID).count(), 1);
    assert_eq!(document.matches(INSTRUMENTATION_SCRIPT_ID).count(), 1);

    let parsed = RenderDocument::parse(&document);
    assert_eq!(parsed.select_all("script").len(), 2);
    assert_eq!(parsed.select_all("title").len(), 1);
}

#[test]
fn update_before_any_selection_changes_nothing() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);
    let before = bridge
        .render_mut()
        .unwrap()
        .document()
        .outer_html()
        .unwrap();

    let update = ElementUpdate::default()
        .with_text("Hijacked")
        .with_style(StyleProperty::Color, "red");
    assert_eq!(bridge.request_update(update), Dispatch::Sent);
    bridge.tick();

    let after = bridge
        .render_mut()
        .unwrap()
        .document()
        .outer_html()
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn edits_persist_through_snapshot() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);
    select(&mut bridge, "h1");

    let mut panel = bridge.editor_panel().expect("panel visible");
    assert_eq!(panel.text(), "Acme");
    panel.set_text("Acme Corp");
    panel.set_class_name("text-4xl font-bold");
    panel.set_style(StyleProperty::BackgroundColor, "#fef3c7");
    assert_eq!(bridge.apply_panel(&mut panel), Dispatch::Sent);
    bridge.tick();

    let snapshot = bridge.get_snapshot().unwrap();
    assert_clean(&snapshot);
    assert!(snapshot.contains(
        r##"<h1 class="text-4xl font-bold" style="background-color: #fef3c7;">Acme Corp</h1>"##
    ));
}

#[test]
fn clicks_by_path_match_reported_paths() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);
    select(&mut bridge, "main p");
    let path = bridge.selection().unwrap().path.clone();
    assert_eq!(path, ElementPath(vec![1, 1, 0]));

    bridge.request_clear_selection();
    bridge.tick();
    bridge
        .render_mut()
        .unwrap()
        .click(&path, MouseButton::Main);
    bridge.tick();
    assert_eq!(bridge.selection().unwrap().text, "Fast and simple.");
}

#[test]
fn link_clicks_are_prevented() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);
    let outcome = bridge
        .render_mut()
        .unwrap()
        .click_selector("header a", MouseButton::Main);
    assert!(outcome.default_prevented);
    assert!(outcome.propagation_stopped);
}

#[test]
fn late_selection_after_clear_wins() {
    let mut bridge = HostBridge::default();
    bridge.mount(LANDING);

    // the click is posted before the host's clear request is processed
    bridge
        .render_mut()
        .unwrap()
        .click_selector("h1", MouseButton::Main);
    bridge.request_clear_selection();
    bridge.tick();

    assert!(bridge.selection().is_some());
    assert_eq!(marked_count(&mut bridge), 0);
    assert_clean(&bridge.get_snapshot().unwrap());
}

const STYLED: &str = r#"<html><head></head><body><div style="background-image: url(data:image/png;base64,AAAA); color: red">Hero</div><p style='font-family: "A;B", serif;'>Quote</p></body></html>"#;

#[test]
fn inline_styles_survive_select_clear_and_save() {
    let mut untouched = HostBridge::default();
    untouched.mount(STYLED);
    let expected = untouched.get_snapshot().unwrap();
    assert!(expected.contains(
        r#"<div style="background-image: url(data:image/png;base64,AAAA); color: red">Hero</div>"#
    ));
    assert!(expected.contains(r#"<p style="font-family: &quot;A;B&quot;, serif;">Quote</p>"#));

    let mut bridge = HostBridge::default();
    bridge.mount(STYLED);
    select(&mut bridge, "div");
    assert_eq!(
        bridge.selection().unwrap().styles.color.as_deref(),
        Some("red")
    );
    select(&mut bridge, "p");
    bridge.request_clear_selection();
    bridge.tick();
    assert_eq!(bridge.get_snapshot().unwrap(), expected);

    // saving with a live selection
    bridge.mount(STYLED);
    select(&mut bridge, "div");
    assert_eq!(bridge.get_snapshot().unwrap(), expected);
    bridge.mount(STYLED);
    select(&mut bridge, "p");
    assert_eq!(bridge.get_snapshot().unwrap(), expected);
}
