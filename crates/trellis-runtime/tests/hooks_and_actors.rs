mod common;

use common::{ops, render, render_msg, runtime, single_batch};
use std::cell::RefCell;
use std::time::Duration;
use trellis_core::{
    Cleanup, Component, Element, ErrorCode, Props, RenderCx, RenderResult, Setter, Strategy, Value,
};
use trellis_runtime::{Inbound, LoopState, Mutation, RecordingPort, Runtime, RuntimeConfig};

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static SETTER: RefCell<Option<Setter<i64>>> = const { RefCell::new(None) };
}

fn log(line: String) {
    LOG.with(|l| l.borrow_mut().push(line));
}

fn counter(cx: &mut RenderCx<'_>, props: &Props, _: &[Element]) -> RenderResult {
    let count = props.get("count").and_then(Value::as_int).unwrap_or(0);
    cx.use_effect(Some(vec![Value::from(count)]), move || {
        log(format!("effect {}", count));
        let cleanup: Cleanup = Box::new(move || log(format!("cleanup {}", count)));
        Some(cleanup)
    });
    Ok(vec![Element::host("span").prop("count", count)])
}

const COUNTER: Component = Component::new("Counter", counter);

fn clicker(cx: &mut RenderCx<'_>, _: &Props, _: &[Element]) -> RenderResult {
    let (clicks, set_clicks) = cx.use_state(|| 0i64);
    SETTER.with(|s| *s.borrow_mut() = Some(set_clicks));
    Ok(vec![Element::host("button").prop("clicks", clicks)])
}

const CLICKER: Component = Component::new("Clicker", clicker);

fn panel(cx: &mut RenderCx<'_>, _: &Props, _: &[Element]) -> RenderResult {
    let renders = cx.use_ref(|| 0usize);
    *renders.borrow_mut() += 1;
    let text = match cx.use_actor("panel") {
        Some(envelope) => envelope.message.as_str().unwrap_or_default().to_string(),
        None => "idle".to_string(),
    };
    Ok(vec![Element::host("section").prop("text", text)])
}

const PANEL: Component = Component::new("Panel", panel);

fn slow(_: &mut RenderCx<'_>, _: &Props, _: &[Element]) -> RenderResult {
    std::thread::sleep(Duration::from_millis(2));
    Ok(vec![Element::host("p")])
}

const SLOW: Component = Component::new("Slow", slow);

/// Runtime whose passes span several slices
fn sliced() -> Runtime<RecordingPort> {
    let config = RuntimeConfig {
        time_slice_ms: 1,
        ..RuntimeConfig::default()
    };
    Runtime::init(config, RecordingPort::new()).unwrap()
}

fn busy(first: Component) -> Element {
    Element::host("main")
        .child(Element::component(first))
        .child(Element::component(SLOW))
        .child(Element::component(SLOW))
}

/// Committed value of `key` on the first host node tagged `tag`
fn host_prop(rt: &Runtime<RecordingPort>, tag: &str, key: &str) -> Option<Value> {
    let tree = rt.context().tree();
    let root = tree.current()?;
    tree.preorder(root)
        .into_iter()
        .find(|&k| tree[k].kind.host_tag() == Some(tag))
        .and_then(|k| tree[k].props.get(key).cloned())
}

fn send(rt: &mut Runtime<RecordingPort>, text: &str) {
    rt.dispatch(Inbound::SendMessage {
        source_id: "toolbar".into(),
        target_id: "panel".into(),
        message: Value::from(text),
    })
    .unwrap();
}

fn with_count(count: i64) -> Element {
    Element::host("main").child(Element::component(COUNTER).prop("count", count))
}

#[test]
fn test_effect_cleanup_runs_before_next_effect_and_on_unmount() {
    let mut rt = runtime(Strategy::Full);
    render(&mut rt, with_count(0));
    render(&mut rt, with_count(0));
    render(&mut rt, with_count(1));
    render(&mut rt, Element::host("main"));

    let lines = LOG.with(|l| l.borrow().clone());
    assert_eq!(lines, vec!["effect 0", "cleanup 0", "effect 1", "cleanup 1"]);
}

#[test]
fn test_effects_reported_on_commit() {
    let mut rt = runtime(Strategy::Full);
    render(&mut rt, with_count(3));
    assert_eq!(rt.last_commit().unwrap().effects_run, 1);
    render(&mut rt, with_count(3));
    assert_eq!(rt.last_commit().unwrap().effects_run, 0);
}

#[test]
fn test_state_setter_schedules_rerender() {
    let mut rt = runtime(Strategy::Full);
    render(&mut rt, Element::host("main").child(Element::component(CLICKER)));

    SETTER.with(|s| s.borrow().as_ref().unwrap().set(5));
    rt.run_until_idle().unwrap();

    let mutations = single_batch(rt.port_mut().drain());
    assert_eq!(ops(&mutations), vec![("UPDATE", vec![0, 0])]);
    match &mutations[0] {
        Mutation::Update { props, .. } => assert_eq!(props["clicks"], Value::Int(5)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_actor_sees_latest_message() {
    let mut rt = runtime(Strategy::Full);
    let first = single_batch(render(
        &mut rt,
        Element::host("main").child(Element::component(PANEL)),
    ));
    assert_eq!(ops(&first), vec![("INSERT", vec![0]), ("INSERT", vec![0, 0])]);
    assert!(rt.actor("panel").is_some());
    assert_eq!(rt.last_commit().unwrap().refs_attached, 1);

    for text in ["first", "second"] {
        rt.dispatch(Inbound::SendMessage {
            source_id: "toolbar".into(),
            target_id: "panel".into(),
            message: Value::from(text),
        })
        .unwrap();
    }
    rt.run_until_idle().unwrap();

    let mutations = single_batch(rt.port_mut().drain());
    match &mutations[..] {
        [Mutation::Update {
            child_path,
            old_props,
            props,
        }] => {
            assert_eq!(child_path, &vec![0, 0]);
            assert_eq!(old_props["text"].as_str(), Some("idle"));
            assert_eq!(props["text"].as_str(), Some("second"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_actor_unregisters_with_its_node() {
    let mut rt = runtime(Strategy::Full);
    render(&mut rt, Element::host("main").child(Element::component(PANEL)));
    render(&mut rt, Element::host("main"));
    assert!(rt.actor("panel").is_none());

    let err = rt
        .dispatch(Inbound::SendMessage {
            source_id: "toolbar".into(),
            target_id: "panel".into(),
            message: Value::Null,
        })
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ActorNotRegistered));
}

#[test]
fn test_state_update_survives_preempted_pass() {
    let mut rt = sliced();
    render(&mut rt, busy(CLICKER));
    render(&mut rt, busy(CLICKER));

    SETTER.with(|s| s.borrow().as_ref().unwrap().set(5));
    // the re-render starts and stops partway through the slow siblings
    assert_eq!(rt.run_slice().unwrap(), LoopState::Running);
    rt.dispatch(Inbound::Render {
        element: busy(CLICKER),
        transition_id: None,
        high_priority: true,
    })
    .unwrap();
    rt.run_until_idle().unwrap();
    assert_eq!(host_prop(&rt, "button", "clicks"), Some(Value::Int(5)));

    // committed updates are not replayed
    SETTER.with(|s| s.borrow().as_ref().unwrap().update(|n| n + 1));
    rt.run_until_idle().unwrap();
    assert_eq!(host_prop(&rt, "button", "clicks"), Some(Value::Int(6)));
    render(&mut rt, busy(CLICKER));
    assert_eq!(host_prop(&rt, "button", "clicks"), Some(Value::Int(6)));
}

#[test]
fn test_message_sent_mid_pass_reaches_actor() {
    let mut rt = sliced();
    render(&mut rt, busy(PANEL));
    render(&mut rt, busy(PANEL));

    rt.dispatch(render_msg(busy(PANEL))).unwrap();
    assert_eq!(rt.run_slice().unwrap(), LoopState::Running);
    send(&mut rt, "hello");
    rt.run_until_idle().unwrap();

    assert_eq!(host_prop(&rt, "section", "text"), Some(Value::from("hello")));
}

#[test]
fn test_message_sent_during_message_pass_wins() {
    let mut rt = sliced();
    render(&mut rt, busy(PANEL));

    send(&mut rt, "first");
    assert_eq!(rt.run_slice().unwrap(), LoopState::Running);
    send(&mut rt, "second");
    rt.run_until_idle().unwrap();
    assert_eq!(host_prop(&rt, "section", "text"), Some(Value::from("second")));

    send(&mut rt, "third");
    rt.run_until_idle().unwrap();
    assert_eq!(host_prop(&rt, "section", "text"), Some(Value::from("third")));
}
