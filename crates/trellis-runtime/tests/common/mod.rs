#![allow(dead_code)]

use trellis_core::{Component, Element, Props, RenderCx, RenderResult, Strategy};
use trellis_runtime::{Inbound, Mutation, Outbound, RecordingPort, Runtime, RuntimeConfig};

pub fn runtime(strategy: Strategy) -> Runtime<RecordingPort> {
    let config = RuntimeConfig {
        default_strategy: strategy,
        ..RuntimeConfig::default()
    };
    Runtime::init(config, RecordingPort::new()).unwrap()
}

fn fragment(_: &mut RenderCx<'_>, _: &Props, children: &[Element]) -> RenderResult {
    Ok(children.to_vec())
}

/// Component that renders its children in place
pub const FRAGMENT: Component = Component::new("Fragment", fragment);

pub fn render_msg(element: Element) -> Inbound {
    Inbound::Render {
        element,
        transition_id: None,
        high_priority: false,
    }
}

/// Render `element` to completion and return the messages it produced
pub fn render(rt: &mut Runtime<RecordingPort>, element: Element) -> Vec<Outbound> {
    rt.dispatch(render_msg(element)).unwrap();
    rt.run_until_idle().unwrap();
    rt.port_mut().drain()
}

/// Mutations of the only message produced
pub fn single_batch(messages: Vec<Outbound>) -> Vec<Mutation> {
    assert_eq!(messages.len(), 1, "expected one commit, got {:?}", messages);
    messages[0].mutations().to_vec()
}

pub fn ops(mutations: &[Mutation]) -> Vec<(&'static str, Vec<usize>)> {
    mutations.iter().map(|m| (m.op(), m.path().clone())).collect()
}

pub fn count(mutations: &[Mutation], op: &str) -> usize {
    mutations.iter().filter(|m| m.op() == op).count()
}
