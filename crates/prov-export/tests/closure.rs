//! Closure traversal rules

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use prov_export::{ClosureBuilder, ExportSeed, ReturnLinkPolicy};
use prov_model::{Link, LinkKind, NewNode, NodeUuid};
use prov_store::{ChangeSet, InMemoryStore, Store};
use prov_test_utils::{
    calc_with_io, group_of, init_tracing, multi_user_chain, workflow_with_calls, OTHER_USER,
};
use std::collections::{BTreeSet, HashSet};

fn uuids(graph: &prov_export::ProvenanceGraph) -> HashSet<NodeUuid> {
    graph.node_uuids().collect()
}

#[test]
fn data_pulls_in_creator_and_its_inputs() {
    init_tracing();
    let store = InMemoryStore::new();
    let ids = calc_with_io(&store, None);

    let graph = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(ids.output)])
        .unwrap();
    assert_eq!(uuids(&graph), HashSet::from([ids.input, ids.calc, ids.output]));
    assert_eq!(graph.link_count(), 2);
}

#[test]
fn input_data_alone_does_not_pull_consumers() {
    let store = InMemoryStore::new();
    let ids = calc_with_io(&store, None);

    let graph = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(ids.input)])
        .unwrap();
    assert_eq!(uuids(&graph), HashSet::from([ids.input]));
    assert_eq!(graph.link_count(), 0);
}

#[test]
fn calculation_pulls_outputs_only_when_asked() {
    let store = InMemoryStore::new();
    let ids = calc_with_io(&store, None);

    let with_outputs = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(ids.calc)])
        .unwrap();
    assert!(with_outputs.contains(ids.output));

    let without = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(ids.calc).without_outputs()])
        .unwrap();
    assert_eq!(uuids(&without), HashSet::from([ids.input, ids.calc]));
}

#[test]
fn last_node_of_chain_pulls_everything() {
    let store = InMemoryStore::new();
    let chain = multi_user_chain(&store, "first@prov.test", OTHER_USER);

    let graph = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(chain.sd3)])
        .unwrap();
    assert_eq!(uuids(&graph), chain.all().into_iter().collect());
    assert_eq!(graph.link_count(), 4);

    let emails: BTreeSet<_> = graph.users().iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, BTreeSet::from(["first@prov.test", OTHER_USER]));
}

#[test]
fn call_links_never_expand_the_closure() {
    let store = InMemoryStore::new();
    let wf = workflow_with_calls(&store);

    let graph = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(wf.d_out)])
        .unwrap();
    assert_eq!(uuids(&graph), HashSet::from([wf.d_in, wf.calc, wf.d_out]));
    assert!(!graph.contains(wf.workflow));
    assert!(!graph.contains(wf.sibling));

    let graph = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(wf.workflow)])
        .unwrap();
    assert_eq!(uuids(&graph), HashSet::from([wf.d_in, wf.workflow]));
    assert_eq!(graph.links_of_kind(LinkKind::Call).count(), 0);
}

#[test]
fn call_and_return_links_kept_between_selected_nodes() {
    let store = InMemoryStore::new();
    let wf = workflow_with_calls(&store);
    let seeds = [ExportSeed::node(wf.workflow), ExportSeed::node(wf.d_out)];

    let graph = ClosureBuilder::new(&store).build(&seeds).unwrap();
    assert_eq!(graph.links_of_kind(LinkKind::Call).count(), 1);
    assert_eq!(graph.links_of_kind(LinkKind::Return).count(), 1);
    // d_in -> wf, d_in -> calc, calc -> d_out, wf -> calc, wf -> d_out
    assert_eq!(graph.link_count(), 5);

    let omitted = ClosureBuilder::new(&store)
        .with_return_links(ReturnLinkPolicy::Omit)
        .build(&seeds)
        .unwrap();
    assert_eq!(omitted.links_of_kind(LinkKind::Return).count(), 0);
    assert_eq!(omitted.node_count(), graph.node_count());
}

#[test]
fn return_link_dropped_when_data_not_selected() {
    let store = InMemoryStore::new();
    let wf = workflow_with_calls(&store);

    let graph = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(wf.workflow)])
        .unwrap();
    assert!(!graph.contains(wf.d_out));
    assert_eq!(graph.links_of_kind(LinkKind::Return).count(), 0);
}

#[test]
fn group_seed_expands_members_and_keeps_membership() {
    let store = InMemoryStore::new();
    let chain = multi_user_chain(&store, "first@prov.test", OTHER_USER);
    let group = group_of(&store, "selection", &[chain.sd2]);

    let graph = ClosureBuilder::new(&store)
        .build(&[ExportSeed::group(group)])
        .unwrap();
    assert_eq!(uuids(&graph), HashSet::from([chain.sd1, chain.jc1, chain.sd2]));
    assert_eq!(graph.groups().len(), 1);
    assert_eq!(graph.groups()[0].members, vec![chain.sd2]);
    assert_eq!(graph.groups()[0].group.name, "selection");
}

#[test]
fn computers_of_selected_nodes_are_included() {
    let store = InMemoryStore::new();
    let calc = prov_test_utils::calc_on_computer(&store, prov_test_utils::computer("cluster"));

    let graph = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(calc)])
        .unwrap();
    assert_eq!(graph.computers().len(), 1);
    assert_eq!(graph.computers()[0].name, "cluster");
}

const DATA: usize = 8;
const CALCS: usize = 6;

#[derive(Debug, Clone)]
struct RandomGraph {
    inputs: BTreeSet<(usize, usize)>,
    creators: Vec<Option<usize>>,
    calls: BTreeSet<(usize, usize)>,
}

fn random_graph() -> impl Strategy<Value = RandomGraph> {
    (
        prop::collection::btree_set((0..DATA, 0..CALCS), 0..16),
        prop::collection::vec(prop::option::of(0..CALCS), DATA),
        prop::collection::btree_set((0..CALCS, 0..CALCS), 0..10),
    )
        .prop_map(|(inputs, creators, calls)| RandomGraph {
            inputs,
            creators,
            calls: calls.into_iter().filter(|(a, b)| a != b).collect(),
        })
}

/// Seed `spec` into a fresh store; CALL links only when `with_calls`
fn seed(spec: &RandomGraph, data: &[NodeUuid], calcs: &[NodeUuid], with_calls: bool) -> InMemoryStore {
    let store = InMemoryStore::new();
    let mut changes = ChangeSet::new();
    for uuid in data {
        changes.add_node(NewNode::data("data.int").with_uuid(*uuid));
    }
    for uuid in calcs {
        changes.add_node(NewNode::calculation("calculation.job").with_uuid(*uuid));
    }
    for &(d, c) in &spec.inputs {
        changes.add_link(Link::new(data[d], calcs[c], format!("in_{d}"), LinkKind::Input));
    }
    for (d, creator) in spec.creators.iter().enumerate() {
        if let Some(c) = creator {
            changes.add_link(Link::new(calcs[*c], data[d], "out", LinkKind::Create));
        }
    }
    if with_calls {
        for &(a, b) in &spec.calls {
            changes.add_link(Link::new(calcs[a], calcs[b], format!("call_{a}"), LinkKind::Call));
        }
    }
    store.commit(changes).unwrap();
    store
}

proptest! {
    #[test]
    fn closure_invariants(spec in random_graph(), seed_idx in 0..(DATA + CALCS), follow in any::<bool>()) {
        let data: Vec<NodeUuid> = (0..DATA).map(|_| NodeUuid::new()).collect();
        let calcs: Vec<NodeUuid> = (0..CALCS).map(|_| NodeUuid::new()).collect();
        let seed_uuid = if seed_idx < DATA { data[seed_idx] } else { calcs[seed_idx - DATA] };
        let mut export_seed = ExportSeed::node(seed_uuid);
        if !follow {
            export_seed = export_seed.without_outputs();
        }

        let with_calls = seed(&spec, &data, &calcs, true);
        let without_calls = seed(&spec, &data, &calcs, false);
        let graph = ClosureBuilder::new(&with_calls).build(&[export_seed]).unwrap();
        let reference = ClosureBuilder::new(&without_calls).build(&[export_seed]).unwrap();

        // seeds are always selected
        prop_assert!(graph.contains(seed_uuid));
        // exported links never dangle
        for link in graph.links() {
            prop_assert!(graph.contains(link.source) && graph.contains(link.target));
        }
        // CALL links never change which nodes are selected
        prop_assert_eq!(uuids(&graph), uuids(&reference));
        // every link between selected nodes is exported
        let expected = with_calls
            .all_links()
            .into_iter()
            .filter(|l| graph.contains(l.source) && graph.contains(l.target))
            .count();
        prop_assert_eq!(graph.link_count(), expected);
    }
}

#[test]
fn closure_is_deterministic() {
    let store = InMemoryStore::new();
    let chain = multi_user_chain(&store, "first@prov.test", OTHER_USER);
    let a: Vec<_> = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(chain.sd3)])
        .unwrap()
        .node_uuids()
        .collect();
    let b: Vec<_> = ClosureBuilder::new(&store)
        .build(&[ExportSeed::node(chain.sd3)])
        .unwrap()
        .node_uuids()
        .collect();
    assert_eq!(a, b);
    assert_eq!(store.get_node(a[0]).unwrap().map(|n| n.uuid()), Some(chain.sd3));
}
