//! Testing utilities for PROV workspace
//!
//! Shared fixtures: small provenance graphs seeded into an in-memory store,
//! plus one-time tracing setup.

#![allow(missing_docs)]

use once_cell::sync::OnceCell;
use prov_model::{
    AttributeValue, ComputeEndpoint, Group, GroupUuid, JsonObject, Link, LinkKind, NewNode, NodeUuid, Repository,
    User,
};
use prov_store::{ChangeSet, InMemoryStore, Store};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Install a `RUST_LOG`-driven fmt subscriber once per test binary
pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fallback owner used by import tests
pub const DEFAULT_USER: &str = "default@prov.test";
/// Second owner for attribution tests
pub const OTHER_USER: &str = "other@prov.test";

/// Store with the default user already created
pub fn store_with_default_user() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.create_user(User::new(DEFAULT_USER)).unwrap();
    store
}

/// Compute endpoint with non-trivial metadata and transport parameters
pub fn computer(name: &str) -> ComputeEndpoint {
    let mut metadata = JsonObject::new();
    metadata.insert("shebang".into(), json!("#!/bin/bash"));
    metadata.insert("workdir".into(), json!("/scratch/{username}/aiida_run/"));
    metadata.insert("append_text".into(), json!("## ending text"));
    let mut params = JsonObject::new();
    params.insert("compress".into(), json!(true));
    params.insert("port".into(), json!(22));
    params.insert("gss_host".into(), json!(format!("{name}.example.org")));
    ComputeEndpoint::new(name, format!("{name}.example.org"))
        .with_plugins("ssh", "pbspro")
        .with_metadata(metadata)
        .with_transport_params(params)
}

/// `input -INPUT-> calc -CREATE-> output`
#[derive(Debug, Clone, Copy)]
pub struct CalcFixture {
    /// Input data
    pub input: NodeUuid,
    /// Calculation
    pub calc: NodeUuid,
    /// Created data
    pub output: NodeUuid,
}

/// Seed a job calculation with one input and one output
pub fn calc_with_io(store: &impl Store, user: Option<&str>) -> CalcFixture {
    let owned = |node: NewNode| match user {
        Some(email) => node.with_user(email),
        None => node,
    };
    let input = owned(
        NewNode::data("data.parameter")
            .with_label("parameters")
            .with_attribute("ecutwfc", 30.0_f64)
            .with_attribute("nspin", 2_i64),
    );
    let calc = owned(
        NewNode::calculation("calculation.job.pw")
            .with_label("relax")
            .with_repository(
                Repository::new()
                    .with_file("aiida.in", b"&control calculation='relax' /".to_vec())
                    .unwrap()
                    .with_file("_aiidasubmit.sh", b"#!/bin/bash\npw.x < aiida.in".to_vec())
                    .unwrap(),
            ),
    );
    let output = owned(
        NewNode::data("data.parameter")
            .with_label("output_parameters")
            .with_attribute("energy", -3.5_f64)
            .with_attribute("converged", true),
    );
    let ids = CalcFixture {
        input: input.uuid,
        calc: calc.uuid,
        output: output.uuid,
    };
    store
        .commit(
            ChangeSet::new()
                .with_node(input)
                .with_node(calc)
                .with_node(output)
                .with_link(Link::new(ids.input, ids.calc, "parameters", LinkKind::Input))
                .with_link(Link::new(ids.calc, ids.output, "output_parameters", LinkKind::Create)),
        )
        .unwrap();
    ids
}

/// `sd1 -> jc1 -> sd2 -> jc2 -> sd3`, first half by one user, second half by another
#[derive(Debug, Clone, Copy)]
pub struct ChainFixture {
    pub sd1: NodeUuid,
    pub jc1: NodeUuid,
    pub sd2: NodeUuid,
    pub jc2: NodeUuid,
    pub sd3: NodeUuid,
}

impl ChainFixture {
    /// All five nodes in chain order
    pub fn all(&self) -> [NodeUuid; 5] {
        [self.sd1, self.jc1, self.sd2, self.jc2, self.sd3]
    }
}

/// Seed the two-user chain; creates both users if missing
pub fn multi_user_chain(store: &impl Store, first: &str, second: &str) -> ChainFixture {
    for email in [first, second] {
        if store.get_user(email).unwrap().is_none() {
            store
                .create_user(User::new(email).with_name("Test", email).with_institution("PROV"))
                .unwrap();
        }
    }
    let structure = |label: &str, user: &str| {
        NewNode::data("data.structure")
            .with_label(label)
            .with_attribute(
                "cell",
                AttributeValue::List(vec![
                    AttributeValue::Integer(1),
                    AttributeValue::Integer(2),
                    AttributeValue::Integer(3),
                ]),
            )
            .with_user(user)
    };
    let sd1 = structure("sd1", first);
    let jc1 = NewNode::calculation("calculation.job").with_label("jc1").with_user(first);
    let sd2 = structure("sd2", first);
    let jc2 = NewNode::calculation("calculation.job").with_label("jc2").with_user(second);
    let sd3 = structure("sd3", second);
    let ids = ChainFixture {
        sd1: sd1.uuid,
        jc1: jc1.uuid,
        sd2: sd2.uuid,
        jc2: jc2.uuid,
        sd3: sd3.uuid,
    };
    store
        .commit(
            ChangeSet::new()
                .with_node(sd1)
                .with_node(jc1)
                .with_node(sd2)
                .with_node(jc2)
                .with_node(sd3)
                .with_link(Link::new(ids.sd1, ids.jc1, "link", LinkKind::Input))
                .with_link(Link::new(ids.jc1, ids.sd2, "link", LinkKind::Create))
                .with_link(Link::new(ids.sd2, ids.jc2, "link", LinkKind::Input))
                .with_link(Link::new(ids.jc2, ids.sd3, "link", LinkKind::Create)),
        )
        .unwrap();
    ids
}

/// Workflow orchestrating one calculation, plus a sibling reachable only by CALL
///
/// ```text
/// d_in -INPUT-> wf -CALL-> calc -CREATE-> d_out <-RETURN- wf
/// d_in -INPUT-> calc
/// wf -CALL-> sibling -CREATE-> sibling_out
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WorkflowFixture {
    pub d_in: NodeUuid,
    pub workflow: NodeUuid,
    pub calc: NodeUuid,
    pub d_out: NodeUuid,
    pub sibling: NodeUuid,
    pub sibling_out: NodeUuid,
}

/// Seed the workflow fixture
pub fn workflow_with_calls(store: &impl Store) -> WorkflowFixture {
    let d_in = NewNode::data("data.int").with_attribute("value", 1_i64);
    let workflow = NewNode::workflow("workflow.work").with_label("wf");
    let calc = NewNode::calculation("calculation.inline").with_label("add");
    let d_out = NewNode::data("data.int").with_attribute("value", 2_i64);
    let sibling = NewNode::calculation("calculation.inline").with_label("sibling");
    let sibling_out = NewNode::data("data.int").with_attribute("value", 3_i64);
    let ids = WorkflowFixture {
        d_in: d_in.uuid,
        workflow: workflow.uuid,
        calc: calc.uuid,
        d_out: d_out.uuid,
        sibling: sibling.uuid,
        sibling_out: sibling_out.uuid,
    };
    store
        .commit(
            ChangeSet::new()
                .with_node(d_in)
                .with_node(workflow)
                .with_node(calc)
                .with_node(d_out)
                .with_node(sibling)
                .with_node(sibling_out)
                .with_link(Link::new(ids.d_in, ids.workflow, "x", LinkKind::Input))
                .with_link(Link::new(ids.d_in, ids.calc, "x", LinkKind::Input))
                .with_link(Link::new(ids.workflow, ids.calc, "CALL", LinkKind::Call))
                .with_link(Link::new(ids.calc, ids.d_out, "result", LinkKind::Create))
                .with_link(Link::new(ids.workflow, ids.d_out, "output", LinkKind::Return))
                .with_link(Link::new(ids.workflow, ids.sibling, "CALL2", LinkKind::Call))
                .with_link(Link::new(ids.sibling, ids.sibling_out, "result", LinkKind::Create)),
        )
        .unwrap();
    ids
}

/// Create a group holding `members`
pub fn group_of(store: &impl Store, name: &str, members: &[NodeUuid]) -> GroupUuid {
    let group = Group::new(name);
    let uuid = group.uuid;
    store
        .commit(ChangeSet::new().with_group(group).with_members(uuid, members.iter().copied()))
        .unwrap();
    uuid
}

/// Register a compute endpoint and bind a new calculation to it
pub fn calc_on_computer(store: &impl Store, computer: ComputeEndpoint) -> NodeUuid {
    let calc = NewNode::calculation("calculation.job")
        .with_computer(computer.uuid)
        .with_label(format!("job on {}", computer.name));
    let uuid = calc.uuid;
    store
        .commit(ChangeSet::new().with_computer(computer).with_node(calc))
        .unwrap();
    uuid
}
