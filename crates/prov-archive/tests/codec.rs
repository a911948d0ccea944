//! Archive codec integration tests

use chrono::{FixedOffset, TimeZone};
use pretty_assertions::assert_eq;
use prov_archive::{
    export_tree, inspect_archive, pack_directory, write_archive, ArchiveContents, ArchiveData,
    ArchiveError, ArchiveFormat, ArchiveReader, GroupRecord, NodeRecord, WriteOptions,
    CURRENT_VERSION, DATA_FILE, METADATA_FILE,
};
use prov_model::{
    AttributeValue, ComputeEndpoint, Group, Link, LinkKind, NewNode, Node, NodeUuid, Repository,
    User,
};
use std::collections::BTreeMap;
use std::fs;

fn sample_contents() -> ArchiveContents {
    let tz = FixedOffset::east_opt(2 * 3600).unwrap();
    let when = tz.with_ymd_and_hms(2017, 3, 4, 12, 30, 0).unwrap();

    let mut nested = BTreeMap::new();
    nested.insert(
        "a".to_string(),
        AttributeValue::List(vec![AttributeValue::Integer(1), AttributeValue::Float(2.5)]),
    );

    let computer = ComputeEndpoint::new("localhost", "localhost");
    let input = Node::stored(
        NewNode::data("data.parameter")
            .with_attribute("str", "hello")
            .with_attribute("int", 42_i64)
            .with_attribute("float", 3.0_f64)
            .with_attribute("bool", true)
            .with_attribute("when", when)
            .with_attribute("nested", nested)
            .with_user("a@x.org"),
    );
    let repo = Repository::new()
        .with_file("aiida.in", b"input file".to_vec())
        .unwrap()
        .with_file("out/aiida.out", b"output".to_vec())
        .unwrap();
    let calc = Node::stored(
        NewNode::calculation("calculation.job")
            .with_computer(computer.uuid)
            .with_user("a@x.org")
            .with_repository(repo.clone()),
    );
    let group = Group::new("test group").with_user("a@x.org");

    let data = ArchiveData {
        nodes: vec![NodeRecord::from_node(&input), NodeRecord::from_node(&calc)],
        links: vec![Link::new(input.uuid(), calc.uuid(), "parameters", LinkKind::Input)],
        groups: vec![GroupRecord {
            group,
            members: vec![input.uuid()],
        }],
        users: vec![User::new("a@x.org").with_name("Ada", "L")],
        computers: vec![computer],
    };
    let mut payloads = BTreeMap::new();
    payloads.insert(calc.uuid(), repo);
    ArchiveContents::new(data, payloads)
}

fn calc_record(data: &ArchiveData) -> &NodeRecord {
    data.nodes
        .iter()
        .find(|n| !n.files.is_empty())
        .unwrap()
}

#[test]
fn round_trip_through_both_containers() {
    for (name, format) in [("export.aiida", ArchiveFormat::TarGz), ("export.zip", ArchiveFormat::Zip)] {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join(name);
        let contents = sample_contents();

        let written = write_archive(&contents, &dest, WriteOptions::default()).unwrap();
        assert_eq!(written.format, format);
        assert_eq!(ArchiveFormat::detect(&dest).unwrap(), format);

        let reader = ArchiveReader::open(&dest).unwrap();
        assert_eq!(reader.metadata().export_version.as_str(), CURRENT_VERSION);
        assert_eq!(reader.metadata().counts.files, 2);

        let data = reader.read_data().unwrap();
        assert_eq!(data, contents.data);

        let record = calc_record(&data);
        let repo = reader.load_repository(record, true).unwrap();
        assert_eq!(repo.get("out/aiida.out"), Some(&b"output"[..]));
    }
}

#[test]
fn format_is_detected_not_inferred() {
    let dir = tempfile::tempdir().unwrap();
    // zip container behind a misleading name
    let dest = dir.path().join("export.tar.gz");
    let options = WriteOptions::default().with_format(ArchiveFormat::Zip);
    write_archive(&sample_contents(), &dest, options).unwrap();
    assert_eq!(ArchiveFormat::detect(&dest).unwrap(), ArchiveFormat::Zip);
    assert!(ArchiveReader::open(&dest).unwrap().read_data().is_ok());
}

#[test]
fn existing_destination_requires_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("export.aiida");
    fs::write(&dest, b"precious").unwrap();

    let err = write_archive(&sample_contents(), &dest, WriteOptions::default()).unwrap_err();
    assert!(matches!(err, ArchiveError::DestinationExists(_)));
    assert_eq!(fs::read(&dest).unwrap(), b"precious");

    write_archive(&sample_contents(), &dest, WriteOptions::default().with_overwrite(true)).unwrap();
    assert!(inspect_archive(&dest).is_ok());
}

#[test]
fn inspect_reads_metadata_only() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    export_tree(&sample_contents(), &tree).unwrap();
    // a corrupt data document does not matter for inspection
    fs::write(tree.join(DATA_FILE), b"not json").unwrap();
    let dest = dir.path().join("broken.aiida");
    pack_directory(&tree, &dest, ArchiveFormat::TarGz, false).unwrap();

    let metadata = inspect_archive(&dest).unwrap();
    assert_eq!(metadata.counts.nodes, 2);
    let reader = ArchiveReader::open(&dest).unwrap();
    assert!(matches!(reader.read_data(), Err(ArchiveError::Json { .. })));
}

#[test]
fn version_gate_runs_before_data_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    export_tree(&sample_contents(), &tree).unwrap();

    let meta_path = tree.join(METADATA_FILE);
    let mut metadata: serde_json::Value = serde_json::from_slice(&fs::read(&meta_path).unwrap()).unwrap();
    metadata["export_version"] = serde_json::json!(0.0);
    fs::write(&meta_path, serde_json::to_vec(&metadata).unwrap()).unwrap();
    fs::remove_file(tree.join(DATA_FILE)).unwrap();

    let dest = dir.path().join("old.aiida");
    pack_directory(&tree, &dest, ArchiveFormat::TarGz, false).unwrap();

    match ArchiveReader::open(&dest) {
        Err(ArchiveError::UnsupportedVersion { found, .. }) => assert_eq!(found, "0.0"),
        other => panic!("expected version error, got {other:?}"),
    }
}

#[test]
fn tampered_payload_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    let contents = sample_contents();
    export_tree(&contents, &tree).unwrap();

    let record = calc_record(&contents.data).clone();
    let payload = tree.join(prov_archive::payload_entry(record.uuid, "aiida.in"));
    fs::write(&payload, b"tampered").unwrap();

    let reader = ArchiveReader::open(&tree).unwrap();
    assert!(matches!(
        reader.load_repository(&record, true),
        Err(ArchiveError::ChecksumMismatch { .. })
    ));
    let unchecked = reader.load_repository(&record, false).unwrap();
    assert_eq!(unchecked.get("aiida.in"), Some(&b"tampered"[..]));
}

#[test]
fn missing_payload_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    let contents = sample_contents();
    export_tree(&contents, &tree).unwrap();

    let mut record = calc_record(&contents.data).clone();
    record.uuid = NodeUuid::new();
    let reader = ArchiveReader::open(&tree).unwrap();
    assert!(matches!(
        reader.load_repository(&record, true),
        Err(ArchiveError::MissingEntry(_))
    ));
}

#[test]
fn escaping_tar_entries_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    export_tree(&sample_contents(), &tree).unwrap();

    // rebuild the container by hand with an extra hostile entry
    let dest = dir.path().join("evil.aiida");
    let file = fs::File::create(&dest).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_path_with_name(tree.join(METADATA_FILE), METADATA_FILE)
        .unwrap();
    let mut header = tar::Header::new_gnu();
    let payload = b"owned";
    header.set_size(payload.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    {
        let name = b"../escape.txt";
        let gnu = header.as_gnu_mut().unwrap();
        gnu.name[..name.len()].copy_from_slice(name);
    }
    header.set_cksum();
    builder.append(&header, &payload[..]).unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    assert!(matches!(
        ArchiveReader::open(&dest),
        Err(ArchiveError::UnsafePath(_))
    ));
    assert!(!dir.path().join("escape.txt").exists());
}

#[test]
fn unknown_container_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.aiida");
    fs::write(&path, b"definitely not an archive").unwrap();
    assert!(matches!(
        inspect_archive(&path),
        Err(ArchiveError::UnknownFormat(_))
    ));
}
