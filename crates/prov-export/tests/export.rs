//! Export entry point: archive contents, licensing, destinations

use pretty_assertions::assert_eq;
use prov_archive::{inspect_archive, ArchiveError, ArchiveFormat, ArchiveReader};
use prov_export::{
    export, export_tree, ExportError, ExportOptions, ExportSeed, LicensePolicy, LicensingError,
    PolicySide,
};
use prov_model::NewNode;
use prov_store::{InMemoryStore, Store};
use prov_test_utils::{calc_with_io, group_of, init_tracing, multi_user_chain, OTHER_USER};

#[test]
fn archive_holds_closure_records_and_payloads() {
    init_tracing();
    let store = InMemoryStore::new();
    let ids = calc_with_io(&store, None);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("export.aiida");

    let report = export(&store, &[ExportSeed::node(ids.output)], &dest, &ExportOptions::default()).unwrap();
    assert_eq!(report.format, ArchiveFormat::TarGz);
    assert_eq!(report.counts.nodes, 3);
    assert_eq!(report.counts.links, 2);
    assert_eq!(report.counts.files, 2);

    let reader = ArchiveReader::open(&dest).unwrap();
    let data = reader.read_data().unwrap();
    let calc = data.nodes.iter().find(|n| n.uuid == ids.calc).unwrap();
    let repo = reader.load_repository(calc, true).unwrap();
    assert_eq!(repo.get("aiida.in"), Some(&b"&control calculation='relax' /"[..]));
}

#[test]
fn zip_export_by_extension_and_by_option() {
    let store = InMemoryStore::new();
    let ids = calc_with_io(&store, None);
    let dir = tempfile::tempdir().unwrap();

    let by_ext = export(
        &store,
        &[ExportSeed::node(ids.calc)],
        &dir.path().join("export.zip"),
        &ExportOptions::default(),
    )
    .unwrap();
    assert_eq!(by_ext.format, ArchiveFormat::Zip);

    let dest = dir.path().join("export.aiida");
    let by_option = export(
        &store,
        &[ExportSeed::node(ids.calc)],
        &dest,
        &ExportOptions::default().with_format(ArchiveFormat::Zip),
    )
    .unwrap();
    assert_eq!(by_option.format, ArchiveFormat::Zip);
    assert_eq!(ArchiveFormat::detect(&dest).unwrap(), ArchiveFormat::Zip);
}

#[test]
fn allow_list_violation_writes_nothing() {
    let store = InMemoryStore::new();
    let node = store
        .create_node(NewNode::data("data.structure").with_license("CC0"))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("export.aiida");

    let options = ExportOptions::default().with_license(LicensePolicy::new().allow(["GPL"]));
    let err = export(&store, &[ExportSeed::node(node.uuid())], &dest, &options).unwrap_err();
    match err {
        ExportError::Licensing(LicensingError::NotAllowed { node: n, license }) => {
            assert_eq!(n, node.uuid());
            assert_eq!(license, "CC0");
        }
        other => panic!("expected licensing error, got {other:?}"),
    }
    assert!(!dest.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn license_checks_cover_the_whole_closure() {
    let store = InMemoryStore::new();
    let ids = calc_with_io(&store, None);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("export.aiida");

    // nodes of the fixture declare no license
    let options = ExportOptions::default().with_license(LicensePolicy::new().allow(["GPL"]));
    let err = export(&store, &[ExportSeed::node(ids.output)], &dest, &options).unwrap_err();
    assert!(matches!(err, ExportError::Licensing(LicensingError::Missing { .. })));

    let options = ExportOptions::default().with_license(LicensePolicy::new().forbid(["GPL"]));
    assert!(export(&store, &[ExportSeed::node(ids.output)], &dest, &options).is_ok());
}

#[test]
fn forbidden_and_predicate_policies() {
    let store = InMemoryStore::new();
    let gpl = store
        .create_node(NewNode::data("data.structure").with_license("GPL"))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("export.aiida");
    let seeds = [ExportSeed::node(gpl.uuid())];

    let forbid = ExportOptions::default().with_license(LicensePolicy::new().forbid(["GPL"]));
    let err = export(&store, &seeds, &dest, &forbid).unwrap_err();
    match err {
        ExportError::Licensing(e) => assert_eq!(e.side(), PolicySide::Forbidden),
        other => panic!("expected licensing error, got {other:?}"),
    }

    let crashing =
        ExportOptions::default().with_license(LicensePolicy::new().allow_if(|_| Err("boom".into())));
    let err = export(&store, &seeds, &dest, &crashing).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Licensing(LicensingError::PredicateFailed { side: PolicySide::Allowed, .. })
    ));
    assert!(!dest.exists());

    let accepting = ExportOptions::default()
        .with_license(LicensePolicy::new().allow_if(|l| Ok(l.contains("GPL"))));
    assert!(export(&store, &seeds, &dest, &accepting).is_ok());
}

#[test]
fn existing_destination_needs_overwrite() {
    let store = InMemoryStore::new();
    let ids = calc_with_io(&store, None);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("export.aiida");
    std::fs::write(&dest, b"keep me").unwrap();

    let err = export(&store, &[ExportSeed::node(ids.calc)], &dest, &ExportOptions::default()).unwrap_err();
    assert!(matches!(err, ExportError::Archive(ArchiveError::DestinationExists(_))));
    assert_eq!(std::fs::read(&dest).unwrap(), b"keep me");

    let options = ExportOptions::default().with_overwrite(true);
    export(&store, &[ExportSeed::node(ids.calc)], &dest, &options).unwrap();
    assert_eq!(inspect_archive(&dest).unwrap().counts.nodes, 3);
}

#[test]
fn unknown_seed_is_reported() {
    let store = InMemoryStore::new();
    let dir = tempfile::tempdir().unwrap();
    let err = export(
        &store,
        &[ExportSeed::node(prov_model::NodeUuid::new())],
        &dir.path().join("x.aiida"),
        &ExportOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ExportError::UnknownSeed { .. }));
}

#[test]
fn tree_export_writes_plain_layout() {
    let store = InMemoryStore::new();
    let chain = multi_user_chain(&store, "first@prov.test", OTHER_USER);
    let group = group_of(&store, "chain", &[chain.sd3]);
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");

    let counts = export_tree(&store, &[ExportSeed::group(group)], &tree, &ExportOptions::default()).unwrap();
    assert_eq!(counts.nodes, 5);
    assert_eq!(counts.groups, 1);
    assert_eq!(counts.users, 2);
    assert!(tree.join(prov_archive::METADATA_FILE).is_file());
    assert!(tree.join(prov_archive::DATA_FILE).is_file());

    let data = ArchiveReader::open(&tree).unwrap().read_data().unwrap();
    assert_eq!(data.groups[0].members, vec![chain.sd3]);

    // a second tree export into the same folder is refused
    let again = export_tree(&store, &[ExportSeed::group(group)], &tree, &ExportOptions::default());
    assert!(matches!(again, Err(ExportError::Archive(ArchiveError::DestinationExists(_)))));
}
