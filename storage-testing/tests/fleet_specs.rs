use storage_contracts::{PartitionBackend, TableProbe};
use storage_testing::spec::{labeled_tables, specs_root};
use storage_testing::{FleetSpec, load_by_name};
use storage_types::PartitionTableType;

fn all_specs() -> Vec<FleetSpec> {
    let mut names: Vec<String> = std::fs::read_dir(specs_root())
        .expect("read lab-specs")
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            (path.extension()? == "toml")
                .then(|| path.file_stem()?.to_str().map(str::to_string))
                .flatten()
        })
        .collect();
    names.sort();
    names
        .iter()
        .map(|name| load_by_name(name).expect("spec should load"))
        .collect()
}

#[test]
fn every_shipped_spec_is_valid() {
    let specs = all_specs();
    assert!(specs.len() >= 4);
    for spec in specs {
        assert!(!spec.disks.is_empty(), "{} has no disks", spec.name);
    }
}

#[test]
fn backend_reflects_spec() {
    let spec = load_by_name("mixed-fleet").unwrap();
    let backend = spec.backend();

    let devices = backend.list_devices().unwrap();
    let paths: Vec<&str> = devices.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec!["/dev/sda", "/dev/sdb", "/dev/sdc", "/dev/nvme0n1"]);
    assert_eq!(devices[3].sector_size, 4096);

    let TableProbe::Existing(sdb) = backend.read_table(&devices[1]).unwrap() else {
        panic!("/dev/sdb should carry a table");
    };
    assert_eq!(sdb.table_type, PartitionTableType::Msdos);
    assert_eq!(sdb.partitions.len(), 4);
    assert_eq!(sdb.next_number(), None);

    assert_eq!(backend.read_table(&devices[3]).unwrap(), TableProbe::Absent);
}

#[test]
fn labeled_tables_skip_blank_disks() {
    let spec = load_by_name("mixed-fleet").unwrap();
    let tables = labeled_tables(&spec);
    assert_eq!(tables.len(), 3);
    assert!(tables.iter().all(|t| !t.fresh));
}
