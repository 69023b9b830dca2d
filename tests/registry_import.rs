// tests/registry_import.rs
// Company import: file parsing, alias conflicts, skip-existing.

use std::io::Write;
use std::path::Path;

use people_on_the_move::error::ConfigError;
use people_on_the_move::model::CompanyId;
use people_on_the_move::registry::{load_companies_from, parse_company_records};
use people_on_the_move::{import_companies, CompanyRegistry, LocalStore, Store};

#[test]
fn fixture_file_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/companies.csv");
    let cs = load_companies_from(&path).unwrap();
    assert_eq!(cs.len(), 3);

    assert_eq!(cs[0].id, CompanyId::from_name("Tyson Foods"));
    assert_eq!(cs[0].website, "https://www.tysonfoods.com");
    assert!(cs[0].aliases.contains("Tyson"));

    assert_eq!(cs[1].canonical_name, "Hormel Foods, Inc.");
    assert_eq!(cs[1].website, "https://www.hormelfoods.com");
    assert!(cs[1].aliases.contains("Hormel"));

    assert!(cs[2].aliases.is_empty());
    let reg = CompanyRegistry::from_companies(cs).unwrap();
    assert_eq!(reg.len(), 3);
}

#[test]
fn duplicate_alias_is_a_configuration_error() {
    let csv = "name,domain,website,aliases\n\
               Tyson Foods,tysonfoods.com,,Tyson\n\
               Tyson Fresh Meats,tysonfreshmeats.com,,TYSON\n";
    let companies = parse_company_records(csv).unwrap();
    let err = CompanyRegistry::from_companies(companies).unwrap_err();
    match err {
        ConfigError::DuplicateAlias { alias, first, second } => {
            assert_eq!(alias.to_lowercase(), "tyson");
            assert_eq!(first.as_str(), "tyson-foods");
            assert_eq!(second.as_str(), "tyson-fresh-meats");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn alias_equal_to_another_name_is_rejected_at_import() {
    let store = LocalStore::in_memory();
    let csv = "name,domain,website,aliases\n\
               Cargill,cargill.com,,\n\
               Cargill Protein,cargill.com,,Cargill\n";
    let err = import_companies(&store, parse_company_records(csv).unwrap()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::DuplicateAlias { .. })
    ));
    assert!(store.list_companies().unwrap().is_empty());
}

#[test]
fn malformed_record_names_its_line() {
    let csv = "name,domain,website,aliases\n\
               Tyson Foods,tysonfoods.com,,Tyson\n\
               Hormel Foods,hormelfoods.com\n";
    let err = parse_company_records(csv).unwrap_err();
    assert!(matches!(err, ConfigError::MalformedRecord { line: 3, .. }));
    assert!(err.to_string().contains("line 3"));

    let missing_name = "name,domain,website,aliases\n,cargill.com,,\n";
    assert!(matches!(
        parse_company_records(missing_name),
        Err(ConfigError::MalformedRecord { line: 2, .. })
    ));

    let unterminated = "name,domain,website,aliases\n\"Cargill,cargill.com,,\n";
    assert!(parse_company_records(unterminated).is_err());
}

#[test]
fn reimport_skips_existing_companies() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name,domain,website,aliases").unwrap();
    writeln!(file, "Tyson Foods,tysonfoods.com,,Tyson").unwrap();
    writeln!(file, "Perdue Farms,perduefarms.com,,Perdue").unwrap();

    let store = LocalStore::in_memory();
    let first = import_companies(&store, load_companies_from(file.path()).unwrap()).unwrap();
    assert_eq!((first.parsed, first.added, first.already_exists), (2, 2, 0));

    let second = import_companies(&store, load_companies_from(file.path()).unwrap()).unwrap();
    assert_eq!((second.parsed, second.added, second.already_exists), (2, 0, 2));
    assert_eq!(store.list_companies().unwrap().len(), 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_companies_from(Path::new("does/not/exist.csv")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
