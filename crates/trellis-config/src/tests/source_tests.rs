use rstest::{fixture, rstest};

use super::support::ConfigDir;
use crate::{ClassifiedFile, ConfigExtension, Environment, SourceMap};

#[fixture]
fn config_dir() -> ConfigDir {
    ConfigDir::new()
}

#[rstest]
#[case("db.yaml", "db", None, ConfigExtension::Yaml)]
#[case("db.yml", "db", None, ConfigExtension::Yaml)]
#[case("db.dev.yaml", "db", Some(Environment::Development), ConfigExtension::Yaml)]
#[case("log.test.json", "log", Some(Environment::Test), ConfigExtension::Json)]
fn classifies_recognised_filenames(
    #[case] filename: &str,
    #[case] name: &str,
    #[case] environment: Option<Environment>,
    #[case] extension: ConfigExtension,
) {
    let classified = ClassifiedFile::parse(filename).expect("filename should classify");
    assert_eq!(classified.name, name);
    assert_eq!(classified.environment, environment);
    assert_eq!(classified.extension, extension);
}

#[rstest]
#[case("README")]
#[case("db.txt")]
#[case("db.staging.yaml")]
#[case("db.dev.toml")]
#[case("dummy.new.prod.yaml")]
#[case(".hidden.yaml")]
fn ignores_other_filenames(#[case] filename: &str) {
    assert!(ClassifiedFile::parse(filename).is_none());
}

#[rstest]
fn groups_files_by_name_and_environment(config_dir: ConfigDir) {
    let prod = config_dir.write("db.yaml", "uri: sqlite:///prod.db\n");
    let dev = config_dir.write("db.dev.yaml", "uri: sqlite:///dev.db\n");
    config_dir.write("socket.json", "{}");
    config_dir.write("notes.md", "ignored");

    let map = SourceMap::scan(&config_dir.configs()).expect("scan succeeds");

    assert_eq!(map.names().collect::<Vec<_>>(), ["db", "socket"]);
    let db = map.get("db").expect("db entry");
    assert_eq!(
        db.file_for(Environment::Production).map(|file| file.path()),
        Some(prod.as_path())
    );
    assert_eq!(
        db.file_for(Environment::Development).map(|file| file.path()),
        Some(dev.as_path())
    );
    assert!(db.file_for(Environment::Test).is_none());
}

#[rstest]
fn does_not_descend_into_subdirectories(config_dir: ConfigDir) {
    std::fs::create_dir_all(config_dir.configs().join("nested.yaml"))
        .expect("create directory named like a config");
    std::fs::write(config_dir.configs().join("nested.yaml").join("db.yaml"), "uri: x")
        .expect("write nested config");

    let map = SourceMap::scan(&config_dir.configs()).expect("scan succeeds");
    assert!(map.is_empty());
}

#[rstest]
fn missing_directory_scans_empty(config_dir: ConfigDir) {
    let map = SourceMap::scan(&config_dir.root().join("absent")).expect("scan succeeds");
    assert!(map.is_empty());
}

#[rstest]
fn scanning_twice_is_idempotent(config_dir: ConfigDir) {
    config_dir.write("db.yaml", "uri: a\n");
    config_dir.write("db.test.yml", "uri: b\n");
    config_dir.write("app.prod.json", "{}");

    let first = SourceMap::scan(&config_dir.configs()).expect("first scan");
    let second = SourceMap::scan(&config_dir.configs()).expect("second scan");
    assert_eq!(first, second);
}

#[rstest]
fn tagged_production_file_beats_untagged(config_dir: ConfigDir) {
    let untagged = config_dir.write("db.yaml", "uri: untagged\n");
    let tagged = config_dir.write("db.prod.yaml", "uri: tagged\n");

    let map = SourceMap::scan(&config_dir.configs()).expect("scan succeeds");
    let db = map.get("db").expect("db entry");

    let selected = db.file_for(Environment::Production).expect("production file");
    assert_eq!(selected.path(), tagged.as_path());
    assert!(selected.is_tagged());
    assert_eq!(db.shadowed(), [untagged]);
}

#[rstest]
fn lexically_last_file_wins_between_equals(config_dir: ConfigDir) {
    let json = config_dir.write("db.json", "{\"uri\": \"json\"}");
    let yml = config_dir.write("db.yml", "uri: yml\n");

    let map = SourceMap::scan(&config_dir.configs()).expect("scan succeeds");
    let db = map.get("db").expect("db entry");

    assert_eq!(
        db.file_for(Environment::Production).map(|file| file.path()),
        Some(yml.as_path())
    );
    assert_eq!(db.shadowed(), [json]);
}

#[rstest]
fn selection_falls_back_to_production(config_dir: ConfigDir) {
    config_dir.write("db.yaml", "uri: prod\n");
    let map = SourceMap::scan(&config_dir.configs()).expect("scan succeeds");
    let db = map.get("db").expect("db entry");

    let (environment, _) = db.select(Environment::Test).expect("fallback selected");
    assert_eq!(environment, Environment::Production);
}
