use rstest::rstest;

use crate::{Environment, HelperMode, MigrationMode, Mode};

#[rstest]
#[case("dev", Mode::Run(Environment::Development))]
#[case("test", Mode::Run(Environment::Test))]
#[case("prod", Mode::Run(Environment::Production))]
#[case("shell", Mode::Helper(HelperMode::Shell))]
#[case("deploy", Mode::Helper(HelperMode::Deploy))]
#[case("db-upgrade", Mode::Migration(MigrationMode::Upgrade))]
fn parses_mode_labels(#[case] label: &str, #[case] expected: Mode) {
    let mode: Mode = label.parse().expect("mode should parse");
    assert_eq!(mode, expected);
    assert_eq!(mode.to_string(), label);
}

#[test]
fn rejects_unknown_mode() {
    let error = "staging".parse::<Mode>().expect_err("staging is not a mode");
    assert_eq!(error.value(), "staging");
}

#[rstest]
#[case(Mode::Run(Environment::Test), Environment::Test)]
#[case(Mode::Run(Environment::Production), Environment::Production)]
#[case(Mode::Helper(HelperMode::Shell), Environment::Development)]
#[case(Mode::Migration(MigrationMode::Init), Environment::Development)]
fn helper_modes_materialize_development(#[case] mode: Mode, #[case] expected: Environment) {
    assert_eq!(mode.environment(), expected);
}

#[test]
fn environment_tags_are_case_sensitive() {
    assert!("DEV".parse::<Environment>().is_err());
}
