//! Behavioural tests for the assembly sequence.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use trellis_config::{Environment, Mode, Settings};

use crate::{BuiltinKind, Phase, ServiceDescriptor, View, ViewDescriptor};

use super::support::{self, AssemblyEvent, Mailer, TestWorld};

type StepResult = Result<(), String>;

struct Placeholder;

impl View for Placeholder {}

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a configuration file \"{filename}\" containing \"{contents}\"")]
fn given_configuration_file(world: &RefCell<TestWorld>, filename: String, contents: String) {
    world
        .borrow()
        .project
        .write(&filename, &format!("{contents}\n"));
}

#[given("the mode \"{mode}\"")]
fn given_mode(world: &RefCell<TestWorld>, mode: String) -> StepResult {
    let mode = mode
        .parse::<Mode>()
        .map_err(|error| format!("invalid mode '{mode}': {error}"))?;
    world.borrow_mut().use_mode(mode);
    Ok(())
}

#[given("a \"{name}\" service relaying to \"{relay}\"")]
fn given_service(world: &RefCell<TestWorld>, name: String, relay: String) {
    let descriptor = ServiceDescriptor::of::<Mailer>(name)
        .with_mode_settings(Environment::Production, Settings::new().with("relay", relay));
    world.borrow_mut().declare_service(descriptor);
}

#[given("a view \"{name}\" routed at \"{route}\"")]
fn given_view(world: &RefCell<TestWorld>, name: String, route: String) {
    world
        .borrow_mut()
        .declare_view(ViewDescriptor::new(name, Placeholder, route));
}

#[when("the application is assembled")]
fn when_assembled(world: &RefCell<TestWorld>) {
    world.borrow_mut().assemble();
}

#[then("assembly succeeds")]
fn then_assembly_succeeds(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let summary = world.assembly().summary();
    assert!(
        world
            .reporter
            .events()
            .contains(&AssemblyEvent::Succeeded(summary)),
        "success event missing"
    );
}

#[then("assembly fails in the \"{phase}\" phase")]
fn then_assembly_fails(world: &RefCell<TestWorld>, phase: String) -> StepResult {
    let expected = phase
        .parse::<Phase>()
        .map_err(|error| format!("invalid phase '{phase}': {error}"))?;
    let world = world.borrow();
    let error = world.error();
    if error.phase() == Some(expected) {
        Ok(())
    } else {
        Err(format!("expected a failure in {expected}, got: {error}"))
    }
}

#[then("the data layer uri is \"{uri}\"")]
fn then_data_layer_uri(world: &RefCell<TestWorld>, uri: String) {
    let world = world.borrow();
    let state = world.provider.state();
    let config = state
        .data_layer_config
        .as_ref()
        .expect("data layer was not built");
    assert_eq!(config.uri, uri);
}

#[then("the built-ins are \"{kinds}\"")]
fn then_builtins(world: &RefCell<TestWorld>, kinds: String) -> StepResult {
    let expected = kinds
        .split(',')
        .map(|kind| kind.parse::<BuiltinKind>().map_err(|error| error.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    let actual = world.borrow().assembly().builtins();
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected built-ins {expected:?}, got {actual:?}"))
    }
}

#[then("the \"{phase}\" phase was skipped")]
fn then_phase_skipped(world: &RefCell<TestWorld>, phase: String) -> StepResult {
    let phase = phase
        .parse::<Phase>()
        .map_err(|error| format!("invalid phase '{phase}': {error}"))?;
    let events = world.borrow().reporter.events();
    if events.contains(&AssemblyEvent::PhaseSkipped(phase)) {
        Ok(())
    } else {
        Err(format!("phase {phase} was not skipped: {events:?}"))
    }
}

#[then("the mailer service relays to \"{relay}\"")]
fn then_mailer_relay(world: &RefCell<TestWorld>, relay: String) {
    let world = world.borrow();
    let mailer = world
        .assembly()
        .services()
        .get::<Mailer>()
        .expect("mailer service missing");
    assert_eq!(mailer.relay.as_deref(), Some(relay.as_str()));
}

#[then("the reporter recorded \"{winner}\" replacing \"{replaced}\"")]
fn then_replacement(world: &RefCell<TestWorld>, winner: String, replaced: String) {
    let events = world.borrow().reporter.events();
    assert!(
        events.contains(&AssemblyEvent::ServiceReplaced { replaced, winner }),
        "replacement event missing: {events:?}"
    );
}

#[then("the reporter recorded the failure")]
fn then_reporter_failure(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, AssemblyEvent::Failed { .. }));
    assert!(failed, "failure event missing: {events:?}");
}

#[then("the host registered error handlers for \"{classes}\"")]
fn then_error_classes(world: &RefCell<TestWorld>, classes: String) {
    let world = world.borrow();
    let registered: Vec<String> = world
        .provider
        .state()
        .error_classes()
        .iter()
        .map(ToString::to_string)
        .collect();
    let expected: Vec<String> = classes.split(", ").map(str::to_owned).collect();
    assert_eq!(registered, expected);
}

#[scenario(
    path = "tests/features/assembly.feature",
    name = "Development reads its own data layer file"
)]
fn development_reads_its_own_data_layer_file(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/assembly.feature",
    name = "The realtime layer is skipped without its configuration"
)]
fn realtime_layer_skipped_without_configuration(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/assembly.feature",
    name = "A later service of the same type replaces an earlier one"
)]
fn later_service_replaces_earlier_one(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/assembly.feature",
    name = "A malformed log configuration aborts assembly"
)]
fn malformed_log_configuration_aborts(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/assembly.feature",
    name = "A relative view route aborts assembly"
)]
fn relative_view_route_aborts(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/assembly.feature",
    name = "The host configuration disables the fallback error handler"
)]
fn host_configuration_disables_fallback_handler(world: RefCell<TestWorld>) {
    let _ = world;
}
