//! Tests for struct and function wiring.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lodestar_container::prelude::*;
use parking_lot::Mutex;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".into()
    }
}

struct French;

impl Greeter for French {
    fn greet(&self) -> String {
        "bonjour".into()
    }
}

fn greeter<G: Greeter + 'static>(greeter: G) -> Provider<G> {
    Provider::value(greeter).implements::<dyn Greeter>(|it| it as Arc<dyn Greeter>)
}

// ─────────────────────────────────────────────────────────────────────────
// Struct targets
// ─────────────────────────────────────────────────────────────────────────

#[derive(Default, Wire)]
struct App {
    #[wire("count")]
    count: Option<Arc<i32>>,
    #[wire]
    greeter: Option<Arc<dyn Greeter>>,
}

#[test]
fn wires_named_and_capability_fields() {
    let mut container = Container::new();
    container.register_named("count", Provider::value(5_i32)).unwrap();
    container.register_by_type(greeter(English)).unwrap();

    let mut app = App::default();
    container.wire(&mut app).unwrap();

    assert_eq!(app.count.as_deref(), Some(&5));
    assert_eq!(app.greeter.map(|g| g.greet()).as_deref(), Some("hello"));
}

#[test]
fn second_capability_implementation_is_ambiguous() {
    let mut container = Container::new();
    container.register_named("count", Provider::value(5_i32)).unwrap();
    container.register_by_type(greeter(English)).unwrap();
    container.register_by_type(greeter(French)).unwrap();

    let err = container.wire(&mut App::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MultipleProvidersFound);
}

#[derive(Debug, PartialEq)]
struct Foo {
    name: &'static str,
}

#[derive(Default, Wire)]
#[wire(after_wire)]
struct Bar {
    #[wire("foo")]
    foo: Option<Arc<Foo>>,
    #[wire]
    typed: Option<Arc<Foo>>,
    after_wire_called: bool,
}

impl AfterWire for Bar {
    fn after_wire(&mut self) -> Result<Option<Cleanup>, BoxError> {
        self.after_wire_called = true;
        Ok(None)
    }
}

#[test]
fn after_wire_runs_once_fields_are_set() {
    let mut container = Container::new();
    container
        .register_named("foo", Provider::value(Foo { name: "named" }))
        .unwrap();
    container
        .register_by_type(Provider::value(Foo { name: "typed" }))
        .unwrap();

    let mut bar = Bar::default();
    container.wire(&mut bar).unwrap();

    assert!(bar.after_wire_called);
    assert_eq!(bar.foo.as_deref(), Some(&Foo { name: "named" }));
    assert_eq!(bar.typed.as_deref(), Some(&Foo { name: "typed" }));
}

#[test]
fn missing_field_provider_reports_field_path() {
    let mut container = Container::new();
    container
        .register_by_type(Provider::value(Foo { name: "typed" }))
        .unwrap();

    let mut bar = Bar::default();
    let err = container.wire(&mut bar).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProviderNotFound);
    assert!(err.to_string().contains(".foo \"foo\""));
    assert!(!bar.after_wire_called);
}

#[derive(Default, Wire)]
#[wire(after_wire)]
struct Failing {
    #[wire]
    foo: Option<Arc<Foo>>,
}

impl AfterWire for Failing {
    fn after_wire(&mut self) -> Result<Option<Cleanup>, BoxError> {
        Err("refused".into())
    }
}

#[test]
fn failing_hook_rolls_back_dependencies() {
    let released = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&released);
    let mut container = Container::new();
    container
        .register_named(
            "",
            Provider::factory_with_cleanup(move || {
                let counter = Arc::clone(&counter);
                (
                    Foo { name: "typed" },
                    Cleanup::new(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }),
                )
            }),
        )
        .unwrap();

    let mut failing = Failing::default();
    let err = container.wire(&mut failing).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TargetFailed);
    assert!(failing.foo.is_some());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[derive(Default, Wire)]
struct Reporter {
    #[wire(setter)]
    greeter: Option<Arc<dyn Greeter>>,
    #[wire(name = "title", setter = "apply_title")]
    title: Option<Arc<String>>,
    lines: Vec<String>,
}

impl Reporter {
    fn set_greeter(&mut self, greeter: Arc<dyn Greeter>) {
        self.lines.push(greeter.greet());
        self.greeter = Some(greeter);
    }

    fn apply_title(&mut self, title: Arc<String>) {
        self.title = Some(Arc::new(title.to_uppercase()));
    }
}

#[test]
fn setters_receive_resolved_values() {
    let mut container = Container::new();
    container.register_by_type(greeter(French)).unwrap();
    container
        .register_named("title", Provider::value(String::from("report")))
        .unwrap();

    let mut reporter = Reporter::default();
    container.wire(&mut reporter).unwrap();

    assert!(reporter.greeter.is_some());
    assert_eq!(reporter.lines, vec!["bonjour".to_string()]);
    assert_eq!(reporter.title.as_deref().map(String::as_str), Some("REPORT"));
}

#[derive(Default, Wire)]
struct Pair(
    #[wire("left")] Option<Arc<u8>>,
    #[wire("right")] Option<Arc<u8>>,
    u8,
);

#[test]
fn tuple_struct_fields_are_wired() {
    let mut container = Container::new();
    container
        .register_all_named([
            ("left", Provider::value(1_u8).into_any()),
            ("right", Provider::value(2_u8).into_any()),
        ])
        .unwrap();

    let mut pair = Pair::default();
    container.wire(&mut pair).unwrap();

    assert_eq!(pair.0.as_deref(), Some(&1));
    assert_eq!(pair.1.as_deref(), Some(&2));
    assert_eq!(pair.2, 0);
}

struct Session;

#[derive(Default, Wire)]
struct Handler {
    #[wire]
    shared: Option<Arc<Session>>,
    #[wire(transient)]
    fresh: Option<Arc<Session>>,
    #[wire(optional)]
    missing: Option<Arc<Foo>>,
}

#[test]
fn transient_and_optional_fields() {
    let mut container = Container::new();
    container
        .register_by_type(Provider::factory(|| Session))
        .unwrap();

    let (cached, _) = container.resolve::<Session>().unwrap();
    let mut handler = Handler::default();
    container.wire(&mut handler).unwrap();

    let shared = handler.shared.unwrap();
    let fresh = handler.fresh.unwrap();
    assert!(Arc::ptr_eq(&cached, &shared));
    assert!(!Arc::ptr_eq(&cached, &fresh));
    assert!(handler.missing.is_none());
}

#[derive(Default, Wire)]
struct Partial {
    #[wire("db")]
    db: Option<Arc<Foo>>,
    #[wire("cache")]
    cache: Option<Arc<Foo>>,
}

#[test]
fn failed_wiring_releases_and_evicts_acquired_singletons() {
    let created = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let (made, freed) = (Arc::clone(&created), Arc::clone(&released));
    let mut container = Container::new();
    container
        .register_named(
            "db",
            Provider::factory_with_cleanup(move || {
                made.fetch_add(1, Ordering::SeqCst);
                let freed = Arc::clone(&freed);
                (
                    Foo { name: "db" },
                    Cleanup::new(move || {
                        freed.fetch_add(1, Ordering::SeqCst);
                    }),
                )
            }),
        )
        .unwrap();

    let err = container.wire(&mut Partial::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderNotFound);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(!container.is_cached_named("db"));

    container
        .register_named("cache", Provider::value(Foo { name: "cache" }))
        .unwrap();
    let mut partial = Partial::default();
    let cleanup = container.wire(&mut partial).unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(partial.db.as_deref(), Some(&Foo { name: "db" }));
    assert_eq!(partial.cache.as_deref(), Some(&Foo { name: "cache" }));

    cleanup.run();
    assert_eq!(released.load(Ordering::SeqCst), 2);
    assert!(!container.is_cached_named("db"));
}

#[test]
fn already_cached_singletons_survive_rollback() {
    let released = Arc::new(AtomicUsize::new(0));
    let freed = Arc::clone(&released);
    let mut container = Container::new();
    container
        .register_named(
            "db",
            Provider::factory_with_cleanup(move || {
                let freed = Arc::clone(&freed);
                (
                    Foo { name: "db" },
                    Cleanup::new(move || {
                        freed.fetch_add(1, Ordering::SeqCst);
                    }),
                )
            }),
        )
        .unwrap();

    container.resolve_named::<Foo>("db").unwrap();
    container.wire(&mut Partial::default()).unwrap_err();

    assert!(container.is_cached_named("db"));
    assert_eq!(released.load(Ordering::SeqCst), 0);
}

struct Pool;

struct PooledSession {
    _pool: Arc<Pool>,
}

#[derive(Default, Wire)]
struct Checkout {
    #[wire]
    session: Option<Arc<PooledSession>>,
    #[wire("ledger")]
    ledger: Option<Arc<Foo>>,
}

fn pool_container(made: &Arc<AtomicUsize>, released: &Arc<AtomicUsize>) -> Container {
    let (made, freed) = (Arc::clone(made), Arc::clone(released));
    let mut container = Container::new();
    container
        .register_by_type(Provider::factory_with_cleanup(move || {
            made.fetch_add(1, Ordering::SeqCst);
            let freed = Arc::clone(&freed);
            (
                Pool,
                Cleanup::new(move || {
                    freed.fetch_add(1, Ordering::SeqCst);
                }),
            )
        }))
        .unwrap();
    container
        .register_by_type(Provider::factory(|pool: Arc<Pool>| PooledSession { _pool: pool }))
        .unwrap();
    container
}

#[test]
fn rollback_leaves_cached_dependencies_of_created_singletons_alone() {
    let made = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let container = pool_container(&made, &released);

    let (pool, _) = container.resolve::<Pool>().unwrap();
    let err = container.wire(&mut Checkout::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderNotFound);

    assert_eq!(released.load(Ordering::SeqCst), 0);
    assert!(container.is_cached_type::<Pool>());
    assert!(!container.is_cached_type::<PooledSession>());

    let (again, _) = container.resolve::<Pool>().unwrap();
    assert!(Arc::ptr_eq(&pool, &again));
    assert_eq!(made.load(Ordering::SeqCst), 1);
}

#[test]
fn rollback_evicts_singletons_created_below_other_instances() {
    let made = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let container = pool_container(&made, &released);

    container.wire(&mut Checkout::default()).unwrap_err();
    assert_eq!(made.load(Ordering::SeqCst), 1);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(!container.is_cached_type::<Pool>());
    assert!(!container.is_cached_type::<PooledSession>());

    container.resolve::<Pool>().unwrap();
    assert_eq!(made.load(Ordering::SeqCst), 2);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn released_singletons_are_never_served_from_cache() {
    let made = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let mut container = pool_container(&made, &released);
    container
        .register_named("ledger", Provider::value(Foo { name: "ledger" }))
        .unwrap();

    let cleanup = container.wire(&mut Checkout::default()).unwrap();
    cleanup.run();
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(!container.is_cached_type::<Pool>());
    assert!(!container.is_cached_type::<PooledSession>());

    let mut checkout = Checkout::default();
    container.wire(&mut checkout).unwrap();
    assert_eq!(made.load(Ordering::SeqCst), 2);
    assert!(checkout.session.is_some());

    // A cleanup that only borrowed the cached pool still releases it.
    let (_, borrowed) = container.resolve::<Pool>().unwrap();
    assert_eq!(made.load(Ordering::SeqCst), 2);
    borrowed.run();
    assert_eq!(released.load(Ordering::SeqCst), 2);
    assert!(!container.is_cached_type::<Pool>());

    container.teardown();
    assert_eq!(released.load(Ordering::SeqCst), 2);

    container.resolve::<Pool>().unwrap();
    assert_eq!(made.load(Ordering::SeqCst), 3);
}

struct Manual {
    greeting: Option<String>,
}

impl Wire for Manual {
    fn wire_fields(&mut self, wirer: &mut FieldWirer<'_, '_>) -> Result<(), WireError> {
        if let Some(greeter) = wirer.field::<Arc<dyn Greeter>>(FieldSpec::new("greeting"))? {
            self.greeting = Some(greeter.greet());
        }
        Ok(())
    }
}

#[test]
fn hand_written_field_table() {
    let mut container = Container::new();
    container.register_by_type(greeter(English)).unwrap();

    let mut manual = Manual { greeting: None };
    container.wire(&mut manual).unwrap();
    assert_eq!(manual.greeting.as_deref(), Some("hello"));
}

// ─────────────────────────────────────────────────────────────────────────
// Function targets
// ─────────────────────────────────────────────────────────────────────────

struct Message(String);

struct Polite {
    message: Arc<Message>,
}

impl Greeter for Polite {
    fn greet(&self) -> String {
        format!("{}, please", self.message.0)
    }
}

#[test]
fn wire_fn_injects_parameters() {
    let mut container = Container::new();
    container
        .register_by_type(Provider::value(Message("hi there!".into())))
        .unwrap();
    container
        .register_by_type(
            Provider::factory(|message: Arc<Message>| Polite { message })
                .implements::<dyn Greeter>(|it| it as Arc<dyn Greeter>),
        )
        .unwrap();

    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    container
        .wire_fn(move |greeter: Arc<dyn Greeter>, message: Arc<Message>| {
            *sink.lock() = Some((greeter.greet(), message.0.clone()));
        })
        .unwrap();

    assert_eq!(
        *seen.lock(),
        Some(("hi there!, please".to_string(), "hi there!".to_string()))
    );
}

#[test]
fn wire_fn_without_parameters_is_invalid() {
    let container = Container::new();
    let err = container.wire_fn(|| {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidWireTargetShape);
}

#[test]
fn wire_fn_error_is_target_failure() {
    let mut container = Container::new();
    container.register_by_type(Provider::value(1_u8)).unwrap();

    let err = container
        .wire_fn(|_: Arc<u8>| Err::<(), _>("nope"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TargetFailed);
}

trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
}

struct Alpha;

impl Plugin for Alpha {
    fn id(&self) -> &'static str {
        "alpha"
    }
}

struct Beta;

impl Plugin for Beta {
    fn id(&self) -> &'static str {
        "beta"
    }
}

fn plugin<P: Plugin + 'static>(plugin: P) -> AnyProvider {
    Provider::value(plugin)
        .implements::<dyn Plugin>(|it| it as Arc<dyn Plugin>)
        .into_any()
}

#[test]
fn named_collection_receives_compatible_named_providers() {
    let mut container = Container::new();
    container
        .register_all_named([
            ("alpha", plugin(Alpha)),
            ("beta", plugin(Beta)),
            ("gamma", Provider::value(7_u32).into_any()),
        ])
        .unwrap();
    container.register_all_by_type([plugin(Alpha)]).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    container
        .wire_fn(move |plugins: NamedCollection<dyn Plugin>| {
            let mut entries: Vec<(String, &'static str)> = plugins
                .iter()
                .map(|(name, plugin)| (name.to_string(), plugin.id()))
                .collect();
            entries.sort();
            *sink.lock() = entries;
        })
        .unwrap();

    assert_eq!(
        *seen.lock(),
        vec![("alpha".to_string(), "alpha"), ("beta".to_string(), "beta")]
    );
}

#[test]
fn empty_named_collection_is_not_found() {
    let mut container = Container::new();
    container.register_all_by_type([plugin(Alpha)]).unwrap();

    let err = container
        .wire_fn(|_: NamedCollection<dyn Plugin>| {})
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderNotFound);
}

#[derive(Default, Wire)]
struct PluginHost {
    #[wire]
    plugins: Option<NamedCollection<dyn Plugin>>,
    #[wire("plugins")]
    named: Option<NamedCollection<dyn Plugin>>,
}

#[test]
fn named_collection_field_by_name_is_invalid() {
    let mut container = Container::new();
    container.register_named("alpha", plugin(Alpha)).unwrap();

    let mut host = PluginHost::default();
    let err = container.wire(&mut host).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidWireTargetShape);
    assert_eq!(host.plugins.map(|plugins| plugins.len()), Some(1));
    assert!(host.named.is_none());
}
