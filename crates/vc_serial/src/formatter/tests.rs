use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::any::TypeId;
use core::cell::RefCell;

use crate::api::{DeserializeDriver, SerializeDriver};
use crate::config::{DataFormat, SerializationConfig};
use crate::debug::{MemoryLogger, Severity};
use crate::derive::Reflect;
use crate::error::{Abort, HookError, SerialResult, SerializeError};
use crate::format::{DataReader, DataWriter};
use crate::formatter::{
    EmptyFormatter, Formatter, FormatterBinding, FormatterLocator, LocatorStep, TypePattern, read_named_entries,
};
use crate::info::{TypeInfo, Typed};
use crate::policy::{PERMISSIVE, STRICT, SerializationPolicy};
use crate::reflect::Reflect;
use crate::registry::Registry;

#[derive(Reflect, Default, Debug, PartialEq)]
struct Sample {
    pub id: u32,
    hidden: u32,
    #[reflect(serialize)]
    secret: u32,
    #[reflect(skip)]
    pub cache: u32,
    #[reflect(former_name = "label")]
    pub name: String,
}

fn sample() -> Sample {
    Sample {
        id: 1,
        hidden: 2,
        secret: 3,
        cache: 4,
        name: String::from("abc"),
    }
}

#[derive(Reflect, Default, Debug, PartialEq)]
#[reflect(not_serializable)]
struct Handle {
    pub raw: u64,
}

#[derive(Reflect, Default, Debug, PartialEq)]
struct Owner {
    pub handle: Handle,
    pub tag: i32,
}

#[derive(Reflect, Default, Debug, PartialEq)]
struct Temperature {
    pub kelvin: f64,
}

thread_local! {
    static EVENTS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

fn record(event: &'static str) {
    EVENTS.with_borrow_mut(|events| events.push(event));
}

fn take_events() -> Vec<&'static str> {
    EVENTS.with_borrow_mut(core::mem::take)
}

#[derive(Reflect, Default)]
#[reflect(
    before_serialize = Tracked::before_serialize,
    after_serialize = Tracked::after_serialize,
    before_deserialize = Tracked::before_deserialize,
    after_deserialize = Tracked::after_deserialize
)]
struct Tracked {
    pub value: i32,
    #[reflect(skip)]
    pub restored: bool,
}

impl Tracked {
    fn before_serialize(&self) -> Result<(), HookError> {
        record("before_serialize");
        Ok(())
    }

    fn after_serialize(&self) -> Result<(), HookError> {
        record("after_serialize");
        Ok(())
    }

    fn before_deserialize(&mut self) -> Result<(), HookError> {
        record("before_deserialize");
        Ok(())
    }

    fn after_deserialize(&mut self) -> Result<(), HookError> {
        record("after_deserialize");
        self.restored = true;
        Ok(())
    }
}

#[derive(Reflect, Default)]
#[reflect(before_serialize = Guarded::refuse)]
struct Guarded {
    pub value: i32,
}

impl Guarded {
    fn refuse(&self) -> Result<(), HookError> {
        Err(Box::new(Abort::new("refused")))
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn config(policy: &str) -> SerializationConfig {
    SerializationConfig {
        policy: policy.to_string(),
        ..SerializationConfig::default()
    }
}

fn json_of<T: Reflect + Typed>(registry: &Arc<Registry>, config: SerializationConfig, value: &T) -> String {
    SerializeDriver::new(registry.clone(), config)
        .unwrap()
        .serialize_json(value)
        .unwrap()
}

fn from_json<T: Reflect + Typed>(
    registry: &Arc<Registry>,
    config: SerializationConfig,
    text: &str,
) -> (T, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::new());
    let mut de = DeserializeDriver::new(registry.clone(), config).unwrap();
    de.context_mut().set_logger(logger.clone());
    (de.deserialize_json(text).unwrap(), logger)
}

fn round_trip<T: Reflect + Typed>(registry: &Arc<Registry>, config: SerializationConfig, value: &T) -> T {
    let bytes = SerializeDriver::new(registry.clone(), config.clone())
        .unwrap()
        .serialize(value, DataFormat::Binary)
        .unwrap();
    let logger = Arc::new(MemoryLogger::new());
    let mut de = DeserializeDriver::new(registry.clone(), config).unwrap();
    de.context_mut().set_logger(logger.clone());
    let back = de.deserialize(&bytes, DataFormat::Binary).unwrap();
    assert!(logger.entries().is_empty(), "{:?}", logger.entries());
    back
}

fn both_registries() -> [Arc<Registry>; 2] {
    let compiled = Registry::new();
    compiled.set_compiled_formatters(true);
    [Arc::new(Registry::new()), Arc::new(compiled)]
}

// -----------------------------------------------------------------------------
// Structs

#[test]
fn standard_policy_selects_public_and_marked_fields() {
    for registry in both_registries() {
        let text = json_of(&registry, SerializationConfig::default(), &sample());
        assert_eq!(text, r#"{"id":1,"secret":3,"name":"abc"}"#);

        let back = round_trip(&registry, SerializationConfig::default(), &sample());
        assert_eq!(back, Sample { hidden: 0, cache: 0, ..sample() });
    }
}

#[test]
fn strict_and_permissive_policies() {
    for registry in both_registries() {
        assert_eq!(json_of(&registry, config(STRICT), &sample()), r#"{"secret":3}"#);

        let back = round_trip(&registry, config(PERMISSIVE), &sample());
        assert_eq!(back, Sample { cache: 0, ..sample() });
    }
}

#[test]
fn former_names_still_load() {
    for registry in both_registries() {
        let text = json_of(&registry, SerializationConfig::default(), &sample());
        let renamed = text.replace("\"name\"", "\"label\"");
        let (back, logger) = from_json::<Sample>(&registry, SerializationConfig::default(), &renamed);
        assert_eq!(back.name, "abc");
        assert!(logger.entries().is_empty());
    }
}

#[test]
fn unknown_members_are_skipped_with_a_warning() {
    for registry in both_registries() {
        let text = r#"{"ident":7,"secret":3,"name":"abc"}"#;
        let (back, logger) = from_json::<Sample>(&registry, SerializationConfig::default(), text);
        assert_eq!((back.id, back.secret, back.name.as_str()), (0, 3, "abc"));
        assert_eq!(logger.count(Severity::Warning), 1);
        assert!(logger.contains("has no member `ident`"));
    }
}

#[test]
fn excluded_members_in_the_stream_are_ignored() {
    let registry = Arc::new(Registry::new());
    let text = json_of(&registry, config(PERMISSIVE), &sample());
    let (back, logger) = from_json::<Sample>(&registry, SerializationConfig::default(), &text);
    assert_eq!(back.hidden, 0);
    assert_eq!(back.id, 1);
    assert!(logger.entries().is_empty());
}

#[test]
fn too_many_entries_abort() {
    let registry = Arc::new(Registry::new());
    let cfg = SerializationConfig {
        max_node_entries: 2,
        ..SerializationConfig::default()
    };
    let mut de = DeserializeDriver::new(registry, cfg).unwrap();
    de.context_mut().set_logger(Arc::new(MemoryLogger::new()));
    let result = de.deserialize_json::<Sample>(r#"{"id":1,"secret":3,"name":"abc"}"#);
    assert!(matches!(result, Err(SerializeError::Aborted(_))));
}

// -----------------------------------------------------------------------------
// Hooks

#[test]
fn hooks_run_around_members() {
    let registry = Arc::new(Registry::new());
    let back = round_trip(&registry, SerializationConfig::default(), &Tracked {
        value: 8,
        restored: false,
    });
    assert_eq!(back.value, 8);
    assert!(back.restored);
    assert_eq!(
        take_events(),
        ["before_serialize", "after_serialize", "before_deserialize", "after_deserialize"]
    );
}

#[test]
fn aborting_hook_stops_the_session() {
    let registry = Arc::new(Registry::new());
    let result = SerializeDriver::new(registry, SerializationConfig::default())
        .unwrap()
        .serialize(&Guarded { value: 1 }, DataFormat::Binary);
    match result {
        Err(SerializeError::Aborted(abort)) => assert_eq!(abort.message(), "refused"),
        other => panic!("expected an abort, got {other:?}"),
    }
}

// -----------------------------------------------------------------------------
// Collections

#[test]
fn lists_and_maps() {
    let registry = Arc::new(Registry::new());
    let names = vec![String::from("a"), String::from("bc")];
    assert_eq!(round_trip(&registry, SerializationConfig::default(), &names), names);

    let numbers: Vec<u32> = (0..100).collect();
    assert_eq!(round_trip(&registry, SerializationConfig::default(), &numbers), numbers);

    let map = BTreeMap::from([(String::from("one"), 1_i32), (String::from("two"), 2)]);
    assert_eq!(round_trip(&registry, SerializationConfig::default(), &map), map);
    let text = json_of(&registry, SerializationConfig::default(), &map);
    let (back, _) = from_json::<BTreeMap<String, i32>>(&registry, SerializationConfig::default(), &text);
    assert_eq!(back, map);
}

#[test]
fn primitive_arrays_fill_other_lists() {
    let registry = Arc::new(Registry::new());
    let bytes = SerializeDriver::new(registry.clone(), SerializationConfig::default())
        .unwrap()
        .serialize(&vec![3_u32, 4, 5], DataFormat::Binary)
        .unwrap();
    let back: VecDeque<u32> = DeserializeDriver::new(registry, SerializationConfig::default())
        .unwrap()
        .deserialize(&bytes, DataFormat::Binary)
        .unwrap();
    assert_eq!(back, [3, 4, 5]);
}

#[test]
fn arrays_skip_extra_items() {
    let registry = Arc::new(Registry::new());
    let words: Vec<String> = ["a", "b", "c", "d"].map(String::from).into();
    let text = json_of(&registry, SerializationConfig::default(), &words);
    let (back, logger) = from_json::<[String; 2]>(&registry, SerializationConfig::default(), &text);
    assert_eq!(back, ["a", "b"]);
    assert!(logger.contains("2 extra items were skipped"));

    let text = json_of(&registry, SerializationConfig::default(), &vec![String::from("x")]);
    let (back, logger) = from_json::<[String; 2]>(&registry, SerializationConfig::default(), &text);
    assert_eq!(back, ["x", ""]);
    assert!(logger.entries().is_empty());
}

// -----------------------------------------------------------------------------
// Locating

#[test]
fn non_serializable_types_need_a_permissive_policy() {
    let registry = Arc::new(Registry::new());
    let owner = Owner {
        handle: Handle { raw: 77 },
        tag: 5,
    };
    assert_eq!(
        json_of(&registry, SerializationConfig::default(), &owner),
        r#"{"handle":{},"tag":5}"#
    );
    let back = round_trip(&registry, SerializationConfig::default(), &owner);
    assert_eq!(back, Owner { handle: Handle::default(), tag: 5 });

    assert_eq!(round_trip(&registry, config(PERMISSIVE), &owner), owner);
}

#[test]
fn bindings_override_the_fallback() {
    let registry = Arc::new(Registry::new());
    registry.add_binding(FormatterBinding::new(
        TypePattern::Exact(TypeId::of::<Sample>()),
        100,
        |info, _| Arc::new(EmptyFormatter::new(info)),
    ));
    assert_eq!(json_of(&registry, SerializationConfig::default(), &sample()), "{}");
}

/// Stores a [`Temperature`] as whole millikelvin.
struct MilliKelvin;

impl Formatter for MilliKelvin {
    fn type_info(&self) -> &'static TypeInfo {
        Temperature::type_info()
    }

    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()> {
        let kelvin = value.downcast_ref::<Temperature>().map_or(0.0, |t| t.kelvin);
        writer.write_i64(Some("mk"), (kelvin * 1000.0) as i64)
    }

    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        read_named_entries(reader, Temperature::type_info(), |name, reader| {
            if name != "mk" {
                return Ok(false);
            }
            if let Some(mk) = reader.read_i64()?
                && let Some(temperature) = value.downcast_mut::<Temperature>()
            {
                temperature.kelvin = mk as f64 / 1000.0;
            }
            Ok(true)
        })
    }
}

struct TemperatureLocator;

impl FormatterLocator for TemperatureLocator {
    fn try_locate(
        &self,
        _: &Registry,
        info: &'static TypeInfo,
        _: &SerializationPolicy,
    ) -> Option<Arc<dyn Formatter>> {
        (info.type_id() == TypeId::of::<Temperature>()).then(|| Arc::new(MilliKelvin) as Arc<dyn Formatter>)
    }
}

#[test]
fn locators_supply_custom_formatters() {
    for step in [LocatorStep::BeforeRegistered, LocatorStep::AfterRegistered] {
        let registry = Arc::new(Registry::new());
        registry.add_locator(step, TemperatureLocator);
        let warm = Temperature { kelvin: 300.5 };
        assert_eq!(json_of(&registry, SerializationConfig::default(), &warm), r#"{"mk":300500}"#);
        assert_eq!(round_trip(&registry, SerializationConfig::default(), &warm), warm);
    }
}
