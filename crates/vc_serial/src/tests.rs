use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::api::{DeserializeDriver, SerializeDriver};
use crate::config::{ByteOrderKind, DataFormat, SerializationConfig};
use crate::debug::{ErrorHandlingPolicy, LoggingPolicy, MemoryLogger, Severity};
use crate::derive::Reflect;
use crate::error::SerializeError;
use crate::info::{TypePath, Typed};
use crate::policy::SerializationPolicy;
use crate::reflect::{Reflect, Shared};
use crate::registry::{ModuleRegistration, Registry};

#[derive(Reflect, Default, Debug, Clone, Copy, PartialEq)]
struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Reflect, Default, Debug, PartialEq)]
struct Material {
    pub name: String,
    pub tint: [u8; 3],
}

#[derive(Reflect, Default)]
struct Entity {
    pub name: String,
    pub position: Vec3,
    pub material: Option<Shared<Material>>,
    pub parent: Option<Shared<Entity>>,
    pub tags: Vec<String>,
    pub extra: Option<Shared<dyn Reflect>>,
}

#[derive(Reflect, Default)]
struct Scene {
    pub entities: Vec<Shared<Entity>>,
    pub lookup: BTreeMap<String, i32>,
    pub weights: Vec<f32>,
}

#[derive(Reflect, Default)]
struct AnyBox {
    pub item: Option<Shared<dyn Reflect>>,
}

const FORMATS: [DataFormat; 3] = [DataFormat::Binary, DataFormat::Json, DataFormat::Nodes];

fn scene() -> Scene {
    let stone = Shared::new(Material {
        name: String::from("stone"),
        tint: [120, 110, 100],
    });
    let tower = Shared::new(Entity {
        name: String::from("tower"),
        position: Vec3 { x: 1.5, y: -2.0, z: 0.25 },
        material: Some(stone.clone()),
        tags: vec![String::from("static"), String::from("tall")],
        extra: Some(Shared::new(Vec3 { x: 0.5, y: 0.5, z: 8.0 }).into_dyn()),
        ..Entity::default()
    });
    let guard = Shared::new(Entity {
        name: String::from("guard"),
        material: Some(stone),
        parent: Some(tower.clone()),
        extra: Some(Shared::new(String::from("patrols at night")).into_dyn()),
        ..Entity::default()
    });
    // a cycle through the parent links
    tower.borrow_mut().parent = Some(guard.clone());

    Scene {
        entities: vec![tower, guard],
        lookup: BTreeMap::from([(String::from("tower"), 0), (String::from("guard"), 1)]),
        weights: vec![0.5, 1.0, 2.25],
    }
}

fn break_cycles(scene: &Scene) {
    for entity in &scene.entities {
        entity.borrow_mut().parent = None;
    }
}

fn check_scene(scene: &Scene) {
    let [tower, guard] = scene.entities.as_slice() else {
        panic!("expected two entities, got {}", scene.entities.len());
    };
    let (tower_ref, guard_ref) = (tower.borrow(), guard.borrow());
    assert_eq!(tower_ref.name, "tower");
    assert_eq!(tower_ref.position, Vec3 { x: 1.5, y: -2.0, z: 0.25 });
    assert_eq!(tower_ref.tags, ["static", "tall"]);
    assert!(tower_ref.parent.as_ref().unwrap().ptr_eq(guard));
    assert!(guard_ref.parent.as_ref().unwrap().ptr_eq(tower));

    let stone = tower_ref.material.as_ref().unwrap();
    assert!(stone.ptr_eq(guard_ref.material.as_ref().unwrap()));
    assert_eq!(*stone.borrow(), Material {
        name: String::from("stone"),
        tint: [120, 110, 100],
    });

    let extra = tower_ref.extra.as_ref().unwrap().borrow();
    assert_eq!(extra.downcast_ref::<Vec3>(), Some(&Vec3 { x: 0.5, y: 0.5, z: 8.0 }));
    let note = guard_ref.extra.as_ref().unwrap().borrow();
    assert_eq!(note.downcast_ref::<String>().map(String::as_str), Some("patrols at night"));

    assert_eq!(scene.lookup.get("guard"), Some(&1));
    assert_eq!(scene.weights, [0.5, 1.0, 2.25]);
}

fn scene_registry() -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    registry.register::<Scene>();
    registry.register::<Vec3>();
    registry
}

fn logged_deserializer(registry: &Arc<Registry>, config: SerializationConfig) -> (DeserializeDriver, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::new());
    let mut de = DeserializeDriver::new(registry.clone(), config).unwrap();
    de.context_mut().set_logger(logger.clone());
    (de, logger)
}

fn write<T: Reflect + Typed>(registry: &Arc<Registry>, config: SerializationConfig, value: &T, format: DataFormat) -> Vec<u8> {
    SerializeDriver::new(registry.clone(), config)
        .unwrap()
        .serialize(value, format)
        .unwrap()
}

fn round_trip<T: Reflect + Typed>(registry: &Arc<Registry>, value: &T, format: DataFormat) -> (T, Arc<MemoryLogger>) {
    let mut ser = SerializeDriver::new(registry.clone(), SerializationConfig::default()).unwrap();
    let (mut de, logger) = logged_deserializer(registry, SerializationConfig::default());
    let back = match format {
        DataFormat::Nodes => de.from_nodes(&ser.serialize_nodes(value).unwrap()).unwrap(),
        _ => de.deserialize(&ser.serialize(value, format).unwrap(), format).unwrap(),
    };
    (back, logger)
}

// -----------------------------------------------------------------------------
// Graphs

#[test]
fn scene_round_trips_in_every_format() {
    let registry = scene_registry();
    let original = scene();
    for format in FORMATS {
        let (back, logger) = round_trip(&registry, &original, format);
        assert!(logger.entries().is_empty(), "{format:?}: {:?}", logger.entries());
        check_scene(&back);
        break_cycles(&back);
    }
    break_cycles(&original);
}

#[test]
fn compiled_formatters_read_the_same_streams() {
    let reflective = scene_registry();
    let compiled = scene_registry();
    compiled.set_compiled_formatters(true);

    let original = scene();
    for format in [DataFormat::Binary, DataFormat::Json] {
        let bytes = write(&reflective, SerializationConfig::default(), &original, format);
        assert_eq!(write(&compiled, SerializationConfig::default(), &original, format), bytes);

        let (mut de, logger) = logged_deserializer(&compiled, SerializationConfig::default());
        let back: Scene = de.deserialize(&bytes, format).unwrap();
        assert!(logger.entries().is_empty());
        check_scene(&back);
        break_cycles(&back);
    }
    break_cycles(&original);
}

#[test]
fn big_endian_sessions() {
    let registry = scene_registry();
    let config = SerializationConfig {
        byte_order: ByteOrderKind::Big,
        ..SerializationConfig::default()
    };
    assert_eq!(write(&registry, config.clone(), &12345_i32, DataFormat::Binary), [24, 0, 0, 0x30, 0x39]);

    let original = scene();
    let bytes = write(&registry, config.clone(), &original, DataFormat::Binary);
    let (mut de, _) = logged_deserializer(&registry, config);
    let back: Scene = de.deserialize(&bytes, DataFormat::Binary).unwrap();
    check_scene(&back);
    break_cycles(&back);
    break_cycles(&original);
}

#[test]
fn pretty_text_reads_back() {
    let registry = scene_registry();
    let config = SerializationConfig {
        pretty_print: true,
        ..SerializationConfig::default()
    };
    let original = scene();
    let text = SerializeDriver::new(registry.clone(), config)
        .unwrap()
        .serialize_json(&original)
        .unwrap();
    assert!(text.contains("\n    \"entities\": {"));

    let (mut de, _) = logged_deserializer(&registry, SerializationConfig::default());
    let back: Scene = de.deserialize_json(&text).unwrap();
    check_scene(&back);
    break_cycles(&back);
    break_cycles(&original);
}

#[test]
fn streams_through_io() {
    let registry = scene_registry();
    let original = scene();
    let mut ser = SerializeDriver::new(registry.clone(), SerializationConfig::default()).unwrap();
    let bytes = ser
        .serialize_into(&original, DataFormat::Binary, Vec::new())
        .unwrap();

    let (mut de, _) = logged_deserializer(&registry, SerializationConfig::default());
    let back: Scene = de.deserialize_from(bytes.as_slice(), DataFormat::Binary).unwrap();
    check_scene(&back);
    break_cycles(&back);

    let nodes = ser.serialize_into(&original, DataFormat::Nodes, Vec::new());
    assert!(matches!(nodes, Err(SerializeError::UnsupportedFormat { .. })));
    break_cycles(&original);
}

// -----------------------------------------------------------------------------
// Tolerance

#[derive(Reflect, Default, Debug, PartialEq)]
struct SettingsV1 {
    pub volume: i32,
    pub title: String,
}

#[derive(Reflect, Default)]
struct Extras {
    pub history: Vec<String>,
    pub ratios: Vec<f64>,
    pub table: BTreeMap<u8, Option<Vec3>>,
    pub shared: Option<Shared<Material>>,
}

#[derive(Reflect, Default)]
struct SettingsV2 {
    pub volume: i32,
    pub extras: Extras,
    pub title: String,
}

#[test]
fn newer_members_are_skipped() {
    let registry = scene_registry();
    let newer = SettingsV2 {
        volume: 7,
        extras: Extras {
            history: vec![String::from("a"), String::from("b")],
            ratios: vec![0.25, 4.0],
            table: BTreeMap::from([(1, Some(Vec3::default())), (2, None)]),
            shared: Some(Shared::new(Material::default())),
        },
        title: String::from("main"),
    };
    let older = SettingsV1 {
        volume: 7,
        title: String::from("main"),
    };

    for format in [DataFormat::Binary, DataFormat::Json] {
        let bytes = write(&registry, SerializationConfig::default(), &newer, format);
        let (mut de, logger) = logged_deserializer(&registry, SerializationConfig::default());
        let back: SettingsV1 = de.deserialize(&bytes, format).unwrap();
        assert_eq!(back, older);
        assert_eq!(logger.count(Severity::Warning), 1, "{format:?}");
        assert!(logger.contains("no member `extras`"));

        // skipping leaves nothing behind that a rewrite would carry
        let rewritten = write(&registry, SerializationConfig::default(), &back, format);
        assert_eq!(rewritten, write(&registry, SerializationConfig::default(), &older, format));
    }
}

#[derive(Reflect, Default)]
#[reflect(type_path = "demo::Original")]
struct Original {
    pub value: i32,
}

#[derive(Reflect, Default)]
#[reflect(type_path = "demo::Renamed", former_path = "demo::Original")]
struct Renamed {
    pub value: i32,
}

#[test]
fn renamed_types_keep_loading() {
    let writer = Arc::new(Registry::new());
    writer.register::<Original>();
    let reader = Arc::new(Registry::new());
    reader.register::<Renamed>();

    let boxed = AnyBox {
        item: Some(Shared::new(Original { value: 41 }).into_dyn()),
    };
    let mut ser = SerializeDriver::new(writer, SerializationConfig::default()).unwrap();
    for format in FORMATS {
        let (mut de, logger) = logged_deserializer(&reader, SerializationConfig::default());
        let back: AnyBox = match format {
            DataFormat::Nodes => de.from_nodes(&ser.serialize_nodes(&boxed).unwrap()).unwrap(),
            _ => de.deserialize(&ser.serialize(&boxed, format).unwrap(), format).unwrap(),
        };
        let item = back.item.unwrap();
        assert_eq!(item.borrow().downcast_ref::<Renamed>().map(|r| r.value), Some(41));
        assert!(logger.entries().is_empty());
    }
}

#[test]
fn generic_instances_bind_by_path() {
    let registry = scene_registry();
    registry.register::<Vec<Vec3>>();
    let points = vec![Vec3 { x: 1.0, y: 2.0, z: 3.0 }, Vec3::default()];
    let boxed = AnyBox {
        item: Some(Shared::new(points.clone()).into_dyn()),
    };
    assert!(<Vec<Vec3>>::type_path().ends_with("Vec<vc_serial::tests::Vec3>"));
    for format in FORMATS {
        let (back, logger) = round_trip(&registry, &boxed, format);
        let item = back.item.unwrap();
        assert_eq!(item.borrow().downcast_ref::<Vec<Vec3>>(), Some(&points));
        assert!(logger.entries().is_empty());
    }
}

// -----------------------------------------------------------------------------
// Literal bytes and limits

#[test]
fn literal_encodings() {
    let registry = scene_registry();
    assert_eq!(
        write(&registry, SerializationConfig::default(), &12345_i32, DataFormat::Binary),
        [24, 0x39, 0x30, 0x00, 0x00]
    );
    let wide = SerializationConfig {
        narrow_strings: false,
        ..SerializationConfig::default()
    };
    assert_eq!(
        write(&registry, wide, &String::from("Hi"), DataFormat::Binary),
        [40, 0x01, 0x02, 0x00, 0x00, 0x00, 0x48, 0x00, 0x69, 0x00]
    );
    assert_eq!(
        write(&registry, SerializationConfig::default(), &String::from("Hi"), DataFormat::Binary),
        [40, 0x00, 0x02, 0x00, 0x00, 0x00, 0x48, 0x69]
    );
}

#[test]
fn empty_input_has_no_value() {
    let registry = scene_registry();
    let (mut de, _) = logged_deserializer(&registry, SerializationConfig::default());
    let result = de.deserialize::<i32>(&[], DataFormat::Binary);
    assert!(matches!(result, Err(SerializeError::MissingValue { .. })));
    let result = de.deserialize_json::<Vec3>("");
    assert!(matches!(result, Err(SerializeError::MissingValue { .. })));
}

#[derive(Reflect, Default)]
struct Link {
    pub next: Option<Shared<Link>>,
}

#[test]
fn unbounded_nesting_aborts() {
    let registry = scene_registry();
    let mut head = Shared::new(Link::default());
    for _ in 0..10 {
        head = Shared::new(Link { next: Some(head) });
    }
    let config = SerializationConfig {
        max_depth: 4,
        ..SerializationConfig::default()
    };
    let result = SerializeDriver::new(registry, config)
        .unwrap()
        .serialize(&head, DataFormat::Binary);
    match result {
        Err(SerializeError::Aborted(abort)) => assert!(abort.message().contains("deeper than 4")),
        other => panic!("expected an abort, got {other:?}"),
    }
}

#[test]
fn throwing_modes_fail_the_whole_call() {
    let registry = scene_registry();
    let bytes = write(&registry, SerializationConfig::default(), &String::from("text"), DataFormat::Binary);
    let config = SerializationConfig {
        error_handling: ErrorHandlingPolicy::ThrowOnWarningsAndErrors,
        ..SerializationConfig::default()
    };
    let (mut de, logger) = logged_deserializer(&registry, config);
    let result = de.deserialize::<Vec3>(&bytes, DataFormat::Binary);
    assert!(matches!(result, Err(SerializeError::Aborted(_))));
    assert_eq!(logger.count(Severity::Abort), 1);
}

// -----------------------------------------------------------------------------
// Configuration and registration

#[test]
fn configuration_loads_from_text() {
    let cfg: SerializationConfig =
        ron::from_str("(policy: \"strict\", error_handling: ThrowOnErrors, byte_order: Big)").unwrap();
    assert_eq!(cfg.policy, "strict");
    assert_eq!(cfg.error_handling, ErrorHandlingPolicy::ThrowOnErrors);
    assert_eq!(cfg.byte_order, ByteOrderKind::Big);
    assert_eq!(cfg.max_node_entries, 10_000);

    let cfg: SerializationConfig = serde_json::from_str(r#"{"logging":"Silent","max_depth":8}"#).unwrap();
    assert_eq!(cfg.logging, LoggingPolicy::Silent);
    assert_eq!(cfg.max_depth, 8);
    assert!(cfg.narrow_strings);

    let text = serde_json::to_string(&cfg).unwrap();
    assert_eq!(serde_json::from_str::<SerializationConfig>(&text).unwrap(), cfg);
}

#[test]
fn custom_policies_are_looked_up_by_id() {
    let registry = scene_registry();
    let config = SerializationConfig {
        policy: String::from("positions_only"),
        ..SerializationConfig::default()
    };
    assert!(matches!(
        SerializeDriver::new(registry.clone(), config.clone()),
        Err(SerializeError::UnknownPolicy { .. })
    ));

    registry.register_policy(SerializationPolicy::new("positions_only", false, |_, field| {
        field.type_info().type_id() == core::any::TypeId::of::<Vec3>() || field.name() == "x"
    }));
    let entity = Entity {
        name: String::from("hidden"),
        position: Vec3 { x: 4.0, y: 0.0, z: 0.0 },
        ..Entity::default()
    };
    let text = SerializeDriver::new(registry, config)
        .unwrap()
        .serialize_json(&entity)
        .unwrap();
    assert_eq!(text, r#"{"position":{"x":4.0}}"#);
}

#[test]
fn queued_modules_register_once() {
    let registry = Registry::new();
    registry.enqueue_module(ModuleRegistration::new("demo::geometry", |types| types.register::<Vec3>()));
    assert!(registry.process_pending_modules());
    assert!(registry.types().get_with_type_path(Vec3::type_path()).is_some());

    registry.enqueue_module(ModuleRegistration::new("demo::geometry", |types| types.register::<Material>()));
    registry.process_pending_modules();
    assert!(registry.types().get_with_type_path(Material::type_path()).is_none());
}

#[cfg(feature = "auto_register")]
mod discovered {
    use super::*;

    #[derive(Reflect, Default)]
    #[reflect(auto_register)]
    pub(super) struct Beacon {
        pub signal: u16,
    }

    #[test]
    fn submitted_modules_are_registered_up_front() {
        let writer = Arc::new(Registry::new());
        let boxed = AnyBox {
            item: Some(Shared::new(Beacon { signal: 3 }).into_dyn()),
        };
        let bytes = write(&writer, SerializationConfig::default(), &boxed, DataFormat::Binary);

        let reader = Arc::new(Registry::new());
        assert!(reader.types().get_with_type_path(Beacon::type_path()).is_some());
        let (mut de, logger) = logged_deserializer(&reader, SerializationConfig::default());
        let back: AnyBox = de.deserialize(&bytes, DataFormat::Binary).unwrap();
        let item = back.item.unwrap();
        assert_eq!(item.borrow().downcast_ref::<Beacon>().map(|b| b.signal), Some(3));
        assert!(logger.entries().is_empty());
    }
}

#[test]
fn global_registry_drivers() {
    Registry::global().register::<Vec3>();
    let point = Vec3 { x: 1.0, y: 2.0, z: 3.0 };
    let bytes = SerializeDriver::with_global(SerializationConfig::default())
        .unwrap()
        .serialize(&point, DataFormat::Binary)
        .unwrap();
    let back: Vec3 = DeserializeDriver::with_global(SerializationConfig::default())
        .unwrap()
        .deserialize(&bytes, DataFormat::Binary)
        .unwrap();
    assert_eq!(back, point);
}
