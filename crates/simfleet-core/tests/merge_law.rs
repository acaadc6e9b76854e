use proptest::prelude::*;
use serde_json::{Map, Value, json};
use simfleet_core::{FleetConfig, merge_deployment};

/// A field as it may appear in a deployment: absent, explicit null, or set.
#[derive(Debug, Clone)]
enum Field<T> {
    Absent,
    Null,
    Set(T),
}

fn field<T: Clone + std::fmt::Debug + 'static>(inner: impl Strategy<Value = T> + 'static) -> BoxedStrategy<Field<T>> {
    prop_oneof![
        Just(Field::Absent),
        Just(Field::Null),
        inner.prop_map(Field::Set),
    ]
    .boxed()
}

fn put<T: Into<Value> + Clone>(map: &mut Map<String, Value>, key: &str, value: &Field<T>) {
    match value {
        Field::Absent => {}
        Field::Null => {
            map.insert(key.to_string(), Value::Null);
        }
        Field::Set(v) => {
            map.insert(key.to_string(), v.clone().into());
        }
    }
}

fn word() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,8}"
}

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(word(), 0..4)
}

const SCALARS: &[&str] = &["name", "snapshot", "mode", "captureMode", "namePrefix"];

proptest! {
    #[test]
    fn scalars_prefer_deployment_then_default(
        defaults in prop::collection::vec(prop::option::of(word()), SCALARS.len()),
        overrides in prop::collection::vec(field(word()), SCALARS.len()),
    ) {
        let mut d = Map::new();
        let mut o = Map::new();
        for (i, key) in SCALARS.iter().enumerate() {
            if let Some(v) = &defaults[i] {
                d.insert(key.to_string(), Value::from(v.clone()));
            }
            put(&mut o, key, &overrides[i]);
        }

        let merged = merge_deployment(&d, &o).unwrap();
        for (i, key) in SCALARS.iter().enumerate() {
            let expected = match &overrides[i] {
                Field::Set(v) => Some(Value::from(v.clone())),
                Field::Absent | Field::Null => defaults[i].clone().map(Value::from),
            };
            prop_assert_eq!(merged.get(*key).cloned(), expected, "field {}", key);
        }
    }

    #[test]
    fn lists_concatenate_unless_cleared(
        default_plugins in prop::option::of(words()),
        plugins in field(words()),
        default_args in prop::option::of(words()),
        args in field(words()),
        default_labels in prop::option::of(words()),
        labels in field(words()),
    ) {
        let mut d = Map::new();
        if let Some(p) = &default_plugins {
            d.insert("plugins".into(), json!(p));
        }
        if let Some(a) = &default_args {
            d.insert("provision".into(), json!({ "args": a }));
        }
        if let Some(l) = &default_labels {
            d.insert("labels".into(), json!({ "instance": l }));
        }

        let mut o = Map::new();
        put(&mut o, "plugins", &plugins);
        let mut provision = Map::new();
        put(&mut provision, "args", &args);
        o.insert("provision".into(), Value::Object(provision));
        let mut label_block = Map::new();
        put(&mut label_block, "instance", &labels);
        o.insert("labels".into(), Value::Object(label_block));

        let merged = merge_deployment(&d, &o).unwrap();

        let expect = |base: &Option<Vec<String>>, over: &Field<Vec<String>>| -> Value {
            match over {
                Field::Null => json!([]),
                Field::Absent => json!(base.clone().unwrap_or_default()),
                Field::Set(extra) => {
                    let mut all = base.clone().unwrap_or_default();
                    all.extend(extra.iter().cloned());
                    json!(all)
                }
            }
        };
        prop_assert_eq!(&merged["plugins"], &expect(&default_plugins, &plugins));
        prop_assert_eq!(&merged["provision"]["args"], &expect(&default_args, &args));
        prop_assert_eq!(&merged["labels"]["instance"], &expect(&default_labels, &labels));
    }

    #[test]
    fn resolved_count_follows_merge(default_count in prop::option::of(1u32..50), count in field(1u32..50)) {
        let mut defaults = json!({ "snapshot": "snap" });
        if let Some(c) = default_count {
            defaults["count"] = json!(c);
        }
        let mut deployment = Map::new();
        put(&mut deployment, "count", &count);

        let config = FleetConfig::from_value(json!({
            "defaults": defaults,
            "deployments": [Value::Object(deployment)],
        }))
        .unwrap();
        let spec = &config.resolve().unwrap()[0];
        let expected = match count {
            Field::Set(c) => c,
            Field::Absent | Field::Null => default_count.unwrap_or(1),
        };
        prop_assert_eq!(spec.count, expected);
    }
}
