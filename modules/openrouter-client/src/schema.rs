use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

/// Trait for types the model can be constrained to emit.
///
/// Automatically implemented for any `JsonSchema + DeserializeOwned` type.
/// The generated schema follows the strict-mode rules OpenRouter forwards to
/// its providers: `additionalProperties: false` on every object, every
/// property listed in `required`, and no `$ref` indirection.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn response_schema() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = value
            .as_object()
            .and_then(|map| map.get("definitions"))
            .cloned();
        tighten(&mut value, definitions.as_ref());

        if let serde_json::Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    fn output_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Recursively inline `$ref`s, collapse single-element `allOf` wrappers, and
/// mark every object strict.
fn tighten(value: &mut serde_json::Value, definitions: Option<&serde_json::Value>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(path)) = map.get("$ref").cloned() {
                if let Some(def) = path
                    .strip_prefix("#/definitions/")
                    .and_then(|name| definitions.and_then(|d| d.get(name)))
                {
                    *value = def.clone();
                    tighten(value, definitions);
                    return;
                }
            }

            if let Some(serde_json::Value::Array(all_of)) = map.get("allOf").cloned() {
                if all_of.len() == 1 {
                    *value = all_of.into_iter().next().unwrap();
                    tighten(value, definitions);
                    return;
                }
            }

            if map.get("type") == Some(&serde_json::Value::String("object".into())) {
                map.insert("additionalProperties".into(), serde_json::Value::Bool(false));
                if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                    let keys: Vec<serde_json::Value> = props
                        .keys()
                        .map(|k| serde_json::Value::String(k.clone()))
                        .collect();
                    map.insert("required".into(), serde_json::Value::Array(keys));
                }
            }

            for (_, v) in map.iter_mut() {
                tighten(v, definitions);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                tighten(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Verdict {
        accepted: bool,
        reason: Option<String>,
    }

    #[test]
    fn objects_are_strict() {
        let schema = Verdict::response_schema();
        let map = schema.as_object().unwrap();
        assert_eq!(
            map.get("additionalProperties"),
            Some(&serde_json::Value::Bool(false))
        );
    }

    #[test]
    fn optional_fields_are_still_required() {
        let schema = Verdict::response_schema();
        let required = schema
            .as_object()
            .unwrap()
            .get("required")
            .and_then(|v| v.as_array())
            .unwrap();
        let names: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
        assert!(names.contains(&"accepted"));
        assert!(names.contains(&"reason"));
    }

    #[test]
    fn nested_types_are_inlined() {
        #[derive(Deserialize, JsonSchema)]
        struct Inner {
            text: String,
        }

        #[derive(Deserialize, JsonSchema)]
        struct Outer {
            inner: Inner,
        }

        let schema = Outer::response_schema();
        let map = schema.as_object().unwrap();
        assert!(!map.contains_key("definitions"));
        assert!(!map.contains_key("$schema"));

        let inner = map
            .get("properties")
            .and_then(|p| p.get("inner"))
            .and_then(|v| v.as_object())
            .unwrap();
        assert!(!inner.contains_key("$ref"));
        assert_eq!(
            inner.get("type"),
            Some(&serde_json::Value::String("object".into()))
        );
    }
}
