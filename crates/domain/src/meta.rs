use serde_json::{Map, Value};

/// A JSON object column (`meta`/`data`/`asset_meta`/`configs` in the store).
///
/// Wraps `serde_json::Map` so the merge-patch semantics used throughout the
/// pipeline (§8: "meta patch") live in one place instead of being
/// reimplemented at each call site.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MetaMap(pub Map<String, Value>);

impl MetaMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// RFC 7386-style shallow merge patch: a key set to `null` in `patch` is
    /// removed; any other key is overwritten; keys absent from `patch` are
    /// left untouched.
    pub fn patch(&mut self, patch: &Value) {
        let Some(patch_obj) = patch.as_object() else {
            return;
        };
        for (k, v) in patch_obj {
            if v.is_null() {
                self.0.remove(k);
            } else {
                self.0.insert(k.clone(), v.clone());
            }
        }
    }

    /// Reserved compartment helpers (§3: `__user_meta__`, `__artifact_info__`).
    pub fn compartment(&self, name: &str) -> MetaMap {
        match self.0.get(name).and_then(|v| v.as_object()) {
            Some(obj) => MetaMap(obj.clone()),
            None => MetaMap::new(),
        }
    }

    pub fn set_compartment(&mut self, name: &str, value: MetaMap) {
        self.0
            .insert(name.to_string(), Value::Object(value.0));
    }
}

impl From<Map<String, Value>> for MetaMap {
    fn from(m: Map<String, Value>) -> Self {
        Self(m)
    }
}

pub const USER_META_COMPARTMENT: &str = "__user_meta__";
pub const ARTIFACT_INFO_COMPARTMENT: &str = "__artifact_info__";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_overwrites_adds_and_deletes() {
        let mut m = MetaMap(
            json!({"a": 1, "b": 2})
                .as_object()
                .unwrap()
                .clone(),
        );
        m.patch(&json!({"b": 20, "c": 3}));
        assert_eq!(m.get("a"), Some(&json!(1)));
        assert_eq!(m.get("b"), Some(&json!(20)));
        assert_eq!(m.get("c"), Some(&json!(3)));

        m.patch(&json!({"a": null}));
        assert_eq!(m.get("a"), None);
    }

    #[test]
    fn compartment_round_trips() {
        let mut m = MetaMap::new();
        let mut user = MetaMap::new();
        user.insert("nickname", json!("bob"));
        m.set_compartment(USER_META_COMPARTMENT, user.clone());
        assert_eq!(m.compartment(USER_META_COMPARTMENT), user);
    }
}
