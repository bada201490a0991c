//! Named extension decoding.
//!
//! Each kind of owner (material, node, texture reference, document root)
//! has a fixed table mapping an extension name to a decode routine. A
//! routine only runs when its key is present, and writes its result into
//! typed fields of the owner. Keys without a routine are kept verbatim.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::LoadError;

pub type ExtensionHandler<T> = fn(&mut T, &Value) -> Result<(), LoadError>;

pub struct ExtensionRegistry<T: 'static> {
    handlers: &'static [(&'static str, ExtensionHandler<T>)],
}

impl<T: 'static> ExtensionRegistry<T> {
    pub const fn new(handlers: &'static [(&'static str, ExtensionHandler<T>)]) -> Self {
        Self { handlers }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|(name, _)| *name)
    }

    pub fn is_recognized(&self, name: &str) -> bool {
        self.handlers.iter().any(|(key, _)| *key == name)
    }

    /// Run the routine of every recognized key in `extensions` against
    /// `owner` and collect the rest.
    pub fn apply(
        &self,
        owner: &mut T,
        extensions: Option<&Map<String, Value>>,
    ) -> Result<Extensions, LoadError> {
        let mut result = Extensions::default();
        for (name, value) in extensions.into_iter().flatten() {
            match self.handlers.iter().find(|(key, _)| *key == name.as_str()) {
                Some((key, handler)) => {
                    handler(owner, value)?;
                    result.recognized.push(*key);
                }
                None => {
                    result.unrecognized.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(result)
    }
}

/// Extension keys found on one owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions {
    recognized: Vec<&'static str>,
    unrecognized: BTreeMap<String, Value>,
}

impl Extensions {
    /// Keep every key verbatim, for owners without decodable extensions.
    pub(crate) fn opaque(extensions: Option<&Map<String, Value>>) -> Self {
        Self {
            recognized: Vec::new(),
            unrecognized: extensions
                .into_iter()
                .flatten()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    /// Extensions decoded into typed fields of the owner.
    pub fn recognized(&self) -> &[&'static str] {
        &self.recognized
    }

    /// Raw payload of an extension this crate does not decode.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.unrecognized.get(name)
    }

    pub fn unrecognized(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.unrecognized
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.recognized.is_empty() && self.unrecognized.is_empty()
    }
}

#[cfg(test)]
mod test {
    use serde_json::{json, Value};

    use super::{ExtensionRegistry, Extensions};
    use crate::error::LoadError;

    #[derive(Default)]
    struct Owner {
        answer: Option<u64>,
    }

    fn decode_answer(owner: &mut Owner, value: &Value) -> Result<(), LoadError> {
        let answer = value
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| LoadError::bad_extension("TEST_answer", "missing value"))?;
        owner.answer = Some(answer);
        Ok(())
    }

    const REGISTRY: ExtensionRegistry<Owner> =
        ExtensionRegistry::new(&[("TEST_answer", decode_answer)]);

    #[test]
    fn recognized_and_opaque_keys() {
        let extensions = json!({
            "TEST_answer": { "value": 42 },
            "VENDOR_other": { "anything": [1, 2, 3] },
        });
        let mut owner = Owner::default();
        let result = REGISTRY
            .apply(&mut owner, extensions.as_object())
            .unwrap();

        assert_eq!(owner.answer, Some(42));
        assert_eq!(result.recognized(), &["TEST_answer"]);
        assert_eq!(
            result.get("VENDOR_other"),
            Some(&json!({ "anything": [1, 2, 3] }))
        );
        assert!(result.get("TEST_answer").is_none());
        assert!(REGISTRY.is_recognized("TEST_answer"));
        assert!(!REGISTRY.is_recognized("VENDOR_other"));
    }

    #[test]
    fn absent_extensions() {
        let mut owner = Owner::default();
        let result = REGISTRY.apply(&mut owner, None).unwrap();
        assert_eq!(result, Extensions::default());
        assert!(result.is_empty());
        assert!(owner.answer.is_none());
    }

    #[test]
    fn malformed_recognized_extension_fails() {
        let extensions = json!({ "TEST_answer": { "value": "nope" } });
        let mut owner = Owner::default();
        assert!(REGISTRY.apply(&mut owner, extensions.as_object()).is_err());
    }
}
