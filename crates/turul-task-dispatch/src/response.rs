//! Response carrier and payload projection.

use serde::Serialize;
use serde_json::{Map, Value};

/// Envelope key that a projected payload never writes into the body.
pub const RESPONSE_HEADER: &str = "responseHeader";

/// Body key used for payloads that do not serialize to a JSON object.
pub const RESULT_KEY: &str = "result";

/// Response under construction for one request.
///
/// The envelope (`header`, HTTP caching flag) belongs to the transport; the
/// body (`values`) is what work payloads are merged into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseCarrier {
    header: Map<String, Value>,
    values: Map<String, Value>,
    http_caching: bool,
}

impl ResponseCarrier {
    pub fn new() -> Self {
        Self {
            header: Map::new(),
            values: Map::new(),
            http_caching: true,
        }
    }

    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: Value) {
        self.header.insert(key.into(), value);
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn add(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn http_caching(&self) -> bool {
        self.http_caching
    }

    pub fn set_http_caching(&mut self, enabled: bool) {
        self.http_caching = enabled;
    }

    /// Copy every field of `payload` into the body.
    ///
    /// Envelope keys in the payload are skipped and the envelope itself is
    /// never touched. Merging the same payload twice leaves the carrier as
    /// merging it once did. A `null` payload merges nothing; any other
    /// non-object lands under [`RESULT_KEY`].
    pub fn merge<P: Serialize + ?Sized>(&mut self, payload: &P) -> Result<(), serde_json::Error> {
        match serde_json::to_value(payload)? {
            Value::Object(fields) => {
                for (key, value) in fields {
                    if key == RESPONSE_HEADER {
                        continue;
                    }
                    self.values.insert(key, value);
                }
            }
            Value::Null => {}
            other => {
                self.values.insert(RESULT_KEY.to_string(), other);
            }
        }
        Ok(())
    }

    /// The body as a JSON object.
    pub fn body(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub fn into_body(self) -> Value {
        Value::Object(self.values)
    }
}

impl Default for ResponseCarrier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ReloadResponse {
        core_name: String,
        status: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        response_header: Option<Value>,
    }

    #[test]
    fn test_merge_copies_fields() {
        let mut carrier = ResponseCarrier::new();
        carrier
            .merge(&ReloadResponse {
                core_name: "core1".to_string(),
                status: 0,
                response_header: None,
            })
            .unwrap();
        assert_eq!(carrier.body(), json!({"coreName": "core1", "status": 0}));
    }

    #[test]
    fn test_merge_preserves_envelope() {
        let mut carrier = ResponseCarrier::new();
        carrier.set_header("QTime", json!(3));
        carrier.set_http_caching(false);

        carrier
            .merge(&ReloadResponse {
                core_name: "core1".to_string(),
                status: 0,
                response_header: Some(json!({"QTime": 99})),
            })
            .unwrap();

        assert_eq!(carrier.header().get("QTime"), Some(&json!(3)));
        assert!(!carrier.http_caching());
        assert!(carrier.get(RESPONSE_HEADER).is_none());
        assert_eq!(carrier.get("coreName"), Some(&json!("core1")));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let payload = json!({"value": "ok", "nested": {"a": [1, 2]}});
        let mut once = ResponseCarrier::new();
        once.merge(&payload).unwrap();
        let mut twice = once.clone();
        twice.merge(&payload).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_non_object_payloads() {
        let mut carrier = ResponseCarrier::new();
        carrier.merge(&()).unwrap();
        assert_eq!(carrier.body(), json!({}));

        carrier.merge(&42).unwrap();
        assert_eq!(carrier.into_body(), json!({"result": 42}));
    }

    #[test]
    fn test_new_carrier_caches_by_default() {
        let carrier = ResponseCarrier::default();
        assert!(carrier.http_caching());
        assert!(carrier.header().is_empty());
        assert!(carrier.values().is_empty());
    }
}
