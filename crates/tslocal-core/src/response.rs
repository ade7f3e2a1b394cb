//! Reply classification: status codes to errors, bodies to normalized JSON.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::LocalApiError;
use crate::normalize::normalize_keys;
use crate::transport::Reply;

/// Turn a transport reply into a normalized payload or a classified error.
///
/// Socket replies: non-2xx maps through [`LocalApiError::from_status`];
/// 204 or a blank body yields an empty object. CLI replies: blank output is
/// [`LocalApiError::EmptyResponse`]. On both paths a JSON body is
/// normalized and anything else comes back verbatim as a string.
pub fn decode_reply(reply: Reply) -> Result<Value, LocalApiError> {
    match reply {
        Reply::Http { status, body } => {
            let text = String::from_utf8_lossy(&body).into_owned();
            if !(200..300).contains(&status) {
                debug!(status, "LocalAPI returned an error status");
                return Err(LocalApiError::from_status(status, text));
            }
            if status == 204 || text.trim().is_empty() {
                return Ok(empty());
            }
            Ok(parse_payload(text))
        }
        Reply::Output(text) => {
            if text.trim().is_empty() {
                return Err(LocalApiError::EmptyResponse);
            }
            Ok(parse_payload(text))
        }
    }
}

/// The value returned for calls with no response body.
pub fn empty() -> Value {
    Value::Object(Map::new())
}

fn parse_payload(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => normalize_keys(value),
        Err(_) => Value::String(text),
    }
}
