//! Wire codec for point-in-polygon requests and responses.
//!
//! Requests are JSON objects (see [`PointInPolygonRequest`]); responses are
//! JSON arrays of [`PlaceRecord`]s. Encoding is deterministic: record keys
//! follow declaration order and projected properties are sorted, so equal
//! responses always encode to identical bytes.

use serde::ser::Error as _;
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};
use crate::models::{PlaceRecord, PointInPolygonRequest};

/// Parse a serialized request. Does not check coordinate ranges.
///
/// The payload must be a JSON object; derived struct deserialization would
/// otherwise also fill fields positionally from an array.
pub fn decode_request(raw: impl AsRef<[u8]>) -> Result<PointInPolygonRequest, DecodeError> {
    let object: Map<String, Value> = serde_json::from_slice(raw.as_ref())?;
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Serialize a response as a JSON array.
///
/// serde_json writes non-finite floats as `null`, which would not decode back
/// into a record, so those are refused here.
pub fn encode_response(places: &[PlaceRecord]) -> Result<String, EncodeError> {
    for place in places {
        let mut coords = [place.latitude, place.longitude]
            .into_iter()
            .chain(place.bbox.into_iter().flatten());
        if coords.any(|v| !v.is_finite()) {
            return Err(EncodeError(serde_json::Error::custom(format!(
                "place {} has a non-finite coordinate",
                place.id
            ))));
        }
    }

    Ok(serde_json::to_string(places)?)
}

/// Parse an encoded response back into records.
pub fn decode_response(raw: impl AsRef<[u8]>) -> Result<Vec<PlaceRecord>, DecodeError> {
    Ok(serde_json::from_slice(raw.as_ref())?)
}
