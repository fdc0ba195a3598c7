use std::fmt::Debug;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Lets router state decide how [`PermissiveJson`] treats bodies that fail to
/// decode.
pub trait BodyPolicy {
    /// `true` rejects undecodable bodies with `400`, `false` keeps whatever
    /// fields decode and defaults the rest.
    fn strict_bodies(&self) -> bool;
}

/// Field-by-field decoding for bodies that are valid JSON but do not decode
/// as a whole. Implementations start from the default and keep every field
/// that decodes on its own.
pub trait LenientDecode: Default {
    fn decode_lenient(value: &Value) -> Self;
}

/// Looks `key` up in `fields`, preferring an exact match over a
/// case-insensitive one.
pub fn lookup_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).or_else(|| {
        fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

/// Decodes a single field. A missing key, `null` or a value of the wrong type
/// leaves `T::default()`.
pub fn lenient_field<T>(fields: &Map<String, Value>, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match lookup_field(fields, key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            tracing::debug!(field = key, %err, "Skipping undecodable field");
            T::default()
        }),
    }
}

/// JSON body extractor that, unless the state asks for strictness, never
/// rejects. Fields that fail to decode keep their default while the rest of
/// the body is kept; a body that is not JSON at all yields `T::default()`.
///
/// Unlike [`axum::Json`] the `Content-Type` header is not checked.
pub struct PermissiveJson<T>(pub T);

impl<T, S> FromRequest<S> for PermissiveJson<T>
where
    T: DeserializeOwned + LenientDecode + Debug + Send,
    S: BodyPolicy + Send + Sync,
{
    type Rejection = AppError;

    #[tracing::instrument(name = "permissive_json_extractor", skip_all)]
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => {
                tracing::trace!(value = ?value, "Extracted");

                Ok(PermissiveJson(value))
            }
            Err(err) if state.strict_bodies() => {
                tracing::warn!(%err, "Rejection");

                Err(AppError::bad_request_with(
                    vec![serde_json::json!({
                        "line": err.line(),
                        "column": err.column(),
                        "reason": err.to_string(),
                    })],
                    "Failed to parse request body",
                ))
            }
            Err(err) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => {
                    tracing::warn!(%err, "Partially undecodable body, keeping valid fields");

                    Ok(PermissiveJson(T::decode_lenient(&value)))
                }
                Err(_) => {
                    tracing::warn!(%err, "Undecodable body, using defaults");

                    Ok(PermissiveJson(T::default()))
                }
            },
        }
    }
}
