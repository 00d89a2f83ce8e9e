//! Domain operations. Handlers authenticate and parse; services load records,
//! consult the access policy, write through the stores and keep derived
//! aggregates current.

pub mod aggregate;
pub mod auth_service;
pub mod bootcamp_service;
pub mod course_service;
pub mod email;
pub mod geocoder;
pub mod review_service;
pub mod user_service;

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::BootcampSummary;
use crate::store::Stores;

pub use auth_service::AuthService;
pub use bootcamp_service::BootcampService;
pub use course_service::CourseService;
pub use review_service::ReviewService;
pub use user_service::UserService;

pub(crate) fn to_json<T: Serialize>(record: &T) -> Result<Value, ApiError> {
    serde_json::to_value(record).map_err(|e| {
        tracing::error!("Failed to serialize record: {}", e);
        ApiError::internal_server_error("Server Error")
    })
}

/// Replace the `bootcamp` id of each serialized child with `{id, name, description}`.
pub(crate) async fn populate_bootcamps(
    stores: &Stores,
    items: Vec<(Uuid, Value)>,
) -> Result<Vec<Value>, ApiError> {
    let mut ids: Vec<Uuid> = items.iter().map(|(id, _)| *id).collect();
    ids.sort();
    ids.dedup();
    let summaries: HashMap<Uuid, BootcampSummary> = stores
        .bootcamps
        .find_bootcamps(&ids)
        .await?
        .iter()
        .map(|b| (b.id, BootcampSummary::from(b)))
        .collect();

    items
        .into_iter()
        .map(|(bootcamp_id, mut value)| {
            if let (Value::Object(map), Some(summary)) = (&mut value, summaries.get(&bootcamp_id)) {
                map.insert("bootcamp".to_string(), to_json(summary)?);
            }
            Ok(value)
        })
        .collect()
}
