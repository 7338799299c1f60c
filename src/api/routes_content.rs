use super::*;

use crate::content::{KeyedRecord, Record};

/// True when every query parameter equals the record's field of the same name.
/// Unknown parameters never match.
fn matches_filters(value: &serde_json::Value, filters: &HashMap<String, String>) -> bool {
    filters.iter().all(|(field, wanted)| match value.get(field) {
        Some(serde_json::Value::String(s)) => s == wanted,
        Some(serde_json::Value::Null) => wanted == "null",
        Some(other) => other.to_string() == *wanted,
        None => false,
    })
}

/// `GET /{collection}`, optionally filtered by field, e.g. `/dialogue?position_id=4`.
pub(super) async fn list_records<T: Record>(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<HashMap<String, String>>,
) -> ApiResult<Vec<T>> {
    let records = state.store.list::<T>()?;
    if filters.is_empty() {
        return Ok(Json(ApiResponse::success(records)));
    }
    let mut matched = Vec::new();
    for record in records {
        let value = serde_json::to_value(&record)
            .map_err(|e| ApiError::Internal(format!("encode {}: {}", T::COLLECTION, e)))?;
        if matches_filters(&value, &filters) {
            matched.push(record);
        }
    }
    Ok(Json(ApiResponse::success(matched)))
}

/// `POST /{collection}`: insert or replace by key.
pub(super) async fn upsert_record<T: Record>(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    ApiJson(record): ApiJson<T>,
) -> ApiResult<T> {
    state.store.put(&record)?;
    info!(
        target: "security",
        "{} wrote {} {}",
        escape_log(&admin.username),
        T::COLLECTION,
        escape_log(&record.record_key())
    );
    Ok(Json(ApiResponse::success(record)))
}

pub(super) async fn get_record<T: KeyedRecord>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(state.store.get_by_id::<T>(id)?)))
}

pub(super) async fn delete_record<T: KeyedRecord>(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    ApiPath(id): ApiPath<u32>,
) -> ApiResult<()> {
    let key = crate::content::id_key(id);
    if !state.store.delete::<T>(&key)? {
        return Err(ApiError::NotFound(format!("{} {} not found", T::COLLECTION, id)));
    }
    info!(
        target: "security",
        "{} deleted {} {}",
        escape_log(&admin.username),
        T::COLLECTION,
        id
    );
    Ok(Json(ApiResponse::ok(format!("{} {} deleted", T::COLLECTION, id))))
}

/// List/upsert routes for a collection.
pub(super) fn collection<T: Record>(router: Router<AppState>) -> Router<AppState> {
    router.route(
        &format!("/{}", T::COLLECTION),
        get(list_records::<T>).post(upsert_record::<T>),
    )
}

/// List/upsert plus `GET`/`DELETE /{collection}/{id}`.
pub(super) fn keyed_collection<T: KeyedRecord>(router: Router<AppState>) -> Router<AppState> {
    collection::<T>(router).route(
        &format!("/{}/{{id}}", T::COLLECTION),
        get(get_record::<T>).delete(delete_record::<T>),
    )
}
