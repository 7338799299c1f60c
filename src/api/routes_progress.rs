use super::*;

use crate::content::{
    self, InventoryRecord, PackageOutcome, PlayerProgressRecord, SubquestRecord,
};

pub(super) async fn get_inventory(
    State(state): State<AppState>,
    session: AuthSession,
    ApiQuery(query): ApiQuery<PlayerQuery>,
) -> ApiResult<Vec<InventoryRecord>> {
    session.ensure_player(&query.player_id)?;
    let items = content::inventory_for(&state.store, &query.player_id)?;
    Ok(Json(ApiResponse::success(items)))
}

pub(super) async fn get_inventory_amount(
    State(state): State<AppState>,
    session: AuthSession,
    ApiQuery(query): ApiQuery<AmountQuery>,
) -> ApiResult<AmountResponse> {
    session.ensure_player(&query.player_id)?;
    let amount = content::item_amount(&state.store, &query.player_id, query.item_id)?;
    Ok(Json(ApiResponse::success(AmountResponse {
        player_id: query.player_id,
        item_id: query.item_id,
        amount,
    })))
}

/// Apply one signed delta. Deltas that would go below zero are refused with 409.
pub(super) async fn post_inventory(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(delta): ApiJson<InventoryDelta>,
) -> ApiResult<InventoryRecord> {
    session.ensure_player(&delta.player_id)?;
    if delta.amount == 0 {
        return Err(ApiError::BadRequest("amount must be non-zero".to_string()));
    }
    state.store.get_by_id::<crate::content::ItemRecord>(delta.item_id)?;
    let record = content::add_item_delta(&state.store, &delta.player_id, delta.item_id, delta.amount)?;
    Ok(Json(ApiResponse::success(record)))
}

pub(super) async fn apply_package(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(req): ApiJson<ApplyPackageRequest>,
) -> ApiResult<PackageOutcome> {
    session.ensure_player(&req.player_id)?;
    let outcome = content::apply_package(&state.store, &req.player_id, req.package_id)?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub(super) async fn get_progress(
    State(state): State<AppState>,
    session: AuthSession,
    ApiQuery(query): ApiQuery<PlayerQuery>,
) -> ApiResult<Vec<PlayerProgressRecord>> {
    session.ensure_player(&query.player_id)?;
    let entries = content::player_progress(&state.store, &query.player_id)?;
    Ok(Json(ApiResponse::success(entries)))
}

/// `POST /player_progress`: create or update an entry.
pub(super) async fn post_progress(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(update): ApiJson<ProgressUpdate>,
) -> ApiResult<PlayerProgressRecord> {
    session.ensure_player(&update.player_id)?;
    state.store.get_by_id::<SubquestRecord>(update.subquest_id)?;
    let record = content::set_progress_status(
        &state.store,
        &update.player_id,
        update.subquest_id,
        update.status,
    )?;
    Ok(Json(ApiResponse::success(record)))
}

/// `POST /player_progress/update`: change the status of an existing entry.
pub(super) async fn update_progress(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(update): ApiJson<ProgressUpdate>,
) -> ApiResult<PlayerProgressRecord> {
    session.ensure_player(&update.player_id)?;
    let key = PlayerProgressRecord::key_for(&update.player_id, update.subquest_id);
    if !state.store.exists::<PlayerProgressRecord>(&key)? {
        return Err(ApiError::NotFound(format!(
            "no progress for subquest {}",
            update.subquest_id
        )));
    }
    let record = content::set_progress_status(
        &state.store,
        &update.player_id,
        update.subquest_id,
        update.status,
    )?;
    Ok(Json(ApiResponse::success(record)))
}

/// `POST /player_progress/advance`: complete a subquest and open the next one
/// in one transaction. Repeating the call is harmless.
pub(super) async fn advance_progress(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(req): ApiJson<AdvanceRequest>,
) -> ApiResult<AdvanceResponse> {
    session.ensure_player(&req.player_id)?;
    state.store.get_by_id::<SubquestRecord>(req.completed_subquest_id)?;
    let next = state
        .store
        .next_subquest(req.completed_subquest_id)?
        .map(|s| s.subquest_id);
    if let Some(expected) = req.next_subquest_id {
        if Some(expected) != next {
            return Err(ApiError::Conflict(format!(
                "subquest {} is followed by {:?}, not {}",
                req.completed_subquest_id, next, expected
            )));
        }
    }
    let progress = content::advance_progress(&state.store, &req.player_id, req.completed_subquest_id)?;
    Ok(Json(ApiResponse::success(AdvanceResponse {
        completed_subquest_id: req.completed_subquest_id,
        active_subquest_id: content::active_subquest_of(&progress),
        progress,
    })))
}
