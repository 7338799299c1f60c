use super::*;

use crate::content::{
    ActionRecord, ChoiceRecord, DialogueRecord, ItemRecord, LocationRecord, PackageDetailRecord,
    PackageRecord, PositionRecord, QuestRecord, SubquestRecord,
};

use routes_auth::*;
use routes_content::{collection, keyed_collection};
use routes_progress::*;

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        // Player state
        .route("/inventory", get(get_inventory).post(post_inventory))
        .route("/inventory/amount", get(get_inventory_amount))
        .route("/package/apply", post(apply_package))
        .route("/player_progress", get(get_progress).post(post_progress))
        .route("/player_progress/update", post(update_progress))
        .route("/player_progress/advance", post(advance_progress))
        // Accounts
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session_info))
        .route("/api/user/me", get(get_me).put(update_me))
        .route("/api/user/password", post(change_password));

    // Content collections
    app = keyed_collection::<QuestRecord>(app);
    app = keyed_collection::<SubquestRecord>(app);
    app = keyed_collection::<LocationRecord>(app);
    app = keyed_collection::<PositionRecord>(app);
    app = keyed_collection::<ActionRecord>(app);
    app = keyed_collection::<DialogueRecord>(app);
    app = keyed_collection::<ItemRecord>(app);
    app = keyed_collection::<PackageRecord>(app);
    app = collection::<ChoiceRecord>(app);
    app = collection::<PackageDetailRecord>(app);

    app.with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, guard::session_layer))
}
