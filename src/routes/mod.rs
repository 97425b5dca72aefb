pub mod auth;
pub mod brands;
pub mod categories;
pub mod devices;
pub mod logs;
pub mod system;
pub mod users;

use axum::Router;

use crate::state::SharedState;

pub fn api_routes(state: &SharedState) -> Router<SharedState> {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/dispositivos", devices::router(state))
        .nest("/api/categorias", categories::router(state))
        .nest("/api/marcas", brands::router(state))
        .nest("/api/usuarios", users::router(state))
        .nest("/api/logs", logs::router(state))
        .merge(system::router())
}
