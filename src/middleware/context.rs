use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use ipnet::IpNet;

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::auth::session;
use crate::db;
use crate::state::SharedState;

/// Client address, honouring `X-Forwarded-For` only behind a trusted proxy.
pub fn client_ip(req: &Request, trusted_proxies: &[IpNet]) -> IpAddr {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    resolve_ip(req.headers(), peer, trusted_proxies)
}

fn resolve_ip(headers: &HeaderMap, peer_addr: Option<IpAddr>, trusted_proxies: &[IpNet]) -> IpAddr {
    let peer = peer_addr.unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if !trusted_proxies.is_empty() && trusted_proxies.iter().any(|net| net.contains(&peer)) {
        if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            // Leftmost hop that isn't one of our proxies
            for ip_str in xff.split(',').map(|s| s.trim()) {
                if let Ok(ip) = ip_str.parse::<IpAddr>() {
                    if !trusted_proxies.iter().any(|net| net.contains(&ip)) {
                        return ip;
                    }
                }
            }
        }
    }

    peer
}

/// Attaches [`ClientInfo`] and, when the session cookie resolves to a live
/// session, the [`AuthUser`] to the request.
pub async fn load_context(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&req, &state.config.trusted_proxies);
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    req.extensions_mut().insert(ClientInfo {
        ip: Some(ip.to_string()),
        user_agent,
    });

    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(session::COOKIE_NAME) {
        let id = session::hash_token(&state.config.session_secret, cookie.value());
        match db::sessions::find_valid(&state.pool, &id).await {
            Ok(Some(found)) => {
                let user = AuthUser::from_session(found.id, found.data.0);
                req.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Failed to load session: {e}"),
        }
    }

    next.run(req).await
}
