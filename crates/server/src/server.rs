use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
    typed_header::TypedHeaderRejection,
};

use std::{net::SocketAddr, sync::Arc};

use crate::{admin, bookings, transactions, wallets};
use engine::Engine;

static USER_HEADER: HeaderName = HeaderName::from_static("x-user-id");
static ADMIN_HEADER: HeaderName = HeaderName::from_static("x-admin-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// End user authenticated by the upstream gateway.
#[derive(Clone, Debug)]
pub struct UserId(pub String);

/// Operator authenticated by the upstream gateway.
#[derive(Clone, Debug)]
pub struct AdminId(pub String);

fn decode_id<'i, I>(values: &mut I) -> Result<String, AxumError>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let value = values.next().ok_or_else(AxumError::invalid)?;
    let Ok(value) = value.to_str() else {
        return Err(AxumError::invalid());
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(AxumError::invalid());
    }
    Ok(value.to_string())
}

fn encode_id<E: Extend<HeaderValue>>(id: &str, values: &mut E, header: &HeaderName) {
    match HeaderValue::from_str(id) {
        Ok(value) => values.extend(std::iter::once(value)),
        Err(_) => tracing::error!("failed to encode {header} header"),
    }
}

/// `TypedHeader` for `x-user-id`.
#[derive(Debug)]
struct UserHeader(String);

impl Header for UserHeader {
    fn name() -> &'static HeaderName {
        &USER_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        decode_id(values).map(UserHeader)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_id(&self.0, values, &USER_HEADER);
    }
}

/// `TypedHeader` for `x-admin-id`.
#[derive(Debug)]
struct AdminHeader(String);

impl Header for AdminHeader {
    fn name() -> &'static HeaderName {
        &ADMIN_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        decode_id(values).map(AdminHeader)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_id(&self.0, values, &ADMIN_HEADER);
    }
}

async fn user_auth(
    header: Result<TypedHeader<UserHeader>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Ok(TypedHeader(UserHeader(user_id))) = header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    request.extensions_mut().insert(UserId(user_id));
    Ok(next.run(request).await)
}

async fn admin_auth(
    header: Result<TypedHeader<AdminHeader>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Ok(TypedHeader(AdminHeader(admin_id))) = header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    request.extensions_mut().insert(AdminId(admin_id));
    Ok(next.run(request).await)
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };

    let user_routes = Router::new()
        .route("/wallet", get(wallets::get))
        .route("/wallet/transactions", get(transactions::list))
        .route("/bookings", post(bookings::create).get(bookings::list))
        .route("/bookings/{id}", get(bookings::get))
        .route("/bookings/{id}/redeem", post(bookings::redeem))
        .route("/bookings/{id}/review", post(bookings::review))
        .route_layer(middleware::from_fn(user_auth));

    let admin_routes = Router::new()
        .route("/wallets/{user_id}", get(admin::wallet))
        .route("/wallets/{user_id}/credit", post(admin::credit))
        .route("/wallets/{user_id}/debit", post(admin::debit))
        .route("/bookings", get(admin::bookings))
        .route("/bookings/{id}/transition", post(admin::transition))
        .route("/bookings/{id}/review-request", post(admin::request_review))
        .route("/bookings/{id}/refund", post(admin::refund))
        .route("/notifications/flush", post(admin::flush))
        .route_layer(middleware::from_fn(admin_auth));

    Router::new()
        .merge(user_routes)
        .nest("/admin", admin_routes)
        .with_state(state)
}

pub async fn run(engine: Arc<Engine>, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(engine)).await
}

pub fn spawn_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
