//! Request routing and dispatch.
//!
//! Every request goes through one fallback handler that runs the same stages
//! in order and stops at the first failure:
//!
//! 1. match the path against `/api/users[/<segment>]`
//! 2. parse the segment, if any, as a hyphenated RFC 4122 UUID
//! 3. pick an operation from the method
//! 4. read and parse the JSON body for POST and PUT
//! 5. call the [`UserService`] and serialize the outcome

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::debug;
use crate::{error::ApiError, model::UserId, service::UserService};

pub const USERS_PATH: &str = "/api/users";

const JSON_CONTENT_TYPE: &str = "application/json";

/// The operation a request resolves to once path, id and method are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ListUsers,
    CreateUser,
    GetUser(UserId),
    UpdateUser(UserId),
    DeleteUser(UserId),
}

impl Route {
    /// Resolves a method and path, or returns the error the client should see.
    pub fn resolve(method: &Method, path: &str) -> Result<Self, ApiError> {
        let route = match user_segment(path)? {
            Some(segment) => {
                let id = parse_user_id(segment)?;
                match *method {
                    Method::GET => Route::GetUser(id),
                    Method::PUT => Route::UpdateUser(id),
                    Method::DELETE => Route::DeleteUser(id),
                    _ => return Err(ApiError::bad_request("No such method")),
                }
            }
            // The lowercase wording is what existing clients match on.
            None => match *method {
                Method::GET => Route::ListUsers,
                Method::POST => Route::CreateUser,
                _ => return Err(ApiError::bad_request("no such method")),
            },
        };
        Ok(route)
    }
}

/// Splits off the optional `<segment>` of `/api/users/<segment>`.
fn user_segment(path: &str) -> Result<Option<&str>, ApiError> {
    let rest = path.strip_prefix(USERS_PATH).ok_or_else(no_such_endpoint)?;
    match rest {
        "" | "/" => Ok(None),
        _ => match rest.strip_prefix('/') {
            Some(segment) if !segment.contains('/') => Ok(Some(segment)),
            _ => Err(no_such_endpoint()),
        },
    }
}

fn parse_user_id(segment: &str) -> Result<UserId, ApiError> {
    UserId::parse(segment).ok_or_else(invalid_user_id)
}

fn no_such_endpoint() -> ApiError {
    ApiError::not_found("No such endpoints")
}

fn invalid_user_id() -> ApiError {
    ApiError::bad_request("Invalid user id")
}

/// Builds the HTTP application around `service`.
pub fn app(service: Arc<UserService>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn dispatch(State(service): State<Arc<UserService>>, request: Request) -> Response {
    match handle(&service, request).await {
        Ok(response) => response,
        Err(error) => {
            debug!(status = %error.status(), message = error.message(), "request failed");
            error.into_response()
        }
    }
}

async fn handle(service: &UserService, request: Request) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let route = Route::resolve(&parts.method, parts.uri.path())?;

    match route {
        Route::ListUsers => json_response(StatusCode::OK, &service.list_all().await),
        Route::GetUser(id) => json_response(StatusCode::OK, &service.get_by_id(&id).await?),
        Route::CreateUser => {
            let input = read_json(body).await?;
            json_response(StatusCode::CREATED, &service.create(&input).await?)
        }
        Route::UpdateUser(id) => {
            let input = read_json(body).await?;
            json_response(StatusCode::OK, &service.update(&id, &input).await?)
        }
        Route::DeleteUser(id) => {
            service.remove(&id).await?;
            Ok(empty_response(StatusCode::NO_CONTENT))
        }
    }
}

/// Reads the whole body and parses it as JSON.
///
/// A transport failure is an internal error; malformed JSON is the client's
/// fault and becomes a 400.
async fn read_json(body: Body) -> Result<Value, ApiError> {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(ApiError::internal)?;
    parse_json(&bytes)
}

fn parse_json(bytes: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(bytes).map_err(|error| {
        debug!(%error, "rejecting malformed request body");
        ApiError::bad_request("Invalid request body")
    })
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response, ApiError> {
    let encoded = serde_json::to_vec(value).map_err(ApiError::internal)?;
    Ok((status, [(CONTENT_TYPE, JSON_CONTENT_TYPE)], encoded).into_response())
}

fn empty_response(status: StatusCode) -> Response {
    (status, [(CONTENT_TYPE, JSON_CONTENT_TYPE)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0af5e52a-476a-48e8-902e-97bd2897d817";

    fn id() -> UserId {
        UserId::parse(ID).expect("valid id")
    }

    fn rejection(method: Method, path: &str) -> (StatusCode, String) {
        let error = Route::resolve(&method, path).expect_err("request should be rejected");
        (error.status(), error.message().to_string())
    }

    #[test]
    fn resolves_collection_routes_with_and_without_trailing_slash() {
        for path in ["/api/users", "/api/users/"] {
            assert_eq!(Route::resolve(&Method::GET, path), Ok(Route::ListUsers));
            assert_eq!(Route::resolve(&Method::POST, path), Ok(Route::CreateUser));
        }
    }

    #[test]
    fn resolves_item_routes() {
        let path = format!("/api/users/{ID}");
        assert_eq!(Route::resolve(&Method::GET, &path), Ok(Route::GetUser(id())));
        assert_eq!(Route::resolve(&Method::PUT, &path), Ok(Route::UpdateUser(id())));
        assert_eq!(Route::resolve(&Method::DELETE, &path), Ok(Route::DeleteUser(id())));
    }

    #[test]
    fn uppercase_ids_keep_their_spelling() {
        let upper = ID.to_uppercase();
        let route = Route::resolve(&Method::GET, &format!("/api/users/{upper}"))
            .expect("uppercase ids are valid");
        let Route::GetUser(requested) = route else {
            panic!("expected a user lookup");
        };
        assert_eq!(requested.uuid(), id().uuid());
        assert_eq!(requested.to_string(), upper);
    }

    #[test]
    fn unknown_paths_are_not_found() {
        let paths = [
            "/".to_string(),
            "/api".to_string(),
            "/api/usersX".to_string(),
            "/api/user".to_string(),
            "/No%20such%20endpoint".to_string(),
            "/api/users//".to_string(),
            format!("/api/users/{ID}/extra"),
        ];
        for path in &paths {
            assert_eq!(
                rejection(Method::GET, path),
                (StatusCode::NOT_FOUND, "No such endpoints".to_string()),
                "path {path}"
            );
        }
    }

    #[test]
    fn malformed_ids_are_rejected_before_the_method() {
        for segment in [
            "1234567890",
            "0af5e52a476a48e8902e97bd2897d817",
            "{0af5e52a-476a-48e8-902e-97bd2897d817}",
            "0af5e52a-476a-48e8-902e-97bd2897d81z",
            "0af5e52a-476a-08e8-902e-97bd2897d817",
            "0af5e52a-476a-48e8-102e-97bd2897d817",
            "ffffffff-ffff-ffff-ffff-ffffffffffff",
        ] {
            let path = format!("/api/users/{segment}");
            for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
                assert_eq!(
                    rejection(method, &path),
                    (StatusCode::BAD_REQUEST, "Invalid user id".to_string()),
                    "segment {segment}"
                );
            }
        }
    }

    #[test]
    fn unsupported_methods_keep_their_wording() {
        assert_eq!(
            rejection(Method::PATCH, &format!("/api/users/{ID}")),
            (StatusCode::BAD_REQUEST, "No such method".to_string())
        );
        assert_eq!(
            rejection(Method::POST, &format!("/api/users/{ID}")),
            (StatusCode::BAD_REQUEST, "No such method".to_string())
        );
        assert_eq!(
            rejection(Method::PUT, "/api/users/"),
            (StatusCode::BAD_REQUEST, "no such method".to_string())
        );
        assert_eq!(
            rejection(Method::DELETE, "/api/users"),
            (StatusCode::BAD_REQUEST, "no such method".to_string())
        );
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let error = parse_json(&Bytes::from_static(b"{\"username\":")).expect_err("truncated");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.message(), "Invalid request body");

        assert!(parse_json(&Bytes::new()).is_err());
    }
}
