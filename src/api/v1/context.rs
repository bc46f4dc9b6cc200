use crate::application_impl::extract_bearer;
use crate::application_port::{AuthService, RequestContext};
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;
use warp::http::HeaderMap;
use warp::http::header::AUTHORIZATION;

const TRACE_HEADERS: [&str; 3] = ["x-trace-id", "x-request-id", "x-correlation-id"];

/// Build the per-request context. Never rejects: a missing or bad token
/// simply leaves the request anonymous.
pub fn with_context(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (RequestContext,), Error = Infallible> + Clone {
    warp::header::headers_cloned().and_then(move |headers: HeaderMap| {
        let auth_service = auth_service.clone();
        async move { Ok::<_, Infallible>(build_context(&headers, auth_service.as_ref()).await) }
    })
}

async fn build_context(headers: &HeaderMap, auth_service: &dyn AuthService) -> RequestContext {
    let trace_id = TRACE_HEADERS
        .iter()
        .find_map(|name| {
            headers
                .get(*name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let bearer_token = extract_bearer(authorization).map(str::to_owned);

    let current_user = match &bearer_token {
        Some(token) => auth_service.validate_access_token(token).await,
        None => None,
    };

    RequestContext {
        trace_id,
        current_user,
        bearer_token,
    }
}
