use super::context::with_context;
use super::handler;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

const JSON_BODY_LIMIT: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let ctx = with_context(server.auth_service.clone());

    let register = warp::post()
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(json_body())
        .and(ctx.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(json_body())
        .and(ctx.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(json_body())
        .and(ctx.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(ctx.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::get()
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(ctx.clone())
        .and(with(server.user_service.clone()))
        .and_then(handler::me);

    let list_users = warp::get()
        .and(warp::path!("users"))
        .and(with(server.user_service.clone()))
        .and_then(handler::list_users);

    let get_user = warp::get()
        .and(warp::path!("users" / i64))
        .and(with(server.user_service.clone()))
        .and_then(handler::get_user);

    let create_user = warp::post()
        .and(warp::path!("users"))
        .and(json_body())
        .and(ctx.clone())
        .and(with(server.user_service.clone()))
        .and_then(handler::create_user);

    let update_user = warp::patch()
        .and(warp::path!("users" / i64))
        .and(json_body())
        .and(ctx.clone())
        .and(with(server.user_service.clone()))
        .and_then(handler::update_user);

    let delete_user = warp::delete()
        .and(warp::path!("users" / i64))
        .and(ctx)
        .and(with(server.user_service.clone()))
        .and_then(handler::delete_user);

    register
        .or(login)
        .or(refresh)
        .or(logout)
        .or(me)
        .or(list_users)
        .or(get_user)
        .or(create_user)
        .or(update_user)
        .or(delete_user)
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(JSON_BODY_LIMIT).and(warp::body::json())
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
