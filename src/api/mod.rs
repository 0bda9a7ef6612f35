use std::convert::Infallible;
use std::io::Write;

use hyper::header::{ALLOW, CONTENT_TYPE, LOCATION};
use hyper::http::HeaderValue;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{debug, error, info, warn};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;

use crate::config::Config;
use crate::directory::{CreateError, Directory, LoadState};
use crate::model::{ApiContext, EmptyState, FieldErrors, Listing, User, UserForm};

use error::{
    to_http_err, BadGateway, BadRequest, HttpError, HttpResult, ServiceUnavailable,
    Unprocessable,
};
use page::{Notice, PageView};

mod error;
mod page;

pub async fn api(config: Config, context: ApiContext) {
    let Ok(addr) = config.host.parse() else {
        error!("Could not parse APP_HOST: {}", config.host);
        return;
    };

    let make_service = make_service_fn(move |conn: &AddrStream| {
        let context = context.clone();
        debug!("Connected {}", conn.remote_addr());

        let service = service_fn(move |req| handle(context.clone(), req));
        async move { Ok::<_, Infallible>(service) }
    });

    let server = Server::bind(&addr).serve(make_service);
    info!("Server is running on http://{}", addr);
    if let Err(e) = server.await {
        error!("Server error: {}", e);
    }
}

async fn handle(context: ApiContext, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let time = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let res = match (&method, uri.path()) {
        (&Method::GET, "/") => handle_page(&context, uri.query()).await,
        (_, "/") => method_not_allowed(&[Method::GET]),

        (&Method::POST, "/users") => handle_submit_form(&context, req.into_body()).await,
        (_, "/users") => method_not_allowed(&[Method::POST]),

        (&Method::GET, "/api/users") => handle_list_users(&context, uri.query()).await,
        (&Method::POST, "/api/users") => handle_create_user(&context, req.into_body()).await,
        (_, "/api/users") => method_not_allowed(&[Method::GET, Method::POST]),

        (&Method::POST, "/api/refresh") => handle_refresh(&context).await,
        (_, "/api/refresh") => method_not_allowed(&[Method::POST]),

        (&Method::GET, "/metrics") => handle_metrics(&context),
        (_, "/metrics") => method_not_allowed(&[Method::GET]),

        _ => not_found(),
    }
    .unwrap_or_else(Response::from);

    let elapsed = time.elapsed();
    context.observe_req_duration(&method, uri.path(), elapsed);
    debug!("{} {} {} {:?}", &method, uri.path(), res.status(), elapsed);
    Ok(res)
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    #[serde(default)]
    q: String,
    created: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<'a> {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    total: usize,
    shown: usize,
    users: Vec<&'a User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    empty: Option<EmptyState>,
}

impl<'a> ListResponse<'a> {
    fn new(state: &'a LoadState, term: &'a str) -> Self {
        let listing = Listing::new(state.users(), term);
        Self {
            state: state.name(),
            error: state.error(),
            total: listing.total,
            shown: listing.users.len(),
            users: listing.users,
            empty: listing.empty,
        }
    }
}

fn parse_query<'de, T: Deserialize<'de> + Default>(query: Option<&'de str>) -> HttpResult<T> {
    match query {
        Some(query) => serde_urlencoded::from_str(query).map_err(to_http_err(BadRequest)),
        None => Ok(T::default()),
    }
}

fn configured(context: &ApiContext) -> HttpResult<&Directory> {
    context
        .directory()
        .map_err(|e| -> Box<dyn HttpError> { Box::new(ServiceUnavailable(e.to_string())) })
}

async fn handle_page(context: &ApiContext, query: Option<&str>) -> HttpResult<Response<Body>> {
    let query = parse_query::<PageQuery>(query)?;
    let notice = query
        .created
        .map(|user_id| Notice::Success(format!("Registered user {user_id}")));

    let (state, config_error) = match context.directory() {
        Ok(directory) => (directory.state().await, None),
        Err(e) => (LoadState::Loaded(Vec::new()), Some(e.to_string())),
    };

    let view = PageView {
        config_error,
        state: &state,
        term: &query.q,
        form: &UserForm::default(),
        errors: &FieldErrors::default(),
        notice,
    };
    Ok(html_response(StatusCode::OK, page::render(&view)))
}

async fn handle_submit_form(context: &ApiContext, body: Body) -> HttpResult<Response<Body>> {
    let bytes = hyper::body::to_bytes(body).await?;
    let form =
        serde_urlencoded::from_bytes::<UserForm>(&bytes).map_err(to_http_err(BadRequest))?;

    let directory = match context.directory() {
        Ok(directory) => directory,
        Err(e) => {
            let view = PageView {
                config_error: Some(e.to_string()),
                state: &LoadState::Loaded(Vec::new()),
                term: "",
                form: &form,
                errors: &FieldErrors::default(),
                notice: None,
            };
            return Ok(html_response(
                StatusCode::SERVICE_UNAVAILABLE,
                page::render(&view),
            ));
        }
    };

    let (status, errors, notice) = match directory.create(&form).await {
        Ok(registration) => {
            context.observe_registration(&registration);
            let location = format!("/?created={}", registration.created.user_id);
            let mut res = Response::default();
            *res.status_mut() = StatusCode::SEE_OTHER;
            res.headers_mut().insert(LOCATION, location.parse()?);
            return Ok(res);
        }
        Err(CreateError::Validation(errors)) => (StatusCode::UNPROCESSABLE_ENTITY, errors, None),
        Err(CreateError::Store(e)) => {
            context.observe_store_error(&e);
            let notice = Notice::Failure(e.to_string());
            (StatusCode::BAD_GATEWAY, FieldErrors::default(), Some(notice))
        }
    };

    let state = directory.state().await;
    let view = PageView {
        config_error: None,
        state: &state,
        term: "",
        form: &form,
        errors: &errors,
        notice,
    };
    Ok(html_response(status, page::render(&view)))
}

async fn handle_list_users(
    context: &ApiContext,
    query: Option<&str>,
) -> HttpResult<Response<Body>> {
    let query = parse_query::<ListQuery>(query)?;
    let state = configured(context)?.state().await;
    Ok(json_response(StatusCode::OK, &ListResponse::new(&state, &query.q)))
}

async fn handle_create_user(context: &ApiContext, body: Body) -> HttpResult<Response<Body>> {
    let directory = configured(context)?;
    let bytes = hyper::body::to_bytes(body).await?;
    let form = serde_json::from_slice::<UserForm>(&bytes).map_err(to_http_err(BadRequest))?;

    match directory.create(&form).await {
        Ok(registration) => {
            context.observe_registration(&registration);
            let created = registration.created;
            let body = json!({
                "id": created.id,
                "userId": created.user_id,
                "renumbered": registration.renumbered,
                "record": created.raw,
            });
            Ok(json_response(StatusCode::CREATED, &body))
        }
        Err(CreateError::Validation(errors)) => Err(Box::new(Unprocessable(errors))),
        Err(CreateError::Store(e)) => {
            warn!("Creating user failed: {}", e);
            context.observe_store_error(&e);
            Err(Box::new(BadGateway(e.to_string())))
        }
    }
}

async fn handle_refresh(context: &ApiContext) -> HttpResult<Response<Body>> {
    let state = configured(context)?.refresh().await;
    if let Some(error) = state.error() {
        warn!("Refresh failed: {}", error);
    }
    Ok(json_response(StatusCode::OK, &ListResponse::new(&state, "")))
}

fn html_response(status: StatusCode, html: String) -> Response<Body> {
    let mut res = Response::new(html.into());
    *res.status_mut() = status;
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    res
}

fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response<Body> {
    let json = match serde_json::to_string(data) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            return Response::from(Box::new(error::InternalServerError) as Box<dyn HttpError>);
        }
    };
    let mut res = Response::new(json.into());
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    res
}

fn handle_metrics(context: &ApiContext) -> HttpResult<Response<Body>> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metrics = context.gather_metrics();

    encoder.encode(&metrics, &mut buffer)?;
    writeln!(&mut buffer, "# EOF")?;

    let res = Response::builder()
        .header(
            CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )
        .body(buffer.into())?;
    Ok(res)
}

fn method_not_allowed(allow: &[Method]) -> HttpResult<Response<Body>> {
    let mut res = Response::default();
    *res.status_mut() = StatusCode::METHOD_NOT_ALLOWED;

    let allow_str = allow
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    res.headers_mut().insert(ALLOW, allow_str.parse()?);

    Ok(res)
}

fn not_found() -> HttpResult<Response<Body>> {
    let mut res = Response::default();
    *res.status_mut() = StatusCode::NOT_FOUND;
    Ok(res)
}
