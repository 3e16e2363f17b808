use crate::dao;
use crate::model::{Link, LinkForm};
use crate::pages;
use crate::utils::{clean_path, client_ip, internal_error, with_timeout};
use crate::AppState;
use axum::body::Body;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{Html, Redirect, Response};
use axum::Form;
use std::net::SocketAddr;

const DEFAULT_TIMEOUT: u64 = 300;

pub async fn list_links(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, String)> {
    let links = if state.user_links {
        with_timeout(DEFAULT_TIMEOUT, dao::list_all(state.pool.clone())).await?
    } else {
        with_timeout(DEFAULT_TIMEOUT, dao::list_links(state.pool.clone())).await?
    }
    .map_err(internal_error)?;
    Ok(Html(pages::list_page(&links, state.user_links)))
}

pub async fn edit_link(
    State(state): State<AppState>,
    Path(tail): Path<String>,
) -> Result<Html<String>, (StatusCode, String)> {
    let name = first_segment(&tail).ok_or_else(not_found)?;
    let link = with_timeout(DEFAULT_TIMEOUT, dao::get_link(state.pool.clone(), name))
        .await?
        .map_err(internal_error)?
        .unwrap_or_else(|| new_link(name, ""));
    Ok(Html(pages::edit_page(&link, false)))
}

pub async fn save_link(
    State(state): State<AppState>,
    Path(tail): Path<String>,
    Form(form): Form<LinkForm>,
) -> Result<Redirect, (StatusCode, String)> {
    let name = first_segment(&tail).ok_or_else(not_found)?;
    with_timeout(
        DEFAULT_TIMEOUT,
        dao::upsert_link(state.pool.clone(), name, &form.url),
    )
    .await?
    .map_err(internal_error)?;
    tracing::debug!("Saved link {} -> {}", name, form.url);
    Ok(Redirect::to("/"))
}

pub async fn edit_user_link(
    State(state): State<AppState>,
    Path(tail): Path<String>,
) -> Result<Html<String>, (StatusCode, String)> {
    let (username, name) = split_user_tail(&tail).ok_or_else(not_found)?;
    let link = with_timeout(
        DEFAULT_TIMEOUT,
        dao::get_user_link(state.pool.clone(), name, username),
    )
    .await?
    .map_err(internal_error)?
    .unwrap_or_else(|| new_link(name, username));
    Ok(Html(pages::edit_page(&link, true)))
}

pub async fn save_user_link(
    State(state): State<AppState>,
    Path(tail): Path<String>,
    Form(form): Form<LinkForm>,
) -> Result<Redirect, (StatusCode, String)> {
    let (username, name) = split_user_tail(&tail).ok_or_else(not_found)?;
    with_timeout(
        DEFAULT_TIMEOUT,
        dao::upsert_user_link(state.pool.clone(), name, &form.url, username),
    )
    .await?
    .map_err(internal_error)?;
    tracing::debug!("Saved link {} -> {} for {}", name, form.url, username);
    Ok(Redirect::to("/"))
}

/// Resolution order: the whole path as one name first, then first segment
/// plus cleaned remainder appended to the stored destination.
pub async fn redirect(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, (StatusCode, String)> {
    let path = uri.path();
    let full_name = path.strip_prefix('/').unwrap_or(path);
    if full_name.is_empty() {
        return Err(not_found());
    }

    let username = if state.user_links {
        let peer = connect_info.map(|ConnectInfo(addr)| addr);
        match client_ip(&headers, peer) {
            Some(ip) => with_timeout(
                DEFAULT_TIMEOUT,
                dao::username_for_ip(state.pool.clone(), &ip),
            )
            .await?
            .map_err(internal_error)?
            .unwrap_or_default(),
            None => String::new(),
        }
    } else {
        String::new()
    };
    let scope = state.user_links.then_some(username.as_str());

    let exact = with_timeout(
        DEFAULT_TIMEOUT,
        dao::resolve(state.pool.clone(), full_name, scope),
    )
    .await?
    .map_err(internal_error)?;
    if let Some(url) = exact {
        if !url.is_empty() {
            return see_other(&url);
        }
    }

    let name = full_name.split('/').next().unwrap_or_default();
    let rest = clean_path(path.strip_prefix(&format!("/{name}")).unwrap_or(path));
    let mut url = with_timeout(DEFAULT_TIMEOUT, dao::resolve(state.pool.clone(), name, scope))
        .await?
        .map_err(internal_error)?
        .ok_or_else(not_found)?;
    if rest != "." {
        url.push_str(&rest);
    }
    see_other(&url)
}

fn see_other(location: &str) -> Result<Response, (StatusCode, String)> {
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .map_err(internal_error)
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Not found".into())
}

fn new_link(name: &str, username: &str) -> Link {
    Link {
        name: name.to_string(),
        url: String::new(),
        username: username.to_string(),
    }
}

fn first_segment(tail: &str) -> Option<&str> {
    let name = tail.split('/').next().unwrap_or_default();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn split_user_tail(tail: &str) -> Option<(&str, &str)> {
    let mut parts = tail.splitn(3, '/');
    let username = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    if username.is_empty() || name.is_empty() {
        None
    } else {
        Some((username, name))
    }
}
