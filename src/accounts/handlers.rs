use axum::{
    extract::{FromRef, Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use tracing::{debug, error, info, instrument};

use crate::{
    accounts::{
        dto::{FormErrors, LoginForm, LoginQuery, ProfileProjection, SignupForm},
        services::{self, safe_next, LoginOutcome, SignupOutcome},
        session::{
            clear_session_cookie, extract_session_token, redirect_found, session_cookie,
            CurrentUser, SessionKeys,
        },
    },
    state::AppState,
    views,
};

/// Routes this application defines under the accounts prefix.
pub fn account_routes(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{prefix}/signup"), get(signup_form).post(signup_submit))
        .route(&format!("{prefix}/dashboard"), get(dashboard))
}

/// Login and logout, mounted after [`account_routes`] under the same prefix.
pub fn auth_routes(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{prefix}/login"), get(login_form).post(login_submit))
        .route(&format!("{prefix}/logout"), get(logout).post(logout))
}

#[instrument(skip(state))]
pub async fn signup_form(State(state): State<AppState>) -> Html<String> {
    Html(views::signup_page(
        &state.config,
        &SignupForm::default(),
        &FormErrors::default(),
    ))
}

#[instrument(skip(state, form))]
pub async fn signup_submit(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, (StatusCode, String)> {
    match services::signup(state.store.as_ref(), &form).await {
        Ok(SignupOutcome::Created(_)) => Ok(redirect_found(&state.config.account_path("login"))),
        Ok(SignupOutcome::Invalid(errors)) => {
            Ok(Html(views::signup_page(&state.config, &form, &errors)).into_response())
        }
        Err(e) => {
            error!(error = %e, "signup failed");
            Err(internal(e))
        }
    }
}

#[instrument(skip(state))]
pub async fn login_form(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Html<String> {
    let next = query.next.as_deref().and_then(safe_next).unwrap_or_default();
    Html(views::login_page(&state.config, "", next, &FormErrors::default()))
}

#[instrument(skip(state, form))]
pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, String)> {
    let next = safe_next(&form.next).unwrap_or_default().to_string();

    let user = match services::authenticate(state.store.as_ref(), &form.username, &form.password)
        .await
    {
        Ok(LoginOutcome::Authenticated(user)) => user,
        Ok(LoginOutcome::Rejected(errors)) => {
            return Ok(Html(views::login_page(
                &state.config,
                form.username.trim(),
                &next,
                &errors,
            ))
            .into_response());
        }
        Err(e) => {
            error!(error = %e, "authenticate failed");
            return Err(internal(e));
        }
    };

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id, user.session_epoch).map_err(|e| {
        error!(error = %e, "session token sign failed");
        internal(e)
    })?;
    let cookie = session_cookie(&state.config, &token).map_err(internal)?;

    let target = if next.is_empty() {
        state.config.account_path("dashboard")
    } else {
        next
    };
    let mut response = redirect_found(&target);
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

/// Revokes the caller's sessions server-side, then expires the cookie.
/// Anonymous or stale cookies just get the cookie cleared.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let claims = extract_session_token(&headers)
        .and_then(|token| SessionKeys::from_ref(&state).verify(&token).ok());
    match claims {
        Some(claims) => {
            state.store.revoke_sessions(claims.sub).await.map_err(|e| {
                error!(error = %e, user_id = %claims.sub, "session revoke failed");
                internal(e.into())
            })?;
            info!(user_id = %claims.sub, "sessions revoked");
        }
        None => debug!("logout without a valid session"),
    }

    let cookie = clear_session_cookie(&state.config).map_err(internal)?;
    Ok((
        [(SET_COOKIE, cookie)],
        Html(views::logged_out_page(&state.config)),
    )
        .into_response())
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Html<String> {
    let profile = ProfileProjection::from_user(&user);
    Html(views::dashboard_page(&state.config, &profile))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
