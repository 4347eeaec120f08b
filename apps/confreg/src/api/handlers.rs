//! # API Endpoint Handlers
//!
//! Public handlers serve the conference site. `/admin/*` handlers take a
//! `Caller` and leave permission checks to the back office.

use super::{
    AppState,
    auth::{Caller, impersonation_token},
    extract::{ApiJson, ApiPath, ApiQuery},
    types::{
        ApiError, AuditQuery, ContentResponse, FeesResponse, GrantView, HealthResponse,
        ImpersonateRequest, ModerateRequest, ModerateResponse, RegistrationResponse,
        ReviewRequest, SetRoleRequest, StatusQuery,
    },
};
use crate::unix_now;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use confreg_core::{
    AbstractSubmission, AuditEntry, ContentPage, FeeQuote, FeeSelection, IssuedGrant, NewAbstract,
    NewUser, OfficeStats, PageSummary, Permission, Registration, RegistrationForm, RegistrationId,
    SubmissionId, User, UserId,
};

fn content_response(page: &ContentPage) -> Result<ContentResponse, ApiError> {
    Ok(ContentResponse {
        slug: page.slug.clone(),
        revision: page.revision,
        updated_at: page.updated_at,
        body: page.body_json()?,
    })
}

/// 32 random bytes, URL-safe base64.
fn generate_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

// =============================================================================
// PUBLIC
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Published fee schedule.
pub async fn fees_handler(State(state): State<AppState>) -> Json<FeesResponse> {
    let office = state.office.read().await;
    Json(FeesResponse {
        schedule: office.fees().clone(),
        early_bird_open: office.fees().early_bird_open(unix_now()),
    })
}

/// Price a selection.
pub async fn quote_handler(
    State(state): State<AppState>,
    ApiJson(selection): ApiJson<FeeSelection>,
) -> Result<Json<FeeQuote>, ApiError> {
    let office = state.office.read().await;
    Ok(Json(office.quote(&selection, unix_now())?))
}

/// Submit a completed registration.
pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegistrationForm>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let mut office = state.office.write().await;
    let registration = office.register(&form, unix_now())?;
    tracing::info!(
        event = "registration_created",
        id = %registration.id,
        ticket = %registration.ticket_code,
        "Registration received"
    );
    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse::from(&registration)),
    ))
}

/// Public page content.
pub async fn content_handler(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<ContentResponse>, ApiError> {
    let office = state.office.read().await;
    Ok(Json(content_response(&office.page(&slug)?)?))
}

/// Submit an abstract.
pub async fn submit_abstract_handler(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewAbstract>,
) -> Result<(StatusCode, Json<AbstractSubmission>), ApiError> {
    let mut office = state.office.write().await;
    let submission = office.submit_abstract(&new, unix_now())?;
    Ok((StatusCode::CREATED, Json(submission)))
}

// =============================================================================
// ADMIN: REGISTRATIONS
// =============================================================================

/// Registrations by status (pending by default), oldest first.
pub async fn registrations_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    let status = query.registration_status()?;
    let office = state.office.read().await;
    Ok(Json(office.registrations(&caller, status)?))
}

/// One registration by id.
pub async fn registration_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<Registration>, ApiError> {
    let office = state.office.read().await;
    Ok(Json(office.registration(&caller, RegistrationId(id))?))
}

/// Bulk approve or reject.
pub async fn moderate_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(request): ApiJson<ModerateRequest>,
) -> Result<Json<ModerateResponse>, ApiError> {
    let mut office = state.office.write().await;
    let outcomes = office.moderate(
        &caller,
        &request.registration_ids(),
        request.decision,
        request.note.as_deref(),
        unix_now(),
    )?;
    let response = ModerateResponse::new(outcomes);
    tracing::info!(
        event = "moderation_batch",
        user = %caller.user,
        decision = ?request.decision,
        requested = request.ids.len(),
        applied = response.applied,
        "Moderation batch processed"
    );
    Ok(Json(response))
}

// =============================================================================
// ADMIN: USERS
// =============================================================================

pub async fn list_users_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<User>>, ApiError> {
    let office = state.office.read().await;
    Ok(Json(office.list_users(&caller)?))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(new): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let mut office = state.office.write().await;
    let user = office.create_user(&caller, &new, unix_now())?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn set_role_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<SetRoleRequest>,
) -> Result<Json<User>, ApiError> {
    let mut office = state.office.write().await;
    let user = office.set_role(&caller, UserId(id), request.role, unix_now())?;
    tracing::info!(
        event = "role_change",
        by = %caller.user,
        target = %user.id,
        role = %user.role,
        "Role changed"
    );
    Ok(Json(user))
}

// =============================================================================
// ADMIN: IMPERSONATION
// =============================================================================

/// Start impersonating a user. The token is returned once.
pub async fn start_impersonation_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(request): ApiJson<ImpersonateRequest>,
) -> Result<(StatusCode, Json<IssuedGrant>), ApiError> {
    let token = generate_token();
    let mut office = state.office.write().await;
    let issued = office.start_impersonation(
        &caller,
        request.target,
        &request.reason,
        request.duration_secs,
        &token,
        unix_now(),
    )?;
    tracing::warn!(
        event = "impersonation_start",
        admin = %issued.admin,
        target = %issued.target,
        ttl_secs = issued.ttl_secs,
        "Impersonation session started"
    );
    Ok((StatusCode::CREATED, Json(issued)))
}

/// End the session named by `X-Impersonation-Token`.
pub async fn end_impersonation_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = match (caller.impersonator, impersonation_token(&headers)) {
        (Some(_), Some(token)) => token,
        _ => {
            return Err(ApiError::BadRequest(
                "X-Impersonation-Token header required".to_string(),
            ));
        }
    };
    let mut office = state.office.write().await;
    let grant = office.end_impersonation(token, unix_now())?;
    tracing::warn!(
        event = "impersonation_end",
        admin = %grant.admin,
        target = %grant.target,
        "Impersonation session ended"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Active impersonation sessions.
pub async fn active_impersonations_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<GrantView>>, ApiError> {
    let now = unix_now();
    let office = state.office.read().await;
    let grants = office.active_impersonations(&caller, now)?;
    Ok(Json(grants.iter().map(|g| GrantView::new(g, now)).collect()))
}

// =============================================================================
// ADMIN: AUDIT, CONTENT, ABSTRACTS, STATS
// =============================================================================

/// Query the audit trail, newest first.
pub async fn audit_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiQuery(query): ApiQuery<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let filter = query.to_filter()?;
    let office = state.office.read().await;
    Ok(Json(office.audit_log(&caller, &filter)?))
}

/// All pages with revisions.
pub async fn list_pages_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<PageSummary>>, ApiError> {
    caller.require(Permission::EditContent)?;
    let office = state.office.read().await;
    Ok(Json(office.pages()?))
}

/// Create or replace a page.
pub async fn put_page_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(slug): ApiPath<String>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<ContentResponse>, ApiError> {
    let mut office = state.office.write().await;
    let page = office.put_page(&caller, &slug, &body, unix_now())?;
    Ok(Json(content_response(&page)?))
}

pub async fn list_abstracts_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<Vec<AbstractSubmission>>, ApiError> {
    let status = query.submission_status()?;
    let office = state.office.read().await;
    Ok(Json(office.abstracts(&caller, status)?))
}

pub async fn review_abstract_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<ReviewRequest>,
) -> Result<Json<AbstractSubmission>, ApiError> {
    let mut office = state.office.write().await;
    let submission = office.review_abstract(
        &caller,
        SubmissionId(id),
        request.accept,
        request.note.as_deref(),
        unix_now(),
    )?;
    Ok(Json(submission))
}

/// Dashboard counts. Open to anyone who can view registrations.
pub async fn stats_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<OfficeStats>, ApiError> {
    caller.require(Permission::ViewRegistrations)?;
    let office = state.office.read().await;
    Ok(Json(office.stats()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(confreg_core::impersonation::validate_token(&a).is_ok());
    }
}
