/// Dashboard accounts
///
/// Tokens are minted elsewhere; this module only manages the accounts they
/// refer to.
///
/// # Endpoints
///
/// - `POST /api/users/register` - Self-registration as a pending editor (public, rate limited)
/// - `GET /api/users/me` - Current account
/// - `PUT /api/users/me/password` - Change own password
/// - `GET /api/users` - List accounts (admin)
/// - `PATCH /api/users/:id` - Change role or status (admin)
/// - `DELETE /api/users/:id` - Delete account (admin)

use axum::{extract::State, http::StatusCode, Json};
use inkwell_shared::{
    auth::{
        authorization::{require_admin, require_other_user},
        password::{hash_password, validate_password_strength, verify_password},
    },
    models::{
        user::{CreateUser, UpdateUserAccess, User, UserRole, UserStatus},
        Paginated,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::PageQuery;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::{
        auth::Authenticated,
        extract::{ApiPath, ApiQuery, ValidatedJson},
    },
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength before hashing
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    pub new_password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccessRequest {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub status: Option<UserStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Register
///
/// ```text
/// POST /api/users/register
/// Content-Type: application/json
///
/// {"name": "Ada", "email": "ada@example.com", "password": "Sup3rSecret"}
/// ```
///
/// The account starts as a `pending` editor and cannot use gated routes until
/// an admin activates it. A taken email returns 409.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    validate_password_strength(&req.password)?;
    let password_hash = hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name.trim().to_string(),
            email: req.email,
            password_hash,
            role: UserRole::Editor,
            status: UserStatus::Pending,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered, awaiting activation");

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Change own password; the current one must match
pub async fn change_password(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::invalid_field(
            "current_password",
            "Current password is incorrect",
        ));
    }

    validate_password_strength(&req.new_password)
        .map_err(|e| ApiError::invalid_field("new_password", e.to_string()))?;

    let password_hash = hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> ApiResult<Json<Paginated<User>>> {
    require_admin(&auth)?;

    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .page();

    let items = User::list(&state.db, query.status, page).await?;
    let total = User::count(&state.db, query.status).await?;

    Ok(Json(Paginated::new(items, total, page)))
}

/// Change another account's role and/or status
///
/// ```text
/// PATCH /api/users/:id
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {"status": "active", "role": "moderator"}
/// ```
///
/// Admins cannot change their own account. The caller is an active admin
/// who stays one, so at least one active admin always remains.
pub async fn update_user_access(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAccessRequest>,
) -> ApiResult<Json<User>> {
    require_admin(&auth)?;
    require_other_user(&auth, id)?;

    if req.role.is_none() && req.status.is_none() {
        return Err(ApiError::invalid_field("body", "Provide a role or a status"));
    }

    let user = User::update_access(
        &state.db,
        id,
        UpdateUserAccess {
            role: req.role,
            status: req.status,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        user_id = %id,
        role = user.role.as_str(),
        status = ?user.status,
        admin_id = %auth.user_id,
        "User access updated"
    );

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;
    require_other_user(&auth, id)?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, admin_id = %auth.user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "Sup3rSecret".to_string(),
        };
        assert!(req.validate().is_ok());

        let req = RegisterRequest {
            name: String::new(),
            email: "nope".to_string(),
            password: String::new(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_update_access_parses_lowercase() {
        let req: UpdateAccessRequest =
            serde_json::from_str(r#"{"role":"moderator","status":"active"}"#).unwrap();
        assert_eq!(req.role, Some(UserRole::Moderator));
        assert_eq!(req.status, Some(UserStatus::Active));
    }
}
