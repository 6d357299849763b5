//! Account actions: register, login, logout, token refresh, password reset.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{AppError, AppResult, FieldError, UserId};
use crate::domains::auth::password::{generate_reset_token, hash_password, verify_password};
use crate::domains::users::models::{Availability, PublicUser, User};
use crate::kernel::ServerDeps;

/// Reset tokens are short-lived; the email link is only good for this long.
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills_offered: Vec<String>,
    #[serde(default)]
    pub skills_wanted: Vec<String>,
    #[serde(default)]
    pub availability: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Token plus the owner's view of their account.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

fn validate_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < 6 {
        errors.push(FieldError {
            field: "password".to_string(),
            message: "Password must be at least 6 characters".to_string(),
        });
    }
}

fn validate_email(email: &str, errors: &mut Vec<FieldError>) {
    let valid = email.contains('@') && email.contains('.') && !email.contains(char::is_whitespace);
    if !valid {
        errors.push(FieldError {
            field: "email".to_string(),
            message: "Please provide a valid email".to_string(),
        });
    }
}

pub async fn register(deps: &ServerDeps, request: RegisterRequest) -> AppResult<AuthResponse> {
    let mut errors = Vec::new();
    let name = request.name.trim();
    if !(2..=50).contains(&name.chars().count()) {
        errors.push(FieldError {
            field: "name".to_string(),
            message: "Name must be between 2 and 50 characters".to_string(),
        });
    }
    validate_email(&request.email, &mut errors);
    validate_password(&request.password, &mut errors);
    if let Some(bio) = &request.bio {
        if bio.chars().count() > 500 {
            errors.push(FieldError {
                field: "bio".to_string(),
                message: "Bio cannot be more than 500 characters".to_string(),
            });
        }
    }
    let availability = match &request.availability {
        Some(label) => match label.parse::<Availability>() {
            Ok(a) => a,
            Err(_) => {
                errors.push(FieldError {
                    field: "availability".to_string(),
                    message: "Invalid availability".to_string(),
                });
                Availability::Flexible
            }
        },
        None => Availability::Flexible,
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let email = request.email.trim().to_lowercase();
    if deps.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "User already exists with this email".to_string(),
        ));
    }

    let now = Utc::now();
    let user = User {
        id: UserId::new(),
        name: name.to_string(),
        email,
        password_hash: hash_password(&request.password)?,
        avatar: None,
        location: request.location.unwrap_or_default(),
        bio: request.bio.unwrap_or_default(),
        skills_offered: request.skills_offered,
        skills_wanted: request.skills_wanted,
        availability: availability.to_string(),
        rating: 0.0,
        total_ratings: 0,
        total_swaps: 0,
        is_online: false,
        last_seen: now,
        reset_password_token: None,
        reset_password_expires: None,
        created_at: now,
        updated_at: now,
    };
    deps.users.insert(&user).await?;

    let token = deps.jwt.create_token(user.id, user.email.clone())?;
    Ok(AuthResponse {
        token,
        user: PublicUser::owned(&user),
    })
}

pub async fn login(deps: &ServerDeps, request: LoginRequest) -> AppResult<AuthResponse> {
    let email = request.email.trim().to_lowercase();
    let user = deps.users.find_by_email(&email).await?;

    // Same error for unknown email and wrong password.
    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => return Err(AppError::Auth("Invalid credentials".to_string())),
    };

    deps.users.set_online(user.id, true).await?;
    let token = deps.jwt.create_token(user.id, user.email.clone())?;
    let mut view = PublicUser::owned(&user);
    view.is_online = true;
    Ok(AuthResponse { token, user: view })
}

/// Marks the user offline. The token itself stays valid until it expires;
/// clients discard it.
pub async fn logout(deps: &ServerDeps, user_id: UserId) -> AppResult<()> {
    deps.users.set_online(user_id, false).await?;
    Ok(())
}

pub async fn me(deps: &ServerDeps, user_id: UserId) -> AppResult<PublicUser> {
    let user = deps
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    Ok(PublicUser::owned(&user))
}

/// Issue a fresh token for an already-authenticated user.
pub async fn refresh(deps: &ServerDeps, user_id: UserId) -> AppResult<AuthResponse> {
    let user = deps
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    let token = deps.jwt.create_token(user.id, user.email.clone())?;
    Ok(AuthResponse {
        token,
        user: PublicUser::owned(&user),
    })
}

/// Start a password reset. Always succeeds from the caller's point of view
/// so the endpoint doesn't leak which emails are registered. Delivery is
/// external; the token is logged at debug level for development.
pub async fn forgot_password(deps: &ServerDeps, request: ForgotPasswordRequest) -> AppResult<()> {
    let email = request.email.trim().to_lowercase();
    let Some(mut user) = deps.users.find_by_email(&email).await? else {
        return Ok(());
    };

    let token = generate_reset_token();
    user.reset_password_token = Some(token.clone());
    user.reset_password_expires = Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
    deps.users.update(&user).await?;

    debug!(user_id = %user.id, token = %token, "password reset token issued");
    Ok(())
}

/// Complete a password reset with a token from [`forgot_password`].
pub async fn reset_password(
    deps: &ServerDeps,
    request: ResetPasswordRequest,
) -> AppResult<AuthResponse> {
    let mut errors = Vec::new();
    validate_password(&request.password, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let Some(mut user) = deps.users.find_by_reset_token(&request.token).await? else {
        return Err(AppError::Auth("Invalid or expired reset token".to_string()));
    };

    user.password_hash = hash_password(&request.password)?;
    user.reset_password_token = None;
    user.reset_password_expires = None;
    deps.users.update(&user).await?;

    let token = deps.jwt.create_token(user.id, user.email.clone())?;
    Ok(AuthResponse {
        token,
        user: PublicUser::owned(&user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::auth::jwt::JwtService;
    use std::sync::Arc;

    fn deps() -> ServerDeps {
        ServerDeps::in_memory(Arc::new(JwtService::new(
            "test_secret",
            "test_issuer".to_string(),
            1,
        )))
    }

    fn sample_register() -> RegisterRequest {
        RegisterRequest {
            name: "Ada".to_string(),
            email: "Ada@Example.com".to_string(),
            password: "hunter22".to_string(),
            location: Some("London".to_string()),
            bio: None,
            skills_offered: vec!["Piano".to_string()],
            skills_wanted: vec!["Spanish".to_string()],
            availability: None,
        }
    }

    #[tokio::test]
    async fn test_register_lowercases_email_and_returns_token() {
        let deps = deps();
        let response = register(&deps, sample_register()).await.unwrap();
        assert_eq!(response.user.email.as_deref(), Some("ada@example.com"));

        let claims = deps.jwt.verify_token(&response.token).unwrap();
        assert_eq!(claims.user_id, response.user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_conflict() {
        let deps = deps();
        register(&deps, sample_register()).await.unwrap();
        let err = register(&deps, sample_register()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_and_bad_email() {
        let deps = deps();
        let mut request = sample_register();
        request.email = "not-an-email".to_string();
        request.password = "abc".to_string();
        match register(&deps, request).await.unwrap_err() {
            AppError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_email_look_alike() {
        let deps = deps();
        register(&deps, sample_register()).await.unwrap();

        let wrong_password = login(
            &deps,
            LoginRequest {
                email: "ada@example.com".to_string(),
                password: "nope nope".to_string(),
            },
        )
        .await
        .unwrap_err();
        let unknown_email = login(
            &deps,
            LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "hunter22".to_string(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_marks_user_online() {
        let deps = deps();
        let registered = register(&deps, sample_register()).await.unwrap();
        let response = login(
            &deps,
            LoginRequest {
                email: "ada@example.com".to_string(),
                password: "hunter22".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(response.user.is_online);

        let stored = deps.users.find_by_id(registered.user.id).await.unwrap().unwrap();
        assert!(stored.is_online);
    }

    #[tokio::test]
    async fn test_forgot_then_reset_rotates_password() {
        let deps = deps();
        let registered = register(&deps, sample_register()).await.unwrap();

        forgot_password(
            &deps,
            ForgotPasswordRequest {
                email: "ada@example.com".to_string(),
            },
        )
        .await
        .unwrap();
        let token = deps
            .users
            .find_by_id(registered.user.id)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .unwrap();

        reset_password(
            &deps,
            ResetPasswordRequest {
                token,
                password: "new-password".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(login(
            &deps,
            LoginRequest {
                email: "ada@example.com".to_string(),
                password: "new-password".to_string(),
            },
        )
        .await
        .is_ok());
        assert!(login(
            &deps,
            LoginRequest {
                email: "ada@example.com".to_string(),
                password: "hunter22".to_string(),
            },
        )
        .await
        .is_err());
    }

    #[tokio::test]
    async fn test_forgot_password_does_not_leak_registration() {
        let deps = deps();
        assert!(forgot_password(
            &deps,
            ForgotPasswordRequest {
                email: "nobody@example.com".to_string(),
            },
        )
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn test_reset_with_bogus_token_fails() {
        let deps = deps();
        let err = reset_password(
            &deps,
            ResetPasswordRequest {
                token: "bogus".to_string(),
                password: "new-password".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
