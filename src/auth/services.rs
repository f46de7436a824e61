use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{ChangePasswordRequest, LoginRequest, PublicUser, RegisterRequest, UpdateProfileRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password, MIN_PASSWORD_LEN},
    repo_types::User,
};
use crate::{
    error::AppError,
    store::{StoreError, UserStore},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed, non-blank value of a required text field.
fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(message))
}

fn check_email(email: &str) -> Result<(), AppError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        warn!(email = %email, "invalid email");
        Err(AppError::validation("Invalid email"))
    }
}

fn check_password_len(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn duplicate_email(e: StoreError) -> AppError {
    match e {
        StoreError::Duplicate => AppError::validation("Email already registered"),
        other => other.into(),
    }
}

/// Creates an account. Does not log the user in.
pub async fn register(users: &dyn UserStore, req: RegisterRequest) -> Result<PublicUser, AppError> {
    const MISSING: &str = "Name, email and password are required";
    let name = required(req.name, MISSING)?;
    let email = normalize_email(&required(req.email, MISSING)?);
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation(MISSING))?;

    check_email(&email)?;
    check_password_len(&password)?;

    if users.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::validation("Email already registered"));
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: hash_password(&password)?,
        created_at: OffsetDateTime::now_utc(),
    };
    // the unique index still catches a concurrent registration of the same email
    users.insert_user(&user).await.map_err(duplicate_email)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user.into())
}

/// Checks credentials and issues a bearer token.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<(String, PublicUser), AppError> {
    const MISSING: &str = "Email and password are required";
    let email = normalize_email(&required(req.email, MISSING)?);
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation(MISSING))?;

    let Some(user) = users.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::auth("Invalid credentials"));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::auth("Invalid credentials"));
    }

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user.into()))
}

/// Resolves a bearer token to the id of the user it was issued to.
pub fn verify_token(keys: &JwtKeys, token: &str) -> Result<Uuid, AppError> {
    if token.is_empty() {
        return Err(AppError::auth("Missing token"));
    }
    match keys.verify(token) {
        Ok(claims) => Ok(claims.sub),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(AppError::auth("Invalid or expired token"))
        }
    }
}

async fn load_user(users: &dyn UserStore, user_id: Uuid) -> Result<User, AppError> {
    users.find_user_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "token refers to missing user");
        AppError::auth("User not found")
    })
}

pub async fn get_current_user(users: &dyn UserStore, user_id: Uuid) -> Result<PublicUser, AppError> {
    Ok(load_user(users, user_id).await?.into())
}

pub async fn update_profile(
    users: &dyn UserStore,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<PublicUser, AppError> {
    let mut user = load_user(users, user_id).await?;

    if let Some(name) = req.name {
        user.name = required(Some(name), "Name cannot be empty")?;
    }
    if let Some(email) = req.email {
        let email = normalize_email(&email);
        check_email(&email)?;
        if email != user.email {
            if let Some(other) = users.find_user_by_email(&email).await? {
                if other.id != user.id {
                    return Err(AppError::validation("Email already registered"));
                }
            }
            user.email = email;
        }
    }

    users.update_user(&user).await.map_err(duplicate_email)?;
    info!(user_id = %user.id, "profile updated");
    Ok(user.into())
}

pub async fn change_password(
    users: &dyn UserStore,
    user_id: Uuid,
    req: ChangePasswordRequest,
) -> Result<(), AppError> {
    const MISSING: &str = "Current and new password are required";
    let current = req
        .current_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation(MISSING))?;
    let new = req
        .new_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation(MISSING))?;

    let mut user = load_user(users, user_id).await?;
    if !verify_password(&current, &user.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(AppError::auth("Current password is incorrect"));
    }
    check_password_len(&new)?;

    user.password_hash = hash_password(&new)?;
    users.update_user(&user).await?;
    info!(user_id = %user.id, "password changed");
    Ok(())
}
