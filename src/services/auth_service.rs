use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use super::email::EmailMessage;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::reset::{hash_token, ResetToken};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::models::{validate_password, Role, User, UserInput, ValidationErrors};

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailsInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[serde(alias = "currentPassword")]
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotInput {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetInput {
    pub password: Option<String>,
}

/// Registration, login and the credential flows. Token issuance is left to
/// the HTTP layer, which also sets the cookie.
pub struct AuthService<'a> {
    ctx: &'a AppContext,
}

impl<'a> AuthService<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Self-service signup. Only `user` and `publisher` may be chosen.
    pub async fn register(&self, input: UserInput) -> Result<User, ApiError> {
        if input.role == Some(Role::Admin) {
            let mut errors = ValidationErrors::new();
            errors.add("role", "Role must be either user or publisher");
            return Err(errors.into());
        }
        let (name, email, password, role) = input.into_new()?;
        let user = User::new(name, email, role, hash_password(&password)?);
        self.ctx.stores.users.insert_user(&user).await?;
        info!("Registered user {} as {}", user.id, user.role);
        Ok(user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<User, ApiError> {
        let (Some(email), Some(password)) = (non_blank(input.email), non_blank(input.password)) else {
            return Err(ApiError::bad_request("Please provide an email and password"));
        };

        let user = self
            .ctx
            .stores
            .users
            .find_user_by_email(&email.to_lowercase())
            .await?
            .ok_or_else(invalid_credentials)?;
        if !verify_password(&password, &user.password_hash)? {
            return Err(invalid_credentials());
        }
        Ok(user)
    }

    pub async fn me(&self, id: Uuid) -> Result<User, ApiError> {
        self.ctx
            .stores
            .users
            .find_user(id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("User", id))
    }

    /// Change name and email; both must be present.
    pub async fn update_details(&self, id: Uuid, input: DetailsInput) -> Result<User, ApiError> {
        let mut errors = ValidationErrors::new();
        if non_blank(input.name.clone()).is_none() {
            errors.add("name", "Please provide a name");
        }
        if non_blank(input.email.clone()).is_none() {
            errors.add("email", "Please provide an email address");
        }
        errors.into_result()?;

        let mut user = self.me(id).await?;
        user.apply_update(UserInput {
            name: input.name,
            email: input.email,
            ..UserInput::default()
        })?;
        self.save(&user).await?;
        Ok(user)
    }

    pub async fn update_password(&self, id: Uuid, input: PasswordChange) -> Result<User, ApiError> {
        let mut user = self.me(id).await?;
        let old = input.old_password.unwrap_or_default();
        if !verify_password(&old, &user.password_hash)? {
            return Err(ApiError::unauthorized("Password is incorrect"));
        }

        let mut errors = ValidationErrors::new();
        validate_password(input.new_password.as_deref(), &mut errors);
        errors.into_result()?;

        user.password_hash = hash_password(input.new_password.as_deref().unwrap_or_default())?;
        self.save(&user).await?;
        info!("User {} changed password", user.id);
        Ok(user)
    }

    /// Mint a reset token and mail its link. `base_url` is the scheme and host
    /// the link should point at.
    pub async fn forgot_password(&self, input: ForgotInput, base_url: &str) -> Result<(), ApiError> {
        let email = non_blank(input.email).map(|e| e.to_lowercase()).unwrap_or_default();
        let mut user = self
            .ctx
            .stores
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::not_found("There is no user with that email"))?;

        let reset = ResetToken::generate(Utc::now());
        user.reset_password_token = Some(reset.hash.clone());
        user.reset_password_expire = Some(reset.expires_at);
        self.save(&user).await?;

        let reset_url = format!("{}/api/v1/auth/resetPassword/{}", base_url.trim_end_matches('/'), reset.token);
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Password reset token".to_string(),
            text: format!(
                "You are receiving this email because you (or someone else) has requested the reset of a password. \
                 Please make a PUT request to: \n\n {}",
                reset_url
            ),
        };

        if let Err(e) = self.ctx.mailer.send(&message).await {
            error!("Failed to send reset email to {}: {}", user.email, e);
            user.clear_reset_token();
            self.save(&user).await?;
            return Err(ApiError::internal_server_error("Email could not be sent"));
        }
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, input: ResetInput) -> Result<User, ApiError> {
        let mut user = self
            .ctx
            .stores
            .users
            .find_user_by_reset_token(&hash_token(token), Utc::now())
            .await?
            .ok_or_else(|| ApiError::bad_request("Token is invalid or has expired"))?;

        let mut errors = ValidationErrors::new();
        validate_password(input.password.as_deref(), &mut errors);
        errors.into_result()?;

        user.password_hash = hash_password(input.password.as_deref().unwrap_or_default())?;
        user.clear_reset_token();
        self.save(&user).await?;
        info!("User {} reset password", user.id);
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<(), ApiError> {
        if !self.ctx.stores.users.update_user(user).await? {
            return Err(ApiError::resource_not_found("User", user.id));
        }
        Ok(())
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid credentials")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
