//! Sign-in, sign-up, session and profile procedures.
//!
//! Flow Overview (sign-in):
//! 1) Validate and normalize the input.
//! 2) Look up the user and verify the password; both failures look identical.
//! 3) Store a fresh session and hand its id to the client in the cookie.

use anyhow::Context;
use async_trait::async_trait;
use axum::http::header::SET_COOKIE;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    credentials::Credentials,
    users::{NewUser, UserDirectory, UserRecord},
    validation::{check_email, check_name, check_password, normalize_email},
};
use crate::rpc::{Procedure, RequestContext, RpcError};
use crate::session::SessionManager;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: Option<Uuid>,
    pub data: Option<Value>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct SignOutResult {
    pub success: bool,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// Password hashed once and verified against when the email is unknown.
const DUMMY_PASSWORD: &str = "rpcgate-dummy-password";

pub struct SignIn {
    sessions: Arc<SessionManager>,
    users: Arc<dyn UserDirectory>,
    credentials: Arc<dyn Credentials>,
    dummy_hash: OnceCell<String>,
}

impl SignIn {
    #[must_use]
    pub fn new(
        sessions: Arc<SessionManager>,
        users: Arc<dyn UserDirectory>,
        credentials: Arc<dyn Credentials>,
    ) -> Self {
        Self {
            sessions,
            users,
            credentials,
            dummy_hash: OnceCell::new(),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, RpcError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            debug!("sign-in for unknown email");
            // Unknown emails pay the same verification cost as known ones.
            self.verify_dummy(password).await?;
            return Err(RpcError::invalid_credentials());
        };
        let valid = self
            .credentials
            .verify(password, &user.password_hash)
            .await
            .context("failed to verify credentials")?;
        if !valid {
            debug!(user_id = %user.id, "sign-in with wrong password");
            return Err(RpcError::invalid_credentials());
        }
        Ok(user)
    }

    async fn verify_dummy(&self, password: &str) -> Result<(), RpcError> {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.credentials.hash(DUMMY_PASSWORD))
            .await
            .context("failed to hash dummy password")?;
        self.credentials
            .verify(password, dummy)
            .await
            .context("failed to verify credentials")?;
        Ok(())
    }

    async fn start_session(&self, ctx: &RequestContext, user: &UserRecord) -> Result<(), RpcError> {
        let data = json!({ "name": user.name, "email": user.email });
        let session = self.sessions.create(user.id, Some(data)).await?;
        let cookie = self
            .sessions
            .cookie()
            .encode_set(session.id())
            .context("failed to encode session cookie")?;
        ctx.response_headers().append(SET_COOKIE, cookie);
        Ok(())
    }
}

#[async_trait]
impl Procedure for SignIn {
    type Input = SignInInput;
    type Output = UserSummary;

    async fn call(&self, ctx: &RequestContext, input: SignInInput) -> Result<UserSummary, RpcError> {
        let email = normalize_email(&input.email);
        check_email(&email)?;
        check_password(&input.password)?;

        let outcome = match self.authenticate(&email, &input.password).await {
            Ok(user) => self.start_session(ctx, &user).await.map(|()| user),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(user) => {
                info!(user_id = %user.id, "user signed in");
                Ok(UserSummary {
                    name: user.name,
                    email: user.email,
                })
            }
            Err(err) => {
                // Drop any session cookie the client still holds.
                if let Ok(clear) = self.sessions.cookie().encode_clear() {
                    ctx.response_headers().append(SET_COOKIE, clear);
                }
                Err(err)
            }
        }
    }
}

pub struct SignUp {
    users: Arc<dyn UserDirectory>,
    credentials: Arc<dyn Credentials>,
}

impl SignUp {
    #[must_use]
    pub fn new(users: Arc<dyn UserDirectory>, credentials: Arc<dyn Credentials>) -> Self {
        Self { users, credentials }
    }
}

#[async_trait]
impl Procedure for SignUp {
    type Input = SignUpInput;
    type Output = UserSummary;

    async fn call(&self, _ctx: &RequestContext, input: SignUpInput) -> Result<UserSummary, RpcError> {
        let name = input.name.trim().to_string();
        let email = normalize_email(&input.email);
        check_name(&name)?;
        check_email(&email)?;
        check_password(&input.password)?;

        let password_hash = self
            .credentials
            .hash(&input.password)
            .await
            .context("failed to hash password")?;
        let user = self
            .users
            .insert(NewUser {
                name,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user signed up");
        Ok(UserSummary {
            name: user.name,
            email: user.email,
        })
    }
}

/// Public view of the caller's session; anonymous callers get nulls.
pub struct GetSession;

#[async_trait]
impl Procedure for GetSession {
    type Input = ();
    type Output = SessionView;

    async fn call(&self, ctx: &RequestContext, _input: ()) -> Result<SessionView, RpcError> {
        Ok(match ctx.session() {
            Some(session) => SessionView {
                user_id: Some(session.user_id()),
                data: session.data().cloned(),
            },
            None => SessionView {
                user_id: None,
                data: None,
            },
        })
    }
}

/// Idempotent: signing out without a session still clears the cookie.
pub struct SignOut {
    sessions: Arc<SessionManager>,
}

impl SignOut {
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Procedure for SignOut {
    type Input = ();
    type Output = SignOutResult;

    async fn call(&self, ctx: &RequestContext, _input: ()) -> Result<SignOutResult, RpcError> {
        let clear = self
            .sessions
            .cookie()
            .encode_clear()
            .context("failed to encode clearing cookie")?;
        ctx.response_headers().append(SET_COOKIE, clear);

        if let Some(session) = ctx.session() {
            self.sessions.destroy(session.id()).await?;
            info!(user_id = %session.user_id(), "user signed out");
        }
        Ok(SignOutResult { success: true })
    }
}

pub struct GetProfile {
    users: Arc<dyn UserDirectory>,
}

impl GetProfile {
    #[must_use]
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Procedure for GetProfile {
    type Input = ();
    type Output = Profile;

    async fn call(&self, ctx: &RequestContext, _input: ()) -> Result<Profile, RpcError> {
        let session = ctx.session().ok_or_else(RpcError::unauthenticated)?;
        let user = self
            .users
            .find_by_id(session.user_id())
            .await?
            .ok_or_else(|| RpcError::not_found("User not found"))?;
        Ok(Profile {
            user_id: user.id,
            name: user.name,
            email: user.email,
        })
    }
}
