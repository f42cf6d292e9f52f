//! Authentication collaborators and the procedures built on them.
//!
//! ## Procedures
//!
//! | Path               | Kind     | Access    |
//! |--------------------|----------|-----------|
//! | `auth.signIn`      | mutation | public    |
//! | `auth.signUp`      | mutation | public    |
//! | `auth.getSession`  | query    | public    |
//! | `auth.signOut`     | mutation | public    |
//! | `user.getProfile`  | query    | protected |
//!
//! Sign-in never reveals whether an email is registered: an unknown email and
//! a wrong password produce the same error kind and message.

mod credentials;
mod postgres;
mod procedures;
mod users;
mod validation;

pub use credentials::{Argon2Credentials, Credentials};
pub use postgres::PgUserDirectory;
pub use procedures::{
    GetProfile, GetSession, Profile, SessionView, SignIn, SignInInput, SignOut, SignOutResult,
    SignUp, SignUpInput, UserSummary,
};
pub use users::{DirectoryError, MemoryUserDirectory, NewUser, UserDirectory, UserRecord};

use std::sync::Arc;

use crate::rpc::Router;
use crate::session::SessionManager;

/// Shared handles the auth procedures are built from.
#[derive(Clone)]
pub struct AuthServices {
    sessions: Arc<SessionManager>,
    users: Arc<dyn UserDirectory>,
    credentials: Arc<dyn Credentials>,
}

impl AuthServices {
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
        }
    }

    #[cfg(test)]
    pub(crate) fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Register every auth procedure on `router`.
    #[must_use]
    pub fn register(&self, router: Router) -> Router {
        router
            .mutation(
                "auth.signIn",
                SignIn::new(
                    self.sessions.clone(),
                    self.users.clone(),
                    self.credentials.clone(),
                ),
            )
            .mutation(
                "auth.signUp",
                SignUp::new(self.users.clone(), self.credentials.clone()),
            )
            .query("auth.getSession", GetSession)
            .mutation("auth.signOut", SignOut::new(self.sessions.clone()))
            .protected_query("user.getProfile", GetProfile::new(self.users.clone()))
    }
}
