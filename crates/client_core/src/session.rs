//! Signed-in session and the guard that tears it down on 401.

use shared::domain::User;
use tracing::{info, warn};

use crate::{
    error::Failure,
    state::{AppState, ToastLevel},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub authenticated: bool,
    checking: bool,
}

impl Session {
    /// Starts the "who am I" probe; `false` if one is already running.
    pub fn begin_check(&mut self) -> bool {
        if self.checking {
            return false;
        }
        self.checking = true;
        true
    }

    /// Accepts a probe result. Results arriving after the session was
    /// cleared are ignored.
    pub fn sign_in(&mut self, user: User) -> bool {
        if !self.checking {
            return false;
        }
        self.checking = false;
        self.user = Some(user);
        self.authenticated = true;
        true
    }

    pub fn end_check(&mut self) -> bool {
        std::mem::replace(&mut self.checking, false)
    }

    pub fn is_checking(&self) -> bool {
        self.checking
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Forces the logged-out transition for any authorization failure,
/// whatever feature produced it. Returns `true` when it took over, in
/// which case no feature-specific handling may run for that result.
pub fn intercept(state: &mut AppState, failure: &Failure) -> bool {
    if !failure.requires_reauth() {
        return false;
    }

    let was_signed_in = state.session.authenticated;
    state.sign_out_locally();
    if was_signed_in {
        warn!("authorization failure; session cleared");
        state
            .notices
            .toast(ToastLevel::Error, "Session expired. Please sign in again.");
    } else {
        info!("not signed in; showing login");
    }
    true
}
