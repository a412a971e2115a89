use std::rc::Rc;

use yew::prelude::*;

use crate::api::{AuthChange, AuthEvent, AuthUser, Session, SupabaseClient};
use crate::toast::Toaster;

pub const NOT_AUTHORIZED_MSG: &str =
    "Email no autorizado. Póngase en contacto con el administrador.";
pub const SESSION_EXPIRED_MSG: &str = "Sesión expirada o usuario no autorizado.";

/// Single source of truth for "is the visitor authenticated".
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SessionState {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
    pub loading: bool,
    /// Becomes true exactly once, before any route decision is honored.
    pub initialized: bool,
}

pub enum SessionAction {
    /// Initial session recovery finished (possibly empty, possibly failed).
    Initialized(Option<Session>),
    /// A standing auth-change notification arrived.
    AuthChanged(Option<Session>),
    SetLoading(bool),
    /// Local sign-out; applied even when the remote call failed.
    ClearedLocally,
}

impl Reducible for SessionState {
    type Action = SessionAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        match action {
            SessionAction::Initialized(session) => {
                next.user = session.as_ref().map(|s| s.user.clone());
                next.session = session;
                next.initialized = true;
            }
            SessionAction::AuthChanged(session) => {
                next.user = session.as_ref().map(|s| s.user.clone());
                next.session = session;
                next.loading = false;
            }
            SessionAction::SetLoading(loading) => next.loading = loading,
            SessionAction::ClearedLocally => {
                next.user = None;
                next.session = None;
                next.loading = false;
            }
        }
        Rc::new(next)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Gate {
    Checking,
    SignedOut,
    SignedIn,
}

/// Route-gate decision. Until initialization completes the answer is
/// Checking no matter what `user` holds.
pub fn gate(state: &SessionState) -> Gate {
    if !state.initialized {
        Gate::Checking
    } else if state.user.is_some() {
        Gate::SignedIn
    } else {
        Gate::SignedOut
    }
}

/// Application context built once at startup and provided through the tree;
/// replaces any module-level store. Holds the remote client, the session
/// reducer and the toaster.
#[derive(Clone)]
pub struct AppContext {
    pub client: Rc<SupabaseClient>,
    pub session: UseReducerHandle<SessionState>,
    pub toaster: Toaster,
}

impl PartialEq for AppContext {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.client, &other.client)
            && self.session == other.session
            && self.toaster == other.toaster
    }
}

impl AppContext {
    /// One-shot session recovery. Callers guard with the `initialized`
    /// flag; `initialized` is set even on failure so the gate unblocks.
    pub async fn initialize(&self) {
        match self.client.restore_session().await {
            Ok(session) => self.session.dispatch(SessionAction::Initialized(session)),
            Err(err) => {
                log::error!("error inicializando la sesión: {err}");
                self.session.dispatch(SessionAction::Initialized(None));
            }
        }
    }

    /// Standing listener body for auth-change notifications. A sign-in that
    /// produced no session is a policy rejection; a refresh that produced
    /// none is an expired or revoked user.
    pub fn handle_auth_change(&self, change: AuthChange) {
        let empty = change.session.is_none();
        self.session
            .dispatch(SessionAction::AuthChanged(change.session));
        match change.event {
            AuthEvent::SignedIn if empty => self.toaster.error(NOT_AUTHORIZED_MSG),
            AuthEvent::TokenRefreshed if empty => self.toaster.error(SESSION_EXPIRED_MSG),
            _ => {}
        }
    }

    /// Requests the OAuth redirect. On success navigation leaves the app
    /// and the loading flag is cleared later by the auth-change listener.
    pub fn sign_in_with_google(&self) {
        self.session.dispatch(SessionAction::SetLoading(true));
        if let Err(err) = self.client.sign_in_with_google() {
            log::error!("error iniciando sesión con Google: {err}");
            self.toaster
                .error("Error al iniciar sesión. Por favor, inténtalo de nuevo.");
            self.session.dispatch(SessionAction::SetLoading(false));
        }
    }

    /// Local state is authoritative for "appears logged out": the session
    /// is cleared even when the remote call fails.
    pub async fn sign_out(&self) {
        self.session.dispatch(SessionAction::SetLoading(true));
        if let Err(err) = self.client.sign_out().await {
            log::error!("error cerrando sesión: {err}");
        }
        self.session.dispatch(SessionAction::ClearedLocally);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UserMetadata;

    fn user() -> AuthUser {
        AuthUser {
            id: "u1".into(),
            email: Some("ana@example.com".into()),
            user_metadata: UserMetadata::default(),
            last_sign_in_at: None,
        }
    }

    fn session() -> Session {
        Session {
            access_token: "tok".into(),
            refresh_token: None,
            user: user(),
        }
    }

    #[test]
    fn gate_is_checking_until_initialized() {
        let mut state = SessionState::default();
        assert_eq!(gate(&state), Gate::Checking);
        state.user = Some(user());
        assert_eq!(gate(&state), Gate::Checking);
    }

    #[test]
    fn gate_splits_on_user_once_initialized() {
        let mut state = SessionState {
            initialized: true,
            ..Default::default()
        };
        assert_eq!(gate(&state), Gate::SignedOut);
        state.user = Some(user());
        assert_eq!(gate(&state), Gate::SignedIn);
    }

    #[test]
    fn initialized_sets_flag_even_without_session() {
        let state = Rc::new(SessionState::default());
        let state = state.reduce(SessionAction::Initialized(None));
        assert!(state.initialized);
        assert!(state.user.is_none());
    }

    #[test]
    fn auth_change_clears_loading() {
        let state = Rc::new(SessionState {
            loading: true,
            initialized: true,
            ..Default::default()
        });
        let state = state.reduce(SessionAction::AuthChanged(Some(session())));
        assert!(!state.loading);
        assert_eq!(state.user.as_ref().map(|u| u.id.as_str()), Some("u1"));
    }

    #[test]
    fn local_clear_signs_out_regardless_of_remote() {
        let state = Rc::new(SessionState {
            user: Some(user()),
            session: Some(session()),
            loading: true,
            initialized: true,
        });
        let state = state.reduce(SessionAction::ClearedLocally);
        assert!(state.user.is_none());
        assert!(state.session.is_none());
        assert!(!state.loading);
        assert!(state.initialized);
    }
}
