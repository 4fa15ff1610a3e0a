//! Client-side onboarding flow: landing → auth → payment → app.
//!
//! The session (user record, bearer token, paid flag) lives in a
//! [`SessionStore`] and is written on every transition. The main
//! application screen is only reachable while the session is both
//! authenticated and paid.

mod store;

pub use store::{FileStore, MemoryStore, SessionStore};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

pub const USER_KEY: &str = "lotostats_user";
pub const TOKEN_KEY: &str = "lotostats_token";
pub const PAID_KEY: &str = "lotostats_paid";
pub const SCREEN_KEY: &str = "lotostats_screen";

const ALL_KEYS: [&str; 4] = [USER_KEY, TOKEN_KEY, PAID_KEY, SCREEN_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Landing,
    Auth,
    Payment,
    App,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Screen::Landing => "landing",
            Screen::Auth => "auth",
            Screen::Payment => "payment",
            Screen::App => "app",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} from the {from} screen")]
    InvalidTransition { from: Screen, action: &'static str },

    #[error("session storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<SessionUser>,
    pub token: Option<String>,
    pub paid: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn can_use_app(&self) -> bool {
        self.is_authenticated() && self.paid
    }
}

pub struct Onboarding<S: SessionStore> {
    store: S,
    session: Session,
    screen: Screen,
}

impl<S: SessionStore> Onboarding<S> {
    /// Rehydrates the session from `store`. Corrupt state is wiped and the
    /// flow starts over at landing.
    pub fn load(mut store: S) -> Self {
        let session = match read_session(&store) {
            Ok(session) => session,
            Err(reason) => {
                warn!("Discarding stored session: {}", reason);
                for key in ALL_KEYS {
                    if let Err(e) = store.remove(key) {
                        warn!("Could not clear {}: {}", key, e);
                    }
                }
                Session::default()
            }
        };

        let stored_screen = store
            .get(SCREEN_KEY)
            .and_then(|raw| serde_json::from_str::<Screen>(&raw).ok());
        let requested = stored_screen.unwrap_or(if session.can_use_app() {
            Screen::App
        } else {
            Screen::Landing
        });

        let screen = guard(&session, requested);
        Self {
            store,
            session,
            screen,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Landing → Auth.
    pub fn start(&mut self) -> Result<Screen, SessionError> {
        self.expect(Screen::Landing, "start")?;
        self.go(Screen::Auth)
    }

    /// Auth → Payment, or Auth → App for a returning user who already paid.
    pub fn login(
        &mut self,
        user: SessionUser,
        token: Option<String>,
        paid: bool,
    ) -> Result<Screen, SessionError> {
        self.expect(Screen::Auth, "log in")?;

        // A stored paid flag only carries over to the user who earned it
        let same_user = self
            .session
            .user
            .as_ref()
            .map_or(true, |current| same_email(&current.email, &user.email));

        info!("Session started for {}", user.email);
        self.session.user = Some(user);
        self.session.token = token;
        self.session.paid = paid || (same_user && self.session.paid);
        self.persist_session()?;

        if self.session.paid {
            self.go(Screen::App)
        } else {
            self.go(Screen::Payment)
        }
    }

    /// Payment → App once the payment signal arrives; the paid flag only ever
    /// goes from false to true.
    pub fn payment_confirmed(&mut self, access_token: Option<String>) -> Result<Screen, SessionError> {
        self.expect(Screen::Payment, "confirm a payment")?;
        if !self.session.is_authenticated() {
            return Err(SessionError::InvalidTransition {
                from: self.screen,
                action: "confirm a payment",
            });
        }

        self.session.paid = true;
        if let Some(token) = access_token {
            self.session.token = Some(token);
        }
        self.persist_session()?;
        self.go(Screen::App)
    }

    /// Auth → Landing, Payment → Auth.
    pub fn back(&mut self) -> Result<Screen, SessionError> {
        match self.screen {
            Screen::Auth => self.go(Screen::Landing),
            Screen::Payment => self.go(Screen::Auth),
            from => Err(SessionError::InvalidTransition { from, action: "go back" }),
        }
    }

    /// Clears every stored key and returns to landing.
    pub fn logout(&mut self) -> Result<Screen, SessionError> {
        for key in ALL_KEYS {
            self.store.remove(key)?;
        }
        self.session = Session::default();
        self.screen = Screen::Landing;
        info!("Session cleared");
        Ok(self.screen)
    }

    /// Direct jump to `target`, subject to the same guards as a reload.
    pub fn navigate(&mut self, target: Screen) -> Result<Screen, SessionError> {
        let screen = guard(&self.session, target);
        if screen != target {
            warn!("Navigation to {} refused, falling back to {}", target, screen);
        }
        self.go(screen)
    }

    fn expect(&self, screen: Screen, action: &'static str) -> Result<(), SessionError> {
        if self.screen != screen {
            return Err(SessionError::InvalidTransition {
                from: self.screen,
                action,
            });
        }
        Ok(())
    }

    fn go(&mut self, screen: Screen) -> Result<Screen, SessionError> {
        self.screen = screen;
        self.store.set(SCREEN_KEY, &serde_json::to_string(&screen)?)?;
        Ok(screen)
    }

    fn persist_session(&mut self) -> Result<(), SessionError> {
        match &self.session.user {
            Some(user) => self.store.set(USER_KEY, &serde_json::to_string(user)?)?,
            None => self.store.remove(USER_KEY)?,
        }
        match &self.session.token {
            Some(token) => self.store.set(TOKEN_KEY, token)?,
            None => self.store.remove(TOKEN_KEY)?,
        }
        self.store
            .set(PAID_KEY, if self.session.paid { "true" } else { "false" })?;
        Ok(())
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn guard(session: &Session, target: Screen) -> Screen {
    match target {
        Screen::App if !session.can_use_app() => Screen::Landing,
        Screen::Payment if !session.is_authenticated() => Screen::Landing,
        other => other,
    }
}

fn read_session<S: SessionStore>(store: &S) -> Result<Session, String> {
    let user = match store.get(USER_KEY) {
        Some(raw) => Some(
            serde_json::from_str::<SessionUser>(&raw)
                .map_err(|e| format!("invalid user record: {}", e))?,
        ),
        None => None,
    };

    let paid = match store.get(PAID_KEY) {
        Some(raw) => serde_json::from_str::<bool>(&raw)
            .map_err(|e| format!("invalid paid flag: {}", e))?,
        None => false,
    };

    Ok(Session {
        user,
        token: store.get(TOKEN_KEY),
        paid,
    })
}
