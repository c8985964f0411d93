use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use axum::{Extension, Json, extract::State};
use jsonwebtoken::{EncodingKey, Header, encode};

use hearth_db::Database;
use hearth_db::queries::LoginOutcome;
use hearth_gateway::dispatcher::Dispatcher;
use hearth_types::api::{Claims, LoginRequest, LoginResponse, SessionResponse};
use hearth_types::models::User;
use hearth_types::session::Gate;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    /// The single reserved name allowed elevated privileges.
    pub admin_name: String,
    pub admin_password: String,
    pub max_users: usize,
    /// Mirrors the persisted reset generation. Tokens minted under an
    /// older generation are rejected, forcing re-login after a reset.
    pub reset_generation: AtomicI64,
}

impl AppStateInner {
    pub fn current_generation(&self) -> i64 {
        self.reset_generation.load(Ordering::Acquire)
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (user, gate) = authenticate(&state, &req.name, req.password.as_deref(), req.admin)?;

    let token = create_token(
        &state.jwt_secret,
        &user.name,
        user.is_admin,
        state.current_generation(),
    )?;

    Ok(Json(LoginResponse {
        user,
        token,
        state: gate,
    }))
}

/// Resolve the session a restarting client cached locally: re-reads the
/// user record and re-derives the gate state from live approval data.
pub async fn session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state
        .db
        .get_user(&claims.sub)?
        .ok_or_else(|| ApiError::Unauthorized("session user no longer exists".into()))?
        .into_model();

    let approved = state.db.has_approved(&user.name)?;
    Ok(Json(SessionResponse {
        state: Gate::login(user.is_admin, approved),
        user,
    }))
}

/// Login core. Validation and authorization run before any write; the
/// existence/capacity/create decision is a single DB transaction.
fn authenticate(
    state: &AppStateInner,
    name: &str,
    password: Option<&str>,
    admin_login: bool,
) -> Result<(User, Gate), ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("a name is required".into()));
    }

    if admin_login {
        if name != state.admin_name {
            return Err(ApiError::Unauthorized(
                "only the administrator can sign in as admin".into(),
            ));
        }
        if password != Some(state.admin_password.as_str()) {
            return Err(ApiError::Unauthorized(
                "wrong administrator password".into(),
            ));
        }
    }

    let outcome = state
        .db
        .get_or_create_user(name, admin_login, state.max_users)?;

    let user = match outcome {
        LoginOutcome::Existing(row) | LoginOutcome::Created(row) => row.into_model(),
        LoginOutcome::CapacityReached => {
            return Err(ApiError::Capacity(format!(
                "the household is full ({} members max)",
                state.max_users
            )));
        }
    };

    let approved = state.db.has_approved(&user.name)?;
    let is_admin = user.is_admin;
    Ok((user, Gate::login(is_admin, approved)))
}

pub(crate) fn create_token(
    secret: &str,
    name: &str,
    admin: bool,
    generation: i64,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: name.to_string(),
        admin,
        generation,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppStateInner {
        AppStateInner {
            db: Database::open_in_memory().unwrap(),
            dispatcher: Dispatcher::new(),
            jwt_secret: "test-secret".into(),
            admin_name: "ahmed".into(),
            admin_password: "super-secret".into(),
            max_users: 5,
            reset_generation: AtomicI64::new(0),
        }
    }

    #[test]
    fn blank_names_are_rejected_before_any_write() {
        let state = test_state();
        let err = authenticate(&state, "   ", None, false).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(state.db.count_users().unwrap(), 0);
    }

    #[test]
    fn admin_login_requires_the_reserved_name() {
        let state = test_state();
        let err = authenticate(&state, "sam", Some("super-secret"), true).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(state.db.count_users().unwrap(), 0);
    }

    #[test]
    fn admin_login_requires_the_shared_secret() {
        let state = test_state();
        let err = authenticate(&state, "ahmed", Some("guess"), true).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err = authenticate(&state, "ahmed", None, true).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn first_admin_login_creates_the_admin_once() {
        let state = test_state();

        let (user, gate) = authenticate(&state, "ahmed", Some("super-secret"), true).unwrap();
        assert!(user.is_admin);
        assert_eq!(gate, Gate::PendingApproval { admin: true });

        let (again, _) = authenticate(&state, "ahmed", Some("super-secret"), true).unwrap();
        assert!(again.is_admin);
        assert_eq!(state.db.count_users().unwrap(), 1);
    }

    #[test]
    fn returning_name_is_never_promoted() {
        let state = test_state();
        // the reserved name first signs in as a plain housemate
        authenticate(&state, "ahmed", None, false).unwrap();

        // a later admin-mode login finds the existing record unchanged
        let (user, _) = authenticate(&state, "ahmed", Some("super-secret"), true).unwrap();
        assert!(!user.is_admin);
    }

    #[test]
    fn capacity_blocks_new_names_but_not_returning_ones() {
        let state = test_state();
        for name in ["a", "b", "c", "d", "e"] {
            authenticate(&state, name, None, false).unwrap();
        }

        let err = authenticate(&state, "f", None, false).unwrap_err();
        assert!(matches!(err, ApiError::Capacity(_)));
        assert_eq!(state.db.count_users().unwrap(), 5);

        authenticate(&state, "a", None, false).unwrap();
    }

    #[test]
    fn approval_state_steers_the_gate() {
        let state = test_state();
        let (_, gate) = authenticate(&state, "sam", None, false).unwrap();
        assert_eq!(gate, Gate::PendingApproval { admin: false });

        state.db.record_approval("sam").unwrap();

        let (_, gate) = authenticate(&state, "sam", None, false).unwrap();
        assert_eq!(gate, Gate::Active { admin: false });
    }

    #[test]
    fn minted_tokens_round_trip_through_validation() {
        use jsonwebtoken::{DecodingKey, Validation, decode};

        let token = create_token("test-secret", "sam", false, 3).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "sam");
        assert_eq!(data.claims.generation, 3);
        assert!(!data.claims.admin);
    }
}
