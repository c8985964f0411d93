use serde::{Deserialize, Serialize};

/// Screen-selection state machine for a signed-in session.
///
/// `Unauthenticated -> PendingApproval -> Active`, with logout and global
/// reset dropping back to `Unauthenticated` from anywhere. The admin/user
/// split is a role flag carried through the states, not a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Gate {
    Unauthenticated,
    PendingApproval { admin: bool },
    Active { admin: bool },
}

impl Gate {
    /// Entry state after a successful login. A user whose approval is
    /// already on record skips `PendingApproval` entirely.
    pub fn login(admin: bool, approved: bool) -> Self {
        if approved {
            Self::Active { admin }
        } else {
            Self::PendingApproval { admin }
        }
    }

    /// Transition taken when the session's user records an approval.
    /// Monotonic: an already-active session stays active, and approval
    /// never applies to a logged-out session.
    pub fn approve(self) -> Self {
        match self {
            Self::PendingApproval { admin } | Self::Active { admin } => Self::Active { admin },
            Self::Unauthenticated => Self::Unauthenticated,
        }
    }

    /// Explicit logout.
    pub fn logout(self) -> Self {
        Self::Unauthenticated
    }

    /// Forced sign-out when a global reset is observed.
    pub fn reset(self) -> Self {
        Self::Unauthenticated
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn is_admin(self) -> bool {
        matches!(
            self,
            Self::Active { admin: true } | Self::PendingApproval { admin: true }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unapproved_login_lands_in_pending() {
        let gate = Gate::login(false, false);
        assert_eq!(gate, Gate::PendingApproval { admin: false });
        assert!(!gate.is_active());
    }

    #[test]
    fn approved_login_skips_pending() {
        assert_eq!(Gate::login(true, true), Gate::Active { admin: true });
    }

    #[test]
    fn approval_promotes_pending_to_active() {
        let gate = Gate::login(false, false).approve();
        assert_eq!(gate, Gate::Active { admin: false });
    }

    #[test]
    fn approval_is_monotonic() {
        let gate = Gate::Active { admin: true };
        assert_eq!(gate.approve(), gate);
    }

    #[test]
    fn approval_does_not_touch_logged_out_sessions() {
        assert_eq!(Gate::Unauthenticated.approve(), Gate::Unauthenticated);
    }

    #[test]
    fn logout_and_reset_clear_any_state() {
        for gate in [
            Gate::PendingApproval { admin: false },
            Gate::Active { admin: false },
            Gate::Active { admin: true },
        ] {
            assert_eq!(gate.logout(), Gate::Unauthenticated);
            assert_eq!(gate.reset(), Gate::Unauthenticated);
        }
    }

    #[test]
    fn role_flag_survives_approval() {
        let gate = Gate::login(true, false);
        assert!(gate.is_admin());
        assert!(gate.approve().is_admin());
    }

    #[test]
    fn wire_form_is_tagged() {
        let json = serde_json::to_value(Gate::Active { admin: false }).unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["admin"], false);
    }
}
