use crate::pkg::internal::{adaptors::users::spec::Role, auth::Claims};

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Actor {
            user_id: claims.user_id,
            username: claims.username,
            role: claims.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create, update and unconditional delete of records.
    Manage,
    Trash,
    Restore,
    PurgeTrashed,
    AccessFiles,
}

/// Single authorization rule for every record operation. `actor_alumni` is
/// the alumni profile owned by the actor, if any; `record_alumni` the profile
/// the target record belongs to.
pub fn can_act_on(
    actor: &Actor,
    actor_alumni: Option<i64>,
    record_alumni: i64,
    action: Action,
) -> bool {
    match action {
        Action::Manage => actor.is_admin(),
        Action::Trash | Action::Restore | Action::PurgeTrashed | Action::AccessFiles => {
            actor.is_admin() || actor_alumni == Some(record_alumni)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{can_act_on, Action, Actor};
    use crate::pkg::internal::adaptors::users::spec::Role;

    fn actor(role: Role) -> Actor {
        Actor { user_id: 7, username: "dewi".into(), role }
    }

    #[test]
    fn admins_may_act_on_anything() {
        let admin = actor(Role::Admin);
        for action in [Action::Manage, Action::Trash, Action::Restore, Action::PurgeTrashed, Action::AccessFiles] {
            assert!(can_act_on(&admin, None, 42, action));
        }
    }

    #[test]
    fn users_only_act_on_their_own_profile() {
        let user = actor(Role::User);
        assert!(can_act_on(&user, Some(3), 3, Action::Trash));
        assert!(can_act_on(&user, Some(3), 3, Action::AccessFiles));
        assert!(!can_act_on(&user, Some(3), 4, Action::Restore));
        assert!(!can_act_on(&user, None, 4, Action::PurgeTrashed));
        assert!(!can_act_on(&user, Some(3), 3, Action::Manage));
    }
}
