use crate::model::role::Role;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Action {
    ListUsers,
    CreateUser,
    UpdateUser,
    DeleteUser,
    ManageDepartments,
    ViewReports,
    RecordAttendance,
}

/// The single authorization table. `target` is the role of the account being
/// acted upon and only matters for user administration.
pub fn can_perform(actor: Role, action: Action, target: Option<Role>) -> bool {
    use Action::*;

    match (actor, action) {
        (Role::Superadmin, CreateUser | UpdateUser | DeleteUser) => true,
        (Role::Admin, CreateUser | UpdateUser | DeleteUser) => {
            matches!(target, Some(Role::Kaprog | Role::Pekerja))
        }
        (Role::Superadmin | Role::Admin, ListUsers | ManageDepartments | ViewReports) => true,
        (Role::Kaprog, ViewReports) => true,
        (role, RecordAttendance) => role.is_attendance_eligible(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Role; 4] = [Role::Superadmin, Role::Admin, Role::Kaprog, Role::Pekerja];

    #[test]
    fn superadmin_manages_every_role() {
        for target in ALL {
            assert!(can_perform(Role::Superadmin, Action::CreateUser, Some(target)));
            assert!(can_perform(Role::Superadmin, Action::DeleteUser, Some(target)));
        }
    }

    #[test]
    fn admin_only_manages_attendance_roles() {
        assert!(can_perform(Role::Admin, Action::CreateUser, Some(Role::Kaprog)));
        assert!(can_perform(Role::Admin, Action::UpdateUser, Some(Role::Pekerja)));
        assert!(!can_perform(Role::Admin, Action::CreateUser, Some(Role::Admin)));
        assert!(!can_perform(Role::Admin, Action::DeleteUser, Some(Role::Superadmin)));
        assert!(!can_perform(Role::Admin, Action::CreateUser, None));
    }

    #[test]
    fn attendance_roles_cannot_administer() {
        for actor in [Role::Kaprog, Role::Pekerja] {
            for target in ALL {
                assert!(!can_perform(actor, Action::CreateUser, Some(target)));
            }
            assert!(!can_perform(actor, Action::ManageDepartments, None));
            assert!(!can_perform(actor, Action::ListUsers, None));
            assert!(can_perform(actor, Action::RecordAttendance, None));
        }
    }

    #[test]
    fn reports_are_for_admins_and_kaprog() {
        assert!(can_perform(Role::Superadmin, Action::ViewReports, None));
        assert!(can_perform(Role::Admin, Action::ViewReports, None));
        assert!(can_perform(Role::Kaprog, Action::ViewReports, None));
        assert!(!can_perform(Role::Pekerja, Action::ViewReports, None));
    }

    #[test]
    fn admins_do_not_record_attendance() {
        assert!(!can_perform(Role::Admin, Action::RecordAttendance, None));
        assert!(!can_perform(Role::Superadmin, Action::RecordAttendance, None));
    }
}
