use strum_macros::Display;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Guard = 3,
    Supervisor = 4,
    OperationsManager = 5,
}

/// What a role is allowed to do
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    RecordAttendance,
    ViewOwnProfile,
    ManageLocations,
    ManagePayroll,
    ManageUniforms,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Guard),
            4 => Some(Role::Supervisor),
            5 => Some(Role::OperationsManager),
            _ => None,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Admin => true,
            Role::Hr => matches!(capability, ManagePayroll | ManageUniforms | ViewOwnProfile),
            Role::OperationsManager => matches!(
                capability,
                ManageLocations | ManageUniforms | ViewOwnProfile
            ),
            Role::Supervisor => matches!(capability, RecordAttendance | ViewOwnProfile),
            Role::Guard => matches!(capability, RecordAttendance | ViewOwnProfile),
        }
    }
}
