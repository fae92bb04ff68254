//! Navigation tabs and their role requirements

use blockfarm_chain::Role;

/// Top-level navigation of the shell. A tab with an empty required-role
/// set is public; the rest are shown only to accounts holding at least
/// one of the listed roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTab {
    Register,
    Consult,
    Transfer,
    Roles,
}

impl NavTab {
    pub const ALL: [NavTab; 4] = [
        NavTab::Register,
        NavTab::Consult,
        NavTab::Transfer,
        NavTab::Roles,
    ];

    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            NavTab::Register => &[Role::Manufacturer],
            NavTab::Consult => &[],
            NavTab::Transfer => &[Role::Manufacturer, Role::Distributor, Role::Pharmacy],
            NavTab::Roles => &[Role::Administrator],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NavTab::Register => "Register lot",
            NavTab::Consult => "Verify medicines",
            NavTab::Transfer => "Transfer lot",
            NavTab::Roles => "Role management",
        }
    }
}
