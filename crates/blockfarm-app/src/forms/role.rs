//! Role management form

use blockfarm_chain::Role;
use ethers::types::Address;

use crate::error::ValidationError;
use crate::forms::parse_address;

/// Field state for the grant/revoke form. The manufacturer role is
/// preselected, as the most commonly granted one.
#[derive(Debug, Clone)]
pub struct RoleForm {
    pub role: Role,
    pub target_address: String,
}

impl Default for RoleForm {
    fn default() -> Self {
        RoleForm { role: Role::Manufacturer, target_address: String::new() }
    }
}

/// A validated role action, ready for the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRequest {
    pub role: Role,
    pub account: Address,
}

impl RoleForm {
    pub fn select_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn set_target(&mut self, value: impl Into<String>) {
        self.target_address = value.into();
    }

    pub fn validate(&self) -> Result<RoleRequest, ValidationError> {
        let account = parse_address(&self.target_address, "target address")?;
        Ok(RoleRequest { role: self.role, account })
    }
}
