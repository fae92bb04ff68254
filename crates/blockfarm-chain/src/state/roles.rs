//! Operational roles enforced by the registry contract
//!
//! Role gating on the client is a UX convenience only; the contract
//! independently enforces membership on every call.

use std::fmt;
use std::str::FromStr;

use ethers::utils::keccak256;
use serde::Serialize;
use thiserror::Error;

/// The four capability tags granted and revoked on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Administrator,
    Manufacturer,
    Distributor,
    Pharmacy,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Administrator,
        Role::Manufacturer,
        Role::Distributor,
        Role::Pharmacy,
    ];

    /// Role constant name as declared by the contract.
    pub fn contract_name(&self) -> &'static str {
        match self {
            Role::Administrator => "ADMIN_ROLE",
            Role::Manufacturer => "FABRICANTE_ROLE",
            Role::Distributor => "DISTRIBUIDOR_ROLE",
            Role::Pharmacy => "FARMACIA_ROLE",
        }
    }

    /// Role hash computed locally, `keccak256(contract_name)`.
    ///
    /// Matches the on-chain constants; used as a fallback when the chain
    /// getters have not been queried yet.
    pub fn local_hash(&self) -> [u8; 32] {
        keccak256(self.contract_name().as_bytes())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Administrator => "administrator",
            Role::Manufacturer => "manufacturer",
            Role::Distributor => "distributor",
            Role::Pharmacy => "pharmacy",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Role::Administrator),
            "manufacturer" | "fabricante" => Ok(Role::Manufacturer),
            "distributor" | "distribuidor" => Ok(Role::Distributor),
            "pharmacy" | "farmacia" => Ok(Role::Pharmacy),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Membership of the connected account in each role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleSet {
    pub administrator: bool,
    pub manufacturer: bool,
    pub distributor: bool,
    pub pharmacy: bool,
}

impl RoleSet {
    pub fn holds(&self, role: Role) -> bool {
        match role {
            Role::Administrator => self.administrator,
            Role::Manufacturer => self.manufacturer,
            Role::Distributor => self.distributor,
            Role::Pharmacy => self.pharmacy,
        }
    }

    pub fn holds_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.holds(*role))
    }

    pub fn is_empty(&self) -> bool {
        !Role::ALL.iter().any(|role| self.holds(*role))
    }

    /// Roles held, in declaration order.
    pub fn held(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|role| self.holds(*role)).collect()
    }
}

/// Role hashes as reported by the contract getters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleHashes {
    pub administrator: [u8; 32],
    pub manufacturer: [u8; 32],
    pub distributor: [u8; 32],
    pub pharmacy: [u8; 32],
}

impl RoleHashes {
    /// Hashes computed locally, for use before the getters have loaded.
    pub fn local() -> Self {
        RoleHashes {
            administrator: Role::Administrator.local_hash(),
            manufacturer: Role::Manufacturer.local_hash(),
            distributor: Role::Distributor.local_hash(),
            pharmacy: Role::Pharmacy.local_hash(),
        }
    }

    pub fn for_role(&self, role: Role) -> [u8; 32] {
        match role {
            Role::Administrator => self.administrator,
            Role::Manufacturer => self.manufacturer,
            Role::Distributor => self.distributor,
            Role::Pharmacy => self.pharmacy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_english_and_contract_spellings() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!("Fabricante".parse::<Role>().unwrap(), Role::Manufacturer);
        assert_eq!("distributor".parse::<Role>().unwrap(), Role::Distributor);
        assert_eq!("FARMACIA".parse::<Role>().unwrap(), Role::Pharmacy);
        assert!("auditor".parse::<Role>().is_err());
    }

    #[test]
    fn local_hashes_follow_contract_names() {
        assert_eq!(
            Role::Administrator.local_hash(),
            keccak256("ADMIN_ROLE".as_bytes())
        );
        let hashes = RoleHashes::local();
        for role in Role::ALL {
            assert_eq!(hashes.for_role(role), role.local_hash());
        }
    }

    #[test]
    fn role_set_membership() {
        let set = RoleSet { manufacturer: true, ..RoleSet::default() };
        assert!(set.holds(Role::Manufacturer));
        assert!(set.holds_any(&[Role::Manufacturer, Role::Distributor]));
        assert!(!set.holds_any(&[Role::Administrator]));
        assert!(!set.is_empty());
        assert_eq!(set.held(), vec![Role::Manufacturer]);
        assert!(RoleSet::default().is_empty());
    }
}
