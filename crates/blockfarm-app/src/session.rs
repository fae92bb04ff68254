//! Role-gated session state
//!
//! Membership for all four roles is queried concurrently whenever a
//! session is established. Gated tabs stay hidden while the queries are
//! pending or failed: showing a tab that a later failure would revoke
//! implies capability the account may not have. Failing closed is the
//! whole point.

use blockfarm_chain::{ChainError, RegistryClient, Role, RoleHashes, RoleSet};
use ethers::providers::Middleware;
use ethers::types::Address;

use crate::tabs::NavTab;

/// Gate over the role-protected parts of the shell.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleGate {
    /// No account connected; only public tabs are reachable.
    Disconnected,

    /// Membership queries are in flight.
    Loading,

    /// Queries failed; retriable, and gated tabs stay hidden meanwhile.
    Failed(String),

    /// Membership known for the active account.
    Ready(RoleSet),
}

/// Session state for the connected account's capabilities.
///
/// Responses are committed against the generation captured when the load
/// was issued; a response for a superseded identity is discarded rather
/// than applied to mismatched state.
#[derive(Debug)]
pub struct RoleSession {
    gate: RoleGate,
    hashes: Option<RoleHashes>,
    generation: u64,
}

impl Default for RoleSession {
    fn default() -> Self {
        RoleSession { gate: RoleGate::Disconnected, hashes: None, generation: 0 }
    }
}

impl RoleSession {
    pub fn gate(&self) -> &RoleGate {
        &self.gate
    }

    /// Hash for a role: chain-reported when loaded, local otherwise.
    pub fn role_hash(&self, role: Role) -> [u8; 32] {
        self.hashes
            .map(|hashes| hashes.for_role(role))
            .unwrap_or_else(|| role.local_hash())
    }

    /// Mark a load as started and return the generation to commit under.
    pub fn begin_load(&mut self) -> u64 {
        self.gate = RoleGate::Loading;
        self.generation
    }

    /// Invalidate the session identity (account or chain changed).
    /// Outstanding loads issued before this point will be discarded.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.gate = RoleGate::Disconnected;
        self.hashes = None;
    }

    /// Commit a successful load. Returns false when the result is stale.
    pub fn commit_ok(&mut self, generation: u64, hashes: RoleHashes, roles: RoleSet) -> bool {
        if generation != self.generation {
            tracing::debug!("discarding stale role response");
            return false;
        }
        self.hashes = Some(hashes);
        self.gate = RoleGate::Ready(roles);
        true
    }

    /// Commit a failed load. Returns false when the failure is stale.
    pub fn commit_failed(&mut self, generation: u64, message: String) -> bool {
        if generation != self.generation {
            tracing::debug!("discarding stale role failure");
            return false;
        }
        self.gate = RoleGate::Failed(message);
        true
    }

    /// Tabs visible under the current gate state.
    pub fn visible_tabs(&self) -> Vec<NavTab> {
        NavTab::ALL
            .into_iter()
            .filter(|tab| {
                let required = tab.required_roles();
                if required.is_empty() {
                    return true;
                }
                matches!(&self.gate, RoleGate::Ready(roles) if roles.holds_any(required))
            })
            .collect()
    }

    /// Keep the active tab if still visible, otherwise fall back to the
    /// first available tab, or to none.
    pub fn resolve_active_tab(&self, current: Option<NavTab>) -> Option<NavTab> {
        let tabs = self.visible_tabs();
        match current {
            Some(tab) if tabs.contains(&tab) => Some(tab),
            _ => tabs.first().copied(),
        }
    }
}

/// Query the chain hashes and membership of all four roles for `account`.
/// Hash getters run concurrently, then the four membership checks.
pub async fn load_roles<M: Middleware + 'static>(
    registry: &RegistryClient<M>,
    account: Address,
) -> Result<(RoleHashes, RoleSet), ChainError> {
    let (administrator, manufacturer, distributor, pharmacy) = tokio::try_join!(
        registry.role_hash(Role::Administrator),
        registry.role_hash(Role::Manufacturer),
        registry.role_hash(Role::Distributor),
        registry.role_hash(Role::Pharmacy),
    )?;
    let hashes = RoleHashes { administrator, manufacturer, distributor, pharmacy };

    let (is_admin, is_manufacturer, is_distributor, is_pharmacy) = tokio::try_join!(
        registry.has_role(hashes.administrator, account),
        registry.has_role(hashes.manufacturer, account),
        registry.has_role(hashes.distributor, account),
        registry.has_role(hashes.pharmacy, account),
    )?;

    let roles = RoleSet {
        administrator: is_admin,
        manufacturer: is_manufacturer,
        distributor: is_distributor,
        pharmacy: is_pharmacy,
    };
    tracing::info!(account = %account, roles = ?roles.held(), "role membership loaded");
    Ok((hashes, roles))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(roles: RoleSet) -> RoleSession {
        let mut session = RoleSession::default();
        let generation = session.begin_load();
        assert!(session.commit_ok(generation, RoleHashes::local(), roles));
        session
    }

    #[test]
    fn held_roles_expose_matching_tabs_only() {
        let session = ready(RoleSet { manufacturer: true, ..RoleSet::default() });
        assert_eq!(
            session.visible_tabs(),
            vec![NavTab::Register, NavTab::Consult, NavTab::Transfer]
        );

        let session = ready(RoleSet { administrator: true, ..RoleSet::default() });
        assert_eq!(session.visible_tabs(), vec![NavTab::Consult, NavTab::Roles]);
    }

    #[test]
    fn pending_and_failed_gates_hide_protected_tabs() {
        let mut session = RoleSession::default();
        assert_eq!(session.visible_tabs(), vec![NavTab::Consult]);

        session.begin_load();
        assert_eq!(session.visible_tabs(), vec![NavTab::Consult]);

        let generation = session.begin_load();
        assert!(session.commit_failed(generation, "rpc error".to_string()));
        assert_eq!(session.visible_tabs(), vec![NavTab::Consult]);
    }

    #[test]
    fn unavailable_active_tab_falls_back_to_first_visible() {
        let session = ready(RoleSet { administrator: true, ..RoleSet::default() });
        assert_eq!(
            session.resolve_active_tab(Some(NavTab::Register)),
            Some(NavTab::Consult)
        );
        assert_eq!(
            session.resolve_active_tab(Some(NavTab::Roles)),
            Some(NavTab::Roles)
        );
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut session = RoleSession::default();
        let generation = session.begin_load();

        // The account switched while the query was outstanding.
        session.invalidate();

        let roles = RoleSet { pharmacy: true, ..RoleSet::default() };
        assert!(!session.commit_ok(generation, RoleHashes::local(), roles));
        assert_eq!(session.gate(), &RoleGate::Disconnected);

        assert!(!session.commit_failed(generation, "late failure".to_string()));
        assert_eq!(session.gate(), &RoleGate::Disconnected);
    }

    #[test]
    fn role_hashes_fall_back_to_local_constants() {
        let session = RoleSession::default();
        assert_eq!(
            session.role_hash(Role::Administrator),
            Role::Administrator.local_hash()
        );
    }
}
