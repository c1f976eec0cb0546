//! Collaborator contracts: owner platform, economy, and marker backends.
//!
//! Each contract has a closed set of concrete variants; the active one is
//! picked once at startup. Backends must tolerate absent inputs and report
//! unavailability instead of partially succeeding; a failed side effect is
//! logged and skipped, never allowed to roll back engine state.

use std::collections::HashMap;
use std::sync::Mutex;

use bevy_ecs::prelude::Resource;
use thiserror::Error;

use crate::engine::events::ActorRef;
use crate::engine::owner::{CaptureOwner, OwnerKind};
use crate::engine::session::CapturePhase;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("backend unavailable")]
    Unavailable,
    #[error("owner kind {0:?} not supported")]
    UnsupportedKind(OwnerKind),
    #[error("unknown account {0}")]
    UnknownAccount(String),
    #[error("insufficient funds: needed {needed:.0}, held {held:.0}")]
    Insufficient { needed: f64, held: f64 },
}

/// Resolves real-world actors to owners and validates owner names.
pub trait OwnerDirectory: Send + Sync {
    /// The owner of the given kind this actor would capture for, if any.
    fn owner_for_actor(&self, actor: &ActorRef, kind: OwnerKind) -> Option<CaptureOwner>;

    fn is_member(&self, actor: &ActorRef, owner: &CaptureOwner) -> bool {
        self.owner_for_actor(actor, owner.kind)
            .map(|resolved| resolved.is_same_owner(owner))
            .unwrap_or(false)
    }

    fn known_owners(&self, kind: OwnerKind) -> Vec<CaptureOwner>;

    /// Trimmed, non-empty owner name or `None`; never an error.
    fn normalize_name(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// In-memory roster for the standalone runtime: actors mapped to groups,
/// with an individual-owner fallback for everyone.
#[derive(Debug, Default)]
pub struct StandaloneDirectory {
    groups: HashMap<String, CaptureOwner>,
}

impl StandaloneDirectory {
    pub fn enroll(&mut self, actor_name: &str, group: CaptureOwner) {
        self.groups.insert(actor_name.to_lowercase(), group);
    }
}

impl OwnerDirectory for StandaloneDirectory {
    fn owner_for_actor(&self, actor: &ActorRef, kind: OwnerKind) -> Option<CaptureOwner> {
        match kind {
            OwnerKind::Individual => {
                CaptureOwner::from_display_name(OwnerKind::Individual, Some(&actor.name))
            }
            OwnerKind::Group => self.groups.get(&actor.name.to_lowercase()).cloned(),
            OwnerKind::Alliance => None,
        }
    }

    fn known_owners(&self, kind: OwnerKind) -> Vec<CaptureOwner> {
        match kind {
            OwnerKind::Group => {
                let mut owners: Vec<CaptureOwner> = self.groups.values().cloned().collect();
                owners.sort_by(|a, b| a.id.cmp(&b.id));
                owners.dedup();
                owners
            }
            _ => Vec::new(),
        }
    }
}

/// Directory variant for hosts with no owner platform attached.
#[derive(Debug, Default)]
pub struct EmptyDirectory;

impl OwnerDirectory for EmptyDirectory {
    fn owner_for_actor(&self, actor: &ActorRef, kind: OwnerKind) -> Option<CaptureOwner> {
        match kind {
            OwnerKind::Individual => {
                CaptureOwner::from_display_name(OwnerKind::Individual, Some(&actor.name))
            }
            _ => None,
        }
    }

    fn known_owners(&self, _kind: OwnerKind) -> Vec<CaptureOwner> {
        Vec::new()
    }
}

pub trait EconomyBank: Send + Sync {
    fn is_available(&self) -> bool;

    fn supported_kinds(&self) -> &[OwnerKind];

    fn balance(&self, account: &str) -> Option<f64>;

    fn has_at_least(&self, account: &str, amount: f64) -> bool {
        self.balance(account).map(|held| held >= amount).unwrap_or(false)
    }

    fn withdraw(&self, account: &str, amount: f64) -> Result<(), AdapterError>;

    fn deposit(&self, account: &str, amount: f64) -> Result<(), AdapterError>;

    fn deposit_owner(&self, owner: &CaptureOwner, amount: f64) -> Result<(), AdapterError> {
        if !self.supported_kinds().contains(&owner.kind) {
            return Err(AdapterError::UnsupportedKind(owner.kind));
        }
        self.deposit(&owner.id, amount)
    }

    /// Account listing for observer surfaces; empty when unavailable.
    fn accounts(&self) -> Vec<(String, f64)>;
}

/// In-memory ledger for the standalone runtime.
#[derive(Debug, Default)]
pub struct LedgerBank {
    accounts: Mutex<HashMap<String, f64>>,
}

const LEDGER_KINDS: [OwnerKind; 2] = [OwnerKind::Individual, OwnerKind::Group];

impl LedgerBank {
    pub fn with_account(self, account: &str, balance: f64) -> Self {
        self.accounts
            .lock()
            .expect("ledger lock poisoned")
            .insert(account.to_string(), balance);
        self
    }
}

impl EconomyBank for LedgerBank {
    fn is_available(&self) -> bool {
        true
    }

    fn supported_kinds(&self) -> &[OwnerKind] {
        &LEDGER_KINDS
    }

    fn balance(&self, account: &str) -> Option<f64> {
        self.accounts
            .lock()
            .expect("ledger lock poisoned")
            .get(account)
            .copied()
    }

    fn withdraw(&self, account: &str, amount: f64) -> Result<(), AdapterError> {
        let mut accounts = self.accounts.lock().expect("ledger lock poisoned");
        let held = accounts
            .get_mut(account)
            .ok_or_else(|| AdapterError::UnknownAccount(account.to_string()))?;
        if *held < amount {
            return Err(AdapterError::Insufficient {
                needed: amount,
                held: *held,
            });
        }
        *held -= amount;
        Ok(())
    }

    fn deposit(&self, account: &str, amount: f64) -> Result<(), AdapterError> {
        let mut accounts = self.accounts.lock().expect("ledger lock poisoned");
        *accounts.entry(account.to_string()).or_default() += amount;
        Ok(())
    }

    fn accounts(&self) -> Vec<(String, f64)> {
        let accounts = self.accounts.lock().expect("ledger lock poisoned");
        let mut listing: Vec<(String, f64)> =
            accounts.iter().map(|(id, held)| (id.clone(), *held)).collect();
        listing.sort_by(|a, b| a.0.cmp(&b.0));
        listing
    }
}

/// Bank variant for hosts with no economy attached: reports unavailability
/// rather than pretending a payout happened.
#[derive(Debug, Default)]
pub struct UnavailableBank;

impl EconomyBank for UnavailableBank {
    fn is_available(&self) -> bool {
        false
    }

    fn supported_kinds(&self) -> &[OwnerKind] {
        &[]
    }

    fn balance(&self, _account: &str) -> Option<f64> {
        None
    }

    fn withdraw(&self, _account: &str, _amount: f64) -> Result<(), AdapterError> {
        Err(AdapterError::Unavailable)
    }

    fn deposit(&self, _account: &str, _amount: f64) -> Result<(), AdapterError> {
        Err(AdapterError::Unavailable)
    }

    fn accounts(&self) -> Vec<(String, f64)> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerInfo {
    pub point: String,
    pub owner: Option<String>,
    pub phase: Option<CapturePhase>,
}

/// Hologram/map surface. Both calls are idempotent: redundant updates must
/// not accumulate duplicate markers, and an unavailable backend is a no-op.
pub trait MarkerProvider: Send + Sync {
    fn is_available(&self) -> bool;

    fn create_or_update(&self, marker: &MarkerInfo);

    fn remove(&self, point: &str);
}

/// Renders markers into the log stream, deduplicating unchanged updates.
#[derive(Debug, Default)]
pub struct LogMarkers {
    rendered: Mutex<HashMap<String, MarkerInfo>>,
}

impl LogMarkers {
    pub fn marker_count(&self) -> usize {
        self.rendered.lock().expect("marker lock poisoned").len()
    }
}

impl MarkerProvider for LogMarkers {
    fn is_available(&self) -> bool {
        true
    }

    fn create_or_update(&self, marker: &MarkerInfo) {
        let mut rendered = self.rendered.lock().expect("marker lock poisoned");
        if rendered.get(&marker.point) == Some(marker) {
            return;
        }
        tracing::debug!(
            point = %marker.point,
            owner = marker.owner.as_deref().unwrap_or("unclaimed"),
            phase = marker.phase.map(|phase| phase.label()).unwrap_or("idle"),
            "marker updated"
        );
        rendered.insert(marker.point.clone(), marker.clone());
    }

    fn remove(&self, point: &str) {
        let mut rendered = self.rendered.lock().expect("marker lock poisoned");
        if rendered.remove(point).is_some() {
            tracing::debug!(point, "marker removed");
        }
    }
}

#[derive(Debug, Default)]
pub struct NoopMarkers;

impl MarkerProvider for NoopMarkers {
    fn is_available(&self) -> bool {
        false
    }

    fn create_or_update(&self, _marker: &MarkerInfo) {}

    fn remove(&self, _point: &str) {}
}

/// The active backend variants, selected once at startup.
#[derive(Resource)]
pub struct Adapters {
    pub directory: Box<dyn OwnerDirectory>,
    pub bank: Box<dyn EconomyBank>,
    pub markers: Box<dyn MarkerProvider>,
}

impl Adapters {
    pub fn standalone(directory: StandaloneDirectory, bank: LedgerBank) -> Self {
        Self {
            directory: Box::new(directory),
            bank: Box::new(bank),
            markers: Box::new(LogMarkers::default()),
        }
    }

    /// No collaborators detected: everything degrades to a quiet no-op.
    pub fn detached() -> Self {
        Self {
            directory: Box::new(EmptyDirectory),
            bank: Box::new(UnavailableBank),
            markers: Box::new(NoopMarkers),
        }
    }

    /// Group affiliation first, individual ownership as the fallback.
    pub fn resolve_owner(&self, actor: &ActorRef) -> Option<CaptureOwner> {
        self.directory
            .owner_for_actor(actor, OwnerKind::Group)
            .or_else(|| self.directory.owner_for_actor(actor, OwnerKind::Individual))
    }

    /// Reward queue entries drained by the reward system each tick.
    pub fn pay_capture_reward(
        &self,
        owner: &CaptureOwner,
        amount: f64,
    ) -> Result<(), AdapterError> {
        if !self.bank.is_available() {
            return Err(AdapterError::Unavailable);
        }
        self.bank.deposit_owner(owner, amount)
    }
}

/// Side effects queued by resolution and dispatched best-effort afterwards.
#[derive(Debug, Default, Resource)]
pub struct PendingSideEffects {
    pub rewards: Vec<RewardRequest>,
    pub markers: Vec<MarkerUpdate>,
}

#[derive(Debug, Clone)]
pub struct RewardRequest {
    pub point: String,
    pub owner: CaptureOwner,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub enum MarkerUpdate {
    Upsert(MarkerInfo),
    Remove(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> ActorRef {
        ActorRef::new(1, "Saya")
    }

    fn vanguard() -> CaptureOwner {
        CaptureOwner::from_display_name(OwnerKind::Group, Some("Iron Vanguard")).unwrap()
    }

    fn pact() -> CaptureOwner {
        CaptureOwner::from_display_name(OwnerKind::Group, Some("Ashen Pact")).unwrap()
    }

    #[test]
    fn standalone_directory_resolves_group_then_individual() {
        let mut directory = StandaloneDirectory::default();
        directory.enroll("Saya", vanguard());
        let adapters = Adapters::standalone(directory, LedgerBank::default());

        let owner = adapters.resolve_owner(&actor()).unwrap();
        assert_eq!(owner.kind, OwnerKind::Group);
        assert!(owner.is_same_owner(&vanguard()));

        let stranger = ActorRef::new(2, "Brant");
        let owner = adapters.resolve_owner(&stranger).unwrap();
        assert_eq!(owner.kind, OwnerKind::Individual);
    }

    #[test]
    fn directory_membership_uses_loose_matching() {
        let mut directory = StandaloneDirectory::default();
        directory.enroll("Saya", vanguard());
        let partial = CaptureOwner::new(OwnerKind::Group, "group:iron_vanguard", None);
        assert!(directory.is_member(&actor(), &partial));
        assert!(!directory.is_member(&ActorRef::new(2, "Brant"), &partial));
    }

    #[test]
    fn known_owners_lists_each_enrolled_group_once() {
        let mut directory = StandaloneDirectory::default();
        directory.enroll("Saya", vanguard());
        directory.enroll("Ilka", vanguard());
        directory.enroll("Brant", pact());
        let owners = directory.known_owners(OwnerKind::Group);
        assert_eq!(owners.len(), 2);
        assert!(owners.iter().any(|owner| owner.is_same_owner(&vanguard())));
        assert!(owners.iter().any(|owner| owner.is_same_owner(&pact())));
        assert!(directory.known_owners(OwnerKind::Alliance).is_empty());
    }

    #[test]
    fn normalize_name_trims_and_rejects_blank() {
        let directory = StandaloneDirectory::default();
        assert_eq!(
            directory.normalize_name("  Iron Vanguard "),
            Some("Iron Vanguard".to_string())
        );
        assert_eq!(directory.normalize_name("  "), None);
        assert_eq!(directory.normalize_name(""), None);
    }

    #[test]
    fn ledger_withdraw_checks_funds() {
        let bank = LedgerBank::default().with_account("group:iron_vanguard", 100.0);
        assert!(bank.has_at_least("group:iron_vanguard", 100.0));
        assert!(matches!(
            bank.withdraw("group:iron_vanguard", 150.0),
            Err(AdapterError::Insufficient { .. })
        ));
        bank.withdraw("group:iron_vanguard", 40.0).unwrap();
        assert_eq!(bank.balance("group:iron_vanguard"), Some(60.0));
    }

    #[test]
    fn ledger_rejects_unsupported_owner_kinds() {
        let bank = LedgerBank::default();
        let alliance =
            CaptureOwner::from_display_name(OwnerKind::Alliance, Some("Northern Accord"))
                .unwrap();
        assert!(matches!(
            bank.deposit_owner(&alliance, 10.0),
            Err(AdapterError::UnsupportedKind(OwnerKind::Alliance))
        ));
        bank.deposit_owner(&vanguard(), 10.0).unwrap();
        assert_eq!(bank.balance("group:iron_vanguard"), Some(10.0));
    }

    #[test]
    fn unavailable_bank_never_partially_succeeds() {
        let bank = UnavailableBank;
        assert!(!bank.is_available());
        assert!(matches!(
            bank.deposit("anyone", 5.0),
            Err(AdapterError::Unavailable)
        ));
    }

    #[test]
    fn log_markers_are_idempotent() {
        let markers = LogMarkers::default();
        let info = MarkerInfo {
            point: "ember_keep".to_string(),
            owner: Some("Iron Vanguard".to_string()),
            phase: Some(CapturePhase::Cooldown),
        };
        markers.create_or_update(&info);
        markers.create_or_update(&info);
        assert_eq!(markers.marker_count(), 1);
        markers.remove("ember_keep");
        markers.remove("ember_keep");
        assert_eq!(markers.marker_count(), 0);
    }
}
