//! The approval chain attached to every submitted form, and the rules for
//! moving it forward.
//!
//! A chain is a flat, ordered list of [`ApproverEntry`] records created once
//! at submission time. Entries are flipped one at a time by faculty holding a
//! matching role assignment. Approval is strictly sequential, disapproval is
//! not: any seated approver may disapprove regardless of upstream state.
use super::directory::RoleAssignment;
use super::error::ApprovalError;
use super::role::Role;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ApproverEntry {
    #[n(0)]
    pub role: Role,
    #[n(1)]
    pub order: u32, // 1-based, index + 1
    #[n(2)]
    pub approved: bool,
    #[n(3)]
    pub disapproved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ApprovalChain {
    #[n(0)]
    entries: Vec<ApproverEntry>,
}

/// Derived classification of a chain, used by dashboards and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormStatus {
    Approved,
    Rejected,
    Pending,
}

impl ApproverEntry {
    pub fn new(role: Role, order: u32) -> Self {
        Self {
            role,
            order,
            approved: false,
            disapproved: false,
        }
    }
}

impl ApprovalChain {
    /// Materialise a fresh chain from an ordered role hierarchy.
    pub fn from_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Role>,
    {
        let entries = roles
            .into_iter()
            .enumerate()
            .map(|(index, role)| ApproverEntry::new(role.into(), index as u32 + 1))
            .collect();

        Self { entries }
    }

    /// Build a chain from a raw CBOR hierarchy as received from a client.
    ///
    /// Anything that is not an array of text strings, including a missing
    /// payload, produces an empty chain instead of an error. Older callers
    /// rely on that.
    pub fn from_encoded_roles(raw: Option<&[u8]>) -> Self {
        match decode_hierarchy(raw) {
            Ok(roles) => Self::from_roles(roles),
            Err(err) => {
                tracing::warn!("{err}, treating hierarchy as empty");
                Self::default()
            }
        }
    }

    pub fn entries(&self) -> &[ApproverEntry] {
        &self.entries
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.entries.iter().map(|entry| &entry.role)
    }
    pub fn contains_role(&self, role: &Role) -> bool {
        self.entries.iter().any(|entry| &entry.role == role)
    }

    /// Resolve which seat in this chain the given assignments occupy.
    ///
    /// Every assignment is scanned and each match overwrites the previous
    /// one, so the last matching assignment decides the seat.
    pub fn authorize(&self, assignments: &[RoleAssignment]) -> Result<u32, ApprovalError> {
        // duplicate roles: the later entry wins
        let order_by_role: HashMap<&Role, u32> = self
            .entries
            .iter()
            .map(|entry| (&entry.role, entry.order))
            .collect();

        let mut seat = None;
        for assignment in assignments {
            if let Some(order) = order_by_role.get(&assignment.role) {
                seat = Some(*order);
            }
        }

        seat.ok_or(ApprovalError::Unauthorized)
    }

    /// Approve the entry seated at `order`. Requires the entry immediately
    /// before it to be approved already.
    pub fn approve(&mut self, order: u32) -> Result<&ApproverEntry, ApprovalError> {
        let index = self.position_of(order)?;

        if !self.predecessor_approved(index) {
            return Err(ApprovalError::PredecessorPending);
        }

        let entry = &mut self.entries[index];
        if entry.approved {
            return Err(ApprovalError::AlreadyApproved);
        }
        // disapproved is left as is
        entry.approved = true;

        Ok(entry)
    }

    /// Disapprove the entry seated at `order`. No predecessor check.
    pub fn disapprove(&mut self, order: u32) -> Result<&ApproverEntry, ApprovalError> {
        let index = self.position_of(order)?;

        let entry = &mut self.entries[index];
        if entry.disapproved {
            return Err(ApprovalError::AlreadyDisapproved);
        }
        entry.disapproved = true;
        entry.approved = false;

        Ok(entry)
    }

    /// True when every entry is approved. An empty chain is vacuously approved.
    pub fn all_approved(&self) -> bool {
        self.entries.iter().all(|entry| entry.approved)
    }

    pub fn any_disapproved(&self) -> bool {
        self.entries.iter().any(|entry| entry.disapproved)
    }

    pub fn status(&self) -> FormStatus {
        if self.all_approved() {
            FormStatus::Approved
        } else if self.any_disapproved() {
            FormStatus::Rejected
        } else {
            FormStatus::Pending
        }
    }

    /// Whether the first entry holding `role` may act now, judged by the
    /// approval state of the entry right before it.
    pub fn is_ripe_for(&self, role: &Role) -> bool {
        self.entries
            .iter()
            .position(|entry| &entry.role == role)
            .is_some_and(|index| self.predecessor_approved(index))
    }

    fn position_of(&self, order: u32) -> Result<usize, ApprovalError> {
        self.entries
            .iter()
            .position(|entry| entry.order == order)
            .ok_or(ApprovalError::Unauthorized)
    }

    // gating is by array position, not by order value
    fn predecessor_approved(&self, index: usize) -> bool {
        index == 0 || self.entries[index - 1].approved
    }
}

fn decode_hierarchy(raw: Option<&[u8]>) -> Result<Vec<String>, ApprovalError> {
    let raw = raw.ok_or(ApprovalError::MalformedHierarchy)?;
    minicbor::decode::<Vec<String>>(raw).map_err(|_| ApprovalError::MalformedHierarchy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(role: &str) -> RoleAssignment {
        RoleAssignment::new("FCSE", Role::from(role))
    }

    #[test]
    fn orders_follow_input_positions() {
        let chain = ApprovalChain::from_roles(["advisor", "hod", "dean"]);
        let orders: Vec<u32> = chain.entries().iter().map(|e| e.order).collect();

        assert_eq!(orders, vec![1, 2, 3]);
        assert!(chain.entries().iter().all(|e| !e.approved && !e.disapproved));
    }

    #[test]
    fn encoded_hierarchy_decodes() {
        let raw = minicbor::to_vec(vec!["advisor".to_string(), "dean".to_string()]).unwrap();
        let chain = ApprovalChain::from_encoded_roles(Some(raw.as_slice()));

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.entries()[1].role, Role::Dean);
    }

    #[test]
    fn malformed_hierarchy_is_empty() {
        let raw = minicbor::to_vec(42u32).unwrap();

        assert!(ApprovalChain::from_encoded_roles(Some(raw.as_slice())).is_empty());
        assert!(ApprovalChain::from_encoded_roles(None).is_empty());
        assert!(ApprovalChain::from_encoded_roles(Some(&[0xff, 0x00][..])).is_empty());
    }

    #[test]
    fn last_matching_assignment_wins() {
        let chain = ApprovalChain::from_roles(["advisor", "dean"]);
        let assignments = vec![assignment("dean"), assignment("librarian"), assignment("advisor")];

        assert_eq!(chain.authorize(&assignments), Ok(1));

        let reversed = vec![assignment("advisor"), assignment("dean")];
        assert_eq!(chain.authorize(&reversed), Ok(2));
    }

    #[test]
    fn hand_built_role_name_is_authorized() {
        let chain = ApprovalChain::from_roles(["dean"]);
        let spelled = RoleAssignment::new("FCSE", Role::Other("dean".into()));

        assert_eq!(chain.authorize(&[spelled]), Ok(1));
    }

    #[test]
    fn duplicate_roles_map_to_the_later_order() {
        let chain = ApprovalChain::from_roles(["advisor", "advisor"]);
        assert_eq!(chain.authorize(&[assignment("advisor")]), Ok(2));
    }

    #[test]
    fn no_matching_assignment_is_unauthorized() {
        let chain = ApprovalChain::from_roles(["advisor"]);

        assert_eq!(
            chain.authorize(&[assignment("dean")]),
            Err(ApprovalError::Unauthorized)
        );
        assert_eq!(chain.authorize(&[]), Err(ApprovalError::Unauthorized));
    }

    #[test]
    fn unknown_seat_is_unauthorized() {
        let mut chain = ApprovalChain::from_roles(["advisor"]);

        assert_eq!(chain.approve(7).unwrap_err(), ApprovalError::Unauthorized);
        assert_eq!(chain.disapprove(0).unwrap_err(), ApprovalError::Unauthorized);
    }

    #[test]
    fn approve_is_sequential() {
        let mut chain = ApprovalChain::from_roles(["advisor", "dean"]);

        assert_eq!(chain.approve(2).unwrap_err(), ApprovalError::PredecessorPending);
        assert!(chain.approve(1).unwrap().approved);
        assert!(chain.approve(2).unwrap().approved);
        assert_eq!(chain.approve(2).unwrap_err(), ApprovalError::AlreadyApproved);
        assert_eq!(chain.status(), FormStatus::Approved);
    }

    #[test]
    fn disapprove_skips_gating_and_clears_approval() {
        let mut chain = ApprovalChain::from_roles(["advisor", "dean"]);

        let entry = chain.disapprove(2).unwrap();
        assert!(entry.disapproved && !entry.approved);

        chain.approve(1).unwrap();
        let entry = chain.disapprove(1).unwrap();
        assert!(entry.disapproved && !entry.approved);

        assert_eq!(chain.disapprove(1).unwrap_err(), ApprovalError::AlreadyDisapproved);
        assert_eq!(chain.status(), FormStatus::Rejected);
    }

    #[test]
    fn reapproval_keeps_disapproved_flag() {
        let mut chain = ApprovalChain::from_roles(["advisor"]);
        chain.disapprove(1).unwrap();

        let entry = chain.approve(1).unwrap();
        assert!(entry.approved && entry.disapproved);
        // fully approved takes precedence over the stale disapproval
        assert_eq!(chain.status(), FormStatus::Approved);
    }

    #[test]
    fn empty_chain_is_approved() {
        let chain = ApprovalChain::from_roles(Vec::<String>::new());
        assert!(chain.all_approved());
        assert!(!chain.any_disapproved());
        assert_eq!(chain.status(), FormStatus::Approved);
    }

    #[test]
    fn ripeness_tracks_predecessor() {
        let mut chain = ApprovalChain::from_roles(["advisor", "dean"]);

        assert!(chain.is_ripe_for(&Role::Advisor));
        assert!(!chain.is_ripe_for(&Role::Dean));
        assert!(!chain.is_ripe_for(&Role::Other("hod".into())));

        chain.approve(1).unwrap();
        assert!(chain.is_ripe_for(&Role::Dean));
    }
}
