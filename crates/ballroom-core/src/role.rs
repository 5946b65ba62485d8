//! Roles and dancer identities
//!
//! Leaders and followers run the same protocol; the only asymmetry is
//! [`RELEASER`]. Everything per-role lives in a [`PerRole`] so code selects
//! "mine" and "theirs" by lookup instead of duplicating branches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two symmetric populations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Leads the dance and, by convention, releases the floor.
    Leader,
    /// Follows the dance.
    Follower,
}

/// The role that releases the floor after every dance.
///
/// Exactly one member of a match may release, otherwise a single
/// acquisition could be returned twice. This is fixed, not negotiated.
pub const RELEASER: Role = Role::Leader;

impl Role {
    /// Both roles, leaders first.
    pub const ALL: [Role; 2] = [Role::Leader, Role::Follower];

    /// The partner role.
    pub fn opposite(self) -> Self {
        match self {
            Role::Leader => Role::Follower,
            Role::Follower => Role::Leader,
        }
    }

    /// Whether this role hands the floor back after the rendezvous.
    pub fn is_releaser(self) -> bool {
        self == RELEASER
    }

    /// Lowercase name used in logs and config keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Leader => "leader",
            Role::Follower => "follower",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Identity of a single actor: its role and its index within that role.
///
/// Displays as `1, 2, 3, ...` for leaders and `a, b, ..., z, aa, ab, ...`
/// for followers so interleaved log lines stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DancerId {
    /// Role held for the whole lifetime of the actor
    pub role: Role,
    /// Zero-based index within the role's population
    pub index: usize,
}

impl DancerId {
    /// Create a dancer identity.
    pub fn new(role: Role, index: usize) -> Self {
        Self { role, index }
    }

    /// Human-readable label.
    pub fn label(&self) -> String {
        match self.role {
            Role::Leader => (self.index + 1).to_string(),
            Role::Follower => alphabetic_label(self.index),
        }
    }
}

impl fmt::Display for DancerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.label())
    }
}

/// Bijective base-26: 0 -> a, 25 -> z, 26 -> aa.
fn alphabetic_label(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'a' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// A value per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerRole<T> {
    /// Leader-side value
    pub leader: T,
    /// Follower-side value
    pub follower: T,
}

impl<T> PerRole<T> {
    /// Build from explicit values.
    pub fn new(leader: T, follower: T) -> Self {
        Self { leader, follower }
    }

    /// Build by calling `f` once per role.
    pub fn from_fn(mut f: impl FnMut(Role) -> T) -> Self {
        Self {
            leader: f(Role::Leader),
            follower: f(Role::Follower),
        }
    }

    /// Value for `role`.
    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::Leader => &self.leader,
            Role::Follower => &self.follower,
        }
    }

    /// Mutable value for `role`.
    pub fn get_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::Leader => &mut self.leader,
            Role::Follower => &mut self.follower,
        }
    }

    /// Map both values.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerRole<U> {
        PerRole {
            leader: f(self.leader),
            follower: f(self.follower),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for role in Role::ALL {
            assert_ne!(role, role.opposite());
            assert_eq!(role, role.opposite().opposite());
        }
    }

    #[test]
    fn test_single_releaser() {
        let releasers = Role::ALL.iter().filter(|r| r.is_releaser()).count();
        assert_eq!(releasers, 1);
        assert!(Role::Leader.is_releaser());
    }

    #[test]
    fn test_display_honours_width() {
        assert_eq!(format!("{:<9}|", Role::Leader), "leader   |");
        assert_eq!(format!("{:>8}|", Role::Follower), "follower|");
        assert_eq!(format!("{:<4}|", DancerId::new(Role::Follower, 26)), "aa  |");
    }

    #[test]
    fn test_dancer_labels() {
        assert_eq!(DancerId::new(Role::Leader, 0).to_string(), "1");
        assert_eq!(DancerId::new(Role::Leader, 11).to_string(), "12");
        assert_eq!(DancerId::new(Role::Follower, 0).to_string(), "a");
        assert_eq!(DancerId::new(Role::Follower, 4).to_string(), "e");
        assert_eq!(DancerId::new(Role::Follower, 25).to_string(), "z");
        assert_eq!(DancerId::new(Role::Follower, 26).to_string(), "aa");
        assert_eq!(DancerId::new(Role::Follower, 27).to_string(), "ab");
        assert_eq!(DancerId::new(Role::Follower, 26 * 27).to_string(), "aaa");
    }

    #[test]
    fn test_per_role_lookup() {
        let mut counts = PerRole::new(1u32, 2u32);
        *counts.get_mut(Role::Follower) += 3;
        assert_eq!(*counts.get(Role::Leader), 1);
        assert_eq!(*counts.get(Role::Follower), 5);

        let labels = PerRole::from_fn(|role| role.to_string());
        assert_eq!(labels.leader, "leader");
        assert_eq!(labels.map(|s| s.len()).follower, 8);
    }
}
