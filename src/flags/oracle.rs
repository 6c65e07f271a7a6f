use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-profile boolean override flags. Distinct bits; `None` is the
/// empty value and can never be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProfileFlag {
    None = 0,
    AutoStrum = 1 << 0,
    AutoPlay = 1 << 1,
}

impl ProfileFlag {
    pub fn bit(self) -> u8 {
        self as u8
    }

    /// Every storable flag, in bit order.
    pub fn all() -> [ProfileFlag; 2] {
        [ProfileFlag::AutoStrum, ProfileFlag::AutoPlay]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::AutoStrum => "AutoStrum",
            Self::AutoPlay => "AutoPlay",
        }
    }

    /// Case-insensitive name lookup.
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("none") {
            Some(Self::None)
        } else if name.eq_ignore_ascii_case("autostrum") {
            Some(Self::AutoStrum)
        } else if name.eq_ignore_ascii_case("autoplay") {
            Some(Self::AutoPlay)
        } else {
            None
        }
    }
}

/// Read-only flag capability the engine consults every tick.
///
/// Implementations may be mutated from other threads; each lookup must
/// observe a single consistent boolean.
pub trait FlagOracle: Send + Sync {
    /// Unconfigured profiles report false for every flag.
    fn is_flag_set(&self, profile_id: Uuid, flag: ProfileFlag) -> bool;
}

/// Thread-safe in-memory flag store. The engine reads it through
/// `FlagOracle`; the HTTP control plane and tests mutate it directly.
#[derive(Debug, Default)]
pub struct InMemoryFlagOracle {
    flags: RwLock<HashMap<Uuid, u8>>,
}

impl InMemoryFlagOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear one flag bit. Setting `None` is a no-op.
    pub fn set_flag(&self, profile_id: Uuid, flag: ProfileFlag, enabled: bool) {
        if flag == ProfileFlag::None {
            return;
        }
        let mut flags = self.flags.write().expect("flag store poisoned");
        let entry = flags.entry(profile_id).or_insert(0);
        if enabled {
            *entry |= flag.bit();
        } else {
            *entry &= !flag.bit();
        }
    }

    /// Every registered profile with its current flag bits.
    pub fn snapshot(&self) -> Vec<(Uuid, u8)> {
        let flags = self.flags.read().expect("flag store poisoned");
        let mut entries: Vec<(Uuid, u8)> = flags.iter().map(|(id, bits)| (*id, *bits)).collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}

impl FlagOracle for InMemoryFlagOracle {
    fn is_flag_set(&self, profile_id: Uuid, flag: ProfileFlag) -> bool {
        let flags = self.flags.read().expect("flag store poisoned");
        flags
            .get(&profile_id)
            .is_some_and(|bits| bits & flag.bit() != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_profile_reports_false() {
        let oracle = InMemoryFlagOracle::new();
        let profile = Uuid::new_v4();
        assert!(!oracle.is_flag_set(profile, ProfileFlag::AutoPlay));
        assert!(!oracle.is_flag_set(profile, ProfileFlag::AutoStrum));
    }

    #[test]
    fn set_and_clear_are_independent_bits() {
        let oracle = InMemoryFlagOracle::new();
        let profile = Uuid::new_v4();
        oracle.set_flag(profile, ProfileFlag::AutoPlay, true);
        assert!(oracle.is_flag_set(profile, ProfileFlag::AutoPlay));
        assert!(!oracle.is_flag_set(profile, ProfileFlag::AutoStrum));

        oracle.set_flag(profile, ProfileFlag::AutoStrum, true);
        oracle.set_flag(profile, ProfileFlag::AutoPlay, false);
        assert!(!oracle.is_flag_set(profile, ProfileFlag::AutoPlay));
        assert!(oracle.is_flag_set(profile, ProfileFlag::AutoStrum));
    }

    #[test]
    fn none_flag_is_never_stored() {
        let oracle = InMemoryFlagOracle::new();
        let profile = Uuid::new_v4();
        oracle.set_flag(profile, ProfileFlag::None, true);
        assert!(!oracle.is_flag_set(profile, ProfileFlag::None));
        assert!(oracle.snapshot().is_empty());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ProfileFlag::parse("autoplay"), Some(ProfileFlag::AutoPlay));
        assert_eq!(ProfileFlag::parse("AUTOSTRUM"), Some(ProfileFlag::AutoStrum));
        assert_eq!(ProfileFlag::parse("AutoPlay"), Some(ProfileFlag::AutoPlay));
        assert_eq!(ProfileFlag::parse("none"), Some(ProfileFlag::None));
        assert_eq!(ProfileFlag::parse("fastfall"), None);
    }

    #[test]
    fn snapshot_is_sorted_and_complete() {
        let oracle = InMemoryFlagOracle::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        oracle.set_flag(a, ProfileFlag::AutoPlay, true);
        oracle.set_flag(b, ProfileFlag::AutoStrum, true);
        let snapshot = oracle.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
