//! Release group reputation table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use streamscout_core::config::GroupAdjustments;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupTier {
    Trusted,
    Good,
    Poor,
    /// Known for fakes, malware or mislabeled encodes
    Banned,
}

const TRUSTED: &[&str] = &["FraMeSToR", "SPARKS", "FLUX", "NTb", "DON", "EPSiLON", "HiFi", "CtrlHD"];
const GOOD: &[&str] = &["RARBG", "PSA", "SubsPlease", "NTG", "TEPES", "playWEB", "Erai-raws"];
const POOR: &[&str] = &["YIFY", "YTS", "EVO", "MeGusta", "aXXo"];
const BANNED: &[&str] = &["MkvCage", "NAHOM", "KiNGDOM"];

/// Case-insensitive lookup from release group to reputation tier.
#[derive(Debug, Clone)]
pub struct GroupReputation {
    groups: HashMap<String, GroupTier>,
}

impl Default for GroupReputation {
    fn default() -> Self {
        let mut reputation = Self::empty();
        for (names, tier) in [
            (TRUSTED, GroupTier::Trusted),
            (GOOD, GroupTier::Good),
            (POOR, GroupTier::Poor),
            (BANNED, GroupTier::Banned),
        ] {
            for name in names {
                reputation.insert(name, tier);
            }
        }
        reputation
    }
}

impl GroupReputation {
    /// Table without any known group.
    pub fn empty() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    pub fn with_group(mut self, name: &str, tier: GroupTier) -> Self {
        self.insert(name, tier);
        self
    }

    pub fn insert(&mut self, name: &str, tier: GroupTier) {
        self.groups.insert(name.to_lowercase(), tier);
    }

    pub fn tier(&self, group: &str) -> Option<GroupTier> {
        self.groups.get(&group.to_lowercase()).copied()
    }

    /// Ordering adjustment for `group`; lower ranks first, unknown is 0.
    pub fn adjustment(&self, group: Option<&str>, adjustments: &GroupAdjustments) -> i32 {
        match group.and_then(|group| self.tier(group)) {
            Some(GroupTier::Trusted) => adjustments.trusted,
            Some(GroupTier::Good) => adjustments.good,
            Some(GroupTier::Poor) => adjustments.poor,
            Some(GroupTier::Banned) => adjustments.banned,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let reputation = GroupReputation::default();

        assert_eq!(reputation.tier("sparks"), Some(GroupTier::Trusted));
        assert_eq!(reputation.tier("YTS"), Some(GroupTier::Poor));
        assert_eq!(reputation.tier("nobody"), None);
    }

    #[test]
    fn test_adjustments_follow_tiers() {
        let adjustments = GroupAdjustments::default();
        let reputation = GroupReputation::empty().with_group("Scam", GroupTier::Banned);

        assert_eq!(reputation.adjustment(Some("SCAM"), &adjustments), 100);
        assert_eq!(reputation.adjustment(Some("other"), &adjustments), 0);
        assert_eq!(reputation.adjustment(None, &adjustments), 0);
        assert_eq!(
            GroupReputation::default().adjustment(Some("FLUX"), &adjustments),
            -50
        );
    }
}
