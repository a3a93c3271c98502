//! Capability grants and resolution.
//!
//! A [`PrivilegeMap`] maps capability names to sets of holder masks. A
//! holder string that is itself the name of a capability delegates: anyone
//! holding `ops` also holds `admin` if `ops` is listed among `admin`'s
//! holders. Resolution walks those delegations with a visited set so cycles
//! terminate.
//!
//! [`AuthMap`] is the global map plus lazily created per-channel maps.

use serde::{Deserialize, Serialize};
use slbot_proto::{Identity, Mask};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, trace};

/// Capability name to holder masks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivilegeMap {
    grants: BTreeMap<String, BTreeSet<Mask>>,
}

impl PrivilegeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `mask` to the holders of `capability`.
    pub fn grant(&mut self, mask: impl Into<Mask>, capability: &str) -> bool {
        let mask = mask.into();
        debug!(capability, mask = %mask, "grant");
        self.grants
            .entry(capability.to_owned())
            .or_default()
            .insert(mask)
    }

    /// Remove `mask` from the holders of `capability`. Absent masks are a no-op.
    pub fn revoke(&mut self, mask: &str, capability: &str) -> bool {
        let Some(holders) = self.grants.get_mut(capability) else {
            return false;
        };
        let removed = holders.remove(&Mask::parse(mask));
        if holders.is_empty() {
            self.grants.remove(capability);
        }
        if removed {
            debug!(capability, mask, "revoke");
        }
        removed
    }

    /// The masks directly listed for `capability`.
    pub fn who_has(&self, capability: &str) -> impl Iterator<Item = &Mask> {
        self.grants.get(capability).into_iter().flatten()
    }

    /// Every capability with at least one holder.
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Whether `identity` holds `capability`, directly or by delegation.
    ///
    /// Each capability is expanded at most once, so delegation cycles
    /// resolve to `false` unless some mask on the cycle matches.
    pub fn holds(&self, identity: &Identity, capability: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![capability];

        while let Some(cap) = stack.pop() {
            if !visited.insert(cap) {
                continue;
            }
            let Some(holders) = self.grants.get(cap) else {
                continue;
            };
            if holders.iter().any(|m| m.matches(identity)) {
                trace!(capability, via = cap, nick = %identity.nick, "capability granted");
                return true;
            }
            stack.extend(
                holders
                    .iter()
                    .map(Mask::as_str)
                    .filter(|h| !visited.contains(h)),
            );
        }
        false
    }
}

/// Global privileges plus per-channel privileges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMap {
    #[serde(default)]
    pub global: PrivilegeMap,
    #[serde(default)]
    pub channels: BTreeMap<String, PrivilegeMap>,
}

impl AuthMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, mask: impl Into<Mask>, capability: &str) -> bool {
        self.global.grant(mask, capability)
    }

    pub fn revoke(&mut self, mask: &str, capability: &str) -> bool {
        self.global.revoke(mask, capability)
    }

    pub fn holds(&self, user: &str, capability: &str) -> bool {
        self.global.holds(&Identity::parse(user), capability)
    }

    pub fn who_has(&self, capability: &str) -> Vec<&Mask> {
        self.global.who_has(capability).collect()
    }

    /// The map for `channel`, created empty on first use.
    pub fn channel_mut(&mut self, channel: &str) -> &mut PrivilegeMap {
        self.channels.entry(channel.to_owned()).or_default()
    }

    pub fn channel(&self, channel: &str) -> Option<&PrivilegeMap> {
        self.channels.get(channel)
    }

    pub fn grant_in(&mut self, channel: &str, mask: impl Into<Mask>, capability: &str) -> bool {
        self.channel_mut(channel).grant(mask, capability)
    }

    pub fn revoke_in(&mut self, channel: &str, mask: &str, capability: &str) -> bool {
        self.channel_mut(channel).revoke(mask, capability)
    }

    /// Channel-scoped check; global grants are not consulted.
    pub fn holds_in(&self, channel: &str, user: &str, capability: &str) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|c| c.holds(&Identity::parse(user), capability))
    }

    pub fn who_has_in(&self, channel: &str, capability: &str) -> Vec<&Mask> {
        self.channels
            .get(channel)
            .map(|c| c.who_has(capability).collect())
            .unwrap_or_default()
    }

    /// A copy without empty channel maps, suitable for persisting.
    pub fn compacted(&self) -> Self {
        Self {
            global: self.global.clone(),
            channels: self
                .channels
                .iter()
                .filter(|(_, m)| !m.is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}
