//! Per-pass hydration policy
//!
//! A render pass runs under one [`Strategy`] for its whole duration. The
//! strategy decides which effect tags survive to commit, whether handler props
//! are rewritten, and whether the commit talks to the host at all.

use trellis_core::{EffectTag, Strategy};

/// Strategy and hydration flag fixed at the start of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassMode {
    pub strategy: Strategy,
    /// New nodes attach to existing markup instead of being inserted
    pub hydrating: bool,
}

impl PassMode {
    pub fn new(strategy: Strategy, hydrating: bool) -> Self {
        Self {
            strategy,
            hydrating,
        }
    }

    /// Tag for a node with no counterpart in the committed tree
    pub fn placement(&self) -> EffectTag {
        EffectTag::for_new_node(self.hydrating)
    }

    /// Drop host work outside islands under `Selective`
    pub fn gate(&self, tag: EffectTag, in_island: bool) -> EffectTag {
        if self.strategy.gates_islands() && !in_island {
            tag.difference(EffectTag::HOST_WORK)
        } else {
            tag
        }
    }

    /// Whether removing a node outside or inside an island reaches the host
    pub fn emits_deletion(&self, in_island: bool) -> bool {
        !self.strategy.gates_islands() || in_island
    }

    /// Commit sends nothing to the host
    pub fn is_dry_run(&self) -> bool {
        !self.strategy.emits_mutations()
    }

    pub fn allows_suspense(&self) -> bool {
        self.strategy.allows_suspense()
    }

    pub fn rewrites_listeners(&self) -> bool {
        self.strategy.rewrites_listeners()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_tag_follows_hydration() {
        assert_eq!(PassMode::new(Strategy::Full, false).placement(), EffectTag::PLACEMENT);
        assert!(PassMode::new(Strategy::Full, true)
            .placement()
            .is_hydrating_update());
    }

    #[test]
    fn test_selective_gates_outside_islands() {
        let mode = PassMode::new(Strategy::Selective, true);
        let tag = mode.placement() | EffectTag::LIFECYCLE;
        assert_eq!(mode.gate(tag, false), EffectTag::LIFECYCLE);
        assert_eq!(mode.gate(tag, true), tag);
        assert!(!mode.emits_deletion(false));
        assert!(mode.emits_deletion(true));

        let full = PassMode::new(Strategy::Full, false);
        assert_eq!(full.gate(EffectTag::UPDATE, false), EffectTag::UPDATE);
    }

    #[test]
    fn test_resumable_is_dry() {
        let mode = PassMode::new(Strategy::Resumable, true);
        assert!(mode.is_dry_run());
        assert!(mode.rewrites_listeners());
        assert!(mode.allows_suspense());
        assert!(!PassMode::new(Strategy::Progressive, false).is_dry_run());
    }
}
