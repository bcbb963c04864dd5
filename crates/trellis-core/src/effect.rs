//! Effect tags describing the host work a node needs at commit

use bitflags::bitflags;

bitflags! {
    /// Pending work recorded on a node during reconciliation.
    ///
    /// A hydrating node is tagged `HYDRATE | UPDATE` and is emitted as a
    /// hydration record rather than an update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EffectTag: u8 {
        /// New node; must be materialized in the host tree.
        const PLACEMENT = 1 << 0;
        /// Props changed on a reused node.
        const UPDATE = 1 << 1;
        /// Node is scheduled for removal.
        const DELETION = 1 << 2;
        /// Node attaches to markup already present in the host.
        const HYDRATE = 1 << 3;
        /// A ref hook was mounted on this node.
        const REF = 1 << 4;
        /// Lifecycle effects are queued on this node.
        const LIFECYCLE = 1 << 5;
    }
}

impl EffectTag {
    /// Tags that produce a host mutation record
    pub const HOST_WORK: EffectTag = EffectTag::PLACEMENT
        .union(EffectTag::UPDATE)
        .union(EffectTag::HYDRATE);

    /// Check whether any host mutation is pending
    pub fn has_host_work(self) -> bool {
        self.intersects(Self::HOST_WORK)
    }

    /// Whether this node hydrates existing markup
    pub fn is_hydrating_update(self) -> bool {
        self.contains(EffectTag::HYDRATE | EffectTag::UPDATE)
    }

    /// Tag for a node that has no alternate
    pub fn for_new_node(hydrating: bool) -> Self {
        if hydrating {
            EffectTag::HYDRATE | EffectTag::UPDATE
        } else {
            EffectTag::PLACEMENT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_tags() {
        assert_eq!(EffectTag::for_new_node(false), EffectTag::PLACEMENT);
        assert!(EffectTag::for_new_node(true).is_hydrating_update());
    }

    #[test]
    fn test_host_work() {
        assert!(!EffectTag::empty().has_host_work());
        assert!(!EffectTag::LIFECYCLE.has_host_work());
        assert!((EffectTag::REF | EffectTag::UPDATE).has_host_work());
        assert!(!EffectTag::UPDATE.is_hydrating_update());
    }
}
