//! The caller-owned extension chain and the static block registry.
//!
//! Query entry points hand over a singly linked list of typed capability
//! blocks. The chain's topology belongs to the caller: the patcher may
//! rewrite a node's payload but never unlink, reorder, or insert nodes. Here
//! the chain is a sum type, so a payload overwrite structurally cannot touch
//! the link: preserving the next pointer across the overwrite is a type-level
//! guarantee instead of a runtime step.

use crate::blocks::{
    DepthStencilResolveProperties, DescriptorIndexingFeatures, Maintenance3Properties,
    PortabilityFeatures, ShaderFloat16Int8Features,
};

/// Type tag identifying a chained capability block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockTag {
    DescriptorIndexing,
    ShaderFloat16Int8,
    DepthStencilResolve,
    Maintenance3,
    Portability,
}

/// Payload of one chain node.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockPayload {
    DescriptorIndexing(DescriptorIndexingFeatures),
    ShaderFloat16Int8(ShaderFloat16Int8Features),
    DepthStencilResolve(DepthStencilResolveProperties),
    Maintenance3(Maintenance3Properties),
    Portability(PortabilityFeatures),
}

impl BlockPayload {
    pub fn tag(&self) -> BlockTag {
        match self {
            BlockPayload::DescriptorIndexing(_) => BlockTag::DescriptorIndexing,
            BlockPayload::ShaderFloat16Int8(_) => BlockTag::ShaderFloat16Int8,
            BlockPayload::DepthStencilResolve(_) => BlockTag::DepthStencilResolve,
            BlockPayload::Maintenance3(_) => BlockTag::Maintenance3,
            BlockPayload::Portability(_) => BlockTag::Portability,
        }
    }
}

/// One node of the caller-owned capability chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainNode {
    pub payload: BlockPayload,
    pub next: Option<Box<ChainNode>>,
}

impl ChainNode {
    pub fn new(payload: BlockPayload) -> Self {
        Self { payload, next: None }
    }

    /// Link a list of payloads into a chain, head first.
    ///
    /// Convenience for callers and tests that assemble query structures; the
    /// patcher itself never builds nodes.
    pub fn link(payloads: Vec<BlockPayload>) -> Option<Box<ChainNode>> {
        let mut head: Option<Box<ChainNode>> = None;
        for payload in payloads.into_iter().rev() {
            head = Some(Box::new(ChainNode { payload, next: head }));
        }
        head
    }
}

/// Which profile sub-section addresses a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionKind {
    Features,
    Properties,
}

/// Registry entry tying a block tag to its governing capability and its
/// profile section name.
pub struct BlockSpec {
    pub tag: BlockTag,
    /// Extension whose activation allows the block to be surfaced.
    pub capability: &'static str,
    pub kind: SectionKind,
    pub section: &'static str,
}

/// Static registry over the closed set of chainable blocks.
///
/// Shared by the loader (section-name dispatch) and the patcher (activation
/// lookup). Tags missing from this table are left untouched at patch time.
pub const BLOCK_SPECS: &[BlockSpec] = &[
    BlockSpec {
        tag: BlockTag::DescriptorIndexing,
        capability: "ext_descriptor_indexing",
        kind: SectionKind::Features,
        section: "descriptor_indexing",
    },
    BlockSpec {
        tag: BlockTag::ShaderFloat16Int8,
        capability: "ext_shader_float16_int8",
        kind: SectionKind::Features,
        section: "shader_float16_int8",
    },
    BlockSpec {
        tag: BlockTag::DepthStencilResolve,
        capability: "ext_depth_stencil_resolve",
        kind: SectionKind::Properties,
        section: "depth_stencil_resolve",
    },
    BlockSpec {
        tag: BlockTag::Maintenance3,
        capability: "ext_maintenance3",
        kind: SectionKind::Properties,
        section: "maintenance3",
    },
    BlockSpec {
        tag: BlockTag::Portability,
        capability: "ext_portability_subset",
        kind: SectionKind::Features,
        section: "portability_subset",
    },
];

pub fn spec_for_tag(tag: BlockTag) -> Option<&'static BlockSpec> {
    BLOCK_SPECS.iter().find(|spec| spec.tag == tag)
}

pub fn spec_for_section(kind: SectionKind, section: &str) -> Option<&'static BlockSpec> {
    BLOCK_SPECS
        .iter()
        .find(|spec| spec.kind == kind && spec.section == section)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_is_registered() {
        for payload in [
            BlockPayload::DescriptorIndexing(Default::default()),
            BlockPayload::ShaderFloat16Int8(Default::default()),
            BlockPayload::DepthStencilResolve(Default::default()),
            BlockPayload::Maintenance3(Default::default()),
            BlockPayload::Portability(Default::default()),
        ] {
            assert!(spec_for_tag(payload.tag()).is_some());
        }
    }

    #[test]
    fn section_lookup_respects_kind() {
        assert!(spec_for_section(SectionKind::Features, "descriptor_indexing").is_some());
        assert!(spec_for_section(SectionKind::Properties, "descriptor_indexing").is_none());
        assert!(spec_for_section(SectionKind::Properties, "maintenance3").is_some());
        assert!(spec_for_section(SectionKind::Features, "core").is_none());
    }

    #[test]
    fn link_builds_head_first() {
        let chain = ChainNode::link(vec![
            BlockPayload::Maintenance3(Default::default()),
            BlockPayload::Portability(Default::default()),
        ])
        .expect("non-empty chain");
        assert_eq!(chain.payload.tag(), BlockTag::Maintenance3);
        let second = chain.next.as_ref().expect("two nodes");
        assert_eq!(second.payload.tag(), BlockTag::Portability);
        assert!(second.next.is_none());
    }
}
