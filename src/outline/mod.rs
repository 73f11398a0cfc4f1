//! Hierarchical section model: dotted indices, the validated tree, and its
//! persisted form.

mod index;
pub mod serializer;
mod tree;

pub use index::SectionIndex;
pub use serializer::{load_outline, save_outline, OutlineDocument};
pub use tree::Outline;

#[cfg(test)]
pub(crate) use serializer::SectionNode;
#[cfg(test)]
pub(crate) use tree::tests::node as test_node;
