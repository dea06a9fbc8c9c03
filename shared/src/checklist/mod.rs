//! Flat checklists with indent-implied nesting.
//!
//! The list is stored flat so drag-and-drop is a slice move; the tree is
//! implied by indents. [`tree`] works on the flat list directly and
//! [`arena`] builds an explicit tree when parent/child links are needed.

pub mod arena;
pub mod tree;

pub use self::arena::{ChecklistTree, Node, NodeId};
pub use self::tree::{
    TreeError, completion_progress, find_child_indices, find_parent_index, indent_item,
    is_invalid_drop_target, move_subtree, outdent_item, remove_subtree, set_completed,
    subtree_range, top_level_groups,
};
