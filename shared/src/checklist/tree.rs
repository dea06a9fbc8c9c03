use std::ops::Range;

use thiserror::Error;
use tracing::debug;

use crate::types::checklist::ChecklistItem;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("Index {index} out of bounds for checklist of {len} items")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cannot drop item {drag} inside its own subtree (at {drop})")]
    InvalidDrop { drag: usize, drop: usize },
}

fn check_index(items: &[ChecklistItem], index: usize) -> Result<(), TreeError> {
    if index < items.len() {
        Ok(())
    } else {
        Err(TreeError::IndexOutOfBounds {
            index,
            len: items.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Nearest preceding item with a strictly lower indent.
///
/// `None` for top-level items, for orphans with no lower-indented item before
/// them, and for out-of-range indices.
pub fn find_parent_index(items: &[ChecklistItem], index: usize) -> Option<usize> {
    let indent = items.get(index)?.indent;
    if indent == 0 {
        return None;
    }
    items[..index].iter().rposition(|item| item.indent < indent)
}

/// Direct children of `parent`: the items in its subtree whose
/// [`find_parent_index`] is `parent`.
///
/// In a list that never skips a level these are exactly the items one level
/// deeper. When a level is skipped (`A:0, B:2, C:1`) both `B` and `C` are
/// children of `A`, matching [`ChecklistTree`](super::ChecklistTree).
pub fn find_child_indices(items: &[ChecklistItem], parent: usize) -> Vec<usize> {
    // shallowest indent seen so far inside the block
    let mut floor = u32::MAX;
    subtree_range(items, parent)
        .skip(1)
        .filter(|&i| {
            let indent = items[i].indent;
            let direct = indent <= floor;
            floor = floor.min(indent);
            direct
        })
        .collect()
}

/// The contiguous block made of `index` and every following item with a
/// strictly greater indent.
///
/// Out-of-range indices give an empty range at the end of the list.
pub fn subtree_range(items: &[ChecklistItem], index: usize) -> Range<usize> {
    let Some(root) = items.get(index) else {
        return items.len()..items.len();
    };
    let end = items[index + 1..]
        .iter()
        .position(|item| item.indent <= root.indent)
        .map_or(items.len(), |offset| index + 1 + offset);
    index..end
}

/// Split the list into top-level groups. An orphan (indented item with no
/// lower-indented item before it) starts a group of its own.
pub fn top_level_groups(items: &[ChecklistItem]) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < items.len() {
        let group = subtree_range(items, start);
        start = group.end;
        groups.push(group);
    }
    groups
}

/// True when `drop` falls inside the subtree being dragged, the item itself
/// included. Such a drop would make an item its own ancestor.
pub fn is_invalid_drop_target(items: &[ChecklistItem], drag: usize, drop: usize) -> bool {
    subtree_range(items, drag).contains(&drop)
}

// ---------------------------------------------------------------------------
// Structural edits
// ---------------------------------------------------------------------------

/// Remove `index` together with its descendants, returning the removed block.
pub fn remove_subtree(
    items: &mut Vec<ChecklistItem>,
    index: usize,
) -> Result<Vec<ChecklistItem>, TreeError> {
    check_index(items, index)?;
    let range = subtree_range(items, index);
    debug!("Removing checklist block {:?}", range);
    Ok(items.drain(range).collect())
}

/// Move the block rooted at `from` so it lands right after the whole subtree
/// of `target`, or at the head of the list when `target` is `None`.
///
/// The block keeps its internal order and indents. Returns the index the
/// block's root ends up at.
pub fn move_subtree(
    items: &mut Vec<ChecklistItem>,
    from: usize,
    target: Option<usize>,
) -> Result<usize, TreeError> {
    check_index(items, from)?;
    let block = subtree_range(items, from);

    let insert_at = match target {
        None => 0,
        Some(target) => {
            check_index(items, target)?;
            if block.contains(&target) {
                return Err(TreeError::InvalidDrop {
                    drag: from,
                    drop: target,
                });
            }
            let after_target = subtree_range(items, target).end;
            // A target after the block shifts left once the block is cut out.
            if after_target > block.start {
                after_target - block.len()
            } else {
                after_target
            }
        }
    };

    let moved: Vec<ChecklistItem> = items.drain(block.clone()).collect();
    debug!(
        "Moving checklist block {:?} ({} items) to {}",
        block,
        moved.len(),
        insert_at
    );
    items.splice(insert_at..insert_at, moved);
    Ok(insert_at)
}

/// Indent `index` and its subtree by one level. An item may be at most one
/// level deeper than the item before it; returns whether anything changed.
pub fn indent_item(items: &mut [ChecklistItem], index: usize) -> Result<bool, TreeError> {
    check_index(items, index)?;
    if index == 0 || items[index].indent > items[index - 1].indent {
        return Ok(false);
    }
    for i in subtree_range(items, index) {
        items[i].indent += 1;
    }
    Ok(true)
}

/// Outdent `index` and its subtree by one level; top-level items stay put.
pub fn outdent_item(items: &mut [ChecklistItem], index: usize) -> Result<bool, TreeError> {
    check_index(items, index)?;
    if items[index].indent == 0 {
        return Ok(false);
    }
    for i in subtree_range(items, index) {
        items[i].indent = items[i].indent.saturating_sub(1);
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Set the completed flag of `index` and keep ancestors consistent.
///
/// The flag is applied to the whole subtree of `index`. Completing then walks
/// upward, completing each ancestor only while all of its direct children are
/// complete. Un-completing marks every ancestor incomplete.
pub fn set_completed(
    items: &mut [ChecklistItem],
    index: usize,
    completed: bool,
) -> Result<(), TreeError> {
    check_index(items, index)?;
    for i in subtree_range(items, index) {
        items[i].completed = completed;
    }

    let mut current = index;
    while let Some(parent) = find_parent_index(items, current) {
        if completed {
            let all_done = find_child_indices(items, parent)
                .into_iter()
                .all(|child| items[child].completed);
            if !all_done {
                break;
            }
        }
        items[parent].completed = completed;
        current = parent;
    }
    Ok(())
}

/// `(completed, total)` over every item.
pub fn completion_progress(items: &[ChecklistItem]) -> (usize, usize) {
    let done = items.iter().filter(|item| item.completed).count();
    (done, items.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(rows: &[(&str, u32)]) -> Vec<ChecklistItem> {
        rows.iter()
            .map(|(id, indent)| ChecklistItem::new(*id, *indent))
            .collect()
    }

    fn ids(items: &[ChecklistItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn parent_of_nested_item() {
        let list = items(&[("A", 0), ("B", 1), ("C", 2), ("D", 1)]);
        assert_eq!(find_parent_index(&list, 0), None);
        assert_eq!(find_parent_index(&list, 2), Some(1));
        assert_eq!(find_parent_index(&list, 3), Some(0));
        assert_eq!(find_parent_index(&list, 9), None);
    }

    #[test]
    fn orphan_has_no_parent_and_forms_own_group() {
        let list = items(&[("X", 2), ("Y", 3), ("A", 0), ("B", 1)]);
        assert_eq!(find_parent_index(&list, 0), None);
        assert_eq!(find_parent_index(&list, 1), Some(0));
        assert_eq!(top_level_groups(&list), vec![0..2, 2..4]);
    }

    #[test]
    fn children_skip_grandchildren() {
        let list = items(&[("A", 0), ("B", 1), ("C", 2), ("D", 1), ("E", 0)]);
        assert_eq!(find_child_indices(&list, 0), vec![1, 3]);
        assert_eq!(find_child_indices(&list, 1), vec![2]);
        assert!(find_child_indices(&list, 4).is_empty());
    }

    #[test]
    fn skipped_level_still_counts_as_child() {
        let list = items(&[("A", 0), ("B", 2), ("C", 1), ("D", 2)]);
        assert_eq!(find_parent_index(&list, 1), Some(0));
        assert_eq!(find_child_indices(&list, 0), vec![1, 2]);
        assert_eq!(find_child_indices(&list, 2), vec![3]);
    }

    #[test]
    fn skipped_level_child_blocks_parent_completion() {
        let mut list = items(&[("A", 0), ("B", 2), ("C", 1)]);
        set_completed(&mut list, 2, true).unwrap();
        assert!(!list[0].completed);

        set_completed(&mut list, 1, true).unwrap();
        assert!(list.iter().all(|i| i.completed));
    }

    #[test]
    fn subtree_stops_at_sibling() {
        let list = items(&[("A", 0), ("B", 1), ("C", 2), ("D", 1), ("E", 0)]);
        assert_eq!(subtree_range(&list, 0), 0..4);
        assert_eq!(subtree_range(&list, 1), 1..3);
        assert_eq!(subtree_range(&list, 4), 4..5);
        assert!(subtree_range(&list, 7).is_empty());
    }

    #[test]
    fn move_block_after_later_target() {
        let mut list = items(&[("A", 0), ("B", 1), ("C", 0), ("D", 1), ("E", 0)]);
        let at = move_subtree(&mut list, 0, Some(2)).unwrap();
        assert_eq!(at, 2);
        assert_eq!(ids(&list), vec!["C", "D", "A", "B", "E"]);
    }

    #[test]
    fn move_block_after_earlier_target() {
        let mut list = items(&[("A", 0), ("B", 1), ("C", 0), ("D", 0), ("E", 1)]);
        let at = move_subtree(&mut list, 3, Some(0)).unwrap();
        assert_eq!(at, 2);
        assert_eq!(ids(&list), vec!["A", "B", "D", "E", "C"]);
    }

    #[test]
    fn move_block_to_head() {
        let mut list = items(&[("A", 0), ("B", 0), ("C", 1)]);
        move_subtree(&mut list, 1, None).unwrap();
        assert_eq!(ids(&list), vec!["B", "C", "A"]);
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let mut list = items(&[("A", 0), ("B", 1), ("C", 0)]);
        let err = move_subtree(&mut list, 0, Some(1)).unwrap_err();
        assert_eq!(err, TreeError::InvalidDrop { drag: 0, drop: 1 });
        assert_eq!(ids(&list), vec!["A", "B", "C"]);
    }

    #[test]
    fn remove_takes_whole_block() {
        let mut list = items(&[("A", 0), ("B", 1), ("C", 2), ("D", 0)]);
        let removed = remove_subtree(&mut list, 1).unwrap();
        assert_eq!(ids(&removed), vec!["B", "C"]);
        assert_eq!(ids(&list), vec!["A", "D"]);
        assert!(remove_subtree(&mut list, 5).is_err());
    }

    #[test]
    fn indent_limited_to_one_level_below_previous() {
        let mut list = items(&[("A", 0), ("B", 0), ("C", 1)]);
        assert!(!indent_item(&mut list, 0).unwrap());
        assert!(indent_item(&mut list, 1).unwrap());
        assert_eq!(list[1].indent, 1);
        assert_eq!(list[2].indent, 2);
        assert!(!indent_item(&mut list, 1).unwrap());
    }

    #[test]
    fn outdent_carries_subtree() {
        let mut list = items(&[("A", 0), ("B", 1), ("C", 2)]);
        assert!(outdent_item(&mut list, 1).unwrap());
        assert_eq!(list[1].indent, 0);
        assert_eq!(list[2].indent, 1);
        assert!(!outdent_item(&mut list, 0).unwrap());
    }

    #[test]
    fn completion_cascades_up_with_and_semantics() {
        let mut list = items(&[("A", 0), ("B", 1), ("C", 1)]);

        set_completed(&mut list, 1, true).unwrap();
        assert!(!list[0].completed);

        set_completed(&mut list, 2, true).unwrap();
        assert!(list[0].completed);

        set_completed(&mut list, 1, false).unwrap();
        assert!(!list[0].completed);
        assert!(list[2].completed);
    }

    #[test]
    fn uncompleting_deep_leaf_clears_whole_chain() {
        let mut list = items(&[("A", 0), ("B", 1), ("C", 2)]);
        set_completed(&mut list, 2, true).unwrap();
        assert!(list.iter().all(|i| i.completed));

        set_completed(&mut list, 2, false).unwrap();
        assert!(list.iter().all(|i| !i.completed));
    }

    #[test]
    fn completing_parent_completes_descendants() {
        let mut list = items(&[("A", 0), ("B", 1), ("C", 2), ("D", 0)]);
        set_completed(&mut list, 0, true).unwrap();
        assert_eq!(completion_progress(&list), (3, 4));
    }
}
