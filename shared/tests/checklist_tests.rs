//! Checklist tree invariants checked over generated lists.

use proptest::prelude::*;
use shared::checklist::*;
use shared::types::ChecklistItem;

/// Lists whose indents never jump more than one level, plus the occasional
/// orphan at the head.
fn checklist() -> impl Strategy<Value = Vec<ChecklistItem>> {
    (0u32..3, prop::collection::vec(0u32..4, 1..24)).prop_map(|(head, steps)| {
        let mut prev = head;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, step)| {
                let indent = if i == 0 { head } else { step.min(prev + 1) };
                prev = indent;
                ChecklistItem::new(format!("item-{i}"), indent)
            })
            .collect()
    })
}

/// Any indents at all, including skipped levels anywhere in the list.
fn ragged_checklist() -> impl Strategy<Value = Vec<ChecklistItem>> {
    prop::collection::vec(0u32..5, 1..24).prop_map(|indents| {
        indents
            .into_iter()
            .enumerate()
            .map(|(i, indent)| ChecklistItem::new(format!("item-{i}"), indent))
            .collect()
    })
}

fn checklist_with_index() -> impl Strategy<Value = (Vec<ChecklistItem>, usize)> {
    checklist().prop_flat_map(|items| {
        let len = items.len();
        (Just(items), 0..len)
    })
}

#[test]
fn example_scenario_from_three_items() {
    let mut items = vec![
        ChecklistItem::new("A", 0),
        ChecklistItem::new("B", 1),
        ChecklistItem::new("C", 1),
    ];

    set_completed(&mut items, 1, true).unwrap();
    set_completed(&mut items, 2, true).unwrap();
    assert!(items[0].completed);

    set_completed(&mut items, 1, false).unwrap();
    assert!(!items[0].completed);
    assert!(items[2].completed);
}

proptest! {
    #[test]
    fn top_level_items_have_no_parent((items, i) in checklist_with_index()) {
        if items[i].indent == 0 {
            prop_assert_eq!(find_parent_index(&items, i), None);
        }
    }

    #[test]
    fn parent_is_strictly_shallower((items, i) in checklist_with_index()) {
        if let Some(p) = find_parent_index(&items, i) {
            prop_assert!(p < i);
            prop_assert!(items[p].indent < items[i].indent);
            prop_assert!(subtree_range(&items, p).contains(&i));
        }
    }

    #[test]
    fn remove_shrinks_by_subtree_len((items, i) in checklist_with_index()) {
        let subtree = subtree_range(&items, i);
        let mut after = items.clone();
        let removed = remove_subtree(&mut after, i).unwrap();
        prop_assert_eq!(after.len(), items.len() - subtree.len());
        prop_assert_eq!(&removed[..], &items[subtree]);
    }

    #[test]
    fn drop_is_invalid_exactly_inside_subtree(
        (items, drag) in checklist_with_index(),
        drop in 0usize..24,
    ) {
        let inside = subtree_range(&items, drag).contains(&drop);
        prop_assert_eq!(is_invalid_drop_target(&items, drag, drop), inside);
    }

    #[test]
    fn move_keeps_block_intact(
        (items, from) in checklist_with_index(),
        target in 0usize..24,
    ) {
        let target = target % items.len();
        let block: Vec<ChecklistItem> = items[subtree_range(&items, from)].to_vec();
        let mut moved = items.clone();

        match move_subtree(&mut moved, from, Some(target)) {
            Ok(at) => {
                prop_assert_eq!(moved.len(), items.len());
                prop_assert_eq!(&moved[at..at + block.len()], &block[..]);
            }
            Err(TreeError::InvalidDrop { .. }) => {
                prop_assert!(is_invalid_drop_target(&items, from, target));
                prop_assert_eq!(moved, items);
            }
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }

    #[test]
    fn completing_all_children_completes_parent((items, i) in checklist_with_index()) {
        let children = find_child_indices(&items, i);
        prop_assume!(!children.is_empty());

        let mut list = items.clone();
        for &child in &children {
            set_completed(&mut list, child, true).unwrap();
        }
        prop_assert!(list[i].completed);

        set_completed(&mut list, children[0], false).unwrap();
        let mut ancestor = Some(i);
        while let Some(a) = ancestor {
            prop_assert!(!list[a].completed);
            ancestor = find_parent_index(&list, a);
        }
    }

    #[test]
    fn arena_round_trip_keeps_order((items, _) in checklist_with_index()) {
        let flat = ChecklistTree::from_items(&items).flatten();
        let before: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        let after: Vec<&str> = flat.iter().map(|i| i.id.as_str()).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn flat_and_arena_views_agree_on_links(items in ragged_checklist()) {
        let tree = ChecklistTree::from_items(&items);
        for (i, item) in items.iter().enumerate() {
            let node = tree.find(&item.id).unwrap();

            let parent = find_parent_index(&items, i).map(|p| items[p].id.as_str());
            let arena_parent = tree
                .parent_of(node)
                .and_then(|p| tree.get(p))
                .map(|n| n.item.id.as_str());
            prop_assert_eq!(parent, arena_parent);

            let children: Vec<&str> = find_child_indices(&items, i)
                .into_iter()
                .map(|c| items[c].id.as_str())
                .collect();
            let arena_children: Vec<&str> = tree
                .children_of(node)
                .iter()
                .filter_map(|&c| tree.get(c))
                .map(|n| n.item.id.as_str())
                .collect();
            prop_assert_eq!(children, arena_children);
        }
    }
}
