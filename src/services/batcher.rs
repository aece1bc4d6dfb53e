//! 发布分批 - 业务能力层
//!
//! 按顺序把顶层子树装入批次，每批节点总数（含后代）不超过上限。
//! 单个子树本身超过上限时单独成批，不拆分也不丢弃。

use crate::models::{OutlineNode, PublishBatch};

/// 把大纲森林按节点数上限分批
pub fn batch(forest: Vec<OutlineNode>, cap: usize) -> Vec<PublishBatch> {
    let cap = cap.max(1);
    let mut batches = Vec::new();
    let mut current = PublishBatch::default();
    let mut current_count = 0;

    for node in forest {
        let count = node.node_count();
        if !current.is_empty() && current_count + count > cap {
            batches.push(std::mem::take(&mut current));
            current_count = 0;
        }
        current.nodes.push(node);
        current_count += count;
    }
    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outline::forest_node_count;
    use proptest::prelude::*;

    fn tree(size: usize) -> OutlineNode {
        let children = (1..size).map(|i| OutlineNode::bullet(format!("c{i}"))).collect();
        OutlineNode::bullet("root").with_children(children)
    }

    #[test]
    fn test_single_batch_when_under_cap() {
        let batches = batch(vec![tree(3), tree(2)], 100);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].node_count(), 5);
    }

    #[test]
    fn test_splits_at_cap_boundary() {
        let batches = batch(vec![tree(3), tree(2), tree(4)], 5);
        let counts: Vec<usize> = batches.iter().map(PublishBatch::node_count).collect();
        assert_eq!(counts, vec![5, 4]);
    }

    #[test]
    fn test_oversized_subtree_forms_its_own_batch() {
        let batches = batch(vec![tree(2), tree(7), tree(1)], 5);
        let counts: Vec<usize> = batches.iter().map(PublishBatch::node_count).collect();
        assert_eq!(counts, vec![2, 7, 1]);
    }

    #[test]
    fn test_empty_forest_yields_no_batches() {
        assert!(batch(Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let forest: Vec<OutlineNode> = (0..10).map(|i| OutlineNode::bullet(format!("n{i}"))).collect();
        let texts: Vec<String> = batch(forest, 3)
            .into_iter()
            .flat_map(|b| b.nodes)
            .map(|n| n.text)
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("n{i}")).collect();
        assert_eq!(texts, expected);
    }

    proptest! {
        #[test]
        fn prop_batches_conserve_nodes_and_respect_cap(
            sizes in proptest::collection::vec(1usize..12, 0..40),
            cap in 1usize..20,
        ) {
            let forest: Vec<OutlineNode> = sizes.iter().map(|&s| tree(s)).collect();
            let total = forest_node_count(&forest);
            let batches = batch(forest, cap);

            let sum: usize = batches.iter().map(PublishBatch::node_count).sum();
            prop_assert_eq!(sum, total);

            for b in &batches {
                prop_assert!(!b.is_empty());
                if b.node_count() > cap {
                    prop_assert_eq!(b.nodes.len(), 1);
                }
            }
        }
    }
}
