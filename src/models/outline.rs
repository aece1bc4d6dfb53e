use serde::{Deserialize, Serialize};

/// 大纲节点的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLevel {
    Heading1,
    Heading2,
    Heading3,
    Bullet,
}

impl NodeLevel {
    /// 由 `#` 的个数得到标题级别，超过 3 个按 3 处理
    pub fn heading(hashes: usize) -> Self {
        match hashes {
            0 | 1 => NodeLevel::Heading1,
            2 => NodeLevel::Heading2,
            _ => NodeLevel::Heading3,
        }
    }

    pub fn is_heading(self) -> bool {
        !matches!(self, NodeLevel::Bullet)
    }

    /// 标题的 markdown 前缀
    pub fn marker(self) -> &'static str {
        match self {
            NodeLevel::Heading1 => "#",
            NodeLevel::Heading2 => "##",
            NodeLevel::Heading3 => "###",
            NodeLevel::Bullet => "-",
        }
    }
}

/// 大纲树中的节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub level: NodeLevel,
    pub text: String,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(level: NodeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn bullet(text: impl Into<String>) -> Self {
        Self::new(NodeLevel::Bullet, text)
    }

    /// 缺少上级时补出的空节点
    pub fn placeholder() -> Self {
        Self::bullet(String::new())
    }

    pub fn with_children(mut self, children: Vec<OutlineNode>) -> Self {
        self.children = children;
        self
    }

    /// 自身加全部后代的节点数
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::node_count).sum::<usize>()
    }

    /// 树的深度，单个节点为 1
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::depth).max().unwrap_or(0)
    }
}

/// 一次追加请求发送的顶层节点（连同子树）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishBatch {
    pub nodes: Vec<OutlineNode>,
}

impl PublishBatch {
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(OutlineNode::node_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// 森林中的节点总数
pub fn forest_node_count(forest: &[OutlineNode]) -> usize {
    forest.iter().map(OutlineNode::node_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_count_and_depth() {
        let tree = OutlineNode::new(NodeLevel::Heading1, "h").with_children(vec![
            OutlineNode::bullet("a").with_children(vec![OutlineNode::bullet("a1")]),
            OutlineNode::bullet("b"),
        ]);
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.depth(), 3);
        assert_eq!(forest_node_count(&[tree.clone(), OutlineNode::bullet("c")]), 5);

        let batch = PublishBatch { nodes: vec![tree] };
        assert_eq!(batch.node_count(), 4);
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(NodeLevel::heading(1), NodeLevel::Heading1);
        assert_eq!(NodeLevel::heading(2), NodeLevel::Heading2);
        assert_eq!(NodeLevel::heading(5), NodeLevel::Heading3);
        assert!(NodeLevel::Heading2.is_heading());
        assert!(!NodeLevel::Bullet.is_heading());
    }
}
