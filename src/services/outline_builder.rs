//! 大纲解析 - 业务能力层
//!
//! 把单个分块的生成结果（markdown 风格的标题和嵌套列表）解析成大纲森林。
//!
//! ## 规则
//! - `#` / `##` / `###` 开头的行是 1/2/3 级标题，作为新的顶层节点
//! - 列表行按缩进分为 3 级：1 级为新的顶层节点，2 级挂到最近的顶层节点下，
//!   3 级挂到最近顶层节点的最后一个子节点下
//! - 缩进单位取本段中最小的非零缩进（不小于 2、不大于 4 个空格），tab 视为 4 个空格
//! - 缺少上级时补一个空节点，解析永远不会失败
//! - 去掉标记后为空或属于占位词的行直接丢弃

use std::sync::LazyLock;

use phf::phf_set;
use regex::Regex;
use tracing::debug;

use crate::models::{GenerationResult, NodeLevel, OutlineNode};

/// 去掉标记后需要丢弃的内容（小写比较）
static EXCLUDED: phf::Set<&'static str> = phf_set! {
    "",
    "list",
    "summary",
    "bullet points",
    "要約",
    "まとめ",
    "箇条書き",
    "リスト",
    "---",
    "***",
};

/// 列表标记：`-` `*` `+` `1.` `1)` 后跟空白，或 `・` `•`
static BULLET_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:[-*+]|\d+[.)])(?:\s+|$)|[・•]\s*)(.*)$").expect("bullet regex is valid")
});

const TAB_WIDTH: usize = 4;
const MAX_INDENT_UNIT: usize = 4;
const RENDER_INDENT: &str = "    ";

/// 解析后的一行
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Heading(NodeLevel, String),
    Item { indent: usize, text: String },
}

/// 解析单个分块的生成结果
pub fn build(text: &str) -> Vec<OutlineNode> {
    let lines: Vec<Line> = text.lines().filter_map(parse_line).collect();
    let unit = indent_unit(&lines);

    let mut forest: Vec<OutlineNode> = Vec::new();
    for line in lines {
        match line {
            Line::Heading(level, text) => forest.push(OutlineNode::new(level, text)),
            Line::Item { indent, text } => match item_level(indent, unit) {
                1 => forest.push(OutlineNode::bullet(text)),
                2 => top_level(&mut forest).children.push(OutlineNode::bullet(text)),
                _ => {
                    let top = top_level(&mut forest);
                    if top.children.is_empty() {
                        debug!("3级列表缺少2级上级，补充空节点");
                        top.children.push(OutlineNode::placeholder());
                    }
                    if let Some(parent) = top.children.last_mut() {
                        parent.children.push(OutlineNode::bullet(text));
                    }
                }
            },
        }
    }

    forest
}

/// 按分块顺序拼接所有结果的大纲
pub fn build_forest(results: &[GenerationResult]) -> Vec<OutlineNode> {
    results.iter().flat_map(|r| build(&r.text)).collect()
}

/// 把大纲森林还原成文本，再次解析可得到相同的结构
pub fn render(forest: &[OutlineNode]) -> String {
    let mut lines = Vec::new();
    for node in forest {
        let text = render_text(&node.text);
        if node.level.is_heading() {
            lines.push(format!("{} {}", node.level.marker(), text));
        } else {
            lines.push(format!("- {}", text));
        }
        render_children(&node.children, 1, &mut lines);
    }
    lines.join("\n")
}

fn render_children(children: &[OutlineNode], depth: usize, lines: &mut Vec<String>) {
    for child in children {
        lines.push(format!("{}- {}", RENDER_INDENT.repeat(depth), render_text(&child.text)));
        render_children(&child.children, depth + 1, lines);
    }
}

/// 解析时会去掉一层 `**…**`，文本本身带粗体标记时多包一层
fn render_text(text: &str) -> String {
    if clean_text(text) == text {
        text.to_string()
    } else {
        format!("**{}**", text)
    }
}

/// 最近的顶层节点，不存在时补一个空节点
fn top_level(forest: &mut Vec<OutlineNode>) -> &mut OutlineNode {
    if forest.is_empty() {
        debug!("2级列表缺少顶层上级，补充空节点");
        forest.push(OutlineNode::placeholder());
    }
    let last = forest.len() - 1;
    &mut forest[last]
}

fn parse_line(raw: &str) -> Option<Line> {
    let indent = raw
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum::<usize>();
    let rest = raw.trim();

    if rest.starts_with("```") {
        return None;
    }

    if rest.starts_with('#') {
        let hashes = rest.chars().take_while(|&c| c == '#').count();
        let after = &rest[hashes..];
        if after.is_empty() || after.starts_with(char::is_whitespace) {
            let text = clean_text(after);
            return (!is_excluded(&text)).then(|| Line::Heading(NodeLevel::heading(hashes), text));
        }
    }

    let content = BULLET_MARKER
        .captures(rest)
        .and_then(|caps| caps.get(1))
        .map_or(rest, |m| m.as_str());
    let text = clean_text(content);
    (!is_excluded(&text)).then_some(Line::Item { indent, text })
}

fn clean_text(content: &str) -> String {
    let text = content.trim();
    let text = match text.strip_prefix("**").and_then(|t| t.strip_suffix("**")) {
        Some(inner) if !inner.is_empty() => inner.trim(),
        _ => text,
    };
    text.to_string()
}

fn is_excluded(text: &str) -> bool {
    let key = text.trim_end_matches([':', '：']).trim().to_lowercase();
    EXCLUDED.contains(key.as_str())
}

/// 本段的缩进单位
fn indent_unit(lines: &[Line]) -> usize {
    lines
        .iter()
        .filter_map(|line| match line {
            Line::Item { indent, .. } if *indent >= 2 => Some(*indent),
            _ => None,
        })
        .min()
        .map_or(MAX_INDENT_UNIT, |smallest| smallest.min(MAX_INDENT_UNIT))
}

fn item_level(indent: usize, unit: usize) -> usize {
    if indent < 2 {
        1
    } else {
        (1 + indent / unit).min(3)
    }
}
