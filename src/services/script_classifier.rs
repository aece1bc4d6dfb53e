//! 目标语言判定 - 业务能力层
//!
//! 只负责"这段文字是否含有目标语言文字"的判断

use std::ops::RangeInclusive;

/// 目标语言判定能力
pub trait ScriptClassifier: Send + Sync {
    /// 至少包含一个目标语言文字时返回 true
    fn is_conformant(&self, text: &str) -> bool;
}

/// 以码点区间描述的文字集合
#[derive(Debug, Clone)]
pub struct ScriptRanges {
    ranges: Vec<RangeInclusive<u32>>,
}

impl ScriptRanges {
    pub fn new(ranges: &[[u32; 2]]) -> Self {
        Self {
            ranges: ranges.iter().map(|[start, end]| *start..=*end).collect(),
        }
    }

    /// 平假名、片假名、CJK 统一汉字
    pub fn japanese() -> Self {
        Self::new(&[[0x3040, 0x309F], [0x30A0, 0x30FF], [0x4E00, 0x9FFF]])
    }

    pub fn contains(&self, c: char) -> bool {
        let code = c as u32;
        self.ranges.iter().any(|range| range.contains(&code))
    }
}

impl ScriptClassifier for ScriptRanges {
    fn is_conformant(&self, text: &str) -> bool {
        text.chars().any(|c| self.contains(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_japanese_detection() {
        let classifier = ScriptRanges::japanese();
        assert!(classifier.is_conformant("これはテストです"));
        assert!(classifier.is_conformant("Rust は速い"));
        assert!(classifier.is_conformant("漢字"));
        assert!(!classifier.is_conformant("plain english text"));
        assert!(!classifier.is_conformant(""));
    }

    #[test]
    fn test_custom_ranges() {
        // 西里尔字母
        let classifier = ScriptRanges::new(&[[0x0400, 0x04FF]]);
        assert!(classifier.is_conformant("привет"));
        assert!(!classifier.is_conformant("こんにちは"));
    }
}
