//! 分块 - 业务能力层
//!
//! 把 token 序列切成大小受限的分块。含目标语言文字的缓冲区按字符数判断，
//! 否则按单词数判断。判断发生在追加 token 之后，所以分块可能超出上限一个 token。

use std::sync::Arc;

use crate::config::Config;
use crate::models::Chunk;
use crate::services::script_classifier::ScriptClassifier;

/// 分块策略
#[derive(Clone)]
pub struct ChunkPolicy {
    /// 目标语言分块的字符数软上限
    pub jp_limit: usize,
    /// 其他语言分块的单词数软上限
    pub en_limit: usize,
    pub classifier: Arc<dyn ScriptClassifier>,
}

impl ChunkPolicy {
    pub fn new(jp_limit: usize, en_limit: usize, classifier: Arc<dyn ScriptClassifier>) -> Self {
        Self {
            jp_limit,
            en_limit,
            classifier,
        }
    }

    pub fn from_config(config: &Config, classifier: Arc<dyn ScriptClassifier>) -> Self {
        Self::new(config.jp_limit, config.en_limit, classifier)
    }
}

/// 正在累积的分块
#[derive(Default)]
struct Buffer {
    text: String,
    chars: usize,
    words: usize,
    has_target_script: bool,
}

impl Buffer {
    fn push(&mut self, token: &str, classifier: &dyn ScriptClassifier) {
        self.text.push_str(token);
        self.text.push(' ');
        self.chars += token.chars().count() + 1;
        self.words += token.split_whitespace().count();
        self.has_target_script = self.has_target_script || classifier.is_conformant(token);
    }

    fn should_close(&self, policy: &ChunkPolicy) -> bool {
        if self.has_target_script {
            self.chars > policy.jp_limit
        } else {
            self.words > policy.en_limit
        }
    }

    fn finish(self, index: usize) -> Chunk {
        let text = self.text.strip_suffix(' ').unwrap_or(&self.text).to_string();
        Chunk::new(index, text)
    }
}

/// 切分 token 序列
///
/// 总会返回至少一个分块；空输入得到一个空分块，末尾剩余内容（即使为空）也作为最后一个分块
pub fn segment(tokens: &[String], policy: &ChunkPolicy) -> Vec<Chunk> {
    let classifier = policy.classifier.as_ref();
    let mut chunks = Vec::new();
    let mut buffer = Buffer::default();

    for token in tokens {
        buffer.push(token, classifier);
        if buffer.should_close(policy) {
            let full = std::mem::take(&mut buffer);
            chunks.push(full.finish(chunks.len()));
        }
    }
    chunks.push(buffer.finish(chunks.len()));

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::script_classifier::ScriptRanges;
    use proptest::prelude::*;

    fn policy(jp_limit: usize, en_limit: usize) -> ChunkPolicy {
        ChunkPolicy::new(jp_limit, en_limit, Arc::new(ScriptRanges::japanese()))
    }

    fn words(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{i}")).collect()
    }

    #[test]
    fn test_empty_input_yields_single_empty_chunk() {
        let chunks = segment(&[], &policy(10, 10));
        assert_eq!(chunks, vec![Chunk::new(0, "")]);
    }

    #[test]
    fn test_short_english_is_one_chunk() {
        let tokens = words(600);
        let chunks = segment(&tokens, &policy(2000, 1000));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_count(), 600);
    }

    #[test]
    fn test_english_closes_after_crossing_word_limit() {
        // 第 4 个词使单词数超过 3，分块在其后关闭
        let tokens = words(9);
        let chunks = segment(&tokens, &policy(1000, 3));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "w0 w1 w2 w3");
        assert_eq!(chunks[1].text, "w4 w5 w6 w7");
        assert_eq!(chunks[2].text, "w8");
    }

    #[test]
    fn test_trailing_empty_chunk_when_last_token_closes() {
        let tokens = words(4);
        let chunks = segment(&tokens, &policy(1000, 3));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], Chunk::new(1, ""));
    }

    #[test]
    fn test_japanese_uses_char_limit() {
        let tokens: Vec<String> = vec!["これは".into(), "日本語の".into(), "文章です".into()];
        // "これは " = 4 文字, "日本語の " で 9 文字 > 8
        let chunks = segment(&tokens, &policy(8, 1000));
        assert_eq!(chunks[0].text, "これは 日本語の");
        assert_eq!(chunks[1].text, "文章です");
    }

    #[test]
    fn test_mixed_language_switches_limit_without_lookahead() {
        // 前两个英文词只受单词数限制；出现日文后改用字符数限制
        let tokens: Vec<String> = vec![
            "alpha".into(),
            "beta".into(),
            "ガンマ".into(),
            "delta".into(),
        ];
        let chunks = segment(&tokens, &policy(12, 100));
        assert_eq!(chunks[0].text, "alpha beta ガンマ");
        assert_eq!(chunks[1].text, "delta");
    }

    #[test]
    fn test_indices_are_sequential() {
        let chunks = segment(&words(50), &policy(1000, 4));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    fn token_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,8}",
            "[ぁ-ゖ]{1,6}",
            "[a-z]{1,4}[ァ-ヺ]{1,3}",
        ]
    }

    proptest! {
        #[test]
        fn prop_chunks_reconstruct_tokens(
            tokens in proptest::collection::vec(token_strategy(), 0..200),
            jp_limit in 1usize..60,
            en_limit in 1usize..20,
        ) {
            let chunks = segment(&tokens, &policy(jp_limit, en_limit));
            prop_assert!(!chunks.is_empty());

            let rebuilt: Vec<String> = chunks
                .iter()
                .flat_map(|c| c.text.split_whitespace().map(str::to_string).collect::<Vec<_>>())
                .collect();
            prop_assert_eq!(rebuilt, tokens);
        }

        #[test]
        fn prop_japanese_chunks_overshoot_by_at_most_one_token(
            tokens in proptest::collection::vec("[ぁ-ゖ]{1,6}", 1..200),
            jp_limit in 1usize..60,
        ) {
            let chunks = segment(&tokens, &policy(jp_limit, 1));
            let longest_token = tokens.iter().map(|t| t.chars().count()).max().unwrap_or(0);
            for chunk in &chunks {
                prop_assert!(chunk.char_count() <= jp_limit + longest_token);
            }
        }

        #[test]
        fn prop_english_chunks_overshoot_by_at_most_one_word(
            tokens in proptest::collection::vec("[a-z]{1,8}", 1..200),
            en_limit in 1usize..20,
        ) {
            let chunks = segment(&tokens, &policy(1, en_limit));
            for chunk in &chunks {
                prop_assert!(chunk.word_count() <= en_limit + 1);
            }
        }
    }
}
