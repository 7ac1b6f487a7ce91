//! OCR 词框分组
//!
//! OCR 引擎输出的是平铺的 (词, 词框) 列表，单词级的正则匹配会漏掉
//! 跨多个识别词元的 PII（绝大多数 PII 都是多词的）。这里按竖直邻近
//! 把词聚成行、再把行聚成块（近似段落），恢复出足以让干净文本规则
//! 直接套用的上下文。
//!
//! 行聚类使用容差窗口而非精确 top 对齐：同一视觉行上相邻词的 top
//! 值会有几个像素的抖动。锚点在每个词处理后都更新为该词的 top，
//! 长行上的渐进漂移因此被逐步容忍。

use crate::OcrWord;

/// 行聚类阈值（像素）
pub const LINE_THRESHOLD_PX: f32 = 50.0;
/// 块聚类阈值（像素）
pub const BLOCK_THRESHOLD_PX: f32 = 80.0;

/// 一行：按引擎输出顺序排列的词框序列
#[derive(Debug, Clone)]
pub struct Line {
    words: Vec<OcrWord>,
}

impl Line {
    pub fn words(&self) -> &[OcrWord] {
        &self.words
    }

    /// 行内最小 top，作为块聚类的锚点
    pub fn anchor_top(&self) -> f32 {
        self.words
            .iter()
            .map(|w| w.bbox.top)
            .fold(f32::INFINITY, f32::min)
    }

    /// 空白连接的行文本（词序与引擎输出一致）
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self.words.iter().map(|w| w.text.as_str()).collect();
        parts.join(" ")
    }
}

/// 一块：竖直相邻的若干行，近似一个段落
///
/// 用于捕捉跨行的 PII（例如姓名紧跟下一行的地址）。
#[derive(Debug, Clone)]
pub struct Block {
    lines: Vec<Line>,
}

impl Block {
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn words(&self) -> impl Iterator<Item = &OcrWord> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }

    /// 空白连接的块文本（全部词按引擎输出顺序平铺）
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self
            .lines
            .iter()
            .flat_map(|l| l.words.iter())
            .map(|w| w.text.as_str())
            .collect();
        parts.join(" ")
    }
}

/// 把平铺词框聚成块
///
/// 1. 丢弃空/纯空白词元；
/// 2. 行聚类：维护运行锚点 `last_top`，`|top - last_top| < line_threshold`
///    的词并入当前行，否则关闭当前行并以该词开新行；锚点每步都更新；
/// 3. 块聚类：以各行最小 top 为锚点，与前一行锚点差小于
///    `block_threshold` 的行并入当前块。
///
/// 对固定输入与固定阈值，输出完全确定。
pub fn group_words(words: Vec<OcrWord>, line_threshold: f32, block_threshold: f32) -> Vec<Block> {
    let mut lines: Vec<Line> = Vec::new();
    let mut current: Vec<OcrWord> = Vec::new();
    let mut last_top: Option<f32> = None;

    for word in words {
        if word.text.trim().is_empty() {
            continue;
        }
        let top = word.bbox.top;
        if let Some(prev) = last_top {
            if (top - prev).abs() >= line_threshold && !current.is_empty() {
                lines.push(Line {
                    words: std::mem::take(&mut current),
                });
            }
        }
        current.push(word);
        last_top = Some(top);
    }
    if !current.is_empty() {
        lines.push(Line { words: current });
    }

    let mut blocks: Vec<Block> = Vec::new();
    let mut current_lines: Vec<Line> = Vec::new();
    let mut last_anchor: Option<f32> = None;

    for line in lines {
        let anchor = line.anchor_top();
        if let Some(prev) = last_anchor {
            if (anchor - prev).abs() >= block_threshold && !current_lines.is_empty() {
                blocks.push(Block {
                    lines: std::mem::take(&mut current_lines),
                });
            }
        }
        current_lines.push(line);
        last_anchor = Some(anchor);
    }
    if !current_lines.is_empty() {
        blocks.push(Block {
            lines: current_lines,
        });
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WordBox;

    fn word(text: &str, top: f32, index: usize) -> OcrWord {
        OcrWord {
            text: text.to_string(),
            bbox: WordBox {
                left: 10.0 * index as f32,
                top,
                width: 40.0,
                height: 20.0,
            },
            source_index: index,
        }
    }

    fn all_lines(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .flat_map(|b| b.lines().iter())
            .map(|l| l.text())
            .collect()
    }

    #[test]
    fn test_jittered_tops_cluster_into_one_line() {
        let words = vec![word("555-123-4567", 100.0, 0), word("John", 102.0, 1)];
        let blocks = group_words(words, 50.0, BLOCK_THRESHOLD_PX);
        assert_eq!(all_lines(&blocks), vec!["555-123-4567 John"]);
    }

    #[test]
    fn test_tight_threshold_splits_lines() {
        let words = vec![word("555-123-4567", 100.0, 0), word("John", 102.0, 1)];
        let blocks = group_words(words, 1.0, BLOCK_THRESHOLD_PX);
        assert_eq!(
            all_lines(&blocks),
            vec!["555-123-4567".to_string(), "John".to_string()]
        );
    }

    #[test]
    fn test_anchor_follows_each_word() {
        // 逐词漂移：相邻差 40 < 50，但首尾差 80；锚点逐词更新所以仍是一行
        let words = vec![
            word("a", 100.0, 0),
            word("b", 140.0, 1),
            word("c", 180.0, 2),
        ];
        let blocks = group_words(words, 50.0, 200.0);
        assert_eq!(all_lines(&blocks), vec!["a b c"]);
    }

    #[test]
    fn test_whitespace_words_discarded() {
        let words = vec![
            word("Hello", 100.0, 0),
            word("   ", 100.0, 1),
            word("", 101.0, 2),
            word("World", 102.0, 3),
        ];
        let blocks = group_words(words, 50.0, BLOCK_THRESHOLD_PX);
        assert_eq!(all_lines(&blocks), vec!["Hello World"]);
    }

    #[test]
    fn test_distant_lines_split_into_blocks() {
        let words = vec![
            word("first", 100.0, 0),
            word("second", 200.0, 1),
            word("third", 400.0, 2),
        ];
        let blocks = group_words(words, 50.0, 80.0);
        // 100→200 差 100 ≥ 80 开新块，200→400 同理
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].text(), "first");
        assert_eq!(blocks[1].text(), "second");
        assert_eq!(blocks[2].text(), "third");
    }

    #[test]
    fn test_adjacent_lines_share_a_block() {
        let words = vec![
            word("My", 100.0, 0),
            word("name", 101.0, 1),
            word("is", 100.0, 2),
            word("John", 160.0, 3),
            word("Smith", 161.0, 4),
        ];
        let blocks = group_words(words, 50.0, 80.0);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines().len(), 2);
        assert_eq!(blocks[0].text(), "My name is John Smith");
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let make = || {
            vec![
                word("alpha", 100.0, 0),
                word("beta", 103.0, 1),
                word("gamma", 170.0, 2),
                word("delta", 400.0, 3),
            ]
        };
        let a = group_words(make(), LINE_THRESHOLD_PX, BLOCK_THRESHOLD_PX);
        let b = group_words(make(), LINE_THRESHOLD_PX, BLOCK_THRESHOLD_PX);
        assert_eq!(
            a.iter().map(Block::text).collect::<Vec<_>>(),
            b.iter().map(Block::text).collect::<Vec<_>>()
        );
        assert_eq!(a.len(), b.len());
    }
}
