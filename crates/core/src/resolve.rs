//! 命中结果到遮盖区域的解析

use std::collections::{BTreeSet, HashSet};

use sable_ocr::{Block, OcrWord, WordBox};
use sable_rules::{PiiMatch, RuleSet};

/// 去重后的命中文本（保持首次出现顺序），用于文字页的精确搜索
pub fn unique_match_texts(matches: &[PiiMatch]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut texts = Vec::new();
    for m in matches {
        if seen.insert(m.text.as_str()) {
            texts.push(m.text.clone());
        }
    }
    texts
}

/// 解析扫描页的遮盖词框
///
/// 对每行和每块的文本分别跑规则；命中文本按空白切词，凡是词元文本
/// 出现在命中词集合中的词框都纳入遮盖。块级匹配补上跨行的 PII
/// （例如触发词在上一行、姓名在下一行）。同一词框只收一次。
pub fn resolve_scanned_boxes(blocks: &[Block], rules: &RuleSet) -> Vec<WordBox> {
    let mut selected: BTreeSet<usize> = BTreeSet::new();
    let mut boxes = Vec::new();

    for block in blocks {
        for line in block.lines() {
            let words: Vec<&OcrWord> = line.words().iter().collect();
            collect_in_scope(&words, &line.text(), rules, &mut selected, &mut boxes);
        }

        let words: Vec<&OcrWord> = block.words().collect();
        collect_in_scope(&words, &block.text(), rules, &mut selected, &mut boxes);
    }

    log::info!("[Resolve] 命中 {} 个遮盖词框", boxes.len());
    boxes
}

fn collect_in_scope(
    words: &[&OcrWord],
    text: &str,
    rules: &RuleSet,
    selected: &mut BTreeSet<usize>,
    out: &mut Vec<WordBox>,
) {
    let matches = rules.find_matches(text);
    if matches.is_empty() {
        return;
    }

    let mut pii_tokens: HashSet<&str> = HashSet::new();
    for m in &matches {
        for token in m.text.split_whitespace() {
            pii_tokens.insert(token);
        }
    }

    for word in words {
        if selected.contains(&word.source_index) {
            continue;
        }
        let token = word.text.trim();
        if !token.is_empty() && pii_tokens.contains(token) {
            selected.insert(word.source_index);
            out.push(word.bbox);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_ocr::group_words;
    use sable_rules::PiiKind;

    fn word(text: &str, left: f32, top: f32, index: usize) -> OcrWord {
        OcrWord {
            text: text.to_string(),
            bbox: WordBox {
                left,
                top,
                width: 40.0,
                height: 20.0,
            },
            source_index: index,
        }
    }

    #[test]
    fn test_unique_match_texts_keeps_first_occurrence_order() {
        let matches = vec![
            PiiMatch {
                kind: PiiKind::Email,
                text: "a@b.com".to_string(),
            },
            PiiMatch {
                kind: PiiKind::Phone,
                text: "555-123-4567".to_string(),
            },
            PiiMatch {
                kind: PiiKind::Email,
                text: "a@b.com".to_string(),
            },
        ];
        assert_eq!(unique_match_texts(&matches), vec!["a@b.com", "555-123-4567"]);
    }

    #[test]
    fn test_only_matched_words_selected() {
        let words = vec![
            word("Call", 0.0, 100.0, 0),
            word("555-123-4567", 50.0, 100.0, 1),
            word("now", 120.0, 101.0, 2),
        ];
        let blocks = group_words(words, 50.0, 80.0);
        let boxes = resolve_scanned_boxes(&blocks, &RuleSet::scanned());
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].left, 50.0);
    }

    #[test]
    fn test_cross_line_name_resolved_via_block() {
        // 触发词在第一行，姓名跨到第二行；行级匹配各自落空，块级补上
        let words = vec![
            word("My", 0.0, 100.0, 0),
            word("name", 50.0, 100.0, 1),
            word("is", 100.0, 101.0, 2),
            word("John", 0.0, 160.0, 3),
            word("Smith", 50.0, 161.0, 4),
        ];
        let blocks = group_words(words, 50.0, 80.0);
        let boxes = resolve_scanned_boxes(&blocks, &RuleSet::scanned());
        assert_eq!(boxes.len(), 2);
        let lefts: Vec<f32> = boxes.iter().map(|b| b.left).collect();
        assert!(lefts.contains(&0.0) && lefts.contains(&50.0));
    }

    #[test]
    fn test_line_and_block_hits_deduplicated() {
        // 单行的邮箱在行级和块级都会命中，但词框只收一次
        let words = vec![
            word("Contact:", 0.0, 100.0, 0),
            word("john@example.com", 60.0, 100.0, 1),
        ];
        let blocks = group_words(words, 50.0, 80.0);
        let boxes = resolve_scanned_boxes(&blocks, &RuleSet::scanned());
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].left, 60.0);
    }

    #[test]
    fn test_no_match_yields_no_boxes() {
        let words = vec![word("nothing", 0.0, 100.0, 0), word("here", 50.0, 100.0, 1)];
        let blocks = group_words(words, 50.0, 80.0);
        let boxes = resolve_scanned_boxes(&blocks, &RuleSet::scanned());
        assert!(boxes.is_empty());
    }

    #[test]
    fn test_same_token_elsewhere_in_scope_also_covered() {
        // 包含式匹配：命中词元在同一作用域内的重复出现一并遮盖
        let words = vec![
            word("id", 0.0, 100.0, 0),
            word("123-45-6789", 40.0, 100.0, 1),
            word("ref", 90.0, 101.0, 2),
            word("123-45-6789", 130.0, 101.0, 3),
        ];
        let blocks = group_words(words, 50.0, 80.0);
        let boxes = resolve_scanned_boxes(&blocks, &RuleSet::scanned());
        assert_eq!(boxes.len(), 2);
    }
}
