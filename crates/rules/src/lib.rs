//! PII 检测规则与匹配
//!
//! 内置一张固定顺序的规则表（邮箱、电话、SSN、出生日期、姓名、地址），
//! 每条规则独立应用于同一段文本，规则顺序不影响检出完整性。
//! 不同规则对同一子串重复命中是允许的（重复脱敏是幂等的）。

use regex::Regex;
use serde::{Deserialize, Serialize};

/// PII 类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiKind {
    Email,
    Phone,
    Ssn,
    Dob,
    Name,
    Address,
}

impl std::fmt::Display for PiiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PiiKind::Email => write!(f, "email"),
            PiiKind::Phone => write!(f, "phone"),
            PiiKind::Ssn => write!(f, "ssn"),
            PiiKind::Dob => write!(f, "dob"),
            PiiKind::Name => write!(f, "name"),
            PiiKind::Address => write!(f, "address"),
        }
    }
}

/// 单条检测规则：类别 + 已编译正则
#[derive(Debug, Clone)]
pub struct PatternRule {
    kind: PiiKind,
    regex: Regex,
}

impl PatternRule {
    pub fn new(kind: PiiKind, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            regex: Regex::new(pattern)?,
        })
    }

    pub fn kind(&self) -> PiiKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// 一次命中
///
/// 带捕获组的规则（如电话号码）把所有捕获组按顺序拼接为一个平铺字符串，
/// 后续的区域解析直接对该字符串做字面检索。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiMatch {
    pub kind: PiiKind,
    pub text: String,
}

const EMAIL: &str = r"[\w\.\d]+@[\w\d-]+\.[\w\d.-]+";
const PHONE: &str = r"(\+1[-.\s]?)?(\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})";
const SSN: &str = r"\b\d{3}[-\s]?\d{2}[-\s]?\d{4}\b";
const DOB: &str = r"\b(?:\d{1,2}[-/]\d{1,2}[-/]\d{2,4}|\d{4}-\d{1,2}-\d{1,2})\b";
// 触发词大小写不敏感，姓名本体保持大写开头的严格匹配
const NAME: &str =
    r"(?i:My name is|I am|He is|She is|Name:|name is) ([A-Z][a-z]+(?: [A-Z][a-z]+)+)";
// 扫描件版本：OCR 文本噪声更大，补充称呼类触发词
const NAME_SCANNED: &str = r"(?i:My name is|I am|He is|She is|Name:|name is|dear,|mr\.|Hello,|Hello|Salutations) ([A-Z][a-z]+(?: [A-Z][a-z]+)+)";
const ADDRESS: &str = r"\b\d{1,6}\s+[A-Za-z0-9.,'’\- ]+\s*,?\s*[A-Za-z\- ]+\s*,?\s*(?:AL|AK|AZ|AR|CA|CO|CT|DE|FL|GA|HI|ID|IL|IN|IA|KS|KY|LA|ME|MD|MA|MI|MN|MS|MO|MT|NE|NV|NH|NJ|NM|NY|NC|ND|OH|OK|OR|PA|RI|SC|SD|TN|TX|UT|VT|VA|WA|WV|WI|WY)?\s+\d{5}(?:-\d{4})?\b";

/// 有序规则集
///
/// 新增类别只需要加一个表项，匹配与区域解析对类别不感知。
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<PatternRule>,
}

impl RuleSet {
    /// 文字层页面使用的内置规则表
    pub fn text_layer() -> Self {
        Self::builtin(NAME)
    }

    /// 扫描件页面使用的内置规则表（姓名触发词为超集）
    pub fn scanned() -> Self {
        Self::builtin(NAME_SCANNED)
    }

    fn builtin(name_pattern: &str) -> Self {
        let table = [
            (PiiKind::Email, EMAIL),
            (PiiKind::Phone, PHONE),
            (PiiKind::Ssn, SSN),
            (PiiKind::Dob, DOB),
            (PiiKind::Name, name_pattern),
            (PiiKind::Address, ADDRESS),
        ];
        let rules = table
            .iter()
            .map(|(kind, pattern)| {
                PatternRule::new(*kind, pattern).expect("内置规则必须可编译")
            })
            .collect();
        Self { rules }
    }

    /// 使用调用方提供的规则表
    pub fn from_rules(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// 对任意文本应用全部规则，返回命中序列
    ///
    /// 不保证跨类别的输出顺序；类别之间的重叠命中各自独立返回。
    pub fn find_matches(&self, text: &str) -> Vec<PiiMatch> {
        let mut matches = Vec::new();

        for rule in &self.rules {
            let group_count = rule.regex.captures_len();

            for caps in rule.regex.captures_iter(text) {
                let matched = if group_count > 1 {
                    // 捕获组拼接（无分隔符），缺省的可选组视为空串
                    (1..group_count)
                        .filter_map(|i| caps.get(i))
                        .map(|m| m.as_str())
                        .collect::<String>()
                } else {
                    caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default()
                };

                if matched.is_empty() {
                    continue;
                }

                matches.push(PiiMatch {
                    kind: rule.kind,
                    text: matched,
                });
            }
        }

        matches
    }
}
