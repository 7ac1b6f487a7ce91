//! PII 脱敏流水线
//!
//! 输入 PDF 字节，输出所有识别出的 PII 都被永久遮盖的新 PDF。
//! 文字页在内容流层面销毁文字并加黑框；扫描页经 OCR 定位后在
//! 渲染图上涂黑。

mod compose;
mod error;
mod options;
mod pipeline;
mod resolve;

pub use compose::blackout_words;
pub use error::RedactError;
pub use options::{OcrFailurePolicy, RedactOptions};
pub use pipeline::{classify_page, PageKind, Redactor};
pub use resolve::{resolve_scanned_boxes, unique_match_texts};
