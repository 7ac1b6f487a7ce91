//! Tesseract OCR 引擎实现（CLI 包装）

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::{OcrAuditInfo, OcrWord, WordBox};

/// Tesseract 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TesseractConfig {
    /// Tesseract 可执行文件路径
    pub binary_path: Option<String>,
    /// tessdata 目录路径
    pub tessdata_path: Option<String>,
    /// 语言（如 "eng"）
    pub lang: Option<String>,
    /// 页面分割模式 (0-13)
    pub psm: Option<u8>,
    /// OCR 引擎模式 (0-3)
    pub oem: Option<u8>,
    /// 单次识别超时（毫秒），None 表示不限时
    pub timeout_ms: Option<u64>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            tessdata_path: None,
            lang: None,
            psm: None,
            oem: None,
            timeout_ms: Some(60_000),
        }
    }
}

impl TesseractConfig {
    pub fn lang_or_default(&self) -> &str {
        self.lang.as_deref().unwrap_or("eng")
    }

    pub fn psm_or_default(&self) -> u8 {
        self.psm.unwrap_or(3)
    }

    pub fn oem_or_default(&self) -> u8 {
        self.oem.unwrap_or(1)
    }
}

/// Tesseract OCR 引擎
pub struct TesseractEngine {
    config: TesseractConfig,
    version: Option<String>,
}

impl TesseractEngine {
    /// 创建引擎并验证可执行文件可用
    pub fn new(config: TesseractConfig) -> Result<Self, OcrError> {
        let binary = config.binary_path.as_deref().unwrap_or("tesseract");
        let version = detect_version(binary)?;

        log::info!("[Tesseract] 初始化成功，版本: {}", version);

        Ok(Self {
            config,
            version: Some(version),
        })
    }

    fn binary_path(&self) -> &str {
        self.config.binary_path.as_deref().unwrap_or("tesseract")
    }

    fn recognize_file(&self, image_path: &str) -> Result<Vec<OcrWord>, OcrError> {
        let start = Instant::now();

        let mut cmd = Command::new(self.binary_path());
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(self.config.lang_or_default())
            .arg("--psm")
            .arg(self.config.psm_or_default().to_string())
            .arg("--oem")
            .arg(self.config.oem_or_default().to_string())
            .arg("tsv")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(tessdata_path) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata_path);
        }

        log::info!(
            "[Tesseract] 执行: {} {} -l {} --psm {} --oem {} tsv",
            self.binary_path(),
            image_path,
            self.config.lang_or_default(),
            self.config.psm_or_default(),
            self.config.oem_or_default()
        );

        let (status, stdout, stderr) =
            run_with_timeout(&mut cmd, self.config.timeout_ms)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(OcrError::Execution(format!(
                "tesseract 退出异常: {}",
                stderr.trim()
            )));
        }

        let tsv_output = String::from_utf8_lossy(&stdout);
        let results = parse_tesseract_tsv(&tsv_output);

        log::info!(
            "[Tesseract] 识别完成，耗时: {} ms，词元数: {}",
            start.elapsed().as_millis(),
            results.len()
        );

        Ok(results)
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize_words(&mut self, img: &DynamicImage) -> Result<Vec<OcrWord>, OcrError> {
        let temp_dir = std::env::temp_dir();
        let temp_input = temp_dir.join(format!("sable_ocr_{}.png", std::process::id()));

        img.save(&temp_input)
            .map_err(|e| OcrError::ImageProcess(format!("保存临时图片失败: {}", e)))?;

        let results = self.recognize_file(temp_input.to_string_lossy().as_ref());

        if let Err(e) = std::fs::remove_file(&temp_input) {
            log::warn!("[Tesseract] 删除临时文件失败: {}", e);
        }

        results
    }

    fn audit_info(&self) -> OcrAuditInfo {
        let params = serde_json::json!({
            "lang": self.config.lang_or_default(),
            "psm": self.config.psm_or_default(),
            "oem": self.config.oem_or_default(),
        });

        OcrAuditInfo {
            engine_version: self.version.clone(),
            engine_params: Some(params.to_string()),
        }
    }
}

/// 启动子进程并在截止时间内等待退出，超时则杀死进程
fn run_with_timeout(
    cmd: &mut Command,
    timeout_ms: Option<u64>,
) -> Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>), OcrError> {
    let mut child = cmd
        .spawn()
        .map_err(|e| OcrError::EngineUnavailable(format!("无法执行 tesseract: {}", e)))?;

    // 边等待边在后台读管道，避免 TSV 输出塞满缓冲区
    let stdout_handle = child.stdout.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });
    let stderr_handle = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));

    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if let (Some(deadline), Some(ms)) = (deadline, timeout_ms) {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(OcrError::Timeout(ms));
                    }
                }
                std::thread::sleep(Duration::from_millis(25));
            }
        }
    };

    let stdout = stdout_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    Ok((status, stdout, stderr))
}

/// 解析 Tesseract TSV 输出
///
/// TSV 格式：
/// level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
///
/// 只取 word 级别 (level=5)，保留空白词元（由分组器过滤），词框为像素
/// 坐标，`source_index` 按输出顺序递增。
fn parse_tesseract_tsv(tsv: &str) -> Vec<OcrWord> {
    let mut results = Vec::new();
    let mut source_index = 0usize;

    for line in tsv.lines().skip(1) {
        // 跳过表头
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let level: i32 = cols[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let left: f32 = cols[6].parse().unwrap_or(0.0);
        let top: f32 = cols[7].parse().unwrap_or(0.0);
        let width: f32 = cols[8].parse().unwrap_or(0.0);
        let height: f32 = cols[9].parse().unwrap_or(0.0);
        let text = cols[11];

        results.push(OcrWord {
            text: text.to_string(),
            bbox: WordBox {
                left,
                top,
                width,
                height,
            },
            source_index,
        });
        source_index += 1;
    }

    results
}

/// 获取 Tesseract 版本
fn detect_version(binary_path: &str) -> Result<String, OcrError> {
    let output = Command::new(binary_path)
        .arg("--version")
        .output()
        .map_err(|e| OcrError::EngineUnavailable(format!("无法执行 tesseract: {}", e)))?;

    if !output.status.success() {
        return Err(OcrError::EngineUnavailable(
            "tesseract --version 执行失败".to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);

    // 版本号通常在第一行，形如 "tesseract 5.3.0" 或 "tesseract v5.3.0"
    for line in combined.lines() {
        if line.contains("tesseract") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                return Ok(parts[1].trim_start_matches('v').to_string());
            }
        }
    }

    Ok("unknown".to_string())
}
