//! 工具输出中的内嵌媒体：`<叙述文本>\n[CHART_IMAGE_BASE64]: <base64>`

use base64::Engine as _;

use super::CHART_MARKER;

/// 从工具输出中拆出的媒体（base64 原文）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub base64: String,
}

impl Media {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.base64.as_bytes())
    }

    /// 按内容嗅探类型，用于保存文件时选扩展名
    pub fn mime_type(&self) -> &'static str {
        match self.decode() {
            Ok(bytes) if bytes.starts_with(b"\x89PNG") => "image/png",
            Ok(bytes) if bytes.starts_with(b"<svg") || bytes.starts_with(b"<?xml") => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type() {
            "image/png" => "png",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }
}

/// 按标记拆分：返回去掉标记与载荷后的叙述文本，以及（非空时的）媒体
pub fn split_media(text: &str) -> (String, Option<Media>) {
    match text.split_once(CHART_MARKER) {
        Some((narrative, payload)) => {
            let payload = payload.trim();
            let media = (!payload.is_empty()).then(|| Media {
                base64: payload.to_string(),
            });
            (narrative.trim_end().to_string(), media)
        }
        None => (text.to_string(), None),
    }
}
