//! 响应体解码
//!
//! 行情接口的编码没有约定，按候选顺序逐个尝试严格解码，使用第一个成功的结果。

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// 候选字符编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// GB18030（兼容 GBK / GB2312）
    Gb18030,
    Utf8,
    Ascii,
    /// ISO-8859-1，任意字节序列都能解码
    Latin1,
}

/// 默认尝试顺序
pub const DEFAULT_CHARSETS: [Charset; 4] =
    [Charset::Gb18030, Charset::Utf8, Charset::Ascii, Charset::Latin1];

impl Charset {
    pub fn name(self) -> &'static str {
        match self {
            Charset::Gb18030 => "gb18030",
            Charset::Utf8 => "utf-8",
            Charset::Ascii => "ascii",
            Charset::Latin1 => "iso-8859-1",
        }
    }

    /// 严格解码，遇到非法字节序列返回 `None`
    pub fn decode<'a>(self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Charset::Gb18030 => {
                encoding_rs::GB18030.decode_without_bom_handling_and_without_replacement(bytes)
            }
            Charset::Utf8 => {
                encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(bytes)
            }
            Charset::Ascii => {
                if bytes.is_ascii() {
                    std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
                } else {
                    None
                }
            }
            Charset::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
        }
    }
}

/// 按顺序尝试候选编码，返回解码结果和所用编码
pub fn decode_with_fallback(bytes: &[u8], charsets: &[Charset]) -> Option<(String, Charset)> {
    charsets
        .iter()
        .find_map(|&charset| charset.decode(bytes).map(|text| (text.into_owned(), charset)))
}
