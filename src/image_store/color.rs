//! 十六进制颜色解析
//!
//! 支持 `#RGB`、`#RGBA`、`#RRGGBB`、`#RRGGBBAA`（`#` 可省略，大小写不敏感）。
//! 通过 `once_cell::sync::Lazy` 在首次调用时编译正则，后续零成本复用。

use once_cell::sync::Lazy;
use regex::Regex;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("hex color pattern is valid")
});

/// RGBA8 颜色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba8Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Color {
    /// 完全透明的黑色，未指定颜色时的默认值。
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// 严格解析，格式不合法时返回 `None`。
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let captures = HEX_COLOR.captures(hex.trim())?;
        let digits = captures.get(1)?.as_str();

        let expand = |c: u8| -> Option<u8> {
            let v = (c as char).to_digit(16)? as u8;
            Some(v * 16 + v)
        };
        let pair = |s: &str| u8::from_str_radix(s, 16).ok();

        let bytes = digits.as_bytes();
        match digits.len() {
            3 | 4 => {
                let r = expand(bytes[0])?;
                let g = expand(bytes[1])?;
                let b = expand(bytes[2])?;
                let a = if digits.len() == 4 { expand(bytes[3])? } else { 255 };
                Some(Self::new(r, g, b, a))
            }
            6 | 8 => {
                let r = pair(&digits[0..2])?;
                let g = pair(&digits[2..4])?;
                let b = pair(&digits[4..6])?;
                let a = if digits.len() == 8 { pair(&digits[6..8])? } else { 255 };
                Some(Self::new(r, g, b, a))
            }
            _ => None,
        }
    }

    /// 宽松解析：空字符串与非法输入都回退为透明黑。
    pub fn from_hex_or_transparent(hex: &str) -> Self {
        if hex.trim().is_empty() {
            return Self::TRANSPARENT;
        }

        Self::parse_hex(hex).unwrap_or_else(|| {
            log::warn!("⚠️ 无法解析颜色 '{}'，回退为透明黑", hex);
            Self::TRANSPARENT
        })
    }
}
