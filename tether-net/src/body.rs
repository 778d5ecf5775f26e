use serde::{Deserialize, Serialize};

/// First code point of the private-use block that high bytes land in.
pub const USER_DEFINED_BASE: u32 = 0xF700;

/// How response bytes become the reply body text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyEncoding {
    /// Binary-safe: ASCII passes through, bytes `>= 0x80` map to
    /// `U+F700 + byte`. The interpreter can recover every byte.
    #[default]
    UserDefined,
    /// Lossy UTF-8; invalid sequences become U+FFFD.
    Utf8,
}

impl BodyEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            BodyEncoding::UserDefined => bytes.iter().map(|&b| user_defined_char(b)).collect(),
            BodyEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

fn user_defined_char(byte: u8) -> char {
    if byte < 0x80 {
        char::from(byte)
    } else {
        // The range U+F780..=U+F7FF is never a surrogate.
        char::from_u32(USER_DEFINED_BASE + u32::from(byte)).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

/// Inverse of the user-defined mapping, for interpreter-side code.
pub fn user_defined_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| {
            let cp = ch as u32;
            if cp >= USER_DEFINED_BASE + 0x80 && cp <= USER_DEFINED_BASE + 0xFF {
                (cp - USER_DEFINED_BASE) as u8
            } else {
                cp as u8
            }
        })
        .collect()
}
