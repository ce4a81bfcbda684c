// src/types.rs — 所有核心数据类型

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// 加密类型（只接受三个固定值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encryption {
    #[default]
    #[serde(rename = "WPA2")]
    Wpa2,
    #[serde(rename = "WEP")]
    Wep,
    #[serde(rename = "nopass")]
    NoPass,
}

impl Encryption {
    pub const ALL: [Encryption; 3] = [Encryption::Wpa2, Encryption::Wep, Encryption::NoPass];

    pub fn needs_password(&self) -> bool {
        !matches!(self, Encryption::NoPass)
    }

    /// 写进 QR 负载里的字面值
    pub fn as_str(&self) -> &'static str {
        match self {
            Encryption::Wpa2 => "WPA2",
            Encryption::Wep => "WEP",
            Encryption::NoPass => "nopass",
        }
    }

    /// 菜单里给人看的名字
    pub fn label(&self) -> &'static str {
        match self {
            Encryption::Wpa2 => "WPA/WPA2",
            Encryption::Wep => "WEP",
            Encryption::NoPass => "开放网络（无密码）",
        }
    }
}

impl std::fmt::Display for Encryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encryption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "WPA2" => Ok(Encryption::Wpa2),
            "WEP" => Ok(Encryption::Wep),
            "nopass" => Ok(Encryption::NoPass),
            other => Err(format!("未知加密类型: {other}（可选 WPA2 / WEP / nopass）")),
        }
    }
}

/// 表单里的原始输入，尚未校验
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WifiCredential {
    pub ssid: String,
    pub password: String,
    pub encryption: Encryption,
}

/// `nopass` 时对残留密码的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PasswordPolicy {
    /// 切到 nopass 立即清空，编码时 P: 段恒为空
    #[default]
    Clear,
    /// 保留旧值原样写入负载
    PassThrough,
}

impl FromStr for PasswordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "clear" => Ok(PasswordPolicy::Clear),
            "pass-through" => Ok(PasswordPolicy::PassThrough),
            other => Err(format!("未知密码策略: {other}（可选 clear / pass-through）")),
        }
    }
}

/// 主题色：QR 前景色 + 界面着色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccentColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl AccentColor {
    pub const DEFAULT: AccentColor = AccentColor { r: 0x16, g: 0xa3, b: 0x49 };

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, 0xff]
    }
}

impl Default for AccentColor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for AccentColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex())
    }
}

impl FromStr for AccentColor {
    type Err = String;

    /// 接受 `#rrggbb` 或 `rrggbb`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let digits = raw.strip_prefix('#').unwrap_or(raw);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("无效颜色: {raw}（格式 #rrggbb）"));
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(AccentColor {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl Serialize for AccentColor {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for AccentColor {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 表单菜单动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Ssid,
    Password,
    Encryption,
    Logo,
    Color,
    Submit,
    ShowQr,
    Print,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_literals_match_payload_values() {
        for enc in Encryption::ALL {
            assert_eq!(enc.as_str().parse::<Encryption>().unwrap(), enc);
        }
        assert!("wpa2".parse::<Encryption>().is_err());
        assert_eq!(Encryption::default(), Encryption::Wpa2);
    }

    #[test]
    fn only_nopass_skips_password() {
        assert!(Encryption::Wpa2.needs_password());
        assert!(Encryption::Wep.needs_password());
        assert!(!Encryption::NoPass.needs_password());
    }

    #[test]
    fn accent_color_parses_with_or_without_hash() {
        let a: AccentColor = "#FF8000".parse().unwrap();
        let b: AccentColor = "ff8000".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hex(), "#ff8000");
        assert_eq!(AccentColor::default().hex(), "#16a349");
    }

    #[test]
    fn accent_color_rejects_garbage() {
        assert!("#12345".parse::<AccentColor>().is_err());
        assert!("#gggggg".parse::<AccentColor>().is_err());
        assert!("".parse::<AccentColor>().is_err());
    }

    #[test]
    fn password_policy_deserializes_kebab_case() {
        #[derive(Deserialize)]
        struct Wrap {
            p: PasswordPolicy,
        }
        let w: Wrap = toml::from_str(r#"p = "pass-through""#).unwrap();
        assert_eq!(w.p, PasswordPolicy::PassThrough);
    }
}
