// src/config.rs — 配置加载，支持文件覆盖

use crate::render::{DEFAULT_LOGO_SIZE, DEFAULT_QR_SIZE};
use crate::types::{AccentColor, Encryption, PasswordPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// rofi 字体
    pub font: String,
    /// rofi 窗口位置 (0–8, 同 rofi -location)
    pub position: u8,
    pub x_offset: i32,
    pub y_offset: i32,
    /// 表单默认加密类型
    pub encryption: Encryption,
    /// 未选择颜色时的主题色
    pub accent_color: AccentColor,
    /// nopass 时残留密码的处理方式
    pub password_policy: PasswordPolicy,
    /// 二维码边长（像素）
    pub qr_size: u32,
    /// logo 边长（像素）
    pub logo_size: u32,
    /// 进入打印模式后多久弹出打印对话框
    #[serde(with = "humantime_serde")]
    pub print_dialog_delay: Duration,
    /// 进入打印模式后多久显示"返回"
    #[serde(with = "humantime_serde")]
    pub back_delay: Duration,
    /// 打印命令，最后一个参数自动追加为打印页路径
    pub print_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font: "DejaVu Sans Mono 8".into(),
            position: 0,
            x_offset: 0,
            y_offset: 0,
            encryption: Encryption::Wpa2,
            accent_color: AccentColor::DEFAULT,
            password_policy: PasswordPolicy::Clear,
            qr_size: DEFAULT_QR_SIZE,
            logo_size: DEFAULT_LOGO_SIZE,
            print_dialog_delay: Duration::from_secs(2),
            back_delay: Duration::from_secs(4),
            print_command: vec!["lp".into()],
        }
    }
}

impl Config {
    /// 按优先级查找并加载配置文件
    pub fn load() -> Result<Self> {
        for path in &config_candidates() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Config::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置 {}", path.display()))?;
        let cfg: Config = toml::from_str(&text)
            .with_context(|| format!("配置格式错误 {}", path.display()))?;
        tracing::debug!(path = %path.display(), "已加载配置");
        Ok(cfg)
    }

    /// 打印页临时文件路径
    pub fn print_page_path() -> PathBuf {
        runtime_dir().join("wifi-qr-print.png")
    }
}

fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn config_candidates() -> Vec<PathBuf> {
    let mut v = vec![];
    // 同目录下的 config.toml
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            v.push(dir.join("config.toml"));
        }
    }
    // ~/.config/wifi-qr/config.toml
    if let Some(dir) = dirs::config_dir() {
        v.push(dir.join("wifi-qr/config.toml"));
    }
    v
}
