// src/rofi.rs — 所有 rofi 调用封装

use crate::config::Config;
use crate::types::AccentColor;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// 通用 rofi dmenu，返回用户选择的行（去掉首尾空白），Esc 返回 None
pub async fn dmenu(
    items: &[String],
    prompt: &str,
    cfg: &Config,
    extra: &[&str], // 额外参数，如 -mesg、-a、-password
) -> Option<String> {
    let s = dmenu_raw(items, prompt, cfg, extra).await?;
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// 去掉 rofi 追加的换行，其余字符原样保留
fn strip_line_ending(out: &str) -> &str {
    out.trim_end_matches(['\n', '\r'])
}

/// 自由输入用：首尾空格也是 SSID/密码的一部分，只去掉行尾换行
async fn dmenu_raw(
    items: &[String],
    prompt: &str,
    cfg: &Config,
    extra: &[&str],
) -> Option<String> {
    let input = items.join("\n");
    let mut args = vec![
        "-dmenu".to_string(),
        "-p".to_string(),
        prompt.to_string(),
        "-font".to_string(),
        cfg.font.clone(),
        "-location".to_string(),
        cfg.position.to_string(),
        "-yoffset".to_string(),
        cfg.y_offset.to_string(),
        "-xoffset".to_string(),
        cfg.x_offset.to_string(),
    ];
    args.extend(extra.iter().map(|e| e.to_string()));

    // 打印流程里横幅会被中途收起，future 被 drop 时必须连带关掉 rofi
    let mut child = Command::new("rofi")
        .args(&args)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| tracing::warn!("无法启动 rofi: {e}"))
        .ok()?;

    // 写完候选项后 stdin 必须关闭，否则 rofi 一直等输入不渲染
    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(input.as_bytes()).await;
    }

    let out = child.wait_with_output().await.ok()?;
    if out.status.success() {
        let s = strip_line_ending(&String::from_utf8_lossy(&out.stdout)).to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    } else {
        None // 用户按了 Esc
    }
}

/// 用主题色给选中行着色
fn theme(accent: &AccentColor) -> String {
    format!(
        "element selected.normal {{ background-color: {0}; }} prompt {{ text-color: {0}; }}",
        accent.hex()
    )
}

/// 单行密码输入（显示为圆点）
pub async fn password_prompt(hint: &str, cfg: &Config) -> Option<String> {
    let prompt = format!(
        "🔒 密码{}: ",
        if hint.is_empty() {
            String::new()
        } else {
            format!(" ({hint})")
        }
    );
    dmenu_raw(&[], &prompt, cfg, &["-password", "-lines", "0"]).await
}

/// 单行文本输入
pub async fn input_prompt(prompt: &str, cfg: &Config) -> Option<String> {
    dmenu_raw(&[], prompt, cfg, &["-lines", "1"]).await
}

/// 只能从给定选项里选
pub async fn pick(items: &[String], prompt: &str, cfg: &Config) -> Option<String> {
    let lines = items.len().to_string();
    dmenu(items, prompt, cfg, &["-no-custom", "-lines", lines.as_str()]).await
}

/// 在 rofi -mesg 区域显示 UTF-8 二维码，下面附带若干可选行
pub async fn show_qr(
    title: &str,
    qr_text: &str,
    items: &[String],
    accent: &AccentColor,
    cfg: &Config,
) -> Option<String> {
    let qr_width = qr_text
        .lines()
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(40);
    let rofi_width = format!("-{}", qr_width + 4);
    let lines = items.len().max(1).to_string();
    let theme = theme(accent);

    let extra: Vec<&str> = vec![
        "-mesg",
        qr_text,
        "-lines",
        lines.as_str(),
        "-font",
        "Monospace 9",
        "-width",
        rofi_width.as_str(),
        "-no-custom",
        "-theme-str",
        theme.as_str(),
    ];
    dmenu(items, title, cfg, &extra).await
}

/// 打印模式的全屏提示：只显示横幅和二维码，没有可选项
pub async fn show_banner(banner: &str, qr_text: &str, accent: &AccentColor, cfg: &Config) {
    let mesg = format!("{banner}\n\n{qr_text}");
    let theme = format!("{} window {{ fullscreen: true; }}", theme(accent));
    let extra: Vec<&str> = vec![
        "-mesg",
        mesg.as_str(),
        "-lines",
        "0",
        "-font",
        "Monospace 9",
        "-no-custom",
        "-theme-str",
        theme.as_str(),
    ];
    let _ = dmenu(&[], "🖨", cfg, &extra).await;
}

/// 构建表单主菜单
pub async fn main_menu(
    items: &[String],
    prompt: &str,
    cfg: &Config,
    accent: &AccentColor,
    mesg: Option<&str>, // 顶部校验错误
) -> Option<String> {
    let width = items.iter().map(|s| s.chars().count()).max().unwrap_or(40) + 4;

    let mut extra: Vec<String> = vec![
        "-lines".into(),
        items.len().to_string(),
        "-width".into(),
        format!("-{width}"),
        "-no-custom".into(),
        "-theme-str".into(),
        theme(accent),
    ];
    if let Some(msg) = mesg {
        extra.push("-mesg".into());
        extra.push(msg.to_string());
    }

    let extra_refs: Vec<&str> = extra.iter().map(String::as_str).collect();
    dmenu(items, prompt, cfg, &extra_refs).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_uses_accent_hex() {
        let t = theme(&"#123456".parse().unwrap());
        assert!(t.contains("background-color: #123456;"));
    }

    #[test]
    fn free_text_keeps_surrounding_spaces() {
        assert_eq!(strip_line_ending(" secret12 \n"), " secret12 ");
        assert_eq!(strip_line_ending("  Home Net\r\n"), "  Home Net");
        assert_eq!(strip_line_ending("\n"), "");
    }
}
