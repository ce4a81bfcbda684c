// src/output.rs — 原子写输出文件，打印程序不会读到写一半的图片

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// 先写临时文件再 rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("无法创建目录 {}", dir.display()))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).with_context(|| format!("无法写入 {}", tmp.display()))?;
    std::fs::rename(&tmp, path)?; // 原子替换
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "已写出");
    Ok(())
}

/// 没有指定输出文件时写到 stdout
pub fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(bytes)?;
    if !bytes.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
