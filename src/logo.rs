// src/logo.rs — 用户上传的 logo，同一时间只持有一张

use anyhow::{bail, Context, Result};
use image::DynamicImage;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

/// 文件选择器只放行图片类型
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub struct Logo {
    pub path: PathBuf,
    pub image: DynamicImage,
}

/// 单槽位：选新文件前先释放旧的
#[derive(Default)]
pub struct LogoSlot {
    current: Option<Logo>,
}

impl LogoSlot {
    pub fn get(&self) -> Option<&Logo> {
        self.current.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }

    /// 读入新 logo。失败时保留原来的 logo 不变
    pub fn select(&mut self, path: &Path) -> Result<()> {
        if !has_image_extension(path) {
            bail!("不支持的图片类型: {}", path.display());
        }
        let image = image::open(path)
            .with_context(|| format!("无法读取图片 {}", path.display()))?;

        self.release();
        tracing::debug!(path = %path.display(), w = image.width(), h = image.height(), "logo 已载入");
        self.current = Some(Logo {
            path: path.to_path_buf(),
            image,
        });
        Ok(())
    }

    /// 丢弃当前 logo
    pub fn release(&mut self) {
        if let Some(old) = self.current.take() {
            tracing::debug!(path = %old.path.display(), "释放旧 logo");
        }
    }
}

impl Serialize for LogoSlot {
    /// 视图状态里只记录路径
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match &self.current {
            Some(logo) => s.serialize_some(&logo.path),
            None => s.serialize_none(),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
