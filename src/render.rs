// src/render.rs — 用 qrcode crate 渲染 PNG / SVG / 终端块字符二维码

use crate::types::AccentColor;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use qrcode::render::{svg, unicode};
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_QR_SIZE: u32 = 328;
pub const DEFAULT_LOGO_SIZE: u32 = 120;

const LIGHT: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("负载无法编码为二维码: {0}")]
    Encode(#[from] QrError),
    #[error("图片编码失败: {0}")]
    Image(#[from] image::ImageError),
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Png,
    Svg,
    Term,
    Payload,
}

/// 交给渲染器的全部参数
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest<'a> {
    pub payload: &'a str,
    pub size: u32,
    pub error_correction_level: &'static str,
    pub foreground_color: AccentColor,
    pub overlay_image: Overlay<'a>,
}

/// logo 占位：没有 logo 时 opacity 为 0，位置仍然保留
#[derive(Debug, Serialize)]
pub struct Overlay<'a> {
    pub source: Option<&'a Path>,
    pub width: u32,
    pub height: u32,
    pub opacity: u8,
    #[serde(skip)]
    pub image: Option<&'a DynamicImage>,
}

impl Overlay<'_> {
    fn visible_image(&self) -> Option<&DynamicImage> {
        if self.opacity == 0 {
            None
        } else {
            self.image
        }
    }
}

fn qr_code(payload: &str) -> Result<QrCode, RenderError> {
    Ok(QrCode::with_error_correction_level(
        payload.as_bytes(),
        EcLevel::H,
    )?)
}

/// 渲染为 size×size 的彩色位图，logo 居中叠加（不挖空）
pub fn render_png(req: &RenderRequest<'_>) -> Result<RgbaImage, RenderError> {
    let code = qr_code(req.payload)?;
    let raw = code
        .render::<Rgba<u8>>()
        .dark_color(Rgba(req.foreground_color.rgba()))
        .light_color(LIGHT)
        .quiet_zone(true)
        .min_dimensions(req.size, req.size)
        .build();

    // 模块尺寸只能取整数，最后统一缩放到精确尺寸
    let mut canvas = if raw.width() == req.size && raw.height() == req.size {
        raw
    } else {
        imageops::resize(&raw, req.size, req.size, FilterType::Nearest)
    };

    if let Some(logo) = req.overlay_image.visible_image() {
        let (w, h) = (req.overlay_image.width, req.overlay_image.height);
        let scaled = logo.resize_exact(w, h, FilterType::Lanczos3).to_rgba8();
        let x = (req.size.saturating_sub(w) / 2) as i64;
        let y = (req.size.saturating_sub(h) / 2) as i64;
        imageops::overlay(&mut canvas, &scaled, x, y);
    }

    tracing::debug!(size = req.size, logo = req.overlay_image.opacity, "二维码位图已生成");
    Ok(canvas)
}

pub fn png_bytes(img: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img.clone()).write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// SVG 只画码点，不嵌入 logo
pub fn render_svg(req: &RenderRequest<'_>) -> Result<String, RenderError> {
    if req.overlay_image.visible_image().is_some() {
        tracing::warn!("SVG 输出不包含 logo，需要 logo 请用 PNG");
    }
    let code = qr_code(req.payload)?;
    let dark = req.foreground_color.hex();
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(req.size, req.size)
        .dark_color(svg::Color(&dark))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// 生成终端/rofi 用的 UTF-8 块字符二维码
pub fn render_terminal(payload: &str) -> Result<String, RenderError> {
    let code = qr_code(payload)?;
    let image = code
        .render::<unicode::Dense1x2>()
        .quiet_zone(true)
        .build();

    // 每行加两个前导空格，rofi 显示时稍微居中
    let padded = image
        .lines()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(padded)
}

/// 按格式输出字节
pub fn render_bytes(format: OutputFormat, req: &RenderRequest<'_>) -> Result<Vec<u8>, RenderError> {
    match format {
        OutputFormat::Png => png_bytes(&render_png(req)?),
        OutputFormat::Svg => Ok(render_svg(req)?.into_bytes()),
        OutputFormat::Term => Ok(render_terminal(req.payload)?.into_bytes()),
        OutputFormat::Payload => Ok(req.payload.as_bytes().to_vec()),
    }
}
