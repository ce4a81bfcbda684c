// src/form.rs — 表单 + 视图状态，所有变化都走这里的转移函数

use crate::config::Config;
use crate::logo::LogoSlot;
use crate::payload;
use crate::print::{PrintEvent, PrintPhase};
use crate::render::{Overlay, RenderRequest};
use crate::types::{AccentColor, Encryption, PasswordPolicy};
use crate::validate::{self, Field, FieldError, FormValues, ValidationErrors};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// 整个界面的可序列化状态
#[derive(Serialize)]
pub struct ViewState {
    pub values: FormValues,
    /// nopass 时密码框禁用
    pub password_enabled: bool,
    pub errors: Vec<FieldError>,
    /// 最近一次成功提交的负载
    pub payload: Option<String>,
    pub accent: AccentColor,
    pub logo: LogoSlot,
    pub print: PrintPhase,
    pub policy: PasswordPolicy,
    #[serde(skip)]
    qr_size: u32,
    #[serde(skip)]
    logo_size: u32,
    // 提交过一次之后，每次改动都实时重新校验
    #[serde(skip)]
    submitted: bool,
}

impl ViewState {
    pub fn new(cfg: &Config) -> Self {
        let mut values = FormValues::default();
        values.credential.encryption = cfg.encryption;
        Self {
            values,
            password_enabled: cfg.encryption.needs_password(),
            errors: vec![],
            payload: None,
            accent: cfg.accent_color,
            logo: LogoSlot::default(),
            print: PrintPhase::Editing,
            policy: cfg.password_policy,
            qr_size: cfg.qr_size,
            logo_size: cfg.logo_size,
            submitted: false,
        }
    }

    pub fn error_for(&self, field: Field) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    pub fn set_ssid(&mut self, ssid: &str) {
        self.values.credential.ssid = ssid.to_string();
        self.revalidate();
    }

    /// 密码框禁用时忽略输入
    pub fn set_password(&mut self, password: &str) {
        if !self.password_enabled {
            tracing::debug!("密码框已禁用，忽略输入");
            return;
        }
        self.values.credential.password = password.to_string();
        self.revalidate();
    }

    pub fn set_encryption(&mut self, encryption: Encryption) {
        self.values.credential.encryption = encryption;
        self.password_enabled = encryption.needs_password();
        if !self.password_enabled && self.policy == PasswordPolicy::Clear {
            self.values.credential.password.clear();
        }
        self.revalidate();
    }

    /// 颜色合法时立即生效（界面着色），否则只留给校验报错
    pub fn set_accent(&mut self, raw: &str) {
        let raw = raw.trim();
        if raw.is_empty() {
            self.values.accent = None;
        } else {
            if let Ok(color) = raw.parse() {
                self.accent = color;
            }
            self.values.accent = Some(raw.to_string());
        }
        self.revalidate();
    }

    pub fn select_logo(&mut self, path: &Path) -> Result<()> {
        self.logo.select(path)
    }

    /// 校验通过才重新编码；失败时保留旧负载
    pub fn submit(&mut self) -> Result<&str, ValidationErrors> {
        self.submitted = true;
        let sub = validate::validate(&self.values).inspect_err(|e| {
            self.errors = e.0.clone();
        })?;
        self.errors.clear();
        if self.values.accent.is_some() {
            self.accent = sub.accent;
        }
        let encoded = payload::encode(&sub.credential, self.policy);
        tracing::info!(ssid = sub.credential.ssid(), encryption = %sub.credential.encryption(), "二维码已更新");
        Ok(self.payload.insert(encoded).as_str())
    }

    pub fn apply_print(&mut self, event: PrintEvent) -> PrintPhase {
        let next = self.print.next(event);
        if next != self.print {
            tracing::debug!(from = ?self.print, to = ?next, ?event, "打印状态切换");
        }
        self.print = next;
        next
    }

    /// 还没有成功提交过时返回 None
    pub fn render_request(&self) -> Option<RenderRequest<'_>> {
        let payload = self.payload.as_deref()?;
        let logo = self.logo.get();
        Some(RenderRequest {
            payload,
            size: self.qr_size,
            error_correction_level: "H",
            foreground_color: self.accent,
            overlay_image: Overlay {
                source: logo.map(|l| l.path.as_path()),
                width: self.logo_size,
                height: self.logo_size,
                opacity: u8::from(logo.is_some()),
                image: logo.map(|l| &l.image),
            },
        })
    }

    fn revalidate(&mut self) {
        if !self.submitted {
            return;
        }
        self.errors = match validate::validate(&self.values) {
            Ok(_) => vec![],
            Err(e) => e.0,
        };
    }
}
