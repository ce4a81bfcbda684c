// src/validate.rs — 表单校验规则表，通过后才能拿到 ValidCredential

use crate::types::{AccentColor, Encryption, WifiCredential};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SSID_MIN_LEN: usize = 2;
pub const PASSWORD_MIN_LEN: usize = 8;

/// 表单字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Ssid,
    Password,
    Accent,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Ssid => "ssid",
            Field::Password => "password",
            Field::Accent => "accent",
        };
        f.write_str(name)
    }
}

/// 提交时的全部原始输入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormValues {
    #[serde(flatten)]
    pub credential: WifiCredential,
    /// None 表示使用默认主题色
    pub accent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: Field,
    pub rule: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("表单有 {} 处错误: {}", .0.len(), join_errors(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn for_field(&self, field: Field) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }
}

fn join_errors(errs: &[FieldError]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 已通过校验的凭据，只能由 [`validate`] 构造
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCredential {
    ssid: String,
    password: String,
    encryption: Encryption,
}

impl ValidCredential {
    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn encryption(&self) -> Encryption {
        self.encryption
    }
}

/// 校验成功的提交结果
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub credential: ValidCredential,
    pub accent: AccentColor,
}

/// 一条具名规则：返回 Some(消息) 表示失败
pub struct Rule {
    pub name: &'static str,
    pub field: Field,
    check: fn(&FormValues) -> Option<String>,
}

// 规则表。密码规则是唯一的跨字段规则，依赖 encryption 的当前值
pub static SCHEMA: &[Rule] = &[
    Rule {
        name: "ssid_min_len",
        field: Field::Ssid,
        check: ssid_min_len,
    },
    Rule {
        name: "password_min_len_unless_open",
        field: Field::Password,
        check: password_min_len_unless_open,
    },
    Rule {
        name: "accent_color_format",
        field: Field::Accent,
        check: accent_color_format,
    },
];

fn ssid_min_len(v: &FormValues) -> Option<String> {
    (v.credential.ssid.chars().count() < SSID_MIN_LEN)
        .then(|| format!("至少 {SSID_MIN_LEN} 个字符"))
}

fn password_min_len_unless_open(v: &FormValues) -> Option<String> {
    if !v.credential.encryption.needs_password() {
        return None;
    }
    (v.credential.password.chars().count() < PASSWORD_MIN_LEN)
        .then(|| format!("至少 {PASSWORD_MIN_LEN} 个字符"))
}

fn accent_color_format(v: &FormValues) -> Option<String> {
    let raw = v.accent.as_deref()?;
    raw.parse::<AccentColor>().err()
}

/// 按规则表逐条检查，收集所有失败字段
pub fn validate(values: &FormValues) -> Result<Submission, ValidationErrors> {
    let errors: Vec<FieldError> = SCHEMA
        .iter()
        .filter_map(|rule| {
            (rule.check)(values).map(|message| FieldError {
                field: rule.field,
                rule: rule.name,
                message,
            })
        })
        .collect();

    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "表单校验未通过");
        return Err(ValidationErrors(errors));
    }

    let accent = match values.accent.as_deref() {
        Some(raw) => raw.parse().unwrap_or_default(),
        None => AccentColor::default(),
    };
    Ok(Submission {
        credential: ValidCredential {
            ssid: values.credential.ssid.clone(),
            password: values.credential.password.clone(),
            encryption: values.credential.encryption,
        },
        accent,
    })
}
