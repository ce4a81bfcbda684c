// src/payload.rs — 凭据 → Wi-Fi QR 负载字符串

use crate::types::{Encryption, PasswordPolicy};
use crate::validate::ValidCredential;

/// 生成 `WIFI:T:<enc>;S:<ssid>;P:<password>;H:;`
///
/// 只接受校验过的凭据，没有错误路径。
pub fn encode(cred: &ValidCredential, policy: PasswordPolicy) -> String {
    let password = match (cred.encryption(), policy) {
        (Encryption::NoPass, PasswordPolicy::Clear) => "",
        _ => cred.password(),
    };

    // 转义 SSID/密码中的保留字符
    let ssid_esc = escape_wifi_field(cred.ssid());
    let pass_esc = escape_wifi_field(password);

    format!(
        "WIFI:T:{};S:{ssid_esc};P:{pass_esc};H:;",
        cred.encryption().as_str()
    )
}

/// 转义 Wi-Fi QR 格式中的保留字符（\ ; , : "）
fn escape_wifi_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        match c {
            '\\' | ';' | ',' | ':' | '"' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
