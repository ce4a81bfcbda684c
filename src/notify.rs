// src/notify.rs — 桌面通知，没有 notify-send 时退回日志

pub enum Urgency {
    Low,
    Critical,
}

pub fn send(urgency: Urgency, title: &str, body: &str) {
    let u = match urgency {
        Urgency::Low => "low",
        Urgency::Critical => "critical",
    };
    let ok = std::process::Command::new("notify-send")
        .args(["-a", "wifi-qr", "-u", u, &format!("Wi-Fi 二维码: {title}"), body])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if !ok {
        match urgency {
            Urgency::Critical => tracing::error!(%body, "{title}"),
            _ => tracing::info!(%body, "{title}"),
        }
    }
}

pub fn low(title: &str, body: &str) {
    send(Urgency::Low, title, body)
}

pub fn critical(title: &str, body: &str) {
    send(Urgency::Critical, title, body)
}
