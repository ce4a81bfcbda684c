// src/main.rs — 主入口 & 表单菜单逻辑
mod config;
mod form;
mod logo;
mod notify;
mod output;
mod payload;
mod print;
mod render;
mod rofi;
mod types;
mod validate;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::Config;
use form::ViewState;
use print::{PrintDelays, PrintEvent, PrintFlow, SystemPrinter};
use render::OutputFormat;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use types::{Encryption, MenuAction, PasswordPolicy};
use validate::{Field, ValidationErrors};

/// 打印模式的全屏提示
const BANNER: &str = "📶 对准二维码扫码，即可连接 Wi-Fi";

// ════════════════════════════════════════════════════════════════
// CLI 参数
// ════════════════════════════════════════════════════════════════

#[derive(Parser)]
#[command(name = "wifi-qr", about = "Wi-Fi 连接二维码生成器", version)]
struct Cli {
    /// 指定配置文件（默认按顺序查找）
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// 校验并生成二维码
    Generate(GenerateArgs),
    /// 在终端走一遍打印流程
    Print(FormArgs),
}

#[derive(Args)]
struct FormArgs {
    /// 网络名称（至少 2 个字符）
    #[arg(long)]
    ssid: String,
    /// 密码（WPA2/WEP 至少 8 个字符）
    #[arg(long)]
    password: Option<String>,
    /// WPA2 | WEP | nopass
    #[arg(long)]
    encryption: Option<Encryption>,
    /// 叠加在二维码中央的 logo
    #[arg(long)]
    logo: Option<PathBuf>,
    /// 二维码颜色 #rrggbb
    #[arg(long)]
    color: Option<String>,
    /// nopass 时残留密码的处理: clear | pass-through
    #[arg(long)]
    policy: Option<PasswordPolicy>,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    form: FormArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Term)]
    format: OutputFormat,
    /// 输出文件，缺省写到 stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// 只输出渲染参数（JSON）
    #[arg(long)]
    json: bool,
}

// ════════════════════════════════════════════════════════════════
// 入口
// ════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("配置加载失败，使用默认值: {e:#}");
            Config::default()
        }),
    };

    // Ctrl-C 取消所有挂起的打印定时器；再按一次直接退出
    let root = CancellationToken::new();
    let root_clone = root.clone();
    ctrlc::set_handler(move || {
        if root_clone.is_cancelled() {
            std::process::exit(130);
        }
        root_clone.cancel();
    })
    .unwrap_or_else(|e| tracing::warn!("无法注册 Ctrl-C 处理，打印定时器不会被中断: {e}"));

    match cli.cmd {
        Some(Cmd::Generate(args)) => generate(&cfg, args)?,
        Some(Cmd::Print(args)) => print_in_terminal(&cfg, args, root).await?,
        None => run_form(&cfg, root).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ════════════════════════════════════════════════════════════════
// 非交互：generate / print
// ════════════════════════════════════════════════════════════════

/// 把命令行参数灌进表单状态（先加密类型，再密码，与界面操作顺序一致）
fn build_view(cfg: &Config, args: &FormArgs) -> Result<ViewState> {
    let mut cfg = cfg.clone();
    if let Some(policy) = args.policy {
        cfg.password_policy = policy;
    }
    let mut view = ViewState::new(&cfg);
    if let Some(enc) = args.encryption {
        view.set_encryption(enc);
    }
    view.set_ssid(&args.ssid);
    if let Some(pass) = &args.password {
        view.set_password(pass);
    }
    if let Some(color) = &args.color {
        view.set_accent(color);
    }
    if let Some(logo) = &args.logo {
        view.select_logo(logo)?;
    }
    Ok(view)
}

fn submit_or_report(view: &mut ViewState) -> Result<()> {
    if let Err(errs) = view.submit() {
        report_errors(&errs);
        return Err(errs.into());
    }
    Ok(())
}

fn report_errors(errs: &ValidationErrors) {
    for e in &errs.0 {
        eprintln!("  ✗ {}: {}", field_label(e.field), e.message);
    }
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::Ssid => "网络名称",
        Field::Password => "密码",
        Field::Accent => "颜色",
    }
}

fn generate(cfg: &Config, args: GenerateArgs) -> Result<()> {
    let mut view = build_view(cfg, &args.form)?;
    submit_or_report(&mut view)?;
    let req = view.render_request().context("没有可渲染的二维码")?;

    if args.json {
        let json = serde_json::to_string_pretty(&req)?;
        return output::write_stdout(json.as_bytes());
    }

    let bytes = render::render_bytes(args.format, &req)?;
    match (&args.output, args.format) {
        (Some(path), _) => {
            output::write_atomic(path, &bytes)?;
            tracing::info!(path = %path.display(), "二维码已保存");
        }
        (None, OutputFormat::Png) => bail!("PNG 输出需要 --output 指定文件"),
        (None, _) => output::write_stdout(&bytes)?,
    }
    Ok(())
}

/// 渲染打印页，返回 (打印页路径, 块字符二维码)
fn prepare_print_page(view: &ViewState) -> Result<(PathBuf, String)> {
    let req = view.render_request().context("请先生成二维码")?;
    let page = Config::print_page_path();
    let png = render::png_bytes(&render::render_png(&req)?)?;
    output::write_atomic(&page, &png)?;
    Ok((page, render::render_terminal(req.payload)?))
}

async fn print_in_terminal(cfg: &Config, args: FormArgs, root: CancellationToken) -> Result<()> {
    let mut view = build_view(cfg, &args)?;
    submit_or_report(&mut view)?;
    let (page, qr_text) = prepare_print_page(&view)?;

    view.apply_print(PrintEvent::Print);
    println!("\n{BANNER}\n\n{qr_text}\n");

    let mut flow = PrintFlow::new(PrintDelays::from(cfg), root.clone());
    flow.arm();
    let printer = SystemPrinter::new(cfg.print_command.clone());
    if !print::drive_to_ready(&mut flow, &mut view, &printer, &page).await {
        tracing::info!("打印流程已取消");
        return Ok(());
    }

    println!("↩  按 Enter 返回");
    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        _ = root.cancelled() => return Ok(()),
        res = stdin.read_line(&mut line) => { res?; }
    }
    view.apply_print(PrintEvent::Back);
    flow.cancel();
    tracing::debug!(phase = ?view.print, "已返回编辑");
    Ok(())
}

// ════════════════════════════════════════════════════════════════
// 交互：rofi 表单
// ════════════════════════════════════════════════════════════════

async fn run_form(cfg: &Config, root: CancellationToken) -> Result<()> {
    let mut view = ViewState::new(cfg);
    let mut flow = PrintFlow::new(PrintDelays::from(cfg), root.clone());
    let printer = SystemPrinter::new(cfg.print_command.clone());

    while !root.is_cancelled() {
        let items = menu_items(&view);
        let mesg = error_summary(&view);
        // 主菜单按 Esc → 退出程序
        let Some(choice) =
            rofi::main_menu(&items, "📶 Wi-Fi 二维码: ", cfg, &view.accent, mesg.as_deref()).await
        else {
            break;
        };
        let Some(action) = parse_action(&choice) else {
            continue;
        };

        match action {
            MenuAction::Ssid => {
                if let Some(s) = rofi::input_prompt("📶 网络名称（至少 2 个字符）: ", cfg).await {
                    view.set_ssid(&s);
                }
            }
            MenuAction::Password => {
                if !view.password_enabled {
                    notify::low("提示", "开放网络不需要密码");
                    continue;
                }
                if let Some(p) = rofi::password_prompt("至少 8 位", cfg).await {
                    view.set_password(&p);
                }
            }
            MenuAction::Encryption => {
                let labels: Vec<String> = Encryption::ALL.iter().map(|e| e.label().to_string()).collect();
                if let Some(sel) = rofi::pick(&labels, "🔐 加密方式: ", cfg).await {
                    if let Some(enc) = Encryption::ALL.into_iter().find(|e| e.label() == sel) {
                        view.set_encryption(enc);
                    }
                }
            }
            MenuAction::Logo => {
                let Some(input) = rofi::input_prompt("🖼 logo 路径（png/jpg/gif/webp）: ", cfg).await else {
                    continue;
                };
                if let Err(e) = view.select_logo(&expand_home(&input)) {
                    notify::critical("logo 载入失败", &format!("{e:#}"));
                }
            }
            MenuAction::Color => {
                if let Some(c) = rofi::input_prompt("🎨 颜色 (#rrggbb): ", cfg).await {
                    view.set_accent(&c);
                }
            }
            // 校验失败时错误直接显示在菜单里
            MenuAction::Submit => {
                if view.submit().is_ok() {
                    show_qr_view(&view, cfg).await?;
                }
            }
            MenuAction::ShowQr => show_qr_view(&view, cfg).await?,
            MenuAction::Print => run_print(&mut view, &mut flow, &printer, cfg).await?,
        }
    }

    Ok(())
}

fn menu_items(view: &ViewState) -> Vec<String> {
    let err = |f: Field| {
        view.error_for(f)
            .map(|e| format!("  ⚠ {}", e.message))
            .unwrap_or_default()
    };
    let cred = &view.values.credential;

    let ssid = if cred.ssid.is_empty() {
        "（未填写）".to_string()
    } else {
        cred.ssid.clone()
    };
    let pass = if !view.password_enabled {
        "（开放网络，无需密码）".to_string()
    } else if cred.password.is_empty() {
        "（未填写）".to_string()
    } else {
        "•".repeat(cred.password.chars().count())
    };
    let logo = view
        .logo
        .get()
        .map(|l| l.path.display().to_string())
        .unwrap_or_else(|| "无".into());
    let color = view
        .values
        .accent
        .clone()
        .unwrap_or_else(|| view.accent.hex());

    let mut items = vec![
        format!("📶 网络名称: {ssid}{}", err(Field::Ssid)),
        format!("🔒 密码: {pass}{}", err(Field::Password)),
        format!("🔐 加密: {}", cred.encryption.label()),
        format!("🖼 logo: {logo}"),
        format!("🎨 颜色: {color}{}", err(Field::Accent)),
        "✅ 生成二维码".to_string(),
    ];
    if view.payload.is_some() {
        items.push("📷 查看二维码".into());
        if view.print.print_action_visible() {
            items.push("🖨 打印二维码".into());
        }
    }
    items
}

fn parse_action(choice: &str) -> Option<MenuAction> {
    let action = match choice.trim() {
        s if s.starts_with("📶") => MenuAction::Ssid,
        s if s.starts_with("🔒") => MenuAction::Password,
        s if s.starts_with("🔐") => MenuAction::Encryption,
        s if s.starts_with("🖼") => MenuAction::Logo,
        s if s.starts_with("🎨") => MenuAction::Color,
        s if s.starts_with("✅") => MenuAction::Submit,
        s if s.starts_with("📷") => MenuAction::ShowQr,
        s if s.starts_with("🖨") => MenuAction::Print,
        _ => return None,
    };
    Some(action)
}

fn error_summary(view: &ViewState) -> Option<String> {
    if view.errors.is_empty() {
        return None;
    }
    Some(
        view.errors
            .iter()
            .map(|e| format!("⚠ {}: {}", field_label(e.field), e.message))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

fn expand_home(input: &str) -> PathBuf {
    let input = input.trim();
    match (input.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(input),
    }
}

async fn show_qr_view(view: &ViewState, cfg: &Config) -> Result<()> {
    let Some(req) = view.render_request() else {
        return Ok(());
    };
    let qr_text = render::render_terminal(req.payload)?;
    let title = format!("📷 {}", view.values.credential.ssid);
    let close = vec!["── 按 Esc 或 Enter 关闭 ──".to_string()];
    // 二维码页按 Esc → 回主菜单
    let _ = rofi::show_qr(&title, &qr_text, &close, &view.accent, cfg).await;
    Ok(())
}

async fn run_print(
    view: &mut ViewState,
    flow: &mut PrintFlow,
    printer: &SystemPrinter,
    cfg: &Config,
) -> Result<()> {
    let (page, qr_text) = prepare_print_page(view)?;
    let accent = view.accent;

    view.apply_print(PrintEvent::Print);
    flow.arm();

    // 横幅和定时器并行；横幅被 Esc 关掉也要等流程走完
    let ready = {
        let banner = rofi::show_banner(BANNER, &qr_text, &accent, cfg);
        let drive = print::drive_to_ready(flow, view, printer, &page);
        tokio::pin!(banner);
        tokio::pin!(drive);
        tokio::select! {
            ready = &mut drive => ready,
            _ = &mut banner => (&mut drive).await,
        }
    };
    if !ready {
        return Ok(());
    }

    // "返回"出现；选中或 Esc 都回到编辑
    let back = vec!["↩ 返回".to_string()];
    let _ = rofi::show_qr(&format!("🖨 {BANNER}"), &qr_text, &back, &accent, cfg).await;
    view.apply_print(PrintEvent::Back);
    flow.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_args_parse() {
        let cli = Cli::try_parse_from([
            "wifi-qr",
            "generate",
            "--ssid",
            "HomeNet",
            "--password",
            "letmein123",
            "--encryption",
            "WEP",
            "--format",
            "payload",
        ])
        .unwrap();
        let Some(Cmd::Generate(args)) = cli.cmd else {
            panic!("expected generate");
        };
        assert_eq!(args.form.encryption, Some(Encryption::Wep));
        assert_eq!(args.format, OutputFormat::Payload);
    }

    #[test]
    fn bad_encryption_is_rejected_by_cli() {
        assert!(Cli::try_parse_from(["wifi-qr", "generate", "--ssid", "x", "--encryption", "WPA3"]).is_err());
    }

    fn args(ssid: &str, password: Option<&str>, encryption: Option<Encryption>) -> FormArgs {
        FormArgs {
            ssid: ssid.into(),
            password: password.map(str::to_string),
            encryption,
            logo: None,
            color: None,
            policy: None,
        }
    }

    #[test]
    fn build_view_applies_encryption_before_password() {
        let mut view = build_view(&Config::default(), &args("OpenCafe", Some("stale-pass"), Some(Encryption::NoPass))).unwrap();
        assert!(view.values.credential.password.is_empty());
        assert_eq!(view.submit().unwrap(), "WIFI:T:nopass;S:OpenCafe;P:;H:;");
    }

    #[test]
    fn build_view_respects_policy_flag() {
        let mut a = args("OpenCafe", None, Some(Encryption::NoPass));
        a.policy = Some(PasswordPolicy::PassThrough);
        let view = build_view(&Config::default(), &a).unwrap();
        assert_eq!(view.policy, PasswordPolicy::PassThrough);
    }

    #[test]
    fn menu_shows_print_only_after_submit() {
        let mut view = build_view(&Config::default(), &args("HomeNet", Some("letmein123"), None)).unwrap();
        assert!(!menu_items(&view).iter().any(|i| i.starts_with("🖨")));
        view.submit().unwrap();
        let items = menu_items(&view);
        assert!(items.iter().any(|i| i.starts_with("🖨")));
        assert!(items[1].contains("••••••••••"));

        view.apply_print(PrintEvent::Print);
        assert!(!menu_items(&view).iter().any(|i| i.starts_with("🖨")));
    }

    #[test]
    fn menu_marks_field_errors_inline() {
        let mut view = build_view(&Config::default(), &args("x", Some("short"), None)).unwrap();
        assert!(view.submit().is_err());
        let items = menu_items(&view);
        assert!(items[0].contains("⚠"));
        assert!(items[1].contains("⚠"));
        assert!(error_summary(&view).unwrap().contains("网络名称"));
    }

    #[test]
    fn every_menu_line_maps_to_an_action() {
        let mut view = build_view(&Config::default(), &args("HomeNet", Some("letmein123"), None)).unwrap();
        view.submit().unwrap();
        let actions: Vec<_> = menu_items(&view).iter().filter_map(|i| parse_action(i)).collect();
        assert_eq!(
            actions,
            vec![
                MenuAction::Ssid,
                MenuAction::Password,
                MenuAction::Encryption,
                MenuAction::Logo,
                MenuAction::Color,
                MenuAction::Submit,
                MenuAction::ShowQr,
                MenuAction::Print,
            ]
        );
        assert_eq!(parse_action("garbage"), None);
    }

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        assert_eq!(expand_home(" /tmp/logo.png "), PathBuf::from("/tmp/logo.png"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/logo.png"), home.join("logo.png"));
        }
    }

    #[test]
    fn generate_writes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("qr.png");
        let args = GenerateArgs {
            form: args("HomeNet", Some("letmein123"), None),
            format: OutputFormat::Png,
            output: Some(out.clone()),
            json: false,
        };
        generate(&Config::default(), args).unwrap();
        let img = image::open(&out).unwrap();
        assert_eq!((img.width(), img.height()), (328, 328));
    }

    #[test]
    fn generate_refuses_invalid_form() {
        let args = GenerateArgs {
            form: args("x", None, None),
            format: OutputFormat::Payload,
            output: None,
            json: false,
        };
        let err = generate(&Config::default(), args).unwrap_err();
        assert!(err.downcast_ref::<ValidationErrors>().is_some());
    }

    #[test]
    fn prints_need_a_payload_first() {
        let view = ViewState::new(&Config::default());
        assert!(prepare_print_page(&view).is_err());
    }
}
