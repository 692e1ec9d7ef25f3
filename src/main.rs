// ==========================================
// PI 产能对账引擎 - 命令行入口
// ==========================================
// 用法:
//   pi-capacity-recon <capacity_file> <issues_file> <context>...
//                     [--config <file.json|file.db>] [--sheet <name>] [--log-json]
//
// 输出: 每个上下文一条 ContextRun，以 JSON 数组写到 stdout
// ==========================================

use anyhow::{bail, Context, Result};
use pi_capacity_recon::config::{ConfigManager, EngineConfig};
use pi_capacity_recon::importer::{load_issues, GridParser};
use pi_capacity_recon::{logging, ReconcileEngine, APP_NAME, VERSION};
use std::path::{Path, PathBuf};

const USAGE: &str = "用法: pi-capacity-recon <capacity_file> <issues_file> <context>... \
[--config <file.json|file.db>] [--sheet <name>] [--log-json]";

#[derive(Debug, Default)]
struct CliArgs {
    capacity_file: PathBuf,
    issues_file: PathBuf,
    contexts: Vec<String>,
    config: Option<PathBuf>,
    sheet: Option<String>,
    log_json: bool,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut positional = Vec::new();
    let mut args = args;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().context("--config 缺少参数")?;
                cli.config = Some(PathBuf::from(v));
            }
            "--sheet" => {
                cli.sheet = Some(args.next().context("--sheet 缺少参数")?);
            }
            "--log-json" => cli.log_json = true,
            "-h" | "--help" => bail!("{}", USAGE),
            _ => positional.push(arg),
        }
    }

    if positional.len() < 3 {
        bail!("{}", USAGE);
    }
    let mut positional = positional.into_iter();
    cli.capacity_file = positional.next().map(PathBuf::from).unwrap_or_default();
    cli.issues_file = positional.next().map(PathBuf::from).unwrap_or_default();
    cli.contexts = positional.collect();
    Ok(cli)
}

/// 默认配置库: <config_dir>/pi-capacity-recon/config.db
fn default_config_db() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME).join("config.db"))
        .filter(|path| path.exists())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = match path.map(Path::to_path_buf).or_else(default_config_db) {
        Some(p) => p,
        None => {
            tracing::info!("未指定配置，使用默认配置");
            return Ok(EngineConfig::default());
        }
    };

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config = if is_json {
        EngineConfig::from_json_file(&path)
            .map_err(|e| anyhow::anyhow!("读取配置文件失败 {}: {}", path.display(), e))?
    } else {
        let db_path = path.to_string_lossy();
        ConfigManager::new(&db_path)
            .and_then(|m| m.load_engine_config())
            .map_err(|e| anyhow::anyhow!("读取配置库失败 {}: {}", path.display(), e))?
    };

    tracing::info!(path = %path.display(), "配置加载完成");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = parse_args(std::env::args().skip(1))?;

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    tracing::info!(version = VERSION, "{} 启动", APP_NAME);

    let config = load_config(cli.config.as_deref())?;
    let engine = ReconcileEngine::new(config).context("引擎初始化失败")?;

    let grid = GridParser
        .parse(&cli.capacity_file, cli.sheet.as_deref())
        .with_context(|| format!("产能表读取失败: {}", cli.capacity_file.display()))?;
    let issues = load_issues(&cli.issues_file)
        .with_context(|| format!("工作项读取失败: {}", cli.issues_file.display()))?;

    let contexts: Vec<(String, Vec<_>)> = cli
        .contexts
        .iter()
        .map(|c| (c.clone(), engine.issues_for_context(&issues, c)))
        .collect();

    let runs = engine.run_contexts(&grid, &contexts);
    println!("{}", serde_json::to_string_pretty(&runs)?);
    Ok(())
}
