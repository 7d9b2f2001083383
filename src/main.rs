// ==========================================
// 质检点检表管理系统 - 命令行入口
// ==========================================
// 用法: qc-inspection [--db <path>] [--actor <name>] <command>
// 数据库路径: --db > QC_INSPECTION_DB_PATH > 用户数据目录
// ==========================================

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use qc_inspection::app::{get_default_db_path, AppState};
use qc_inspection::domain::{ChecklistFilter, ChecklistStatus, NewChecklist, SaveInspectionRequest};
use qc_inspection::export::ExportFormat;
use qc_inspection::logging;

#[derive(Parser)]
#[command(name = "qc-inspection")]
#[command(about = "质检点检表管理系统 - 检验编码 / 点检数据 / 报表导出", long_about = None)]
#[command(version)]
struct Cli {
    /// 数据库文件路径
    #[arg(long, global = true, env = "QC_INSPECTION_DB_PATH")]
    db: Option<String>,

    /// 操作人（写入审计日志）
    #[arg(long, global = true, env = "QC_INSPECTION_ACTOR", default_value = "system")]
    actor: String,

    /// 日志输出为 JSON 行
    #[arg(long, global = true, env = "QC_INSPECTION_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化数据库（建表，幂等）
    Init,

    /// 创建点检表并分配检验编码
    Create {
        #[arg(long)]
        fg_code: String,
        #[arg(long)]
        item_name: String,
        #[arg(long)]
        customer: String,
        /// 工厂代码（2 位）
        #[arg(long)]
        plant: String,
        #[arg(long)]
        process: String,
        /// 机台区域
        #[arg(long)]
        zone: String,
        #[arg(long)]
        machine_name: Option<String>,
        #[arg(long)]
        so_number: Option<String>,
        #[arg(long)]
        customer_code: Option<String>,
        #[arg(long)]
        production_order: Option<String>,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        film_type: Option<String>,
    },

    /// 整批保存点检数据（JSON 请求文件）
    Save {
        #[arg(long)]
        file: PathBuf,
    },

    /// 完成点检表
    Complete { id: i64 },

    /// 取消点检表
    Cancel { id: i64 },

    /// 删除点检表（含全部记录）
    Delete { id: i64 },

    /// 点检表列表
    List {
        /// Active / Completed / Cancelled
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        fg_code: Option<String>,
        /// 创建日期起 (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// 创建日期止 (YYYY-MM-DD，含当天)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// 点检记录（含测量数据）
    Records { id: i64 },

    /// 操作日志
    History { id: i64 },

    /// 检验编码查询
    Codes {
        #[arg(long)]
        plant: Option<String>,
        #[arg(long)]
        zone: Option<String>,
        /// 日期 (YYYY-MM-DD)，默认今天
        #[arg(long)]
        date: Option<NaiveDate>,
        /// 预览下一个编码（不占用）
        #[arg(long)]
        preview: bool,
    },

    /// 导出报表
    Export {
        id: i64,
        #[arg(long, value_enum, default_value = "xlsx")]
        format: FormatArg,
        /// 输出目录，默认取配置 export.dir
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// 查看 / 修改配置
    Config {
        key: Option<String>,
        value: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    PivotCsv,
    FlatCsv,
    Xlsx,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::PivotCsv => ExportFormat::PivotCsv,
            FormatArg::FlatCsv => ExportFormat::FlatCsv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::debug!(db_path = %db_path, version = qc_inspection::VERSION, "启动");

    let state = AppState::new(&db_path).map_err(anyhow::Error::msg)?;
    run(&state, &cli.actor, cli.command)
}

fn run(state: &AppState, actor: &str, command: Commands) -> Result<()> {
    let api = &state.checklist_api;

    match command {
        Commands::Init => {
            println!("数据库已就绪: {}", state.db_path);
        }
        Commands::Create {
            fg_code,
            item_name,
            customer,
            plant,
            process,
            zone,
            machine_name,
            so_number,
            customer_code,
            production_order,
            size,
            film_type,
        } => {
            let request = NewChecklist {
                fg_code,
                item_name,
                customer,
                plant,
                process,
                machine_zone: zone,
                machine_name,
                so_number,
                customer_code,
                production_order,
                size,
                type_of_film: film_type,
                ..Default::default()
            };
            print_json(&api.create_checklist(request, actor)?)?;
        }
        Commands::Save { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("无法读取请求文件: {}", file.display()))?;
            let request: SaveInspectionRequest =
                serde_json::from_str(&raw).context("请求文件格式错误")?;
            print_json(&api.save_inspection_batch(&request, actor)?)?;
        }
        Commands::Complete { id } => print_json(&api.complete_checklist(id, actor)?)?,
        Commands::Cancel { id } => print_json(&api.cancel_checklist(id, actor)?)?,
        Commands::Delete { id } => {
            let deleted = api.delete_checklist(id, actor)?;
            println!("已删除: {}", deleted.inspect_code);
        }
        Commands::List {
            status,
            fg_code,
            from,
            to,
            limit,
        } => {
            let status = match status {
                Some(s) => match ChecklistStatus::from_db_str(s.trim()) {
                    Some(parsed) => Some(parsed),
                    None => bail!("未知状态: {}（允许值: Active/Completed/Cancelled）", s),
                },
                None => None,
            };
            let filter = ChecklistFilter {
                status,
                fg_code,
                created_from: from,
                created_to: to,
                limit,
            };
            print_json(&api.list_checklists(&filter)?)?;
        }
        Commands::Records { id } => print_json(&api.get_records(id)?)?,
        Commands::History { id } => print_json(&api.get_action_logs(id)?)?,
        Commands::Codes {
            plant,
            zone,
            date,
            preview,
        } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            match (plant, zone) {
                (Some(plant), Some(zone)) if preview => {
                    println!("{}", api.preview_code(&plant, &zone, date)?);
                }
                (Some(plant), Some(zone)) => print_json(&api.list_codes(&plant, &zone, date)?)?,
                (None, None) => print_json(&api.daily_code_statistics(date)?)?,
                _ => bail!("--plant 与 --zone 需同时指定"),
            }
        }
        Commands::Export { id, format, out } => {
            let path = state
                .report_api
                .export_to_dir(id, format.into(), out.as_deref())?;
            println!("{}", path.display());
        }
        Commands::Config { key, value } => match (key, value) {
            (None, _) => print_json(&state.config_manager.get_config_snapshot()?)?,
            (Some(key), None) => match state.config_manager.get_global_config_value(&key)? {
                Some(v) => println!("{}", v),
                None => bail!("配置项不存在: {}", key),
            },
            (Some(key), Some(value)) => {
                state.config_manager.set_global_config_value(&key, &value)?;
                println!("{} = {}", key, value);
            }
        },
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from([
            "qc-inspection",
            "--db",
            "/tmp/qc.db",
            "export",
            "7",
            "--format",
            "flat-csv",
        ]);
        assert_eq!(cli.db.as_deref(), Some("/tmp/qc.db"));
        match cli.command {
            Commands::Export { id, format, out } => {
                assert_eq!(id, 7);
                assert_eq!(format, FormatArg::FlatCsv);
                assert!(out.is_none());
            }
            _ => panic!("期望 export 子命令"),
        }
    }

    #[test]
    fn test_cli_parse_codes_date() {
        let cli = Cli::parse_from([
            "qc-inspection",
            "codes",
            "--plant",
            "KB",
            "--zone",
            "A",
            "--date",
            "2025-12-22",
        ]);
        match cli.command {
            Commands::Codes { plant, date, preview, .. } => {
                assert_eq!(plant.as_deref(), Some("KB"));
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 12, 22));
                assert!(!preview);
            }
            _ => panic!("期望 codes 子命令"),
        }
    }
}
