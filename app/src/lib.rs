//! unredact 命令行入口
//!
//! 用法：
//!   unredact boxes <pdf>                     列出候选脱敏框
//!   unredact edit <pdf> -o <out> --page N    选框、编辑、回写
//!   unredact recover <pdf>                   双路文字恢复
//!   unredact batch <in> <out>                批量恢复并生成报告站点
//!   unredact status                          后端可用性
//!   unredact config [--init]                 查看 / 初始化配置

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use unredact_core::{Color, RegionRect};

pub use config::{default_config_path, load_config, save_config, AppConfig, ConfigError};

#[derive(Parser)]
#[command(name = "unredact", version, about = "Recover text hidden under PDF redaction boxes")]
struct Cli {
    /// Config file (default: <config dir>/unredact/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// -v for debug, -vv for trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List detected redaction boxes and their dimension groups
    Boxes {
        pdf: PathBuf,
        /// 1-based page number; all pages when omitted
        #[arg(long)]
        page: Option<usize>,
    },

    /// Select boxes, paint them over and write the edited PDF
    Edit(EditArgs),

    /// Recover raw and OCR text for every page of one document
    Recover {
        pdf: PathBuf,
        /// Print the recovery results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recover text for every PDF in a folder and write an HTML report
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Show pdfium and Tesseract availability
    Status,

    /// Show the effective configuration
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

#[derive(clap::Args)]
pub(crate) struct EditArgs {
    pdf: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    /// 1-based page number
    #[arg(long)]
    page: usize,

    /// Region in raster pixels: x,y,w,h
    #[arg(long, value_parser = parse_rect, conflicts_with = "at", required_unless_present = "at")]
    rect: Option<RegionRect>,

    /// Click position in raster pixels: x,y
    #[arg(long, value_parser = parse_point)]
    at: Option<(u32, u32)>,

    /// Also edit every box on any page with the same dimensions
    #[arg(long)]
    all_matching: bool,

    /// Solid fill color (#rrggbb)
    #[arg(long, value_parser = parse_color, conflicts_with = "text")]
    fill: Option<Color>,

    /// Replacement text drawn inside the box
    #[arg(long)]
    text: Option<String>,

    #[arg(long, default_value_t = 12.0)]
    font_size: f32,

    #[arg(long, value_parser = parse_color, default_value = "#000000")]
    text_color: Color,

    #[arg(long, value_parser = parse_color, default_value = "#ffffff")]
    background: Color,

    /// Repeat the edit round trip on the output this many times
    #[arg(long, default_value_t = 1)]
    cycles: u32,
}

fn parse_numbers(s: &str, expected: usize) -> Result<Vec<i64>, String> {
    let values: Vec<i64> = s
        .split(',')
        .map(|v| v.trim().parse::<i64>().map_err(|e| format!("{}: {}", v.trim(), e)))
        .collect::<Result<_, _>>()?;
    if values.len() != expected {
        return Err(format!("expected {} comma separated numbers, got {}", expected, values.len()));
    }
    Ok(values)
}

fn parse_rect(s: &str) -> Result<RegionRect, String> {
    let v = parse_numbers(s, 4)?;
    Ok(RegionRect::new(v[0], v[1], v[2], v[3]))
}

fn parse_point(s: &str) -> Result<(u32, u32), String> {
    let v = parse_numbers(s, 2)?;
    let x = u32::try_from(v[0]).map_err(|_| format!("invalid x: {}", v[0]))?;
    let y = u32::try_from(v[1]).map_err(|_| format!("invalid y: {}", v[1]))?;
    Ok((x, y))
}

fn parse_color(s: &str) -> Result<Color, String> {
    s.parse::<Color>().map_err(|e| e.to_string())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().context("无法确定配置文件位置")?,
    };
    let mut config = load_config(&config_path)
        .with_context(|| format!("无法读取配置 {}", config_path.display()))?;
    config.apply_env_overrides();

    match cli.command {
        Command::Boxes { pdf, page } => commands::boxes(&config, &pdf, page),
        Command::Edit(args) => commands::edit(&config, &args),
        Command::Recover { pdf, json } => commands::recover(&config, &pdf, json),
        Command::Batch {
            input_dir,
            output_dir,
            workers,
        } => commands::batch(&config, &input_dir, &output_dir, workers),
        Command::Status => commands::status(&config),
        Command::Config { init } => commands::config(&config, &config_path, init),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rect_and_point() {
        assert_eq!(parse_rect("10, 20,30,40").unwrap(), RegionRect::new(10, 20, 30, 40));
        assert!(parse_rect("1,2,3").is_err());
        assert_eq!(parse_point("5,6").unwrap(), (5, 6));
        assert!(parse_point("-1,6").is_err());
    }

    #[test]
    fn test_edit_args() {
        let cli = Cli::try_parse_from([
            "unredact", "edit", "in.pdf", "-o", "out.pdf", "--page", "2", "--at", "100,90",
            "--text", "hello", "--cycles", "3",
        ])
        .unwrap();
        let Command::Edit(args) = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(args.page, 2);
        assert_eq!(args.at, Some((100, 90)));
        assert_eq!(args.text.as_deref(), Some("hello"));
        assert_eq!(args.background, Color::WHITE);
        assert_eq!(args.cycles, 3);
    }

    #[test]
    fn test_edit_requires_a_selection() {
        assert!(Cli::try_parse_from(["unredact", "edit", "in.pdf", "-o", "o.pdf", "--page", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "unredact", "edit", "in.pdf", "-o", "o.pdf", "--page", "1", "--rect", "0,0,1,1", "--at", "0,0",
        ])
        .is_err());
    }
}
