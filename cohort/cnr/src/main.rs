//! 队列 CNR 分析: 对所有已配准的受试者计算 LC 相对于脑桥参考区域的 CNR.
//!
//! 路径全部由环境变量 (`LC_DATA_DIR`, `LC_OUTPUT_DIR`, `LC_ATLAS_DIR`)
//! 或 `$HOME/dataset/lc/*` 决定, 不接受命令行参数.

use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::error::Error;

mod result;
mod runner;

fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    let result = runner::run()?;
    result.analyze()?;
    Ok(())
}
