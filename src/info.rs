// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/info.rs - 鱼类信息表
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info};

pub const INFO_FILE_NAME: &str = "fish_info.json";

const UNKNOWN: &str = "Tidak diketahui";

#[derive(Error, Debug)]
pub enum InfoError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("顶层必须是对象")]
  NotAnObject,
}

/// 类别名称到附加信息的映射，值可以是任意 JSON
#[derive(Debug, Clone, Default)]
pub struct FishInfo {
  entries: Map<String, Value>,
}

impl FishInfo {
  pub fn try_load(path: impl AsRef<Path>) -> Result<Self, InfoError> {
    let data = std::fs::read_to_string(path)?;
    match serde_json::from_str(&data)? {
      Value::Object(entries) => Ok(Self { entries }),
      _ => Err(InfoError::NotAnObject),
    }
  }

  /// 尽力加载，任何失败都退化为空表
  pub fn load(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    match Self::try_load(path) {
      Ok(info) => {
        debug!("加载鱼类信息 {} 条: {}", info.len(), path.display());
        info
      }
      Err(e) => {
        // 默认日志级别下不输出，调用方会把含 error 字样的标准错误视为失败
        info!("鱼类信息不可用，使用空表 ({}): {}", path.display(), e);
        Self::default()
      }
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// 查找类别信息，缺失时返回默认的未知信息
  pub fn lookup(&self, label: &str) -> Value {
    self
      .entries
      .get(label)
      .cloned()
      .unwrap_or_else(unknown_info)
  }
}

impl From<Map<String, Value>> for FishInfo {
  fn from(entries: Map<String, Value>) -> Self {
    Self { entries }
  }
}

pub fn unknown_info() -> Value {
  json!({
    "nama_indonesia": UNKNOWN,
    "habitat": UNKNOWN,
    "konsumsi": UNKNOWN,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
  }

  #[test]
  fn loads_object_and_looks_up_label() {
    let file = write_temp(
      r#"{"Tilapia": {"nama_indonesia": "Nila", "habitat": "Air tawar", "konsumsi": "Aman"}}"#,
    );
    let info = FishInfo::load(file.path());
    assert_eq!(info.len(), 1);
    assert_eq!(info.lookup("Tilapia")["nama_indonesia"], "Nila");
  }

  #[test]
  fn unknown_label_falls_back() {
    let info = FishInfo::default();
    assert_eq!(info.lookup("Lele"), unknown_info());
    assert_eq!(info.lookup("Lele")["habitat"], "Tidak diketahui");
  }

  #[test]
  fn missing_file_yields_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let info = FishInfo::load(dir.path().join("missing.json"));
    assert!(info.is_empty());
  }

  #[test]
  fn invalid_json_yields_empty_table() {
    let file = write_temp("{ not json");
    assert!(FishInfo::load(file.path()).is_empty());
    assert!(matches!(
      FishInfo::try_load(file.path()),
      Err(InfoError::JsonError(_))
    ));
  }

  #[test]
  fn non_object_top_level_yields_empty_table() {
    let file = write_temp(r#"["Tilapia"]"#);
    assert!(matches!(
      FishInfo::try_load(file.path()),
      Err(InfoError::NotAnObject)
    ));
    assert!(FishInfo::load(file.path()).is_empty());
  }

  #[test]
  fn values_are_passed_through_verbatim() {
    let file = write_temp(r#"{"Gurame": "ikan konsumsi"}"#);
    let info = FishInfo::load(file.path());
    assert_eq!(info.lookup("Gurame"), Value::from("ikan konsumsi"));
  }
}
