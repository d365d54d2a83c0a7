// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/model/metadata.rs - ONNX 模型自定义元数据
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

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

const DEFAULT_IMGSZ: (u32, u32) = (640, 640);

#[derive(Error, Debug, PartialEq)]
pub enum MetadataError {
  #[error("类别名称格式错误: {0}")]
  Names(String),
  #[error("输入尺寸格式错误: {0}")]
  Imgsz(String),
}

/// 导出模型时写入的元数据：类别名称与输入尺寸 (高, 宽)
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
  pub names: BTreeMap<usize, String>,
  pub imgsz: (u32, u32),
}

impl Default for ModelMetadata {
  fn default() -> Self {
    Self {
      names: BTreeMap::new(),
      imgsz: DEFAULT_IMGSZ,
    }
  }
}

impl ModelMetadata {
  /// 由键值对构建，缺失的键使用默认值
  pub fn from_properties<'a, F>(get: F) -> Result<Self, MetadataError>
  where
    F: Fn(&str) -> Option<&'a str>,
  {
    let mut metadata = Self::default();
    if let Some(names) = get("names") {
      metadata.names = parse_names(names)?;
    }
    if let Some(imgsz) = get("imgsz") {
      metadata.imgsz = parse_imgsz(imgsz)?;
    }
    Ok(metadata)
  }

  pub fn num_classes(&self) -> Option<usize> {
    (!self.names.is_empty()).then(|| self.names.len())
  }

  pub fn label(&self, class_id: usize) -> String {
    self
      .names
      .get(&class_id)
      .cloned()
      .unwrap_or_else(|| format!("class{class_id}"))
  }
}

/// 解析形如 `{0: 'bandeng', 1: "kakap"}` 的字典，也接受 `['bandeng', 'kakap']`
pub fn parse_names(text: &str) -> Result<BTreeMap<usize, String>, MetadataError> {
  let err = || MetadataError::Names(text.to_string());
  let mut chars = text.trim().chars().peekable();
  let mut names = BTreeMap::new();

  let close = match chars.next() {
    Some('{') => '}',
    Some('[') => ']',
    _ => return Err(err()),
  };

  let mut index = 0usize;
  loop {
    skip_whitespace(&mut chars);
    match chars.peek() {
      Some(&c) if c == close => {
        chars.next();
        break;
      }
      None => return Err(err()),
      _ => {}
    }

    let key = if close == '}' {
      let key = parse_integer(&mut chars).ok_or_else(err)?;
      skip_whitespace(&mut chars);
      if chars.next() != Some(':') {
        return Err(err());
      }
      skip_whitespace(&mut chars);
      key
    } else {
      index
    };

    let name = parse_quoted(&mut chars).ok_or_else(err)?;
    names.insert(key, name);
    index += 1;

    skip_whitespace(&mut chars);
    match chars.next() {
      Some(',') => continue,
      Some(c) if c == close => break,
      _ => return Err(err()),
    }
  }

  skip_whitespace(&mut chars);
  if chars.next().is_some() {
    return Err(err());
  }
  Ok(names)
}

/// 解析 `[640, 640]` 或 `640`，返回 (高, 宽)
pub fn parse_imgsz(text: &str) -> Result<(u32, u32), MetadataError> {
  let err = || MetadataError::Imgsz(text.to_string());
  let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
  let dims = inner
    .split(',')
    .map(|s| s.trim().parse::<u32>())
    .collect::<Result<Vec<_>, _>>()
    .map_err(|_| err())?;
  match dims.as_slice() {
    [size] if *size > 0 => Ok((*size, *size)),
    [h, w] if *h > 0 && *w > 0 => Ok((*h, *w)),
    _ => Err(err()),
  }
}

fn skip_whitespace(chars: &mut Peekable<Chars>) {
  while chars.peek().is_some_and(|c| c.is_whitespace()) {
    chars.next();
  }
}

fn parse_integer(chars: &mut Peekable<Chars>) -> Option<usize> {
  let mut digits = String::new();
  while let Some(&c) = chars.peek() {
    if !c.is_ascii_digit() {
      break;
    }
    digits.push(c);
    chars.next();
  }
  digits.parse().ok()
}

fn parse_quoted(chars: &mut Peekable<Chars>) -> Option<String> {
  let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;
  let mut value = String::new();
  loop {
    match chars.next()? {
      '\\' => match chars.next()? {
        'n' => value.push('\n'),
        't' => value.push('\t'),
        other => value.push(other),
      },
      c if c == quote => return Some(value),
      c => value.push(c),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn parses_python_dict_names() {
    let names = parse_names("{0: 'Bandeng', 1: \"Ikan Mas\", 2: 'Kakap\\'s'}").unwrap();
    assert_eq!(names.len(), 3);
    assert_eq!(names[&0], "Bandeng");
    assert_eq!(names[&1], "Ikan Mas");
    assert_eq!(names[&2], "Kakap's");
  }

  #[test]
  fn parses_list_names_and_empty_dict() {
    let names = parse_names("['Lele', 'Nila',]").unwrap();
    assert_eq!(names[&1], "Nila");
    assert!(parse_names("{}").unwrap().is_empty());
  }

  #[test]
  fn rejects_malformed_names() {
    assert!(parse_names("{0: Bandeng}").is_err());
    assert!(parse_names("{0: 'Bandeng'").is_err());
    assert!(parse_names("Bandeng").is_err());
    assert!(parse_names("{0: 'a'} trailing").is_err());
  }

  #[test]
  fn parses_imgsz_forms() {
    assert_eq!(parse_imgsz("[640, 480]").unwrap(), (640, 480));
    assert_eq!(parse_imgsz("320").unwrap(), (320, 320));
    assert!(parse_imgsz("[0, 640]").is_err());
    assert!(parse_imgsz("big").is_err());
  }

  #[test]
  fn builds_from_properties_with_defaults() {
    let props: HashMap<&str, &str> = [("names", "{0: 'Lele'}"), ("stride", "16")].into();
    let metadata = ModelMetadata::from_properties(|k| props.get(k).copied()).unwrap();
    assert_eq!(metadata.imgsz, (640, 640));
    assert_eq!(metadata.num_classes(), Some(1));
    assert_eq!(metadata.label(0), "Lele");
    assert_eq!(metadata.label(7), "class7");
  }

  #[test]
  fn missing_names_means_unknown_class_count() {
    let metadata = ModelMetadata::from_properties(|_| None).unwrap();
    assert_eq!(metadata.num_classes(), None);
  }
}
