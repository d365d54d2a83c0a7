// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::frame::RgbNchwFrame;

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("Image not found: {0}")]
  NotFound(PathBuf),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

pub struct ImageFileInput {
  path: PathBuf,
  image: Option<RgbImage>,
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    if !path.exists() {
      return Err(ImageFileInputError::NotFound(path.to_path_buf()));
    }

    let image = ImageReader::open(path)?
      .with_guessed_format()?
      .decode()?
      .to_rgb8();
    debug!(
      "读取图像 {}: {}x{}",
      path.display(),
      image.width(),
      image.height()
    );

    Ok(ImageFileInput {
      path: path.to_path_buf(),
      image: Some(image),
    })
  }

  /// 按模型输入尺寸做 letterbox 后逐帧输出
  pub fn into_nchw(self, width: u32, height: u32) -> ImageFileInputNchw {
    ImageFileInputNchw {
      inner: self,
      width,
      height,
    }
  }
}

pub struct ImageFileInputNchw {
  inner: ImageFileInput,
  width: u32,
  height: u32,
}

impl Iterator for ImageFileInputNchw {
  type Item = RgbNchwFrame;

  fn next(&mut self) -> Option<Self::Item> {
    let image = self.inner.image.take()?;
    debug!(
      "letterbox {} -> {}x{}",
      self.inner.path.display(),
      self.width,
      self.height
    );
    Some(RgbNchwFrame::letterboxed(&image, self.width, self.height))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::input::AsNchwFrame;
  use image::Rgb;

  fn sample_png(dir: &Path) -> PathBuf {
    let path = dir.join("ikan sample.png");
    RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]))
      .save(&path)
      .unwrap();
    path
  }

  #[test]
  fn yields_exactly_one_frame() {
    let dir = tempfile::tempdir().unwrap();
    let input = ImageFileInput::open(sample_png(dir.path())).unwrap();
    let mut frames = input.into_nchw(16, 16);
    let frame = frames.next().unwrap();
    assert_eq!(frame.as_nchw().shape(), &[1, 3, 16, 16]);
    assert_eq!(frame.letterbox().source_width, 8);
    assert!(frames.next().is_none());
  }

  #[test]
  fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = ImageFileInput::open(dir.path().join("nope.jpg"))
      .err()
      .unwrap();
    assert!(matches!(err, ImageFileInputError::NotFound(_)));
  }

  #[test]
  fn undecodable_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"not an image").unwrap();
    assert!(ImageFileInput::open(&path).is_err());
  }
}
