use crate::error::{Result, ScoreboardAiError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use scoreboard_ai_common::{ErrorKind, ScoreboardAnalysisError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// 推論サービスへ渡す画像（サイズ・形式チェック済み）
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    /// ログ用の短いSHA-256（画像内容はログに出さない）
    pub fingerprint: String,
}

impl ImagePayload {
    /// 画像の契約チェック
    ///
    /// # Arguments
    /// * `file_name` - 表示用ファイル名
    /// * `bytes` - 画像データ
    /// * `max_bytes` - 上限サイズ
    ///
    /// # Returns
    /// * `Err(ImageTooLarge)` - 上限超過
    /// * `Err(InvalidImage)` - PNG/JPEG/WebP 以外
    pub fn new(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: u64,
    ) -> std::result::Result<Self, ScoreboardAnalysisError> {
        let file_name = file_name.into();

        if bytes.len() as u64 > max_bytes {
            return Err(ScoreboardAnalysisError::new(
                ErrorKind::ImageTooLarge,
                format!("{} is {} bytes; the limit is {} bytes", file_name, bytes.len(), max_bytes),
            ));
        }

        let mime_type = match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => "image/png",
            Ok(ImageFormat::Jpeg) => "image/jpeg",
            Ok(ImageFormat::WebP) => "image/webp",
            Ok(other) => {
                return Err(ScoreboardAnalysisError::new(
                    ErrorKind::InvalidImage,
                    format!("{}: unsupported image format {:?}", file_name, other),
                ))
            }
            Err(_) => {
                return Err(ScoreboardAnalysisError::new(
                    ErrorKind::InvalidImage,
                    format!("{}: not a recognizable image", file_name),
                ))
            }
        };

        let fingerprint = fingerprint(&bytes);

        Ok(Self {
            file_name,
            bytes,
            mime_type,
            fingerprint,
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// 一時ファイル用の拡張子
    pub fn extension(&self) -> &'static str {
        match self.mime_type {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

/// SHA-256 先頭12桁
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)[..12].to_string()
}

/// 画像ファイルの読み込み
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(ScoreboardAiError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.is_dir() {
        return Err(ScoreboardAiError::FolderNotFound(folder.display().to_string()));
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1) // 直下のみ
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let Some(ext) = path.extension() else {
            continue;
        };
        if is_image_extension(&ext.to_string_lossy()) {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            images.push(ImageInfo {
                path: path.to_path_buf(),
                file_name,
            });
        }
    }

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    #[test]
    fn test_is_image_extension() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPG"));
        assert!(is_image_extension("jpeg"));
        assert!(is_image_extension("png"));
        assert!(is_image_extension("webp"));
        assert!(!is_image_extension("txt"));
        assert!(!is_image_extension("gif"));
    }

    #[test]
    fn test_payload_detects_format() {
        let png = ImagePayload::new("a.png", PNG_MAGIC.to_vec(), 1024).unwrap();
        assert_eq!(png.mime_type, "image/png");
        assert_eq!(png.extension(), "png");
        assert_eq!(png.fingerprint.len(), 12);

        let jpeg = ImagePayload::new("b.jpg", JPEG_MAGIC.to_vec(), 1024).unwrap();
        assert_eq!(jpeg.mime_type, "image/jpeg");
    }

    #[test]
    fn test_payload_rejects_oversize() {
        let err = ImagePayload::new("big.png", PNG_MAGIC.to_vec(), 4).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ImageTooLarge));
    }

    #[test]
    fn test_payload_rejects_non_image() {
        let err = ImagePayload::new("notes.png", b"hello world".to_vec(), 1024).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidImage));

        let gif = ImagePayload::new("anim.png", b"GIF89a\x01\x00".to_vec(), 1024).unwrap_err();
        assert_eq!(gif.kind(), Some(ErrorKind::InvalidImage));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint(b"abc"), "ba7816bf8f01");
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"));
        assert!(matches!(result, Err(ScoreboardAiError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_folder_with_images() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("c.png")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("a.JPG")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("b.webp")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("readme.txt")).unwrap().write_all(b"text").unwrap();
        fs::create_dir(temp_dir.path().join("nested.png")).unwrap();

        let result = scan_folder(temp_dir.path()).unwrap();
        let names: Vec<_> = result.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.JPG", "b.webp", "c.png"]);
    }
}
