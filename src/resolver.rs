// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径解析与沙箱模块
//!
//! 该模块把请求行中百分号编码的原始路径转换为受文档根目录约束的
//! 文件系统路径。解码是尽力而为（best-effort）的，并且顺序敏感：
//! 1. 对每个路径段尝试整段十六进制解码（`%61%62` → `ab`）；
//!    解码失败不是错误，而是回退为字面字节。
//! 2. 在首个 `?` 处截断查询字符串。
//! 3. 把字面的 `%20` 序列替换为空格。
//!
//! 安全性判定是抵御目录遍历（`..`）的唯一防线：候选路径做词法规范化
//! 之后，必须以规范化的文档根目录为前缀。即使判定不安全，解析仍会
//! 返回路径本身——是否拒绝由调用方在触碰文件系统之前决定。

use log::debug;
use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::{Component, Path, PathBuf};

/// 一次路径解析的结果。
///
/// `path` 在 `is_safe` 为假时同样有值，但此时绝不能用它访问文件系统。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    path: PathBuf,
    safe: bool,
}

impl Resolved {
    /// 解析出的绝对候选路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 该路径是否被证明位于文档根目录之内
    pub fn is_safe(&self) -> bool {
        self.safe
    }
}

/// 单个路径段的解码结论：要么成功解出字节，要么整段回退为字面字节。
///
/// 这一两分结果是刻意显式保留的，解码失败绝不会被吞掉。
enum SegmentDecode {
    /// 整段十六进制解码成功
    Decoded(Vec<u8>),
    /// 解码失败，按字面字节处理
    Literal,
}

/// 将原始请求路径解析为文档根目录下的候选绝对路径，并给出安全性判定。
///
/// 对同样的输入，解析永远得到同样的路径与同样的结论（幂等）。
pub fn resolve(raw_path: &str, document_root: &Path) -> Resolved {
    // 规范化文档根目录本身。根目录不存在时退化为词法规范化，
    // 此时一切候选路径都视为不安全。
    let (canonical_root, root_exists) = match document_root.canonicalize() {
        Ok(root) => (root, true),
        Err(_) => (normalize(document_root), false),
    };

    let mut candidate = canonical_root.clone();
    for segment in raw_path.split('/') {
        let decoded = decode_segment(segment);
        if decoded.is_empty() {
            continue;
        }
        candidate.push(OsString::from_vec(decoded));
    }

    let normalized = normalize(&candidate);
    let safe = root_exists && normalized.starts_with(&canonical_root);
    debug!(
        "路径解析：{} -> {}（安全：{}）",
        raw_path,
        normalized.display(),
        safe
    );

    Resolved {
        path: normalized,
        safe,
    }
}

/// 对单个路径段执行顺序敏感的三步解码：
/// 整段十六进制解码 → 在 `?` 处截断 → `%20` 替换为空格。
fn decode_segment(segment: &str) -> Vec<u8> {
    let mut bytes = match decode_hex(segment) {
        SegmentDecode::Decoded(decoded) => decoded,
        SegmentDecode::Literal => segment.as_bytes().to_vec(),
    };
    if let Some(pos) = bytes.iter().position(|&b| b == b'?') {
        bytes.truncate(pos);
    }
    replace_percent20(&bytes)
}

/// 尝试将整个路径段（去掉 `%` 之后）按十六进制字节对解码。
///
/// 只有在剩余字符全部是十六进制数字且成对出现时才算成功，
/// 例如 `%2e%2e` → `..`；否则整段按字面处理。
fn decode_hex(segment: &str) -> SegmentDecode {
    let stripped: String = segment.chars().filter(|&c| c != '%').collect();
    if stripped.len() % 2 != 0 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return SegmentDecode::Literal;
    }
    let bytes = stripped
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16).unwrap() as u8;
            let lo = (pair[1] as char).to_digit(16).unwrap() as u8;
            (hi << 4) | lo
        })
        .collect();
    SegmentDecode::Decoded(bytes)
}

/// 把字面的 `%20` 三字节序列替换为空格
fn replace_percent20(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"%20") {
            out.push(b' ');
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// 词法规范化：消去 `.` 与 `..` 组件，不触碰文件系统。
///
/// `..` 在根部不再上溯（`/..` 规范化为 `/`），与内核路径解析一致。
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                out.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().last(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                } else if out.as_os_str().is_empty() {
                    out.push("..");
                }
            }
            Component::Normal(part) => {
                out.push(part);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn root_with_index() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "hi").unwrap();
        dir
    }

    /// 根目录之下的普通路径应被判定为安全，且以规范化根目录为前缀
    #[test]
    fn test_safe_path_is_inside_root() {
        let dir = root_with_index();

        let resolved = resolve("/index.html", dir.path());

        assert!(resolved.is_safe());
        let canonical_root = dir.path().canonicalize().unwrap();
        assert!(resolved.path().starts_with(&canonical_root));
        assert_eq!(resolved.path(), canonical_root.join("index.html"));
    }

    /// 字面的 `..` 逃逸必须被判定为不安全
    #[test]
    fn test_literal_traversal_is_unsafe() {
        let dir = root_with_index();

        let resolved = resolve("/../../etc/passwd", dir.path());

        assert!(!resolved.is_safe());
    }

    /// 经过整段十六进制编码的 `..`（%2e%2e）同样必须被拦截
    #[test]
    fn test_hex_encoded_traversal_is_unsafe() {
        let dir = root_with_index();

        let resolved = resolve("/%2e%2e/%2e%2e/etc/passwd", dir.path());

        assert!(!resolved.is_safe());
    }

    /// 未逃逸出根目录的内部 `..` 是允许的
    #[test]
    fn test_internal_dotdot_stays_safe() {
        let dir = root_with_index();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let resolved = resolve("/sub/../index.html", dir.path());

        assert!(resolved.is_safe());
        assert_eq!(
            resolved.path(),
            dir.path().canonicalize().unwrap().join("index.html")
        );
    }

    /// 整段十六进制解码成功的路径段应被解出字节
    #[test]
    fn test_full_segment_hex_decode() {
        let dir = root_with_index();

        // %61%62 -> "ab"
        let resolved = resolve("/%61%62", dir.path());

        assert_eq!(
            resolved.path(),
            dir.path().canonicalize().unwrap().join("ab")
        );
    }

    /// 十六进制解码失败的路径段应整段回退为字面字节，这不是错误
    #[test]
    fn test_hex_decode_falls_back_to_literal() {
        let dir = root_with_index();

        let resolved = resolve("/inde%78.html", dir.path());

        // "inde78.html"（去掉 % 后不是合法的十六进制串时才保留字面，
        // 此处 "inde78.html" 含非十六进制字符，整段按字面保留）
        assert!(resolved.is_safe());
        assert_eq!(
            resolved.path(),
            dir.path().canonicalize().unwrap().join("inde%78.html")
        );
    }

    /// 查询字符串应在首个 `?` 处被截断
    #[test]
    fn test_query_string_is_truncated() {
        let dir = root_with_index();

        let resolved = resolve("/index.html?id=123&name=test", dir.path());

        assert_eq!(
            resolved.path(),
            dir.path().canonicalize().unwrap().join("index.html")
        );
    }

    /// 字面 `%20` 应被替换为空格
    #[test]
    fn test_percent20_becomes_space() {
        let dir = root_with_index();

        let resolved = resolve("/my%20file.txt", dir.path());

        assert_eq!(
            resolved.path(),
            dir.path().canonicalize().unwrap().join("my file.txt")
        );
    }

    /// 解码顺序敏感：先截断 `?`，之后才替换 `%20`
    #[test]
    fn test_decode_order_query_before_space() {
        let dir = root_with_index();

        let resolved = resolve("/a%20b?x=%20y", dir.path());

        assert_eq!(
            resolved.path(),
            dir.path().canonicalize().unwrap().join("a b")
        );
    }

    /// 同一路径解析两次，结果与结论完全一致（幂等）
    #[test]
    fn test_resolve_is_idempotent() {
        let dir = root_with_index();

        for raw in ["/index.html", "/../etc/passwd", "/%2e%2e/x", "/a%20b?q=1"] {
            let first = resolve(raw, dir.path());
            let second = resolve(raw, dir.path());
            assert_eq!(first, second);
        }
    }

    /// 根路径 `/` 解析为文档根目录本身
    #[test]
    fn test_root_path_resolves_to_root() {
        let dir = root_with_index();

        let resolved = resolve("/", dir.path());

        assert!(resolved.is_safe());
        assert_eq!(resolved.path(), dir.path().canonicalize().unwrap());
    }

    /// 文档根目录不存在时，一切路径都视为不安全
    #[test]
    fn test_missing_root_is_never_safe() {
        let resolved = resolve("/index.html", Path::new("/no/such/root/dir"));

        assert!(!resolved.is_safe());
    }
}
