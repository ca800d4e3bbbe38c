// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 该模块负责将连接入站缓冲区中累积的原始字节码解析为强类型的
//! `Request` 结构体。它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 头部块（Headers）按 CRLF 分行、按首个 `:` 分割的提取。
//! 3. 对任意字节输入的全面性保证：解析要么给出合法请求，要么给出
//!    明确的异常，绝不会产生未处理的失败。
//!
//! ## 头部行策略
//! 缺少 `:` 分隔符的头部行被一律判定为畸形请求（而不是静默丢弃），
//! 保证同样的输入永远得到同样的结论。

use crate::{exception::Exception, param::*};

use lazy_static::lazy_static;
use log::error;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// 请求行的匹配模式：`METHOD SP PATH SP HTTP-VERSION`。
    /// 方法名在此处不设白名单，方法合法性由枚举转换单独判定，
    /// 以便把 `POST / HTTP/1.1` 这类报文归类为"方法不被允许"而非"畸形"。
    static ref REQUEST_LINE_REGEX: Regex =
        Regex::new(r"^([A-Za-z]+) (\S+) (HTTP/\S+)$").unwrap();
}

/// 表示一个完整的 HTTP 请求元数据。
///
/// 该结构体不处理请求体（Body）：头部终结序列之后的任何字节都会被忽略。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法（GET 或 HEAD）
    method: HttpRequestMethod,
    /// 请求行中原封不动的路径段（百分号编码尚未解码）
    raw_path: String,
    /// 请求行中的协议版本字符串（如 `HTTP/1.1`）
    version: String,
    /// 头部名称到取值的映射（保留收到时的大小写，重名时后者覆盖前者）
    headers: HashMap<String, String>,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 截断：只保留头部终结序列之前的头部块。
    /// 3. 解析请求行：提取方法、路径和协议版本。
    /// 4. 迭代解析标头：按首个 `:` 分割，两侧空白被裁剪。
    ///
    /// # 错误处理
    /// 对任意字节输入总是返回 `Ok` 或明确的 `Exception`，不会崩溃：
    /// - 空缓冲区 / 请求行格式不符 → [`Exception::MalformedRequest`]
    /// - 方法不在 GET/HEAD 之内 → [`Exception::UnsupportedMethod`]
    /// - 非 UTF-8 字节 → [`Exception::RequestNotUtf8`]
    pub fn parse(buffer: &[u8]) -> Result<Self, Exception> {
        // 1. 将字节流转换为字符串，失败则判定为非法的 HTTP 请求
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("请求字节流不是合法的UTF-8");
                return Err(Exception::RequestNotUtf8);
            }
        };

        // 2. 去掉头部终结序列及其后的所有字节（请求体不在处理范围内）
        let head = match request_string.find("\r\n\r\n") {
            Some(pos) => &request_string[..pos],
            None => request_string,
        };
        let head = head.trim();
        if head.is_empty() {
            error!("收到空的HTTP请求");
            return Err(Exception::MalformedRequest);
        }

        let mut lines = head.split(CRLF);

        // 3. 解析请求行 (e.g., "GET /index.html HTTP/1.1")
        let first_line = lines.next().unwrap_or("").trim();
        let captures = match REQUEST_LINE_REGEX.captures(first_line) {
            Some(c) => c,
            None => {
                error!("HTTP请求行格式不正确：{}", first_line);
                return Err(Exception::MalformedRequest);
            }
        };

        let method_str = captures.get(1).map(|m| m.as_str()).unwrap_or("");
        let method = match method_str {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            _ => {
                error!("不被允许的HTTP请求方法：{}", method_str);
                return Err(Exception::UnsupportedMethod);
            }
        };
        let raw_path = captures.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
        let version = captures.get(3).map(|m| m.as_str()).unwrap_or("").to_string();

        // 4. 迭代各行解析 Headers：按首个 ':' 分割，名值两侧的空白被裁剪；
        //    缺少 ':' 的行判定为畸形请求
        let mut headers = HashMap::new();
        for line in lines {
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(
                        name.trim().to_string(),
                        value.trim().to_string(),
                    );
                }
                None => {
                    error!("HTTP头部行缺少冒号分隔符：{}", line);
                    return Err(Exception::MalformedRequest);
                }
            }
        }

        Ok(Self {
            method,
            raw_path,
            version,
            headers,
        })
    }
}

// --- Getter 访问器实现 ---

impl Request {
    /// 获取请求方法
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 获取请求行中未经任何解码的原始路径
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// 获取协议版本字符串
    pub fn version(&self) -> &str {
        &self.version
    }

    /// 获取头部名称到取值的映射
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// 按名称查询某个头部的取值（大小写与收到时一致）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证常规 GET 请求的解析，包括 Path 和 Headers
    #[test]
    fn test_parse_get_request() {
        let buffer =
            b"GET /index.html HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\n\r\n";

        let request = Request::parse(buffer).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(request.raw_path(), "/index.html");
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.header("Host"), Some("localhost:7878"));
        assert_eq!(request.header("User-Agent"), Some("Test-Browser"));
    }

    /// 验证 HEAD 请求的解析
    #[test]
    fn test_parse_head_request() {
        let buffer = b"HEAD /index.html HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";

        let request = Request::parse(buffer).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Head);
        assert_eq!(request.raw_path(), "/index.html");
    }

    /// POST 方法应被归类为"方法不被允许"而非"畸形请求"
    #[test]
    fn test_post_is_unsupported_method() {
        let buffer = b"POST /submit HTTP/1.1\r\nHost: localhost\r\n\r\n";

        let result = Request::parse(buffer);

        assert_eq!(result.unwrap_err(), Exception::UnsupportedMethod);
    }

    /// 空缓冲区（或只含空白）应判定为畸形请求
    #[test]
    fn test_empty_buffer_is_malformed() {
        assert_eq!(
            Request::parse(b"").unwrap_err(),
            Exception::MalformedRequest
        );
        assert_eq!(
            Request::parse(b"  \r\n  ").unwrap_err(),
            Exception::MalformedRequest
        );
    }

    /// 请求行缺少组成部分时应判定为畸形请求
    #[test]
    fn test_truncated_request_line_is_malformed() {
        let buffer = b"GET /index.html\r\n\r\n";

        assert_eq!(
            Request::parse(buffer).unwrap_err(),
            Exception::MalformedRequest
        );
    }

    /// 验证 UTF-8 编码检查
    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD];

        assert_eq!(
            Request::parse(&buffer).unwrap_err(),
            Exception::RequestNotUtf8
        );
    }

    /// 缺少冒号分隔符的头部行应判定为畸形请求
    #[test]
    fn test_header_without_colon_is_malformed() {
        let buffer = b"GET / HTTP/1.1\r\nHost localhost\r\n\r\n";

        assert_eq!(
            Request::parse(buffer).unwrap_err(),
            Exception::MalformedRequest
        );
    }

    /// 名值两侧的可选空白应被裁剪
    #[test]
    fn test_header_whitespace_is_trimmed() {
        let buffer = b"GET / HTTP/1.1\r\nHost :   localhost  \r\n\r\n";

        let request = Request::parse(buffer).unwrap();

        assert_eq!(request.header("Host"), Some("localhost"));
    }

    /// 重名头部应由后者覆盖前者
    #[test]
    fn test_duplicate_headers_overwrite() {
        let buffer = b"GET / HTTP/1.1\r\nX-Tag: one\r\nX-Tag: two\r\n\r\n";

        let request = Request::parse(buffer).unwrap();

        assert_eq!(request.header("X-Tag"), Some("two"));
    }

    /// 头部终结序列之后的字节应被完全忽略
    #[test]
    fn test_bytes_after_terminator_are_ignored() {
        let buffer = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\ntrailing garbage";

        let request = Request::parse(buffer).unwrap();

        assert_eq!(request.raw_path(), "/");
        assert_eq!(request.header("Host"), Some("localhost"));
    }

    /// 带查询参数的路径应原样保留在 raw_path 中
    #[test]
    fn test_path_with_query_string() {
        let buffer = b"GET /page?id=123&name=test HTTP/1.1\r\nHost: localhost\r\n\r\n";

        let request = Request::parse(buffer).unwrap();

        assert_eq!(request.raw_path(), "/page?id=123&name=test");
    }

    /// 方法名是大小写敏感的：小写 get 不被允许
    #[test]
    fn test_lowercase_method_is_rejected() {
        let buffer = b"get / HTTP/1.1\r\nHost: localhost\r\n\r\n";

        assert_eq!(
            Request::parse(buffer).unwrap_err(),
            Exception::UnsupportedMethod
        );
    }
}
