// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在请求处理生命周期中可能抛出的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖协议解析错误、路径越权以及文件系统查找失败。
//! - **语义映射**：每个变体都对应特定的 HTTP 状态码，由响应构建层统一转换。
//! - **非致命性**：任何一个连接上的异常都只终结该连接自身，绝不会中断
//!   事件循环或影响其他连接。

use std::fmt;

/// 服务器处理请求过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    /// 视为畸形请求，对应 `405 Method Not Allowed`。
    RequestNotUtf8,
    /// 请求报文畸形：缓冲区为空、请求行不符合
    /// `METHOD SP PATH SP HTTP-VERSION` 格式，或某一头部行缺少 `:` 分隔符。
    /// 对应 `405 Method Not Allowed`。
    MalformedRequest,
    /// 请求行可以解析，但方法不在 GET/HEAD 之内。
    /// 对应 `405 Method Not Allowed`，响应携带 `Allow` 头。
    UnsupportedMethod,
    /// 解析出的路径在规范化后落在文档根目录之外（目录遍历企图）。
    /// 对应 `403 Forbidden`。
    PathOutsideRoot,
    /// 在文档根目录下未找到所请求的文件，或目录中缺少 `index.html`。
    /// 对应 `404 Not Found`。
    FileNotFound,
}

use Exception::*;

/// 为 `Exception` 实现 `Display` 特性，使其支持字符串格式化输出。
///
/// 这些描述信息用于服务端日志（Logging），不会出现在响应报文中。
impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequest => write!(f, "Malformed HTTP request"),
            UnsupportedMethod => write!(f, "Unsupported request method"),
            PathOutsideRoot => write!(f, "Path escapes the document root (403)"),
            FileNotFound => write!(f, "File not found (404)"),
        }
    }
}
