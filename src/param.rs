// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务器协议参数与常量模块
//!
//! 该模块定义了 `plhome` 遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 服务器发出的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - 文件后缀名到 Content-Type 的固定映射表。
//! - HTTP 方法与版本的强类型枚举。
//! - 事件循环使用的缓冲与轮询参数。

use lazy_static::lazy_static;
use std::collections::HashMap;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "plhome/1.0";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// HTTP 头部块的终结序列（空行）
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// 单次就绪通知中最多从 Socket 读取的字节数。
/// 一个完整请求可能跨越多次就绪事件到达，读取逻辑不得假设一次读满。
pub const READ_CHUNK_SIZE: usize = 1024;

/// 监听 Socket 的等待队列长度
pub const LISTEN_BACKLOG: i32 = 100;

/// 单次 epoll_wait 能够返回的最大事件数
pub const MAX_POLL_EVENTS: usize = 1024;

/// epoll 轮询的超时上限（毫秒）。
/// 超时返回后事件循环会执行一次例行维护（目前为空操作），随后立即重新轮询。
pub const POLL_TIMEOUT_MS: i32 = 1000;

lazy_static! {
    /// 服务器当前允许处理的 HTTP 方法列表。
    ///
    /// 不在该列表中的方法将触发 405 Method Not Allowed，
    /// 同时该列表会被渲染进 405 响应的 `Allow` 头。
    pub static ref ALLOWED_METHODS: Vec<HttpRequestMethod> = {
        vec![HttpRequestMethod::Get, HttpRequestMethod::Head]
    };
}

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 仅收录本服务器会实际发出的状态码。
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 `Content-Type` 的固定映射表。
    ///
    /// 未收录的后缀（以及没有后缀的文件）不会产生 `Content-Type` 头，
    /// 这不是错误，而是既定行为。
    pub static ref CONTENT_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert(".html", "text/html");
        map.insert(".css", "text/css");
        map.insert(".js", "application/javascript");
        map.insert(".jpg", "image/jpeg");
        map.insert(".jpeg", "image/jpeg");
        map.insert(".png", "image/png");
        map.insert(".gif", "image/gif");
        map.insert(".swf", "application/x-shockwave-flash");
        map.insert(".txt", "text/plain");
        map
    };
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy)]
pub enum HttpVersion {
    /// HTTP/1.1 版本
    V1_1,
}

/// 服务器认识的 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRequestMethod {
    /// 获取资源
    Get,
    /// 获取资源的元数据（不包含响应体）
    Head,
}

use std::fmt;

impl fmt::Display for HttpVersion {
    /// 将枚举格式化为 HTTP 报文中的版本字符串
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_1 => write!(f, "1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
        }
    }
}
