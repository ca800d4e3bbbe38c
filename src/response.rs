//! # HTTP 响应构建模块
//!
//! 该模块把处理结果格式化为完整的 HTTP/1.1 响应报文：
//! - 状态行（200 / 403 / 404 / 405）。
//! - 每个响应必带的 `Date`、`Server` 与 `Connection` 头。
//! - 200 响应额外携带 `Content-Type`（按后缀查表，查不到则省略该头）
//!   与 `Content-Length`（按截断前的内容长度计算）。
//! - 响应体仅在 200 且方法为 GET 时存在；HEAD 在任何状态下都没有响应体。
//!
//! `Date` 头使用本地挂钟时间按 `<星期缩写>, <日> <月缩写> <年> HH:MM:SS GMT`
//! 格式化，不做时区换算，这是一个有意保留的简化。

use crate::param::*;

use bytes::Bytes;
use chrono::{DateTime, Local};
use log::error;

/// 表示一个待序列化的 HTTP 响应。
#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    date: DateTime<Local>,
    server_name: String,
    /// `Connection` 头的取值：200 为 `keep-alive`，错误响应为 `close`
    connection: &'static str,
    /// 仅 405 响应携带 `Allow` 头
    allow: Option<Vec<HttpRequestMethod>>,
    content_type: Option<String>,
    content_length: Option<u64>,
    content: Option<Bytes>,
}

impl Response {
    fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            date: Local::now(),
            server_name: SERVER_NAME.to_string(),
            connection: "close",
            allow: None,
            content_type: None,
            content_length: None,
            content: None,
        }
    }

    /// 构建 200 响应。
    ///
    /// `Content-Length` 总是等于 `content` 的字节长度，即使随后因为
    /// HEAD 方法而省略响应体，该头的取值也保持不变。
    /// `content_type` 为 `None` 时不输出 `Content-Type` 头。
    pub fn response_200(
        content: Bytes,
        content_type: Option<&str>,
        method: HttpRequestMethod,
    ) -> Self {
        let mut response = Self::new();
        response.set_code(200);
        response.connection = "keep-alive";
        response.content_type = content_type.map(|t| t.to_string());
        response.content_length = Some(content.len() as u64);
        response.content = match method {
            HttpRequestMethod::Get => Some(content),
            HttpRequestMethod::Head => None,
        };
        response
    }

    /// 构建 403 响应（路径越权）
    pub fn response_403() -> Self {
        let mut response = Self::new();
        response.set_code(403);
        response
    }

    /// 构建 404 响应（文件不存在或目录缺少 index.html）
    pub fn response_404() -> Self {
        let mut response = Self::new();
        response.set_code(404);
        response
    }

    /// 构建 405 响应（畸形请求或方法不被允许），携带 `Allow` 头
    pub fn response_405() -> Self {
        let mut response = Self::new();
        response.set_code(405);
        response.allow = Some(ALLOWED_METHODS.to_vec());
        response
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&information) => information.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                panic!();
            }
        };
        self
    }

    /// 将响应序列化为待发送的字节序列。
    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let status_code: &str = &self.status_code.to_string();
        let information: &str = &self.information;
        let date: &str = &format_date(&self.date);
        let server: &str = &self.server_name;

        let header = [
            version,
            " ",
            status_code,
            " ",
            information,
            CRLF,
            match &self.allow {
                Some(allowed) => {
                    let mut allow_str = String::new();
                    for (index, method) in allowed.iter().enumerate() {
                        allow_str.push_str(&format!("{}", method));
                        if index < allowed.len() - 1 {
                            allow_str.push_str(", ");
                        }
                    }
                    ["Allow: ", &allow_str, CRLF].concat()
                }
                None => "".to_string(),
            }
            .as_str(),
            "Date: ",
            date,
            CRLF,
            "Server: ",
            server,
            CRLF,
            "Connection: ",
            self.connection,
            CRLF,
            match &self.content_type {
                Some(t) => ["Content-Type: ", t, CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            match self.content_length {
                Some(l) => ["Content-Length: ", &l.to_string(), CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            CRLF,
        ]
        .concat();

        [
            header.as_bytes(),
            match &self.content {
                Some(c) => c,
                None => b"",
            },
        ]
        .concat()
    }
}

// --- Getter 访问器实现 ---

impl Response {
    /// 获取状态码
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// 获取状态码对应的原因短语
    pub fn information(&self) -> &str {
        &self.information
    }

    /// 获取 `Content-Length` 头的取值（错误响应没有该头）
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// 获取 `Content-Type` 头的取值
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// 按 `<星期缩写>, <日> <月缩写> <年> HH:MM:SS GMT` 格式化本地时间。
/// 后缀 GMT 是字面量，不做时区换算。
fn format_date(date: &DateTime<Local>) -> String {
    date.format("%a, %-d %b %Y %H:%M:%S GMT").to_string()
}
