// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求处理管线模块
//!
//! 该模块串联解析、路径解析与响应构建三个环节，实现连接在写出阶段
//! 执行的文件系统查找策略：
//! - 请求畸形或方法不被允许 → 405。
//! - 路径越权 → 403（在触碰文件系统之前拦截）。
//! - 路径是目录 → 在其中查找 `index.html` 并按 `text/html` 提供，
//!   找不到则 404。
//! - 路径不存在 → 404。
//! - 其余情况读取文件并按后缀给出 Content-Type（查不到表则省略该头）。

use crate::{
    exception::Exception,
    param::CONTENT_TYPES,
    request::Request,
    resolver,
    response::Response,
};

use bytes::Bytes;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// 对一段完整缓冲的请求字节执行整条处理管线，产出待发送的响应。
///
/// 该函数对任意输入都返回一个响应，任何失败都已映射为对应的状态码；
/// `fd` 仅用于日志追踪。
pub fn respond(inbound: &[u8], document_root: &Path, fd: i32) -> Response {
    let request = match Request::parse(inbound) {
        Ok(request) => request,
        Err(e) => {
            warn!("[fd{}]请求解析失败：{}，返回405", fd, e);
            return Response::response_405();
        }
    };
    debug!(
        "[fd{}]已解析请求：{} {} {}",
        fd,
        request.method(),
        request.raw_path(),
        request.version()
    );

    let resolved = resolver::resolve(request.raw_path(), document_root);
    if !resolved.is_safe() {
        warn!(
            "[fd{}]{}：{}，返回403",
            fd,
            Exception::PathOutsideRoot,
            request.raw_path()
        );
        return Response::response_403();
    }

    let path = resolved.path();
    let response = if path.is_dir() {
        serve_index(path, &request, fd)
    } else if !path.exists() {
        warn!("[fd{}]请求的路径{}不存在，返回404", fd, path.display());
        Response::response_404()
    } else {
        serve_file(path, &request, fd)
    };

    debug!(
        "[fd{}]响应构建完成：{} {}",
        fd,
        response.status_code(),
        response.information()
    );
    response
}

/// 目录请求的回退策略：仅当目录中存在 `index.html` 时按 `text/html` 提供
fn serve_index(dir: &Path, request: &Request, fd: i32) -> Response {
    let index_path = dir.join("index.html");
    if !index_path.is_file() {
        warn!(
            "[fd{}]目录{}中没有index.html，返回404",
            fd,
            dir.display()
        );
        return Response::response_404();
    }
    match read_content(&index_path) {
        Ok(content) => Response::response_200(content, Some("text/html"), request.method()),
        Err(e) => {
            warn!("[fd{}]读取{}失败：{}，返回404", fd, index_path.display(), e);
            Response::response_404()
        }
    }
}

/// 读取常规文件并按后缀决定 Content-Type
fn serve_file(path: &Path, request: &Request, fd: i32) -> Response {
    let content_type = content_type_of(path);
    debug!(
        "[fd{}]Content-Type: {}",
        fd,
        content_type.unwrap_or("（无）")
    );
    match read_content(path) {
        Ok(content) => Response::response_200(content, content_type, request.method()),
        Err(e) => {
            warn!("[fd{}]读取{}失败：{}，返回404", fd, path.display(), e);
            Response::response_404()
        }
    }
}

/// 按文件后缀查询固定映射表；没有后缀或查不到表时返回 `None`
fn content_type_of(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?;
    let key = format!(".{}", extension);
    CONTENT_TYPES.get(key.as_str()).copied()
}

fn read_content(path: &Path) -> Result<Bytes, Exception> {
    match fs::read(path) {
        Ok(bytes) => Ok(Bytes::from(bytes)),
        Err(_) => Err(Exception::FileNotFound),
    }
}
