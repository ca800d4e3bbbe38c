// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 非阻塞静态文件服务器
//!
//! 该程序实现了基于 epoll 就绪驱动的单线程非阻塞 Web 服务器。
//! 核心功能包括：
//! - 单线程事件循环，统一多路复用监听 Socket 与全部客户端连接
//! - READING → WRITING → CLOSING 的显式连接状态机
//! - 请求路径的百分号解码与文档根目录沙箱
//! - GET / HEAD 的静态文件响应（含目录的 index.html 回退）
//! - 通过 SO_REUSEPORT 在同一端口上运行多个彼此独立的实例

// --- 模块定义 ---
mod config;     // 配置解析与管理
mod connection; // 连接状态机
mod exception;  // 自定义异常与错误处理
mod handler;    // 请求处理管线
mod param;      // 全局常量与静态参数
mod request;    // HTTP 请求报文解析器
mod resolver;   // 路径解码与沙箱判定
mod response;   // HTTP 响应报文构建器
mod server;     // epoll 事件循环

use config::Config;
use server::Server;

use log::{error, info};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::thread;

/// # 程序入口点
///
/// 初始化日志系统、加载配置，并按配置的实例数启动彼此独立的
/// 事件循环线程。每个线程拥有自己的监听 Socket（共享端口）、
/// 自己的 epoll 与自己的连接集合，线程之间不共享任何状态。
fn main() {
    // 1. 初始化日志系统：采用 log4rs 日志架构，通过外部 YAML 灵活配置级别与输出目的地
    log4rs::init_file("config/log4rs.yaml", Default::default()).unwrap();

    // 2. 环境配置加载：从 TOML 文件读取运行参数
    let config = Config::from_toml("config/development.toml");
    info!("配置文件已载入");
    let root = PathBuf::from(config.document_root());
    info!("document root: {}", root.display());

    // 3. 网络层参数：
    // 支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
    let port = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);

    // 4. 按配置启动 N 个彼此独立的服务器实例。
    // 每个实例绑定同一个 host:port（SO_REUSEPORT），由内核分摊新连接。
    let workers = config.workers();
    info!("启动{}个服务器实例", workers);
    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let root = root.clone();
        let handle = thread::Builder::new()
            .name(format!("worker-{}", worker))
            .spawn(move || {
                let mut server = match Server::bind(address, port, root) {
                    Ok(server) => server,
                    Err(e) => {
                        error!("实例{}无法绑定端口{}，错误：{}", worker, port, e);
                        panic!("实例{}无法绑定端口{}，错误：{}", worker, port, e);
                    }
                };
                info!("实例{}绑定完成，进入事件循环", worker);
                if let Err(e) = server.run() {
                    error!("实例{}的事件循环异常退出：{}", worker, e);
                }
            })
            .unwrap();
        handles.push(handle);
    }

    for handle in handles {
        let _ = handle.join();
    }
}
