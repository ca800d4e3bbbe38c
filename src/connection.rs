// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接状态机模块
//!
//! 每个被接受的客户端 Socket 对应一个 `Connection`，沿着
//! `Reading → Writing → Closing` 单向推进；挂断事件可以从任何状态
//! 直接进入 `Closing`。
//!
//! ## 不变式
//! - 连接在任一时刻恰好处于一个状态。
//! - 入站缓冲区只在 `Reading` 状态追加。
//! - 出站缓冲区在 `Reading → Writing` 迁移时一次性填充，
//!   此后只通过写偏移向前推进。
//!
//! 状态迁移是显式的，事件循环依据迁移结果调整轮询兴趣，
//! 重入的就绪事件不会破坏连接状态。

use crate::{handler, param::*};

use log::debug;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::path::Path;

/// 连接生命周期中的三个状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// 正在累积入站字节，直到出现头部终结序列
    Reading,
    /// 响应已经或即将构建完成，正在向 Socket 写出
    Writing,
    /// 终态：等待事件循环注销并释放 Socket
    Closing,
}

/// 一个被接受的客户端连接及其全部私有缓冲。
///
/// 连接由事件循环独占持有，任何其他组件都不跨就绪周期保留引用。
pub struct Connection {
    stream: TcpStream,
    state: ConnState,
    /// 入站缓冲：只追加，直到检测到头部终结序列
    inbound: Vec<u8>,
    /// 出站缓冲：迁移到 Writing 时一次性填充
    outbound: Vec<u8>,
    /// 出站缓冲中已写出的字节数
    written: usize,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            state: ConnState::Reading,
            inbound: Vec::new(),
            outbound: Vec::new(),
            written: 0,
        }
    }

    /// 连接底层 Socket 的文件描述符
    pub fn fd(&self) -> i32 {
        self.stream.as_raw_fd()
    }

    /// 当前状态
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// 可读就绪：执行一次有界读取（最多 `READ_CHUNK_SIZE` 字节）并追加
    /// 到入站缓冲。完整请求可能跨越多次就绪事件到达；检测到头部终结
    /// 序列后迁移到 `Writing`。
    ///
    /// 对端关闭（读到 0 字节）或读取出错都视为连接生命周期的正常终点，
    /// 直接迁移到 `Closing`，不向上传播错误。
    pub fn on_readable(&mut self) -> ConnState {
        if self.state != ConnState::Reading {
            return self.state;
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        match self.stream.read(&mut chunk) {
            Ok(0) => {
                debug!("[fd{}]对端在请求完成前关闭了连接", self.fd());
                self.state = ConnState::Closing;
            }
            Ok(n) => {
                self.inbound.extend_from_slice(&chunk[..n]);
                if contains_terminator(&self.inbound) {
                    debug!(
                        "[fd{}]请求头接收完毕（共{}字节），进入写出阶段",
                        self.fd(),
                        self.inbound.len()
                    );
                    self.state = ConnState::Writing;
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                debug!("[fd{}]读取Socket失败：{}，关闭连接", self.fd(), e);
                self.state = ConnState::Closing;
            }
        }
        self.state
    }

    /// 可写就绪：首次进入时构建响应并一次性填充出站缓冲，随后写出
    /// Socket 能接受的尽可能多的字节并推进写偏移。部分写出是常态而
    /// 非错误；偏移到达末尾后关闭写方向并迁移到 `Closing`。
    pub fn on_writable(&mut self, document_root: &Path) -> ConnState {
        if self.state != ConnState::Writing {
            return self.state;
        }

        if self.outbound.is_empty() {
            self.outbound = handler::respond(&self.inbound, document_root, self.fd()).as_bytes();
        }

        while self.written < self.outbound.len() {
            match self.stream.write(&self.outbound[self.written..]) {
                Ok(0) => {
                    debug!("[fd{}]对端在响应写完前关闭了连接", self.fd());
                    self.state = ConnState::Closing;
                    return self.state;
                }
                Ok(n) => {
                    self.written += n;
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return self.state;
                }
                Err(e) => {
                    debug!("[fd{}]写入Socket失败：{}，关闭连接", self.fd(), e);
                    self.state = ConnState::Closing;
                    return self.state;
                }
            }
        }

        debug!(
            "[fd{}]响应写出完毕（共{}字节），关闭连接",
            self.fd(),
            self.written
        );
        // 关闭写方向，把缓冲中的字节交给内核冲刷
        let _ = self.stream.shutdown(Shutdown::Write);
        self.state = ConnState::Closing;
        self.state
    }

    /// 挂断就绪：从任何状态直接进入终态
    pub fn on_hangup(&mut self) -> ConnState {
        debug!("[fd{}]收到挂断事件", self.fd());
        self.state = ConnState::Closing;
        self.state
    }
}

/// 入站缓冲中是否已经出现头部终结序列
pub(crate) fn contains_terminator(inbound: &[u8]) -> bool {
    inbound
        .windows(HEADER_TERMINATOR.len())
        .any(|window| window == HEADER_TERMINATOR)
}
