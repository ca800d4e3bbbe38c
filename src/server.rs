// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 事件循环模块
//!
//! 单线程、严格非阻塞的就绪驱动循环：一个监听 Socket 加 N 个已接受
//! 连接统一注册在同一个 epoll 实例上，循环内的所有工作都是有界且
//! 非阻塞的，唯一的挂起点就是 `epoll_wait` 本身。
//!
//! 水平扩展通过运行多个彼此独立的 `Server` 实例实现：监听 Socket
//! 开启 `SO_REUSEADDR` 与 `SO_REUSEPORT`，由内核把新连接分摊到各个
//! 实例上。实例之间没有任何共享状态，因此也不需要任何锁。
//!
//! 连接集合是一个以文件描述符为键、由事件循环独占持有的竞技场
//! （arena）；就绪分发按显式的状态机迁移推进，兴趣集的调整只是
//! 迁移结果的体现：接受时只注册可读兴趣，`Reading → Writing` 迁移
//! 时改注册为可写兴趣（二者从不同时注册）。

use crate::connection::{ConnState, Connection};
use crate::param::*;

use epoll::{ControlOptions::*, Event, Events};
use log::{debug, error, info};
use std::collections::HashMap;
use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};
use std::path::PathBuf;

/// 一个独立的服务器实例：自己的监听 Socket、自己的 epoll、
/// 自己的连接竞技场。
pub struct Server {
    listener: TcpListener,
    epoll_fd: RawFd,
    connections: HashMap<RawFd, Connection>,
    document_root: PathBuf,
}

impl Server {
    /// 创建监听 Socket（`SO_REUSEADDR` + `SO_REUSEPORT`）、绑定地址、
    /// 开始监听并把监听描述符注册为可读兴趣。
    pub fn bind(address: Ipv4Addr, port: u16, document_root: PathBuf) -> io::Result<Self> {
        let listener = create_listener(address, port)?;
        listener.set_nonblocking(true)?;

        let epoll_fd = epoll::create(false)?;
        epoll::ctl(
            epoll_fd,
            EPOLL_CTL_ADD,
            listener.as_raw_fd(),
            Event::new(Events::EPOLLIN, listener.as_raw_fd() as u64),
        )?;

        Ok(Self {
            listener,
            epoll_fd,
            connections: HashMap::new(),
            document_root,
        })
    }

    /// 实际绑定到的本地地址（端口为 0 时由内核分配）
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 运行事件循环直到进程被外部终止。
    ///
    /// 每一轮以带超时的 `epoll_wait` 挂起；超时返回后执行一次例行
    /// 维护（目前为空操作）并立即重新轮询。单个连接上的任何失败都
    /// 不会让循环退出。
    pub fn run(&mut self) -> io::Result<()> {
        info!(
            "事件循环启动，文档根目录：{}",
            self.document_root.display()
        );
        let mut events = vec![Event::new(Events::empty(), 0); MAX_POLL_EVENTS];
        loop {
            let ready = match epoll::wait(self.epoll_fd, POLL_TIMEOUT_MS, &mut events) {
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => 0,
                Err(e) => return Err(e),
            };
            for event in &events[..ready] {
                let fd = event.data as RawFd;
                if fd == self.listener.as_raw_fd() {
                    self.accept_ready();
                } else {
                    self.dispatch(fd, event.events);
                }
            }
            self.tick();
        }
    }

    /// 监听 Socket 就绪：把当前积压的连接全部接受进来。
    ///
    /// 接受失败（包括暂无挂起连接）不是致命错误，静默忽略后循环继续。
    fn accept_ready(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, address)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        debug!("无法将新连接设为非阻塞：{}，丢弃", e);
                        continue;
                    }
                    let fd = stream.as_raw_fd();
                    // 新连接初始只关心可读就绪
                    if let Err(e) = epoll::ctl(
                        self.epoll_fd,
                        EPOLL_CTL_ADD,
                        fd,
                        Event::new(Events::EPOLLIN, fd as u64),
                    ) {
                        debug!("[fd{}]注册epoll失败：{}，丢弃连接", fd, e);
                        continue;
                    }
                    debug!("[fd{}]接受新连接：{}", fd, address);
                    self.connections.insert(fd, Connection::new(stream));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("接受连接失败：{}，忽略", e);
                    break;
                }
            }
        }
    }

    /// 把一次就绪事件分发给对应连接，并依据状态迁移调整兴趣集。
    ///
    /// 分发顺序假设：同一轮里早先 `release` 的描述符可能已被更早的
    /// `accept_ready` 复用，排队中的陈旧事件会落在新连接上。新连接
    /// 处于 `Reading`，多余的可读事件至多触发一次空读（`WouldBlock`），
    /// 不会破坏状态机。
    fn dispatch(&mut self, fd: RawFd, ready: u32) {
        let connection = match self.connections.get_mut(&fd) {
            Some(connection) => connection,
            None => {
                // 同一轮里早先的事件可能已经关闭了这个描述符
                debug!("[fd{}]收到陈旧的就绪事件，忽略", fd);
                return;
            }
        };

        let hangup = ready & (Events::EPOLLHUP | Events::EPOLLERR).bits() as u32 != 0;
        let state = if hangup {
            connection.on_hangup()
        } else if ready & Events::EPOLLIN.bits() as u32 != 0 {
            let before = connection.state();
            let after = connection.on_readable();
            if before == ConnState::Reading && after == ConnState::Writing {
                // Reading → Writing：改为只关心可写就绪
                if let Err(e) = epoll::ctl(
                    self.epoll_fd,
                    EPOLL_CTL_MOD,
                    fd,
                    Event::new(Events::EPOLLOUT, fd as u64),
                ) {
                    debug!("[fd{}]切换写兴趣失败：{}，关闭连接", fd, e);
                    connection.on_hangup();
                }
            }
            connection.state()
        } else if ready & Events::EPOLLOUT.bits() as u32 != 0 {
            connection.on_writable(&self.document_root)
        } else {
            connection.state()
        };

        if state == ConnState::Closing {
            self.release(fd);
        }
    }

    /// 终态处理：从 epoll 注销并释放 Socket
    fn release(&mut self, fd: RawFd) {
        if let Err(e) = epoll::ctl(
            self.epoll_fd,
            EPOLL_CTL_DEL,
            fd,
            Event::new(Events::empty(), 0),
        ) {
            debug!("[fd{}]从epoll注销失败：{}", fd, e);
        }
        self.connections.remove(&fd);
        debug!("[fd{}]连接已释放，当前连接数：{}", fd, self.connections.len());
    }

    /// 例行维护钩子。目前没有周期性任务，保留为空操作。
    fn tick(&mut self) {}
}

impl Drop for Server {
    /// 循环退出时注销并关闭监听 Socket 与 epoll 实例
    fn drop(&mut self) {
        let _ = epoll::ctl(
            self.epoll_fd,
            EPOLL_CTL_DEL,
            self.listener.as_raw_fd(),
            Event::new(Events::empty(), 0),
        );
        unsafe {
            libc::close(self.epoll_fd);
        }
    }
}

/// 通过 libc 创建开启了 `SO_REUSEADDR` 与 `SO_REUSEPORT` 的监听
/// Socket。标准库的 `TcpListener::bind` 不暴露 `SO_REUSEPORT`，
/// 而多实例共享端口依赖它。
fn create_listener(address: Ipv4Addr, port: u16) -> io::Result<TcpListener> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let one: libc::c_int = 1;
        for option in [libc::SO_REUSEADDR, libc::SO_REUSEPORT] {
            if libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                option,
                &one as *const _ as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            ) < 0
            {
                let err = io::Error::last_os_error();
                libc::close(fd);
                return Err(err);
            }
        }

        let sockaddr = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: port.to_be(),
            sin_addr: libc::in_addr {
                s_addr: u32::from(address).to_be(),
            },
            sin_zero: [0; 8],
        };
        if libc::bind(
            fd,
            &sockaddr as *const _ as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        ) < 0
        {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        if libc::listen(fd, LISTEN_BACKLOG) < 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            error!("监听Socket失败：{}", err);
            return Err(err);
        }

        Ok(TcpListener::from_raw_fd(fd))
    }
}
