//! # Network Module
//!
//! This module provides the networking abstractions used between the autonomy
//! executable and the ground: ZMQ sockets with connection monitoring.
//!
//! Telecommands run over REQ/REP (ground is REQ, the exec binds REP), and
//! telemetry/action feedback over PUB/SUB.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use zmq::{Context, Socket, SocketEvent, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Counter giving each monitor a unique inproc endpoint name.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A zmq socket which is monitored, providing additional information.
///
/// A background thread watches activity on the socket and keeps a visible
/// connection flag up to date, which lets users detect a lost peer without
/// having to poll the socket itself.
pub struct MonitoredSocket {
    socket: Socket,

    shutdown: Arc<AtomicBool>,

    connected: Arc<AtomicBool>,
}

/// Options which can be set on a monitored socket.
///
/// The timeout/heartbeat/linger options map one-to-one onto the options of
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt), all times in
/// milliseconds.
pub struct SocketOptions {
    /// Bind to the endpoint (servers) rather than connect to it (clients).
    /// Defaults to `false`.
    pub bind: bool,

    /// If true `MonitoredSocket::new` blocks until the socket connects, and
    /// fails with `CouldNotConnect` if it can't. Defaults to `true`.
    pub block_on_first_connect: bool,

    /// `ZMQ_REQ_CORRELATE`, match replies with requests on REQ sockets
    pub req_correlate: bool,

    /// `ZMQ_REQ_RELAXED`, relax the strict send/recv alternation of REQ sockets
    pub req_relaxed: bool,

    /// `ZMQ_LINGER`
    pub linger: i32,

    /// `ZMQ_RECONNECT_IVL`
    pub reconnect_ivl: i32,

    /// `ZMQ_RECONNECT_IVL_MAX`
    pub reconnect_ivl_max: i32,

    /// `ZMQ_CONNECT_TIMEOUT`
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO`, after which a recv returns `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`, after which a send returns `EAGAIN`
    pub send_timeout: i32,

    /// `ZMQ_HEARTBEAT_IVL`
    pub heartbeat_ivl: i32,

    /// `ZMQ_HEARTBEAT_TIMEOUT`
    pub heartbeat_timeout: i32,

    /// `ZMQ_HEARTBEAT_TTL`
    pub heartbeat_ttl: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Could not create the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Could not enable monitoring on the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Failed to connect the socket: {0:?}")]
    CouldNotConnect(Option<zmq::Error>),

    #[error("Could not read an event from the monitor socket: {0}")]
    EventReadError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a socket of `socket_type` in `ctx`, configure it with
    /// `socket_options`, and bind or connect it to `endpoint` (a zmq endpoint
    /// string such as `"tcp://localhost:4000"`).
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str,
    ) -> Result<Self, MonitoredSocketError> {
        let socket = ctx
            .socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // Each monitor gets its own inproc endpoint
        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );

        // Ask zmq to publish this socket's events on the inproc endpoint,
        // then attach a PAIR socket to read them from
        socket
            .monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx
            .socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor
            .connect(&monitor_endpoint)
            .map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        socket_options.set(&socket)?;

        // Servers bind, clients connect
        if socket_options.bind {
            socket.bind(endpoint)
        } else {
            socket.connect(endpoint)
        }
        .map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        let connected = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        // Hold here until the monitor reports the connection, when asked to
        if socket_options.block_on_first_connect {
            loop {
                match read_event(&monitor).map_err(MonitoredSocketError::EventReadError)? {
                    SocketEvent::CONNECTED => break,
                    SocketEvent::CONNECT_DELAYED => continue,
                    _ => return Err(MonitoredSocketError::CouldNotConnect(None)),
                }
            }

            connected.store(true, Ordering::Relaxed);
        }

        // The monitor thread may block forever in a recv, so it runs detached
        // and is told to stop via the shutdown flag
        {
            let connected = connected.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || monitor_socket(monitor, monitor_endpoint, shutdown, connected));
        }

        Ok(Self {
            socket,
            shutdown,
            connected,
        })
    }

    /// Return if the socket is connected or not.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl std::ops::DerefMut for MonitoredSocket {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.socket
    }
}

impl SocketOptions {
    /// Apply these options to `socket`.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        let opt = |name: &str, result: zmq::Result<()>| {
            result.map_err(|e| MonitoredSocketError::SocketOptionError(name.into(), e))
        };

        opt("connect_timeout", socket.set_connect_timeout(self.connect_timeout))?;
        opt("heartbeat_ivl", socket.set_heartbeat_ivl(self.heartbeat_ivl))?;
        opt(
            "heartbeat_timeout",
            socket.set_heartbeat_timeout(self.heartbeat_timeout),
        )?;
        opt("heartbeat_ttl", socket.set_heartbeat_ttl(self.heartbeat_ttl))?;
        opt("linger", socket.set_linger(self.linger))?;
        opt("reconnect_ivl", socket.set_reconnect_ivl(self.reconnect_ivl))?;
        opt(
            "reconnect_ivl_max",
            socket.set_reconnect_ivl_max(self.reconnect_ivl_max),
        )?;
        opt("rcvtimeo", socket.set_rcvtimeo(self.recv_timeout))?;
        opt("sndtimeo", socket.set_sndtimeo(self.send_timeout))?;

        // The correlate/relaxed options only exist for REQ sockets
        if let Ok(SocketType::REQ) = socket.get_socket_type() {
            opt("req_correlate", socket.set_req_correlate(self.req_correlate))?;
            opt("req_relaxed", socket.set_req_relaxed(self.req_relaxed))?;
        }

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // Option defaults match the zmq library's own
        Self {
            bind: false,
            block_on_first_connect: true,
            req_correlate: false,
            req_relaxed: false,
            linger: 30_000,
            reconnect_ivl: 100,
            reconnect_ivl_max: 0,
            connect_timeout: 0,
            recv_timeout: -1,
            send_timeout: 0,
            heartbeat_ivl: 0,
            heartbeat_timeout: 0,
            heartbeat_ttl: 0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read one event from a monitor socket.
///
/// Events arrive as two-part messages, the event number followed by the
/// address. Only the number is of interest here.
fn read_event(socket: &Socket) -> Result<SocketEvent, zmq::Error> {
    let event_msg = socket.recv_msg(0)?;

    assert!(
        socket.get_rcvmore()?,
        "Monitor events must carry an address frame"
    );
    socket.recv_msg(0)?;

    Ok(SocketEvent::from_raw(u16::from_ne_bytes([
        event_msg[0],
        event_msg[1],
    ])))
}

/// Track connection state until told to shut down or the monitor dies.
fn monitor_socket(
    monitor: Socket,
    monitor_endpoint: String,
    shutdown: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match read_event(&monitor) {
            Ok(SocketEvent::CONNECTED) => connected.store(true, Ordering::Relaxed),
            Ok(SocketEvent::DISCONNECTED) => connected.store(false, Ordering::Relaxed),
            Ok(_) => (),
            Err(_) => {
                log::warn!(
                    "Monitor {} could not read an event, stopping",
                    monitor_endpoint
                );
                return;
            }
        }
    }
}
