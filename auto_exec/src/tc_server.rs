//! # Telecommand Server
//!
//! The TC server owns the REP socket that operators (or `drive_cli`) connect
//! to. Each request carries one JSON-encoded [`Tc`] and gets exactly one
//! [`TcResponse`] back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nav_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
    tc::{Tc, TcParseError, TcResponse},
};

use crate::params::AutoExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telecommand server
pub struct TcServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TcServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not recieve a message from the client: {0}")]
    RecvError(zmq::Error),

    #[error("The client sent a message which was not valid UTF-8")]
    NonUtf8Message,

    #[error("Could not parse the recieved telecommand: {0}")]
    TcParseError(TcParseError),

    #[error("Could not serialize the response: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send a response to the client: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcServer {
    /// Bind the TC server to the endpoint given in the exec parameters.
    ///
    /// Does not wait for a client, the server becomes connected whenever one
    /// shows up.
    pub fn new(ctx: &zmq::Context, params: &AutoExecParams) -> Result<Self, TcServerError> {
        // Short timeouts keep the cyclic executive from stalling on the
        // socket, heartbeats let the monitor spot a vanished client.
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: 10,
            send_timeout: 10,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REP, socket_options, &params.tc_endpoint)
            .map_err(TcServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Check if a client is connected to the server
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Recieve a single TC from the client.
    ///
    /// Call this in a loop until it returns `Ok(None)`, which means there is
    /// nothing more to handle this cycle (the client may of course send more
    /// later). Every `Ok(Some(tc))` must be answered with
    /// [`TcServer::send_response`] before the next recieve, as required by
    /// REQ/REP. When the recieved message is garbage (non-UTF-8 or unparsable)
    /// this function answers the client with [`TcResponse::Invalid`] itself
    /// and returns the error.
    pub fn recieve_tc(&self) -> Result<Option<Tc>, TcServerError> {
        let tc_str = match self.socket.recv_string(0) {
            // Nothing pending within the recv timeout
            Err(zmq::Error::EAGAIN) => return Ok(None),
            // Nothing recieved, so no response is owed
            Err(e) => return Err(TcServerError::RecvError(e)),
            Ok(Err(_)) => {
                self.send_response(TcResponse::Invalid)?;
                return Err(TcServerError::NonUtf8Message);
            }
            Ok(Ok(s)) => s,
        };

        match Tc::from_json(&tc_str) {
            Ok(tc) => Ok(Some(tc)),
            Err(e) => {
                self.send_response(TcResponse::Invalid).ok();
                Err(TcServerError::TcParseError(e))
            }
        }
    }

    /// Send the given response back to the client.
    ///
    /// This function must be called after recieving a TC.
    pub fn send_response(&self, response: TcResponse) -> Result<(), TcServerError> {
        let response_str =
            serde_json::to_string(&response).map_err(TcServerError::SerializationError)?;

        self.socket
            .send(&response_str, 0)
            .map_err(TcServerError::SendError)
    }
}
