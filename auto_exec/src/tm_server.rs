//! # TM Server
//!
//! Publishes a telemetry packet summarising the executable state once per
//! cycle over a PUB socket. Drive goal feedback and results are carried in the
//! same packet.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use nav_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
    tc::mnvr::MnvrCmd,
};

use crate::auto::drive_mgr::tm::DriveTm;
use crate::{data_store::DataStore, params::AutoExecParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: MonitoredSocket,
}

/// One cycle's worth of telemetry, serialised to JSON on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct TmPacket {
    pub session_time_s: f64,

    pub safe: bool,

    pub safe_cause: String,

    /// The manouvre demanded this cycle
    pub mnvr: Option<MnvrCmd>,

    pub drive_tm: Option<DriveTm>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send telemetry: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Bind the TM publisher to the endpoint given in the exec parameters.
    ///
    /// Subscribers may come and go, PUB drops packets when nobody is listening.
    pub fn new(ctx: &zmq::Context, params: &AutoExecParams) -> Result<Self, TmServerError> {
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

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.tm_endpoint)
            .map_err(TmServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Snapshot the datastore into a packet and publish it.
    pub fn send(&mut self, ds: &DataStore) -> Result<(), TmServerError> {
        let packet_string = serde_json::to_string(&TmPacket::from_datastore(ds))
            .map_err(TmServerError::SerializationError)?;

        self.socket
            .send(&packet_string, 0)
            .map_err(TmServerError::SendError)
    }
}

impl TmPacket {
    pub fn from_datastore(ds: &DataStore) -> Self {
        Self {
            session_time_s: ds.session_time_s,
            safe: ds.safe,
            safe_cause: ds
                .safe_cause
                .map(|c| format!("{:?}", c))
                .unwrap_or_default(),
            mnvr: ds.mnvr_output,
            drive_tm: ds.drive_tm.clone(),
        }
    }
}
