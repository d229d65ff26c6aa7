//! Interactive command line for the autonomy executable.
//!
//! Reads commands from a prompt, parses them into telecommands and sends them to the exec's TC
//! server, printing the response. Type `help` for the list of commands, `exit` or Ctrl-C to quit.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Report};
use rustyline::{error::ReadlineError, DefaultEditor};
use structopt::StructOpt;

use nav_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    tc::{Tc, TcResponse},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "auto $ ";
const HISTORY_PATH: &str = ".drive_cli_history";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Interactive TC console for the autonomy executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "drive_cli")]
struct Opt {
    /// Endpoint of the exec's TC server.
    #[structopt(long, default_value = "tcp://localhost:5030")]
    endpoint: String,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- NETWORK ----

    let ctx = zmq::Context::new();

    let socket_options = SocketOptions {
        block_on_first_connect: false,
        connect_timeout: 1000,
        heartbeat_ivl: 500,
        heartbeat_ttl: 1000,
        heartbeat_timeout: 1000,
        linger: 1,
        recv_timeout: 1000,
        send_timeout: 1000,
        req_correlate: true,
        req_relaxed: true,
        ..Default::default()
    };

    let socket = MonitoredSocket::new(&ctx, zmq::REQ, socket_options, &opt.endpoint)
        .wrap_err("Could not create the TC socket")?;

    println!("Sending TCs to {}", opt.endpoint);

    // ---- PROMPT LOOP ----

    let mut rl = DefaultEditor::new()?;
    if rl.load_history(HISTORY_PATH).is_err() {
        // First run, no history yet
    }

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line == "exit" || line == "quit" {
                    break;
                }

                match parse(line) {
                    Some(tc) => send_tc(&socket, &tc),
                    None => (),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Unhandled error: {:?}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_PATH);

    Ok(())
}

/// Parse a prompt line into a TC, printing usage on failure.
fn parse(line: &str) -> Option<Tc> {
    // Prepend a dummy binary name so clap sees the line as a full invocation
    let words = std::iter::once("tc").chain(line.split_whitespace());

    match Tc::from_iter_safe(words) {
        Ok(tc) => Some(tc),
        Err(e) => {
            println!("{}", e.message);
            None
        }
    }
}

/// Send the TC to the exec and print the response.
fn send_tc(socket: &MonitoredSocket, tc: &Tc) {
    if !socket.connected() {
        println!("Not connected to the exec");
        return;
    }

    let json = match tc.to_json() {
        Ok(j) => j,
        Err(e) => {
            println!("Could not serialise the TC: {}", e);
            return;
        }
    };

    if let Err(e) = socket.send(&json, 0) {
        println!("Could not send the TC: {}", e);
        return;
    }

    let msg = match socket.recv_msg(0) {
        Ok(m) => m,
        Err(e) => {
            println!("No response from the exec: {}", e);
            return;
        }
    };

    match msg.as_str() {
        Some(s) => match serde_json::from_str::<TcResponse>(s) {
            Ok(TcResponse::Ok) => println!("Ok"),
            Ok(TcResponse::Invalid) => println!("Rejected: the exec could not parse the TC"),
            Ok(TcResponse::CannotExecute) => {
                println!("Rejected: the exec cannot execute the TC now")
            }
            Err(_) => println!("Unrecognised response: {}", s),
        },
        None => println!("Response was not valid UTF-8"),
    }
}
