//! Autonomy executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules and load the map
//!     - Main loop:
//!         - Telecommand processing and handling
//!         - Drive manager processing:
//!             - Goal management
//!             - Path planning and trajectory control
//!         - Localisation propagation
//!         - Telemetry output
//!
//! The loop runs at a fixed frequency, commands are accepted either from a
//! timed script (single CLI argument) or from the ground over the TC server.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use auto_lib::{
    auto::{DriveMgr, DriveMgrOutput},
    data_store::{DataStore, SafeModeCause},
    params::AutoExecParams,
    script::{PendingTcs, ScriptInterpreter},
    tc_server::{TcServer, TcServerError},
    tm_server::TmServer,
};
use map_manager::MapStore;
use nav_if::tc::{Tc, TcResponse};

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.10;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("auto_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Autonomy Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: AutoExecParams =
        util::params::load("auto_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    // TC source is used to determine whether we're getting TCs from a script
    // or from the ground.
    let mut tc_source = TcSource::None;
    let mut use_tc_server = false;

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the script path
    if args.len() == 2 {
        info!("Loading script from \"{}\"", &args[1]);

        // Load the script interpreter
        let si = ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

        // Display some info
        info!(
            "Loaded script lasts {:.02} s and contains {} TCs\n",
            si.get_duration(),
            si.get_num_tcs()
        );

        // Set the interpreter in the source
        tc_source = TcSource::Script(si);
    }
    // If no arguments then setup the tc server
    else if args.len() == 1 {
        info!("No script provided, remote control via the TcServer will be used\n");
        use_tc_server = true;
    } else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}",
            args.len() - 1
        ));
    }

    // ---- LOAD MAP ----

    let mut map_store_root = host::get_sw_root().wrap_err("Software root is not set")?;
    map_store_root.push(&exec_params.map_store_root);

    let map_store = MapStore::open(&map_store_root).wrap_err("Failed to open the map store")?;

    let (map_doc, grid) = map_store
        .get(&exec_params.map_name)
        .wrap_err_with(|| format!("Failed to load the map \"{}\"", exec_params.map_name))?;

    info!(
        "Map \"{}\" loaded, {}x{} cells at {} m/cell",
        map_doc.name, map_doc.width, map_doc.height, map_doc.resolution_m
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    let mut drive_mgr =
        DriveMgr::init("drive_mgr.toml", map_doc, &grid).wrap_err("Failed to initialise DriveMgr")?;
    info!("DriveMgr init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = nav_if::net::zmq::Context::new();

    if use_tc_server {
        tc_source = TcSource::Remote(
            TcServer::new(&zmq_ctx, &exec_params)
                .wrap_err("Failed to initialise the TcServer")?,
        );
        info!("TcServer initialised");
    }

    let mut tm_server = {
        let s = TmServer::new(&zmq_ctx, &exec_params).wrap_err("Failed to initialise TmServer")?;
        info!("TmServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();

        // ---- TELECOMMAND PROCESSING ----

        // Branch depending on the source
        match tc_source {
            // If no source no point in continuing so break
            TcSource::None => return Err(eyre!("No TC source present")),

            TcSource::Remote(ref server) => {
                // If a client is connected remove any safe mode, otherwise make safe
                if server.is_connected() {
                    ds.make_unsafe(SafeModeCause::TcServerNotConnected).ok();
                } else {
                    if !ds.safe {
                        error!("Connection to the ground lost");
                    }
                    ds.make_safe(SafeModeCause::TcServerNotConnected);
                }

                // Get commands until none remain
                loop {
                    match server.recieve_tc() {
                        Ok(Some(tc)) => {
                            // Branch based on safe mode. If we are in safe mode we need to send
                            // the cannot execute response and should not process the TC, unless
                            // it is the make unsafe TC
                            let response_result = match ds.safe {
                                true => match tc {
                                    Tc::MakeUnsafe => {
                                        tc_processor::exec(&mut ds, &tc);
                                        server.send_response(TcResponse::Ok)
                                    }
                                    _ => server.send_response(TcResponse::CannotExecute),
                                },
                                false => {
                                    // Process the TC
                                    tc_processor::exec(&mut ds, &tc);

                                    // Send response
                                    server.send_response(TcResponse::Ok)
                                }
                            };

                            // Print warning if couldn't send the response
                            match response_result {
                                Ok(_) => (),
                                Err(e) => warn!("Could not respond to TC: {}", e),
                            }
                        }
                        Ok(None) => break,
                        Err(TcServerError::TcParseError(e)) => {
                            warn!("Could not parse recieved TC: {}", e);
                            break;
                        }
                        Err(e) => {
                            return Err(e)
                                .wrap_err("An error occured while receiving TCs from the client")
                        }
                    }
                }
            }

            TcSource::Script(ref mut si) => match si.get_pending_tcs() {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::exec(&mut ds, tc);
                    }
                }
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break;
                }
            },
        };

        // ---- DRIVE PROCESSING ----

        // While in safe mode the drive manager is not stepped, so no motion demands are produced.
        if !ds.safe {
            match drive_mgr.step(ds.drive_cmd.take()) {
                Ok(DriveMgrOutput::Mnvr(mnvr)) => {
                    ds.mnvr_output = Some(mnvr);
                }
                Ok(DriveMgrOutput::None) => (),
                Err(e) => {
                    // DriveMgr errors usually just mean you sent the wrong TC, so just issue the
                    // warning and continue, the manager itself aborts the goal.
                    warn!("Error during DriveMgr processing: {}", e)
                }
            }

            // Direct manouvre commands are only executed when the drive manager is off, they are
            // a checkout tool and must not fight an active goal.
            if let Some(mnvr) = ds.mnvr_cmd.take() {
                if drive_mgr.is_off() {
                    ds.mnvr_output = Some(mnvr);
                } else {
                    warn!("Direct manouvre TC ignored as a drive goal is active");
                }
            }
        }

        // ---- LOCALISATION PROPAGATION ----

        // Propagate the fake localisation source with the command executed this cycle
        if let Some(ref mnvr) = ds.mnvr_output {
            drive_mgr.propagate_loc(mnvr, CYCLE_PERIOD_S);
        }

        // ---- TELEMETRY ----

        ds.drive_tm = Some(drive_mgr.get_tm());

        match tm_server.send(&ds) {
            Ok(_) => (),
            Err(e) => warn!("TmServer error: {}", e),
        };

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    session.exit();

    Ok(())
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
#[allow(dead_code)]
enum TcSource {
    None,
    Remote(TcServer),
    Script(ScriptInterpreter),
}
