//! # Arm console
//!
//! Interactive operator console. Each line entered is parsed as a telecommand, sent to the arm
//! executable, and the response printed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Report};
use rustyline::{error::ReadlineError, DefaultEditor};

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    tc::{Tc, TcParseError, TcResponse},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "iiwa $ ";

const HISTORY_PATH: &str = ".arm_console_history";

const HELP: &str = "\
Commands:
    start       Start tracking the trajectory, once the arm is at its initial configuration
    status      Print the arm control status
    shutdown    Stop the arm executable
    help        Print this message
    exit        Leave the console";

/// How long to wait for the executable to answer.
const RESPONSE_TIMEOUT_MS: i32 = 1000;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
enum ConsoleError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error(transparent)]
    TcParseError(#[from] TcParseError),

    #[error("Could not send the telecommand: {0}")]
    SendError(zmq::Error),

    #[error("No response from the arm executable")]
    NoResponse,

    #[error("Could not receive the response: {0}")]
    RecvError(zmq::Error),

    #[error("The response was not valid UTF-8")]
    NonUtf8Response,

    #[error("Could not parse the response: {0}")]
    ResponseParseError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let endpoint = connect_endpoint(&net_params.tc_endpoint);

    let ctx = zmq::Context::new();
    let socket_options = SocketOptions {
        connect_timeout: 1000,
        linger: 0,
        recv_timeout: RESPONSE_TIMEOUT_MS,
        send_timeout: RESPONSE_TIMEOUT_MS,
        req_correlate: true,
        req_relaxed: true,
        ..Default::default()
    };
    let socket = MonitoredSocket::new(&ctx, zmq::REQ, socket_options, &endpoint)
        .wrap_err("Could not create the telecommand socket")?;

    println!("Arm console, sending telecommands to {}\n", endpoint);
    println!("{}\n", HELP);

    let mut rl = DefaultEditor::new().wrap_err("Could not start the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history found");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).wrap_err("Could not read from the console"),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        rl.add_history_entry(line).ok();

        match line {
            "exit" | "quit" => break,
            "help" => {
                println!("{}", HELP);
                continue;
            }
            _ => (),
        }

        match Tc::from_line(line).map_err(ConsoleError::from).and_then(|tc| send_tc(&socket, &tc)) {
            Ok(response) => print_response(&response),
            Err(e) => println!("{}", e),
        }
    }

    rl.save_history(HISTORY_PATH)
        .wrap_err("Could not save the console history")?;

    Ok(())
}

/// Send a telecommand and wait for the response.
fn send_tc(socket: &MonitoredSocket, tc: &Tc) -> Result<TcResponse, ConsoleError> {
    if !socket.connected() {
        println!("Warning: not connected to the arm executable yet");
    }

    socket
        .send(tc.to_json()?.as_bytes(), 0)
        .map_err(ConsoleError::SendError)?;

    let response_str = match socket.recv_string(0) {
        Ok(Ok(s)) => s,
        Ok(Err(_)) => return Err(ConsoleError::NonUtf8Response),
        Err(zmq::Error::EAGAIN) => return Err(ConsoleError::NoResponse),
        Err(e) => return Err(ConsoleError::RecvError(e)),
    };

    serde_json::from_str(&response_str).map_err(ConsoleError::ResponseParseError)
}

fn print_response(response: &TcResponse) {
    match response {
        TcResponse::Ok => println!("Ok"),
        TcResponse::Status(tm) => {
            println!("State:             {}", tm.state);
            println!("Tracking:          {}", tm.tracking_active);
            println!("Trajectory time:   {:.3} s", tm.elapsed_s);
            println!("Tracking cycles:   {}", tm.num_tracking_cycles);
            println!(
                "IK failures:       {} ({} consecutive)",
                tm.num_no_convergence, tm.num_consec_no_convergence
            );
            println!(
                "Last IK solve:     {} iterations, residual {:.3e}",
                tm.last_ik_iterations, tm.last_ik_residual
            );
        }
        TcResponse::CannotExecute => println!("Cannot execute the telecommand right now"),
        TcResponse::Invalid => println!("The arm executable rejected the telecommand as invalid"),
    }
}

/// The executable binds the telecommand endpoint on all interfaces, the console connects to it
/// locally.
fn connect_endpoint(bind_endpoint: &str) -> String {
    bind_endpoint.replace('*', "localhost")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_connect_endpoint() {
        assert_eq!(connect_endpoint("tcp://*:5013"), "tcp://localhost:5013");
        assert_eq!(connect_endpoint("tcp://10.0.0.2:5013"), "tcp://10.0.0.2:5013");
    }
}
