//! # Supervisor
//!
//! Starts the forward kinematics and inverse kinematics loops on their own named threads and
//! joins them at shutdown. A loop which stops for any reason, including an error or a panic,
//! requests shutdown so the other loop stops too.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::fk_loop::FkLoop;
use crate::ik_ctrl::IkCtrlLoop;
use crate::io::{CommandSink, PoseSink};
use crate::shared_state::SharedControlState;
use crate::CtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Supervisor {
    shared: Arc<SharedControlState>,
    loops: Vec<(&'static str, JoinHandle<Result<(), CtrlError>>)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Supervisor {
    /// Spawn both control loops.
    ///
    /// If the second thread cannot be spawned shutdown is requested, so the first one stops.
    pub fn start<P, C>(
        shared: Arc<SharedControlState>,
        fk_loop: FkLoop<P>,
        ik_loop: IkCtrlLoop<C>,
    ) -> std::io::Result<Self>
    where
        P: PoseSink + Send + 'static,
        C: CommandSink + Send + 'static,
    {
        let mut sup = Self {
            shared,
            loops: Vec::new(),
        };

        sup.spawn("fk_loop", move || fk_loop.run())?;

        if let Err(e) = sup.spawn("ik_loop", move || ik_loop.run()) {
            sup.shared.request_shutdown();
            sup.join().ok();
            return Err(e);
        }

        info!("Control loops started");

        Ok(sup)
    }

    /// Wait for both loops to stop, returning the first error either of them stopped with.
    pub fn join(self) -> Result<(), CtrlError> {
        let mut result = Ok(());

        for (name, jh) in self.loops {
            let loop_result = jh.join().unwrap_or(Err(CtrlError::LoopPanicked(name)));

            match loop_result {
                Ok(()) => info!("{} joined", name),
                Err(e) => {
                    error!("{} stopped with an error: {}", name, e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }

        result
    }

    fn spawn<F>(&mut self, name: &'static str, body: F) -> std::io::Result<()>
    where
        F: FnOnce() -> Result<(), CtrlError> + Send + 'static,
    {
        let shared = self.shared.clone();

        let jh = thread::Builder::new().name(name.into()).spawn(move || {
            // Stopping either loop stops the other
            let _guard = ShutdownOnDrop(shared);
            body()
        })?;

        self.loops.push((name, jh));

        Ok(())
    }
}

/// Requests shutdown when dropped.
struct ShutdownOnDrop(Arc<SharedControlState>);

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        self.0.request_shutdown();
    }
}
