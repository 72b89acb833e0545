//! Arm executable entry point.
//!
//! # Architecture
//!
//! The executable runs two cyclic control loops on their own threads:
//!
//!     - Forward kinematics loop (base frequency):
//!         - Compute the end-effector pose from the latest joint state
//!         - Publish the pose
//!         - Advance the trajectory clock while tracking
//!     - Inverse kinematics loop (a multiple of the base frequency):
//!         - Wait for the first pose
//!         - Drive the arm to the initial configuration
//!         - Wait for the operator's start trigger
//!         - Track the circular trajectory
//!
//! Joint states are received and telecommands served on background threads. Everything shares
//! a single `SharedControlState`. Ctrl-C or a `Shutdown` telecommand stops all of them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::sync::Arc;

// Internal
use arm_lib::{
    fk_loop::FkLoop,
    ik_ctrl::{IkCtrlLoop, TrackingController},
    init_pos::InitialPositioning,
    kin_model::{Chain, RobotDescription},
    kin_solver::KinematicSolver,
    net::{CommandPublisher, JointStateClient, PosePublisher, TcServer, TcTargets},
    params::ArmExecParams,
    shared_state::SharedControlState,
    supervisor::Supervisor,
    traj_gen::TrajectoryGenerator,
    trigger::{spawn_console_trigger, StartTrigger, TriggerSource},
};
use comms_if::net::{zmq, NetParams};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("arm_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Iiwa Arm Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: ArmExecParams =
        util::params::load("arm_exec.toml").wrap_err("Could not load arm_exec params")?;
    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- KINEMATIC MODEL ----

    let desc_path = util::params::param_path(&params.model.description_file)
        .wrap_err("Could not find the robot description")?;
    let desc = RobotDescription::load(&desc_path)
        .wrap_err_with(|| format!("Could not load the robot description {:?}", desc_path))?;
    let chain = Chain::build(&desc, &params.model.base_frame, &params.model.tip_frame)
        .wrap_err("Could not build the kinematic chain")?;

    let num_joints = chain.num_joints();
    info!(
        "Kinematic chain {} -> {} with {} joints: {:?}",
        chain.base_frame(),
        chain.tip_frame(),
        num_joints,
        chain.joint_names()
    );

    params
        .validate(num_joints)
        .wrap_err("Invalid arm_exec params")?;

    let solver = Arc::new(KinematicSolver::new(chain, params.solver));

    // ---- SHARED STATE ----

    let shared = Arc::new(SharedControlState::new(num_joints));
    let trigger = Arc::new(StartTrigger::new());

    {
        let shared = shared.clone();
        ctrlc::set_handler(move || {
            warn!("Caught interrupt");
            shared.request_shutdown();
        })
        .wrap_err("Could not set the Ctrl-C handler")?;
    }

    // ---- NETWORK ----

    let zmq_ctx = zmq::Context::new();

    let joint_state_client =
        JointStateClient::start(&zmq_ctx, &net_params.joint_state_endpoint, shared.clone())
            .wrap_err("Could not start the joint state client")?;
    let pose_publisher = PosePublisher::new(&zmq_ctx, &net_params.eef_pose_endpoint)
        .wrap_err("Could not start the pose publisher")?;
    let command_publisher =
        CommandPublisher::new(&zmq_ctx, &net_params.joint_cmd_endpoint, num_joints)
            .wrap_err("Could not start the command publisher")?;

    // ---- CONTROL LOOPS ----

    let fk_loop = FkLoop::new(
        solver.clone(),
        shared.clone(),
        pose_publisher,
        params.control.frequency_hz,
        params.measurement_timeout(),
    );

    let init_pos = InitialPositioning::new(&params.init_pos, num_joints)
        .wrap_err("Invalid initial reference configuration")?;
    let tracking = TrackingController::new(
        solver,
        TrajectoryGenerator::new(params.traj),
        params.ik_ctrl.no_convergence_policy,
    );
    let ik_loop = IkCtrlLoop::new(
        shared.clone(),
        trigger.clone(),
        init_pos,
        tracking,
        command_publisher,
        params.ik_frequency_hz(),
    );

    let tc_server = TcServer::start(
        &zmq_ctx,
        &net_params.tc_endpoint,
        TcTargets {
            shared: shared.clone(),
            trigger: trigger.clone(),
            status: ik_loop.status_handle(),
        },
    )
    .wrap_err("Could not start the telecommand server")?;

    if params.control.trigger_source == TriggerSource::Console {
        spawn_console_trigger(
            trigger,
            shared.clone(),
            std::io::BufReader::new(std::io::stdin()),
        )
        .wrap_err("Could not start the console trigger")?;
    }

    info!(
        "Starting control loops, FK at {} Hz, IK at {} Hz",
        params.control.frequency_hz,
        params.ik_frequency_hz()
    );

    let supervisor = Supervisor::start(shared.clone(), fk_loop, ik_loop)
        .wrap_err("Could not start the control loops")?;

    // ---- SHUTDOWN ----

    let result = supervisor.join();

    shared.request_shutdown();
    joint_state_client.join();
    tc_server.join();

    result.wrap_err("A control loop failed")?;

    info!("End of execution");

    Ok(())
}
