//! Tracking continues when the trajectory leaves the workspace

mod common;

use std::time::Duration;

use arm_lib::traj_gen::TrajParams;

use common::*;

#[test]
fn test_unreachable_trajectory() {
    // A circle far outside the reach of the arm
    let traj = TrajParams {
        radius_m: 5.0,
        ..Default::default()
    };
    let sc = Scenario::start(traj, 50.0);
    sc.shared.set_measurement(reference()).unwrap();

    wait_until(Duration::from_secs(10), || sc.trigger.is_armed());
    assert!(sc.trigger.fire());

    wait_until(Duration::from_secs(30), || {
        sc.status.lock().unwrap().num_tracking_cycles >= 5
    });

    {
        let status = sc.status.lock().unwrap();

        // Every cycle fails after the full iteration budget, but still commands the arm
        assert_eq!(status.num_no_convergence, status.num_tracking_cycles);
        assert_eq!(
            status.num_consec_no_convergence,
            status.num_tracking_cycles
        );
        assert_eq!(status.last_ik_iterations, 100);
        assert!(status.last_ik_residual > 1.0);
    }

    let tracking_commands = sc
        .commands
        .lock()
        .unwrap()
        .iter()
        .filter(|(tracking, _)| *tracking)
        .count();
    assert!(tracking_commands >= 5);

    assert!(!sc.shared.is_shutdown());
    sc.stop();
}
