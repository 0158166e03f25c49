//! The script every new session starts with.

use refactory_types::PlayerScript;

/// Name of the starter script.
pub const STARTER_SCRIPT_NAME: &str = "Main Controller";

/// Greedy gather-and-deliver loop. Works, but wastes energy on wide scans.
pub const STARTER_SCRIPT: &str = r#"// Welcome to ReFactory!
// update(robot) runs once per robot every tick.
// Strategy: grab the nearest ore, carry it to the nearest machine, repeat.

fn update(robot) {
    let inv = robot.inventory();

    if inv.kind != () {
        // 500 units is far wider than needed.
        let machines = robot.scan_machines(500.0);
        if machines.len() > 0 {
            let target = machines[0];
            if target.distance < 20.0 {
                robot.dropoff(target.id);
            } else {
                robot.move_to(target.x, target.y);
            }
        }
    } else {
        let resources = robot.scan_resources(300.0);
        if resources.len() > 0 {
            let target = resources[0];
            if target.distance < 15.0 {
                robot.pickup(target.id);
            } else {
                robot.move_to(target.x, target.y);
            }
        }
    }
}
"#;

/// A fresh copy of the starter script.
pub fn starter_script() -> PlayerScript {
    PlayerScript::new(STARTER_SCRIPT_NAME, STARTER_SCRIPT)
}
