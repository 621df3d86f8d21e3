use std::rc::Rc;

use nalgebra::Vector3;
use quadnav::{PeerRegistry, State, TargetAnchor, Vehicle, VehicleConfig, VehicleId};

// A leader chases a moving marker while a follower tracks the leader
fn main() {
    let config = VehicleConfig::default();
    let marker = TargetAnchor::new(Vector3::new(0.0, 1.5, 0.0));

    let leader = Vehicle::from_config(&config, State::default(), marker.position());
    let follower = Vehicle::from_config(
        &config,
        State::at_rest(Vector3::new(-1.0, 0.0, -1.0)),
        Vector3::new(-1.0, 1.0, -1.0),
    );
    let (mut leader, mut follower) = match (leader, follower) {
        (Ok(leader), Ok(follower)) => (leader, follower),
        (Err(e), _) | (_, Err(e)) => {
            println!("Invalid configuration: {}", e);
            return;
        }
    };

    leader.controller_mut().follow(marker.handle());
    follower.controller_mut().follow(leader.handle());

    let mut registry = PeerRegistry::new();
    registry.register(VehicleId(0), leader.handle());
    registry.register(VehicleId(1), follower.handle());
    let registry = Rc::new(registry);
    let mut follower = follower.with_peers(VehicleId(1), Rc::clone(&registry));

    let ticks = (20.0 / config.dt) as usize;
    for tick in 0..ticks {
        let t = tick as f64 * config.dt;
        marker.set_position(Vector3::new(2.0 * (0.2 * t).sin(), 1.5, 2.0 * (0.2 * t).cos() - 2.0));

        if let Err(e) = leader.tick().and_then(|_| follower.tick()) {
            println!("Simulation failed: {}", e);
            return;
        }

        if tick % 50 == 0 {
            let separation = follower
                .peer_positions()
                .iter()
                .map(|(_, p)| (p - follower.position()).norm())
                .fold(f64::INFINITY, f64::min);
            println!(
                "t={:5.2} leader lag={:.3} follower separation={:.3}",
                t,
                (marker.position() - leader.position()).norm(),
                separation
            );
        }
    }
}
