use nalgebra::Vector3;
use quadnav::{RigidBody, State, Vehicle, VehicleConfig};

// Takes off from the origin and settles one meter up and to the right
fn main() {
    let config = VehicleConfig::default();
    let target = Vector3::new(1.0, 1.0, 0.0);

    let mut vehicle = match Vehicle::from_config(&config, State::default(), target) {
        Ok(vehicle) => vehicle,
        Err(e) => {
            println!("Invalid configuration: {}", e);
            return;
        }
    };

    let ticks = (10.0 / config.dt) as usize;
    for tick in 0..ticks {
        match vehicle.tick() {
            Ok(output) => {
                if tick % 25 == 0 {
                    let p = vehicle.position();
                    println!(
                        "t={:5.2} position=({:.3}, {:.3}, {:.3}) throttles={:.3?}",
                        vehicle.body().time(),
                        p.x,
                        p.y,
                        p.z,
                        output.throttles
                    );
                }
            }
            Err(e) => {
                println!("Simulation failed: {}", e);
                return;
            }
        }
    }

    let body = vehicle.body();
    println!("Final state:");
    println!("Position error: {:.4}", (target - body.position()).norm());
    println!("Velocity: {:.4}", body.velocity().norm());
    println!("Up: {:.3?}", body.up());
}
