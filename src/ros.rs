//! ROS 2 robot backend: odometry in, `Twist` velocity commands out.

use std::time::Duration;

use futures::StreamExt;
use r2r::geometry_msgs::msg::{Twist, Vector3};
use r2r::nav_msgs::msg::Odometry;
use r2r::QosProfile;
use tokio::sync::watch;

use crate::config::RobotConfig;
use crate::motion::{FeedOrientation, MotionError, Quaternion, VelocityCommand, VelocitySink};

pub struct TwistSink {
    publisher: r2r::Publisher<Twist>,
}

impl VelocitySink for TwistSink {
    fn publish(&mut self, cmd: VelocityCommand) -> Result<(), MotionError> {
        let twist = Twist {
            linear: Vector3 {
                x: cmd.linear,
                y: 0.0,
                z: 0.0,
            },
            angular: Vector3 {
                x: 0.0,
                y: 0.0,
                z: cmd.angular,
            },
        };
        self.publisher
            .publish(&twist)
            .map_err(|e| MotionError::ActuatorUnavailable(e.to_string()))
    }
}

/// Creates the node, subscribes to odometry and advertises the velocity
/// topic. The node is spun on a dedicated thread for the life of the process.
pub fn connect(config: &RobotConfig) -> Result<(FeedOrientation, TwistSink), r2r::Error> {
    let ctx = r2r::Context::create()?;
    let mut node = r2r::Node::create(ctx, &config.ros.node_name, "")?;

    let odometry = node.subscribe::<Odometry>(&config.ros.odom_topic, QosProfile::default())?;
    let publisher =
        node.create_publisher::<Twist>(&config.ros.cmd_vel_topic, QosProfile::default())?;
    log::info!(
        "ROS node '{}' listening on {}, publishing on {}",
        config.ros.node_name,
        config.ros.odom_topic,
        config.ros.cmd_vel_topic
    );

    let (tx, rx) = watch::channel(None);
    tokio::spawn(async move {
        odometry
            .for_each(|msg| {
                let o = msg.pose.pose.orientation;
                tx.send_replace(Some(Quaternion {
                    x: o.x,
                    y: o.y,
                    z: o.z,
                    w: o.w,
                }));
                futures::future::ready(())
            })
            .await;
        log::warn!("Odometry subscription ended");
    });

    std::thread::spawn(move || loop {
        node.spin_once(Duration::from_millis(100));
    });

    Ok((
        FeedOrientation::new(rx, config.orientation_timeout),
        TwistSink { publisher },
    ))
}
