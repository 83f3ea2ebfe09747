//! Builds the robot, peripherals and RF source selected in the configuration.

use std::sync::Arc;

use thiserror::Error;

use crate::abort::CancelFlag;
use crate::capture::SampleCoordinator;
use crate::config::{Config, PeripheralBackend, RfBackend, RobotBackend};
use crate::motion::{HeadingController, MotionActuator, OrientationSource, VelocitySink};
use crate::peripheral::{
    CommandChannel, HttpAntennaLink, HttpPhotoService, PeripheralLink, PhotoService, StatusMonitor,
};
use crate::rf::{PowerSource, ProcessPowerSource};
use crate::scan::ScanOrchestrator;
use crate::sim::{SimAntenna, SimCamera, SimPowerSource, SimRobot};

#[derive(Debug, Error)]
pub enum RigError {
    #[error("the {0} backend is not compiled in (enable the `{0}` feature)")]
    BackendUnavailable(&'static str),
    #[error("ROS initialisation failed: {0}")]
    Ros(String),
    #[error("missing setting: {0}")]
    Missing(&'static str),
}

pub struct Rig {
    pub orchestrator: ScanOrchestrator,
    pub monitor: StatusMonitor,
}

type RobotParts = (Box<dyn OrientationSource>, Box<dyn VelocitySink>, Option<SimRobot>);

fn robot(config: &Config) -> Result<RobotParts, RigError> {
    match config.robot.backend {
        RobotBackend::Simulated => {
            let sim = &config.robot.simulated;
            let robot = SimRobot::new(sim.initial_heading).with_drift(sim.drift);
            log::info!(
                "Using simulated robot (initial heading {:.3} rad, drift {:.3} rad/m)",
                sim.initial_heading,
                sim.drift
            );
            Ok((Box::new(robot.orientation()), Box::new(robot.sink()), Some(robot)))
        }
        #[cfg(feature = "ros")]
        RobotBackend::Ros => {
            let (orientation, sink) =
                crate::ros::connect(&config.robot).map_err(|e| RigError::Ros(e.to_string()))?;
            Ok((Box::new(orientation), Box::new(sink), None))
        }
        #[cfg(not(feature = "ros"))]
        RobotBackend::Ros => Err(RigError::BackendUnavailable("ros")),
    }
}

type PeripheralParts = (Arc<dyn PhotoService>, Arc<dyn PeripheralLink>, Arc<SimAntenna>);

fn peripherals(config: &Config) -> Result<PeripheralParts, RigError> {
    let p = &config.peripherals;
    match p.backend {
        PeripheralBackend::Simulated => {
            log::info!("Using simulated camera and antenna switch");
            let antenna = Arc::new(SimAntenna::default());
            Ok((Arc::new(SimCamera), antenna.clone(), antenna))
        }
        PeripheralBackend::Http => {
            let photo_url = p.photo_url.as_deref().ok_or(RigError::Missing("peripherals.photo_url"))?;
            let antenna_url = p
                .antenna_url
                .as_deref()
                .ok_or(RigError::Missing("peripherals.antenna_url"))?;
            log::info!("Photo service at {}, antenna switch at {}", photo_url, antenna_url);
            Ok((
                Arc::new(HttpPhotoService::new(photo_url, p.photo_timeout, p.ping_timeout)),
                Arc::new(HttpAntennaLink::new(antenna_url, p.request_timeout)),
                Arc::new(SimAntenna::default()),
            ))
        }
    }
}

fn power_source(
    config: &Config,
    sim_antenna: Arc<SimAntenna>,
    sim_robot: Option<SimRobot>,
) -> Result<Box<dyn PowerSource>, RigError> {
    match config.rf.backend {
        RfBackend::Simulated => Ok(Box::new(SimPowerSource::new(sim_antenna, sim_robot))),
        RfBackend::Process => {
            let command = config.rf.command.clone().ok_or(RigError::Missing("rf.command"))?;
            log::info!("RF pipeline: {} {:?}", command, config.rf.args);
            Ok(Box::new(ProcessPowerSource::new(
                command,
                config.rf.args.clone(),
                config.rf.timeout,
            )))
        }
    }
}

pub fn build(config: &Config, cancel: CancelFlag) -> Result<Rig, RigError> {
    let (orientation, sink, sim_robot) = robot(config)?;
    let (camera, antenna, sim_antenna) = peripherals(config)?;
    let power = power_source(config, sim_antenna, sim_robot)?;

    let actuator = MotionActuator::new(sink, config.robot.control_rate_hz, cancel);
    let heading = HeadingController::new(orientation, &config.heading);
    let channel = CommandChannel::new(
        antenna.clone(),
        config.peripherals.request_timeout,
        config.peripherals.retry.clone(),
    );
    let coordinator = SampleCoordinator::new(camera.clone(), channel, power, &config.capture);
    log::info!(
        "Antenna sequence: {:?}",
        coordinator.sequence().iter().map(|a| a.index()).collect::<Vec<_>>()
    );

    Ok(Rig {
        orchestrator: ScanOrchestrator::new(
            actuator,
            heading,
            coordinator,
            config.scan.clone(),
            config.output_dir(),
        ),
        monitor: StatusMonitor::new(camera, antenna, config.peripherals.status_interval),
    })
}
