use super::world::SharedWorld;
use crate::move_group::Waypoint;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task;
use tokio::time::sleep;

#[derive(Error, Debug)]
pub enum SpinnerError {
    #[error("state dispatcher is not running")]
    Stopped,
    #[error("state dispatcher task failed")]
    Join(#[from] task::JoinError),
}

type Result<T> = std::result::Result<T, SpinnerError>;

enum StateUpdate {
    Waypoint { group: String, waypoint: Waypoint },
    Sync(oneshot::Sender<()>),
    Shutdown,
}

/// Background task that keeps the shared robot state current while trajectories run.
pub struct Spinner {
    sender: mpsc::UnboundedSender<StateUpdate>,
    join_handle: task::JoinHandle<()>,
}

impl Spinner {
    pub fn start(world: SharedWorld, waypoint_delay: Duration) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let join_handle = tokio::spawn(async move {
            while let Some(update) = receiver.recv().await {
                match update {
                    StateUpdate::Waypoint { group, waypoint } => {
                        if !waypoint_delay.is_zero() {
                            sleep(waypoint_delay).await;
                        }
                        world.lock().await.apply_waypoint(&group, &waypoint);
                    }
                    StateUpdate::Sync(ack) => {
                        // nobody waiting is fine
                        let _ = ack.send(());
                    }
                    StateUpdate::Shutdown => break,
                }
            }
            tracing::debug!("State dispatcher stopped");
        });
        Self {
            sender,
            join_handle,
        }
    }

    pub fn handle(&self) -> SpinnerHandle {
        SpinnerHandle {
            sender: self.sender.clone(),
        }
    }

    /// Finishes queued updates and waits for the task to end
    pub async fn shutdown(self) -> Result<()> {
        // already stopped is fine, joining reports how it ended
        let _ = self.sender.send(StateUpdate::Shutdown);
        self.join_handle.await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SpinnerHandle {
    sender: mpsc::UnboundedSender<StateUpdate>,
}

impl SpinnerHandle {
    /// Streams a trajectory and blocks until the state reflects its last waypoint
    pub async fn execute(&self, group: &str, trajectory: Vec<Waypoint>) -> Result<()> {
        for waypoint in trajectory {
            self.sender
                .send(StateUpdate::Waypoint {
                    group: group.to_owned(),
                    waypoint,
                })
                .map_err(|_| SpinnerError::Stopped)?;
        }
        let (ack_sender, ack_receiver) = oneshot::channel();
        self.sender
            .send(StateUpdate::Sync(ack_sender))
            .map_err(|_| SpinnerError::Stopped)?;
        ack_receiver.await.map_err(|_| SpinnerError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_config::CellConfig;
    use crate::move_group::{JointValues, Pose};
    use crate::sim::world::SimulatedWorld;
    use approx::assert_relative_eq;
    use nalgebra as na;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn shared_world() -> SharedWorld {
        let config = CellConfig::included().unwrap();
        Arc::new(Mutex::new(SimulatedWorld::new(
            &config.robot,
            &config.simulation,
        )))
    }

    #[tokio::test]
    async fn execute_waits_for_last_waypoint() {
        let world = shared_world();
        let spinner = Spinner::start(world.clone(), Duration::from_millis(1));
        let trajectory: Vec<Waypoint> = (1..=5)
            .map(|step| Waypoint {
                joints: JointValues::new(),
                end_effector: Some(Pose::from_position(na::Vector3::new(
                    0.1 * step as f32,
                    0.0,
                    0.3,
                ))),
            })
            .collect();
        spinner.handle().execute("ur5_arm", trajectory).await.unwrap();
        let pose = world.lock().await.groups["ur5_arm"]
            .end_effector
            .clone()
            .unwrap();
        assert_relative_eq!(pose.position, na::Vector3::new(0.5, 0.0, 0.3));
        spinner.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn execute_after_shutdown_fails() {
        let world = shared_world();
        let spinner = Spinner::start(world, Duration::ZERO);
        let handle = spinner.handle();
        spinner.shutdown().await.unwrap();
        let result = handle.execute("gripper", vec![]).await;
        assert!(matches!(result, Err(SpinnerError::Stopped)));
    }
}
