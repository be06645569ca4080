use crate::move_group::{JointValues, Pose};

/// Equal steps needed to cover `distance` without any step exceeding `max_step`.
/// A step that can't make progress covers the distance in one go.
fn step_count(distance: f32, max_step: f32) -> usize {
    if distance <= 0.0 {
        return 0;
    }
    if !max_step.is_finite() || max_step <= 0.0 {
        return 1;
    }
    (distance / max_step).ceil().max(1.0) as usize
}

/// Straight line poses from `start` to `target`, orientation slerped along.
/// Always ends with `target` even if nothing has to move.
pub fn cartesian_path(start: &Pose, target: &Pose, max_step: f32) -> Vec<Pose> {
    let distance = (target.position - start.position).norm();
    let steps = step_count(distance, max_step);
    let mut path: Vec<Pose> = (1..steps)
        .map(|index| {
            let fraction = index as f32 / steps as f32;
            let orientation = start
                .orientation
                .try_slerp(&target.orientation, fraction, 1.0e-6)
                .unwrap_or(target.orientation);
            Pose::new(start.position.lerp(&target.position, fraction), orientation)
        })
        .collect();
    path.push(target.clone());
    path
}

/// Joints move together and arrive at the same waypoint, none further than `max_step` per waypoint.
/// Joints missing from `start` begin at their goal. Always ends with `target`.
pub fn joint_path(start: &JointValues, target: &JointValues, max_step: f32) -> Vec<JointValues> {
    let mut origin = start.clone();
    for (joint, goal) in target {
        origin.entry(joint.clone()).or_insert(*goal);
    }
    let steps = target
        .iter()
        .map(|(joint, goal)| step_count((goal - origin[joint]).abs(), max_step))
        .max()
        .unwrap_or(0);

    let mut path: Vec<JointValues> = (1..steps)
        .map(|index| {
            let fraction = index as f32 / steps as f32;
            let mut waypoint = origin.clone();
            for (joint, goal) in target {
                let from = origin[joint];
                waypoint.insert(joint.clone(), from + (goal - from) * fraction);
            }
            waypoint
        })
        .collect();
    let mut last = origin;
    last.extend(target.iter().map(|(joint, goal)| (joint.clone(), *goal)));
    path.push(last);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra as na;

    #[test]
    fn test_step_count() {
        assert_eq!(step_count(0.0, 0.1), 0);
        assert_eq!(step_count(0.5, 0.125), 4);
        assert_eq!(step_count(0.45, 0.1), 5);
        assert_eq!(step_count(0.01, 1.0), 1);
    }

    #[test]
    fn test_step_count_without_progress() {
        assert_eq!(step_count(0.2, 0.0), 1);
        assert_eq!(step_count(0.2, -0.01), 1);
        assert_eq!(step_count(0.2, f32::NAN), 1);
    }

    #[test]
    fn cartesian_path_is_straight_line() {
        let start = Pose::from_position(na::Vector3::new(0.0, 0.0, 0.0));
        let target = Pose::from_position(na::Vector3::new(1.0, 0.0, 0.0));
        let path = cartesian_path(&start, &target, 0.1);
        assert_eq!(path.len(), 10);
        for pose in &path {
            assert_relative_eq!(pose.position.yz(), na::Vector2::new(0.0, 0.0));
        }
        for (before, after) in path.iter().zip(path.iter().skip(1)) {
            assert!(after.position.x > before.position.x);
            assert!((after.position - before.position).norm() <= 0.1 + 1.0e-5);
        }
    }

    #[test]
    fn cartesian_path_ends_on_target() {
        let start = Pose::from_position(na::Vector3::new(0.3, 0.5, 0.2));
        let target = Pose::new(
            na::Vector3::new(0.3, 0.5, 0.0),
            na::UnitQuaternion::from_euler_angles(0.0, std::f32::consts::FRAC_PI_2, 0.0),
        );
        let path = cartesian_path(&start, &target, 0.01);
        assert!(path.len() >= 20);
        assert_eq!(path.last(), Some(&target));
        for pose in &path {
            assert_relative_eq!(pose.position.xy(), na::Vector2::new(0.3, 0.5));
        }
    }

    #[test]
    fn cartesian_path_with_zero_step_jumps_to_target() {
        let start = Pose::from_position(na::Vector3::new(0.3, 0.5, 0.2));
        let target = Pose::from_position(na::Vector3::new(0.3, 0.5, 0.0));
        assert_eq!(cartesian_path(&start, &target, 0.0), vec![target]);
    }

    #[test]
    fn cartesian_path_to_same_pose_has_one_waypoint() {
        let pose = Pose::from_position(na::Vector3::new(0.1, 0.2, 0.3));
        let path = cartesian_path(&pose, &pose, 0.01);
        assert_eq!(path, vec![pose]);
    }

    #[test]
    fn joint_path_moves_every_joint() {
        let start: JointValues = [("a".to_owned(), 0.0), ("b".to_owned(), 1.0)]
            .into_iter()
            .collect();
        let target: JointValues = [("a".to_owned(), 0.5), ("b".to_owned(), 0.75)]
            .into_iter()
            .collect();
        let path = joint_path(&start, &target, 0.125);
        assert_eq!(path.len(), 4);
        assert_relative_eq!(path[1]["a"], 0.25);
        assert_relative_eq!(path[1]["b"], 0.875);
        let last = path.last().unwrap();
        assert_relative_eq!(last["a"], 0.5);
        assert_relative_eq!(last["b"], 0.75);
    }

    #[test]
    fn joint_path_with_zero_step_jumps_to_target() {
        let start: JointValues = [("a".to_owned(), 0.0)].into_iter().collect();
        let target: JointValues = [("a".to_owned(), 0.36)].into_iter().collect();
        assert_eq!(joint_path(&start, &target, 0.0), vec![target]);
    }

    #[test]
    fn joint_path_at_target_has_one_waypoint() {
        let start: JointValues = [("a".to_owned(), 0.2)].into_iter().collect();
        let path = joint_path(&start, &start, 0.1);
        assert_eq!(path, vec![start]);
    }
}
