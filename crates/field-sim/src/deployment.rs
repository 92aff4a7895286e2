// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node placement generators.
//!
//! Lattice generators number nodes column-major (`x * height + y`), so the
//! first node sits at the origin and the last one at the far corner.

use field_core::NodeId;

use crate::environment::Environment;
use crate::error::SimError;
use crate::node::Position;
use crate::rng::SimRng;

fn lattice_id(x: u32, y: u32, height: u32) -> NodeId {
    NodeId(u64::from(x) * u64::from(height) + u64::from(y))
}

/// Regular `width × height` grid with the given spacing.
pub fn grid(env: &mut Environment, width: u32, height: u32, spacing: f64) -> Result<(), SimError> {
    for x in 0..width {
        for y in 0..height {
            let position = Position::new(f64::from(x) * spacing, f64::from(y) * spacing);
            env.insert(lattice_id(x, y, height), position)?;
        }
    }
    Ok(())
}

/// Grid whose points are each displaced by up to `deformation` on both axes.
pub fn deformed_lattice(
    env: &mut Environment,
    rng: &mut SimRng,
    width: u32,
    height: u32,
    spacing: f64,
    deformation: f64,
) -> Result<(), SimError> {
    for x in 0..width {
        for y in 0..height {
            let dx = rng.uniform(-deformation, deformation);
            let dy = rng.uniform(-deformation, deformation);
            let position = Position::new(
                f64::from(x).mul_add(spacing, dx),
                f64::from(y).mul_add(spacing, dy),
            );
            env.insert(lattice_id(x, y, height), position)?;
        }
    }
    Ok(())
}

/// `steps` nodes along a random walk from the origin, each step at most
/// `step` on both axes. Ids continue after the highest existing one.
pub fn random_walk(
    env: &mut Environment,
    rng: &mut SimRng,
    steps: u32,
    step: f64,
) -> Result<(), SimError> {
    let mut at = Position::default();
    for _ in 0..steps {
        at.x += rng.uniform(-step, step);
        at.y += rng.uniform(-step, step);
        env.spawn(at)?;
    }
    Ok(())
}

/// `count` nodes placed uniformly in angle and radius inside a circle
/// centred on the origin, with ids `0..count`.
pub fn random_in_circle(
    env: &mut Environment,
    rng: &mut SimRng,
    count: u32,
    radius: f64,
) -> Result<(), SimError> {
    for index in 0..count {
        let angle = rng.uniform(0.0, std::f64::consts::TAU);
        let r = rng.uniform(0.0, radius);
        let position = Position::new(r * angle.cos(), r * angle.sin());
        env.insert(NodeId(u64::from(index)), position)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighborhood::Full;

    #[test]
    fn grid_numbers_column_major() {
        let mut env = Environment::new(Full);
        grid(&mut env, 3, 2, 0.5).unwrap();
        assert_eq!(env.len(), 6);
        let last = env.node(NodeId(5)).unwrap().position();
        assert_eq!(last, Position::new(1.0, 0.5));
        let second = env.node(NodeId(1)).unwrap().position();
        assert_eq!(second, Position::new(0.0, 0.5));
    }

    #[test]
    fn deformation_is_bounded_and_seeded() {
        let place = |seed| {
            let mut env = Environment::new(Full);
            let mut rng = SimRng::new(seed);
            deformed_lattice(&mut env, &mut rng, 4, 4, 1.0, 0.1).unwrap();
            env.nodes().map(|n| n.position()).collect::<Vec<_>>()
        };
        let a = place(42);
        assert_eq!(a, place(42));
        assert_ne!(a, place(43));
        for (i, p) in a.iter().enumerate() {
            let ideal = Position::new((i / 4) as f64, (i % 4) as f64);
            assert!((p.x - ideal.x).abs() <= 0.1 + 1e-12);
            assert!((p.y - ideal.y).abs() <= 0.1 + 1e-12);
        }
    }

    #[test]
    fn circle_points_stay_inside() {
        let mut env = Environment::new(Full);
        let mut rng = SimRng::new(5);
        random_in_circle(&mut env, &mut rng, 50, 2.0).unwrap();
        let origin = Position::default();
        assert!(env.nodes().all(|n| n.position().distance(&origin) <= 2.0 + 1e-12));
    }

    #[test]
    fn random_walk_appends_nodes() {
        let mut env = Environment::new(Full);
        env.insert(NodeId(10), Position::default()).unwrap();
        let mut rng = SimRng::new(5);
        random_walk(&mut env, &mut rng, 3, 0.5).unwrap();
        assert_eq!(env.ids().collect::<Vec<_>>(), [NodeId(10), NodeId(11), NodeId(12), NodeId(13)]);
    }
}
