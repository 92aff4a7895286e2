// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Simulated devices.

use std::collections::BTreeMap;

use field_core::{Export, NodeId, Payload, PayloadError, StateSnapshot};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Point on the simulation plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Position at `(x, y)`.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<Position> for (f64, f64) {
    fn from(p: Position) -> Self {
        (p.x, p.y)
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// One device: where it is, what it senses, and what the Round Driver keeps
/// for it between rounds.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: NodeId,
    position: Position,
    sensors: BTreeMap<String, Payload>,
    pub(crate) outbound: BTreeMap<NodeId, Export>,
    pub(crate) state: StateSnapshot,
    pub(crate) result: Option<Payload>,
    pub(crate) rounds: u64,
}

impl Node {
    /// Fresh node with no sensors, no exports and no state.
    pub fn new(id: NodeId, position: Position) -> Self {
        Self {
            id,
            position,
            sensors: BTreeMap::new(),
            outbound: BTreeMap::new(),
            state: StateSnapshot::default(),
            result: None,
            rounds: 0,
        }
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Moves the node.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Sets sensor `name` to `value`.
    pub fn set_sensor<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), PayloadError> {
        self.sensors.insert(name.into(), Payload::encode(value)?);
        Ok(())
    }

    /// Reads sensor `name`, `Ok(None)` when it was never set.
    pub fn sensor<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, PayloadError> {
        self.sensors.get(name).map(Payload::decode).transpose()
    }

    /// Reads sensor `name`, falling back to `T::default()` when unset.
    pub fn sensor_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, PayloadError> {
        Ok(self.sensor(name)?.unwrap_or_default())
    }

    /// Result of the node's last completed round.
    pub fn result(&self) -> Option<&Payload> {
        self.result.as_ref()
    }

    /// Decoded result of the last completed round.
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<Option<T>, PayloadError> {
        self.result.as_ref().map(Payload::decode).transpose()
    }

    /// Exports produced in the last completed round, by recipient.
    pub fn outbound(&self) -> &BTreeMap<NodeId, Export> {
        &self.outbound
    }

    /// State persisted by the last completed round.
    pub fn state(&self) -> &StateSnapshot {
        &self.state
    }

    /// Number of completed rounds.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensors_are_typed() {
        let mut node = Node::new(NodeId(1), Position::new(0.0, 0.0));
        node.set_sensor("source", &true).unwrap();
        assert_eq!(node.sensor::<bool>("source").unwrap(), Some(true));
        assert_eq!(node.sensor::<bool>("target").unwrap(), None);
        assert!(!node.sensor_or_default::<bool>("target").unwrap());
        assert!(node.sensor::<String>("source").is_err());
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }
}
