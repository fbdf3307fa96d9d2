//! Combat event batches.

use serde::{Deserialize, Serialize};

use super::{EntityId, InvalidDiscriminant, WireMessage};
use crate::MessageType;

/// What kind of combat event happened. Integer-valued on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CombatEventType {
    Hit,
    Stagger,
    Heal,
    Block,
}

impl From<CombatEventType> for u8 {
    fn from(event_type: CombatEventType) -> Self {
        match event_type {
            CombatEventType::Hit => 0,
            CombatEventType::Stagger => 1,
            CombatEventType::Heal => 2,
            CombatEventType::Block => 3,
        }
    }
}

impl TryFrom<u8> for CombatEventType {
    type Error = InvalidDiscriminant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Hit),
            1 => Ok(Self::Stagger),
            2 => Ok(Self::Heal),
            3 => Ok(Self::Block),
            other => Err(InvalidDiscriminant::new("CombatEventType", other)),
        }
    }
}

/// One resolved combat interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatEvent {
    /// `type` on the wire; renamed because `type` is a Rust keyword.
    #[serde(rename = "type")]
    pub event_type: CombatEventType,
    pub source_entity_id: EntityId,
    pub target_entity_id: EntityId,
    /// Damage dealt or health restored.
    pub amount: f32,
    /// Target health after the event.
    pub remaining_hp: f32,
    /// Length of the effect (stagger, block window). 0 for instant events.
    pub duration_ms: i32,
}

/// All combat events resolved during one tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatEventMessage {
    pub tick: u32,
    pub events: Vec<CombatEvent>,
}

impl WireMessage for CombatEventMessage {
    const MESSAGE_TYPE: MessageType = MessageType::CombatEvent;
}
