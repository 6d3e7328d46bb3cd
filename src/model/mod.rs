//! Shared data model: cross-source items, the program inventory, and the
//! data-confidence layer.

pub mod confidence;
pub mod item;
pub mod program;

pub use confidence::{cross_ref_bonus, freshness_decay, ConfidenceScore, Tier};
pub use item::{ItemKey, RawItem, ScoredItem, Source};
pub use program::{
    AccessType, CiStatus, EffectiveStatus, EffectiveStatuses, FundingType, HotSheetsStatus,
    Priority, Program, ProgramInventory,
};
