pub mod archive;
pub mod battle;
pub mod chat;
pub mod creature;
pub mod events;
pub mod guided;
pub mod image_ref;
pub mod locale;
pub mod models;

pub use archive::{ArchiveEntry, ArchiveStore};
pub use battle::{BattleAnalysis, BattleResult};
pub use creature::{BehaviorTree, Codex, CreatureRecord, EngineData, Stats, Taxonomy, Trait};
pub use guided::{Category, GuidedSelections};
pub use image_ref::InlineImage;
pub use locale::Locale;
