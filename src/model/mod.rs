pub mod config;
pub mod fragment;
pub mod record;
pub mod report;
pub mod statistics;

pub use config::{
    AgentConfig, Config, ConfigError, FetcherConfig, RetryPolicy, RunMode, SlotSelectors,
};
pub use fragment::{RawFragment, Slot};
pub use record::{FieldValue, MatchContext, MatchEvent, MatchRecord, NormalizedFields, Score};
pub use report::{ArchiveEntry, ArchivePayload, ArchivedReport, GeneratedReport, Language, Report};
pub use statistics::MatchStatistics;
