pub mod dispatch;
pub mod domain;
pub mod expiry;
pub mod ledger;
pub mod policy;
pub mod ports;
pub mod recorder;
pub mod settings;
pub mod sweep;

#[cfg(test)]
mod testing;

pub use dispatch::{DeliveryStatus, FanoutReport, PushFanoutDispatcher, TokenOutcome};
pub use domain::{
    Candidate, CatalogItem, DeviceToken, MalformedCandidate, NewNotification, NotificationRecord,
    RecipientUser, TrackedItem,
};
pub use ports::{
    CandidateSource, Clock, DeliveryError, HouseholdDirectory, ItemLedgerStore,
    NotificationStore, PortError, PortResult, PushTransport, SystemClock,
};
pub use settings::{EngineSettings, FanoutScope};
pub use sweep::{ExpirySweepJob, ItemError, ItemOutcome, SweepDeps, SweepError, SweepReport};
