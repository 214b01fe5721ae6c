//! Domain types and models

pub mod action;
pub mod crm;
pub mod status;
pub mod sync;

pub use action::PendingAction;
pub use crm::{
    ActivityLog, AppointmentRequest, ContactUpdate, CrmAction, DealStageChange, NewContact,
    NewDeal, OutboundEmail,
};
pub use status::{StatusEvent, StatusKind, StatusSeverity};
pub use sync::{ConnectivityEdge, DrainOutcome, DrainReport, OfflineSnapshot, SkipReason, SyncState};
