//! Client-side state for the skills companion app.
//!
//! Screens own one controller each: an [`EntryListController`] for saved
//! entries, a [`WizardSession`] for guided multi-step exercises and a
//! [`PracticeTimer`] for timed practice. All remote persistence goes through
//! an [`EntryStore`]; the HTTP implementation needs a [`CredentialProvider`].

pub mod config;
pub mod credentials;
pub mod display;
pub mod entry_list;
pub mod error;
pub mod grouping;
pub mod items;
pub mod navigation;
pub mod notice;
pub mod store;
pub mod timer;
pub mod wizard;

pub use credentials::{CredentialProvider, MissingCredentials, StaticCredentials};
pub use entry_list::{
    DeleteOutcome, EntryListController, EntryListEvent, EntryListSnapshot, ListMode, LoadOutcome,
};
pub use error::{ClientError, ErrorCategory};
pub use grouping::{EntryGroup, GroupId};
pub use items::RepeatedItems;
pub use navigation::NavigationRequest;
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use store::{load_kinds, EntryStore, HttpEntryStore, MultiKindSnapshot};
pub use timer::{PracticeTimer, TimerSnapshot, TimerStatus};
pub use wizard::{SaveOutcome, StepChange, WizardSession, WizardState};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
