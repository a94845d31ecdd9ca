//! The consent lifecycle as seen from a client: creating a record from a set of terms, taking
//! snapshots of it and moving the data subject's and controller's consent flags.

mod ack;
mod data_flags;
mod error;
mod handle;
mod identity;
mod purpose;
mod session;
mod terms;
mod view;

pub use ack::Ack;
pub use data_flags::DataFlags;
pub use error::{ConsentError, Submission};
pub use handle::ConsentHandle;
pub use identity::Identity;
pub use purpose::Purpose;
pub use session::ConsentSession;
pub use terms::{ConsentTerms, TermsError};
pub use view::{ConsentView, NetworkStatus};
