// [libs/domain/models/src/lib.rs]

pub mod audit;
pub mod document;
pub mod ledger;
pub mod share;
pub mod signature;
pub mod user;
pub mod verification;

pub use audit::AuditRecord;
pub use document::{DigestAlgorithm, Document, DocumentState, SecurityLevel};
pub use ledger::{Endorsement, LedgerRecord, LedgerTransaction, LedgerTxKind, LedgerTxStatus};
pub use share::{AccessLevel, ShareGrant};
pub use signature::{Signature, SignatureKind};
pub use user::User;
pub use verification::{VerificationEvent, VerificationOutcome};
