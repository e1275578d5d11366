//! Business logic services

pub mod backend;
pub mod directory;
pub mod email_validation;
pub mod enterprise;
pub mod export;
pub mod membership;
pub mod quota_query;

pub use backend::BackendClient;
pub use directory::{DirectoryCache, DirectorySource, EmailDirectory};
pub use email_validation::{EmailPartition, EmailValidator};
pub use enterprise::{
    EnterpriseRosterEngine, EnterpriseService, MembershipVerifier, ReconciledRoster,
    RosterDraft, RosterOperation,
};
pub use export::QuotaWorkbook;
pub use membership::{
    MembershipGateway, MembershipMutationBuilder, MutationOutcome, RawMembershipForm,
};
pub use quota_query::{QueryResult, QuotaQueryCoordinator, UsageSlot, UsageSource};
