//! Repository implementations. Each repository owns one table and provides
//! the queries the service layer needs; nothing here holds business rules.

pub mod beneficiary;
pub mod email_queue;
pub mod rejected_row;

pub use beneficiary::BeneficiaryRepository;
pub use email_queue::EmailQueueRepository;
pub use rejected_row::RejectedRowRepository;
