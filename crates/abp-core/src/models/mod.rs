pub mod beneficiary;
pub mod email;
pub mod rejected_row;

pub use beneficiary::{BeneficiaryRecord, NewBeneficiary, PaymentStatus};
pub use email::{EmailStatus, NewQueuedEmail, QueuedEmail};
pub use rejected_row::{NewRejectedRow, RejectedRowLog, RowSnapshot};
