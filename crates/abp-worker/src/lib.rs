//! Background processing for the outbound email queue.

pub mod mailer;
pub mod queue;
pub mod template;

pub use mailer::EmailService;
pub use queue::{MailWorker, MailWorkerConfig};
pub use template::{PlainTextRenderer, TemplateRenderer};
