//! Outbound notifications: device push through FCM and transactional email
//! through MailerSend.

pub mod email;
pub mod push;

pub use email::{Attachment, EmailError, EmailReceipt, EmailRelay, EmailRequest, MailerSendCredentials};
pub use push::{FcmCredentials, PushDispatcher, PushError, PushFailure, PushReport, PushRequest};
