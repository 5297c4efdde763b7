pub mod audit;
pub mod deserializers;
pub mod directory;
pub mod text;
pub mod ticket;

pub use audit::AuditLogEntry;
pub use directory::{Action, Department, NewUser, Role, UserAccount};
pub use text::{collapse_whitespace, normalize_text, same_identity};
pub use ticket::{ChatMessage, Comment, MessageKind, NewTicket, Priority, Status, Ticket};
