pub mod hub;
pub mod reconcile;

pub use hub::{ChangeEvent, ChangeKind, Hub};
pub use reconcile::ChatView;
