//! Network link underneath the messaging session.

mod netif;

pub use netif::InterfaceLink;

use crate::error::LinkError;

/// Link-layer connectivity (Wi-Fi association, cable, etc.).
#[allow(async_fn_in_trait)]
pub trait Link {
    /// Whether the link is currently usable.
    fn is_up(&mut self) -> bool;

    /// Make one attempt to bring the link up.
    ///
    /// Never loops internally; the caller owns the retry policy.
    async fn connect(&mut self) -> Result<(), LinkError>;
}
