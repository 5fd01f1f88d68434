//! View-models behind the explorer pages.

pub mod detail;
mod event_detail;
mod extrinsic_detail;
mod list_view;

pub use detail::{Lookup, LookupError};
pub use event_detail::EventDetailView;
pub use extrinsic_detail::ExtrinsicDetailView;
pub use list_view::{
    group_by_pallet, EventListView, Events, ExtrinsicListView, Extrinsics, ListKind, ListView,
    PalletChoices,
};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Post `message()` to a view's queue on every change of a watch channel,
/// until either side goes away. Views read the latest value themselves when
/// handling the message, so queued notifications never replay stale values.
fn forward_changes<T, M>(
    mut rx: watch::Receiver<T>,
    tx: mpsc::UnboundedSender<M>,
    message: fn() -> M,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    M: Send + 'static,
{
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            if tx.send(message()).is_err() {
                break;
            }
        }
    })
}
