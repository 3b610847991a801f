// Client-side view pipeline: filter -> sort -> page, plus the navigation
// stack between the list and the detail screen.
pub mod controller;
pub mod filter;
pub mod navigation;
pub mod pager;
pub mod sort;
pub mod view_state;

pub use controller::{load_shared, ListStatus, LoadOutcome, LoadTicket, PageSnapshot, SharedController, ViewController};
pub use filter::{FilterKey, Filters};
pub use navigation::{Navigator, Screen};
pub use sort::SortOrder;
pub use view_state::ViewState;
