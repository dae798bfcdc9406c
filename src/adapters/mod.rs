// Adapters layer: concrete implementations of the inventory and presenter seams.

pub mod inventory;
pub mod presenter;

pub use inventory::{FileInventory, HttpInventory, Inventory};
pub use presenter::{presenter_for, JsonPresenter, OutputFormat, TextPresenter};
