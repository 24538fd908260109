//! Radial "spiral" navigation menu.
//!
//! A [`Menu`] shows the children of its current root as pie slices around a
//! central disc. Clicking a slice with children promotes it to the center,
//! clicking the center returns to the parent, and [`Menu::next`] /
//! [`Menu::previous`] page through children that do not fit on one ring.
//!
//! Drawing goes to a retained [`Scene`] whose tweens are advanced by the host
//! through [`Menu::tick`].

mod macros;

pub mod color;
pub mod error;
pub mod events;
pub mod geometry;
pub mod item;
pub mod menu;
pub mod options;
pub mod scene;

pub use color::FillGenerator;
pub use error::MenuError;
pub use events::{ListenerId, MenuEvent, PageBounds, Signal};
pub use geometry::{Edge, Hit, Layout, Path, Point, Rect};
pub use item::{ItemId, MenuItem};
pub use menu::{Menu, ViewId};
pub use options::MenuOptions;
pub use scene::{AnimationId, ElementId, Scene};
