pub mod habit;
pub mod list;
pub mod tracker;

// Re-export handler functions for use in routing
pub use habit::get as habit_get;
pub use habit::post as habit_post;
pub use habit::put as habit_put;
pub use habit::delete as habit_delete;

pub use tracker::put as tracker_put;

pub use list::get as list_get;
