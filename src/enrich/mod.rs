pub mod json_repair;

pub use json_repair::repair_concatenated_objects;
