pub mod gestures;
pub mod history;
pub mod tools;
